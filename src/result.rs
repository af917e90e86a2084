//! Per-operation outcomes and the aggregate of one benchmark run.

use std::fmt::{self, Display};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::counter::{Quantity, StrategyKind};
use crate::error::StockError;
use crate::harness::Workload;

/// The operation an actor attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Operation {
    /// Add stock.
    Increment,
    /// Remove stock.
    Decrement,
}

/// Why a decrement did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum FailureReason {
    /// Less stock than requested was available.
    InsufficientStock,
    /// The compare-and-swap retry budget ran out.
    RetryExhausted,
}

impl From<StockError> for FailureReason {
    fn from(err: StockError) -> Self {
        match err {
            StockError::RetryExhausted { .. } => FailureReason::RetryExhausted,
            // a live counter never reports a negative initial quantity
            StockError::InsufficientStock { .. } | StockError::NegativeQuantity(_) => {
                FailureReason::InsufficientStock
            }
        }
    }
}

/// The result of one operation performed by one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorOutcome {
    /// Index of the actor that performed the operation.
    pub actor: usize,
    /// What was attempted.
    pub operation: Operation,
    /// `None` on success.
    pub failure: Option<FailureReason>,
}

impl ActorOutcome {
    /// Builds the outcome of an increment, which always succeeds.
    pub fn incremented(actor: usize) -> Self {
        Self {
            actor,
            operation: Operation::Increment,
            failure: None,
        }
    }

    /// Builds the outcome of a decrement from its result.
    pub fn decremented(actor: usize, result: Result<(), StockError>) -> Self {
        Self {
            actor,
            operation: Operation::Decrement,
            failure: result.err().map(FailureReason::from),
        }
    }

    /// Whether the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Contention label of a run: how many actors, how many operations each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContentionLevel {
    /// Concurrent actors.
    pub actors: usize,
    /// Operations performed by each actor.
    pub ops_per_actor: usize,
}

impl ContentionLevel {
    /// Total operations across all actors.
    pub fn total_ops(&self) -> u64 {
        self.actors as u64 * self.ops_per_actor as u64
    }
}

impl Display for ContentionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} actors x {} ops", self.actors, self.ops_per_actor)
    }
}

/// Outcome counts accumulated during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Totals {
    /// Increments performed.
    pub increments: u64,
    /// Decrements that removed stock.
    pub decrements: u64,
    /// Decrements rejected for insufficient stock.
    pub insufficient_stock: u64,
    /// Decrements that exhausted their retry budget.
    pub retry_exhausted: u64,
}

impl Totals {
    /// Successful operations of either kind.
    pub fn successes(&self) -> u64 {
        self.increments + self.decrements
    }

    /// Failed operations, whatever the reason.
    pub fn failures(&self) -> u64 {
        self.insufficient_stock + self.retry_exhausted
    }
}

/// Aggregate of one benchmark execution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunResult {
    /// Strategy under test.
    pub strategy: StrategyKind,
    /// Operation mix performed by the actors.
    pub workload: Workload,
    /// Actors and operations per actor.
    pub level: ContentionLevel,
    /// Units moved by each operation.
    pub amount: u32,
    /// Quantity when the actors were released.
    pub initial_quantity: Quantity,
    /// Quantity once every actor finished.
    pub final_quantity: Quantity,
    /// Wall-clock time from release to completion.
    pub elapsed: Duration,
    /// Outcome counts.
    pub totals: Totals,
    /// Compare-and-swap retries performed during the run.
    pub retries: u64,
}

impl RunResult {
    /// Successful operations.
    pub fn successes(&self) -> u64 {
        self.totals.successes()
    }

    /// Failed operations.
    pub fn failures(&self) -> u64 {
        self.totals.failures()
    }

    /// Operations that were recorded, successful or not.
    pub fn recorded_attempts(&self) -> u64 {
        self.successes() + self.failures()
    }

    /// Operations the harness dispatched.
    pub fn total_attempts(&self) -> u64 {
        self.level.total_ops()
    }

    /// The final quantity a serializable execution of the recorded outcomes
    /// would produce.
    pub fn expected_final(&self) -> Quantity {
        let amount = i128::from(self.amount);
        let expected = i128::from(self.initial_quantity)
            + i128::from(self.totals.increments) * amount
            - i128::from(self.totals.decrements) * amount;
        expected.clamp(i128::from(Quantity::MIN), i128::from(Quantity::MAX)) as Quantity
    }

    /// `final - expected`. Zero for a consistent run; positive when
    /// decrements were lost, negative when increments were lost.
    pub fn consistency_delta(&self) -> i128 {
        i128::from(self.final_quantity) - i128::from(self.expected_final())
    }

    /// Updates that left no trace in the final quantity.
    pub fn lost_updates(&self) -> u64 {
        let amount = u128::from(self.amount.max(1));
        let lost = self.consistency_delta().unsigned_abs() / amount;
        u64::try_from(lost).unwrap_or(u64::MAX)
    }

    /// Recorded operations per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.recorded_attempts() as f64 / secs
    }

    /// Mean wall-clock time per recorded operation.
    pub fn mean_latency(&self) -> Duration {
        match u32::try_from(self.recorded_attempts()) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.elapsed / n,
            Err(_) => Duration::from_secs_f64(
                self.elapsed.as_secs_f64() / self.recorded_attempts() as f64,
            ),
        }
    }

    /// Elapsed time relative to `baseline` (1.0 means equally fast).
    pub fn relative_to(&self, baseline: Duration) -> f64 {
        if baseline.is_zero() {
            return 1.0;
        }
        self.elapsed.as_secs_f64() / baseline.as_secs_f64()
    }
}

impl Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ms | success: {}, failure: {}, final stock: {}",
            self.strategy,
            self.elapsed.as_millis(),
            self.successes(),
            self.failures(),
            self.final_quantity
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample() -> RunResult {
        RunResult {
            strategy: StrategyKind::Mutex,
            workload: Workload::Decrement,
            level: ContentionLevel {
                actors: 4,
                ops_per_actor: 250,
            },
            amount: 1,
            initial_quantity: 1000,
            final_quantity: 0,
            elapsed: Duration::from_millis(20),
            totals: Totals {
                decrements: 1000,
                ..Totals::default()
            },
            retries: 0,
        }
    }

    #[test]
    fn test_outcome_from_result() {
        let ok = ActorOutcome::decremented(1, Ok(()));
        assert!(ok.is_success());

        let exhausted =
            ActorOutcome::decremented(2, Err(StockError::RetryExhausted { attempts: 100 }));
        assert_eq!(exhausted.failure, Some(FailureReason::RetryExhausted));

        let short = ActorOutcome::decremented(
            3,
            Err(StockError::InsufficientStock {
                requested: 2,
                available: 1,
            }),
        );
        assert_eq!(short.failure, Some(FailureReason::InsufficientStock));
        assert!(ActorOutcome::incremented(0).is_success());
    }

    #[test]
    fn test_consistent_run_metrics() {
        let result = sample();
        assert_eq!(result.successes(), 1000);
        assert_eq!(result.failures(), 0);
        assert_eq!(result.total_attempts(), 1000);
        assert_eq!(result.expected_final(), 0);
        assert_eq!(result.consistency_delta(), 0);
        assert_eq!(result.lost_updates(), 0);
        assert!((result.throughput() - 50_000.0).abs() < 1e-6);
        assert_eq!(result.mean_latency(), Duration::from_micros(20));
    }

    #[test]
    fn test_lost_increments() {
        let result = RunResult {
            workload: Workload::Increment,
            initial_quantity: 0,
            final_quantity: 940,
            totals: Totals {
                increments: 1000,
                ..Totals::default()
            },
            ..sample()
        };
        assert_eq!(result.expected_final(), 1000);
        assert_eq!(result.consistency_delta(), -60);
        assert_eq!(result.lost_updates(), 60);
    }

    #[test]
    fn test_lost_decrements_with_amount() {
        let result = RunResult {
            amount: 5,
            initial_quantity: 100,
            final_quantity: 30,
            totals: Totals {
                decrements: 20,
                ..Totals::default()
            },
            ..sample()
        };
        assert_eq!(result.expected_final(), 0);
        assert_eq!(result.consistency_delta(), 30);
        assert_eq!(result.lost_updates(), 6);
    }

    #[test]
    fn test_relative_to() {
        let result = sample();
        assert!((result.relative_to(Duration::from_millis(10)) - 2.0).abs() < 1e-9);
        assert_eq!(result.relative_to(Duration::ZERO), 1.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sample().to_string(),
            "[mutex] 20 ms | success: 1000, failure: 0, final stock: 0"
        );
        assert_eq!(sample().level.to_string(), "4 actors x 250 ops");
    }
}
