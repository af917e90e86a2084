//! Post-run consistency checks.
//!
//! [`validate`] inspects a [`RunResult`] and returns the invariants it breaks
//! as data. Nothing here panics or returns an error: a racy strategy is
//! expected to produce violations, and the caller decides what to do with
//! them.
//!
//! | Invariant | Applies to |
//! |-----------|------------|
//! | recorded outcomes == dispatched operations | every strategy |
//! | `initial + added - removed == final` | [`CorrectnessClass::Consistent`] only |
//! | final quantity is not negative | every strategy |

use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::counter::{CorrectnessClass, Quantity};
use crate::result::RunResult;

/// A named invariant that did not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "invariant", rename_all = "kebab-case"))]
pub enum Violation {
    /// Successes plus failures differ from the operations dispatched.
    AttemptsMismatch {
        /// Operations dispatched by the harness.
        dispatched: u64,
        /// Outcomes that were recorded.
        recorded: u64,
    },
    /// The final quantity disagrees with the recorded successes.
    ConservationBroken {
        /// Quantity implied by the initial stock and recorded successes.
        expected: Quantity,
        /// Quantity actually observed.
        actual: Quantity,
    },
    /// The stock ended below zero.
    NegativeQuantity {
        /// Quantity actually observed.
        actual: Quantity,
    },
}

impl Violation {
    /// Stable name of the broken invariant.
    pub const fn name(&self) -> &'static str {
        match self {
            Violation::AttemptsMismatch { .. } => "attempts-mismatch",
            Violation::ConservationBroken { .. } => "conservation-broken",
            Violation::NegativeQuantity { .. } => "negative-quantity",
        }
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::AttemptsMismatch {
                dispatched,
                recorded,
            } => write!(
                f,
                "{}: dispatched {dispatched}, recorded {recorded}",
                self.name()
            ),
            Violation::ConservationBroken { expected, actual } => write!(
                f,
                "{}: expected final {expected}, actual {actual}",
                self.name()
            ),
            Violation::NegativeQuantity { actual } => {
                write!(f, "{}: final quantity {actual}", self.name())
            }
        }
    }
}

/// Checks `result` against the invariants of `class`.
///
/// `initial_quantity` is the stock the run started from; it takes precedence
/// over the value recorded in the result, so a caller can validate against
/// the quantity it configured.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use scorte::counter::{new_counter, StrategyKind};
/// use scorte::harness::{run_benchmark, BenchmarkConfig};
/// use scorte::validate::validate;
///
/// let counter = Arc::new(new_counter(StrategyKind::Mutex, 100).unwrap());
/// let result = run_benchmark(&counter, &BenchmarkConfig::new(4, 25)).unwrap();
///
/// assert!(validate(&result, 100, StrategyKind::Mutex.correctness()).is_empty());
/// ```
pub fn validate(
    result: &RunResult,
    initial_quantity: Quantity,
    class: CorrectnessClass,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    let dispatched = result.total_attempts();
    let recorded = result.recorded_attempts();
    if dispatched != recorded {
        violations.push(Violation::AttemptsMismatch {
            dispatched,
            recorded,
        });
    }

    if class == CorrectnessClass::Consistent {
        let expected = RunResult {
            initial_quantity,
            ..result.clone()
        }
        .expected_final();
        if expected != result.final_quantity {
            violations.push(Violation::ConservationBroken {
                expected,
                actual: result.final_quantity,
            });
        }
    }

    if result.final_quantity < 0 {
        violations.push(Violation::NegativeQuantity {
            actual: result.final_quantity,
        });
    }

    violations
}

/// A run together with the invariants it broke.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValidationReport {
    /// The validated run.
    pub result: RunResult,
    /// Class the run was validated against.
    pub class: CorrectnessClass,
    /// Broken invariants, empty if the run is consistent.
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Validates `result` against the class its strategy claims.
    pub fn new(result: RunResult) -> Self {
        let class = result.strategy.correctness();
        let violations = validate(&result, result.initial_quantity, class);
        Self {
            result,
            class,
            violations,
        }
    }

    /// Whether every invariant held.
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.result)?;
        if self.is_consistent() {
            return write!(f, " | consistent");
        }
        for violation in &self.violations {
            write!(f, "\n  ! {violation}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::StrategyKind;
    use crate::result::tests::sample;
    use crate::result::Totals;

    #[test]
    fn test_consistent_run() {
        let result = sample();
        assert!(validate(&result, 1000, CorrectnessClass::Consistent).is_empty());
        assert!(ValidationReport::new(result).is_consistent());
    }

    #[test]
    fn test_attempts_mismatch() {
        let result = RunResult {
            final_quantity: 1,
            totals: Totals {
                decrements: 999,
                ..Totals::default()
            },
            ..sample()
        };
        assert_eq!(
            validate(&result, 1000, CorrectnessClass::Consistent),
            vec![Violation::AttemptsMismatch {
                dispatched: 1000,
                recorded: 999
            }]
        );
    }

    #[test]
    fn test_conservation_only_for_consistent_class() {
        let result = RunResult {
            strategy: StrategyKind::Unsynchronized,
            final_quantity: 12,
            ..sample()
        };
        let broken = Violation::ConservationBroken {
            expected: 0,
            actual: 12,
        };
        assert_eq!(
            validate(&result, 1000, CorrectnessClass::Consistent),
            vec![broken]
        );
        assert!(validate(&result, 1000, CorrectnessClass::Racy).is_empty());
    }

    #[test]
    fn test_negative_quantity_for_every_class() {
        let result = RunResult {
            strategy: StrategyKind::Unsynchronized,
            final_quantity: -3,
            ..sample()
        };
        let report = ValidationReport::new(result);
        assert_eq!(report.class, CorrectnessClass::Racy);
        assert_eq!(
            report.violations,
            vec![Violation::NegativeQuantity { actual: -3 }]
        );
    }

    #[test]
    fn test_initial_quantity_argument_wins() {
        let result = sample();
        assert_eq!(
            validate(&result, 900, CorrectnessClass::Consistent),
            vec![Violation::ConservationBroken {
                expected: -100,
                actual: 0
            }]
        );
    }

    #[test]
    fn test_display() {
        let violation = Violation::ConservationBroken {
            expected: 0,
            actual: 12,
        };
        assert_eq!(
            violation.to_string(),
            "conservation-broken: expected final 0, actual 12"
        );

        let report = ValidationReport::new(sample());
        assert!(report.to_string().ends_with("| consistent"));
    }
}
