//! Contention harness: many actors, one counter, one simultaneous start.
//!
//! A run proceeds in four phases:
//!
//! ```text
//!   spawn         release        operate                  collect
//!   ─────►  actor 0 ┐
//!   ─────►  actor 1 ├─ wait on ─► gate opens ─► ops ─┐  done latch
//!   ─────►  actor n ┘  start gate               ops ─┼─► (bounded wait) ─► RunResult
//!                                               ops ─┘
//! ```
//!
//! Every actor blocks on a shared start gate so that they hit the counter
//! together rather than staggered by thread start-up. The harness then waits
//! on a completion latch with a timeout. Expiry is reported as
//! [`HarnessError::Timeout`]: it means deadlock or starvation, not a
//! consistency problem, and is never folded into per-operation failures.
//!
//! Per-operation failures stay local to the actor and are recorded in a
//! sharded [`Tally`].
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use scorte::counter::{new_counter, StrategyKind};
//! use scorte::harness::{run_benchmark, BenchmarkConfig, Workload};
//!
//! let counter = Arc::new(new_counter(StrategyKind::Cas, 1000).unwrap());
//! let config = BenchmarkConfig::new(4, 250).with_workload(Workload::Decrement);
//!
//! let result = run_benchmark(&counter, &config).unwrap();
//! assert_eq!(result.final_quantity, 0);
//! assert_eq!(result.successes(), 1000);
//! ```

pub mod latch;

use std::fmt::{self, Display};
use std::io;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::counter::{Counter, Quantity};
use crate::error::{HarnessError, Result};
use crate::result::{ActorOutcome, ContentionLevel, Operation, RunResult};
use crate::tally::Tally;

use self::latch::{CountDownOnDrop, Latch};

/// Default bound on the completion wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Which operations the actors perform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Workload {
    /// Every operation adds stock.
    Increment,
    /// Every operation removes stock.
    #[default]
    Decrement,
    /// Operations alternate between adding and removing, offset per actor so
    /// that both kinds are in flight at any moment.
    Mixed,
}

impl Workload {
    /// The operation actor `actor` performs as its `op`-th step.
    pub fn operation(&self, actor: usize, op: usize) -> Operation {
        match self {
            Workload::Increment => Operation::Increment,
            Workload::Decrement => Operation::Decrement,
            Workload::Mixed if (actor + op) % 2 == 0 => Operation::Increment,
            Workload::Mixed => Operation::Decrement,
        }
    }

    /// Short identifier, also accepted by [`FromStr`].
    pub const fn as_str(&self) -> &'static str {
        match self {
            Workload::Increment => "increment",
            Workload::Decrement => "decrement",
            Workload::Mixed => "mixed",
        }
    }
}

impl Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown workload name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown workload `{0}` (expected one of: increment, decrement, mixed)")]
pub struct ParseWorkloadError(String);

impl FromStr for Workload {
    type Err = ParseWorkloadError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        [Workload::Increment, Workload::Decrement, Workload::Mixed]
            .into_iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseWorkloadError(s.to_string()))
    }
}

/// Parameters of one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BenchmarkConfig {
    /// Concurrent actors.
    pub actors: usize,
    /// Operations per actor.
    pub ops_per_actor: usize,
    /// Operation mix.
    pub workload: Workload,
    /// Units moved per operation.
    pub amount: u32,
    /// Bound on the completion wait.
    pub timeout: Duration,
    /// Pause each actor takes after release, before its first operation.
    pub start_delay: Option<Duration>,
}

impl BenchmarkConfig {
    /// Decrement workload of `actors × ops_per_actor` single-unit operations.
    pub fn new(actors: usize, ops_per_actor: usize) -> Self {
        Self {
            actors,
            ops_per_actor,
            workload: Workload::default(),
            amount: 1,
            timeout: DEFAULT_TIMEOUT,
            start_delay: None,
        }
    }

    /// Sets the operation mix.
    pub fn with_workload(mut self, workload: Workload) -> Self {
        self.workload = workload;
        self
    }

    /// Sets the units moved per operation.
    pub fn with_amount(mut self, amount: u32) -> Self {
        self.amount = amount;
        self
    }

    /// Sets the completion timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Makes each actor sleep for `delay` after release.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    /// The contention label of this configuration.
    pub fn level(&self) -> ContentionLevel {
        ContentionLevel {
            actors: self.actors,
            ops_per_actor: self.ops_per_actor,
        }
    }

    /// Rejects configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.actors == 0 {
            return Err(HarnessError::InvalidConfig("actors must be positive"));
        }
        if self.ops_per_actor == 0 {
            return Err(HarnessError::InvalidConfig(
                "operations per actor must be positive",
            ));
        }
        if self.amount == 0 {
            return Err(HarnessError::InvalidConfig("amount must be positive"));
        }
        if self.timeout.is_zero() {
            return Err(HarnessError::InvalidConfig("timeout must be positive"));
        }
        Ok(())
    }
}

/// Contention levels of the stock-decrement comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ContentionPreset {
    /// 4 actors × 250 decrements on 1,000 units.
    Low,
    /// 50 actors × 200 decrements on 10,000 units.
    Medium,
    /// 200 actors × 500 decrements on 100,000 units.
    High,
    /// 500 actors × 1,000 decrements on 500,000 units.
    Extreme,
}

impl ContentionPreset {
    /// Every preset, lowest contention first.
    pub const ALL: [ContentionPreset; 4] = [
        ContentionPreset::Low,
        ContentionPreset::Medium,
        ContentionPreset::High,
        ContentionPreset::Extreme,
    ];

    /// Initial stock, sized so that every single-unit decrement can succeed.
    pub fn initial_quantity(&self) -> Quantity {
        let level = self.config().level();
        level.total_ops() as Quantity
    }

    /// Initial stock for decrements of `amount` units each.
    pub fn stock_for(&self, amount: u32) -> Quantity {
        self.initial_quantity() * Quantity::from(amount)
    }

    /// Decrement-only configuration for this preset.
    pub fn config(&self) -> BenchmarkConfig {
        let (actors, ops) = match self {
            ContentionPreset::Low => (4, 250),
            ContentionPreset::Medium => (50, 200),
            ContentionPreset::High => (200, 500),
            ContentionPreset::Extreme => (500, 1_000),
        };
        BenchmarkConfig::new(actors, ops).with_workload(Workload::Decrement)
    }

    /// Short identifier.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ContentionPreset::Low => "low",
            ContentionPreset::Medium => "medium",
            ContentionPreset::High => "high",
            ContentionPreset::Extreme => "extreme",
        }
    }
}

impl Display for ContentionPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs one actor to completion.
fn run_actor(
    actor: usize,
    counter: &Counter,
    config: &BenchmarkConfig,
    gate: &Latch,
    aborted: &AtomicBool,
    tally: &Tally,
) {
    gate.wait();
    if aborted.load(Ordering::Acquire) {
        return;
    }
    if let Some(delay) = config.start_delay {
        thread::sleep(delay);
    }

    for op in 0..config.ops_per_actor {
        let outcome = match config.workload.operation(actor, op) {
            Operation::Increment => {
                counter.increment(config.amount);
                ActorOutcome::incremented(actor)
            }
            Operation::Decrement => {
                ActorOutcome::decremented(actor, counter.decrement(config.amount))
            }
        };
        tally.record(&outcome);
    }
}

/// Drives `config.actors` concurrent actors against `counter` and collects
/// the result.
///
/// The counter is borrowed for the run only; actors hold clones of the `Arc`.
///
/// # Errors
///
/// - [`HarnessError::InvalidConfig`] before anything is spawned.
/// - [`HarnessError::Spawn`] if an actor thread cannot be started; actors
///   already spawned are released without operating.
/// - [`HarnessError::Timeout`] if the actors do not finish in time. The
///   remaining actors are detached and finish on their own.
/// - [`HarnessError::ActorPanicked`] if an actor panicked.
pub fn run_benchmark(counter: &Arc<Counter>, config: &BenchmarkConfig) -> Result<RunResult> {
    run_benchmark_with(counter, config, spawn_named)
}

/// Body of one actor thread.
type ActorBody = Box<dyn FnOnce() + Send>;

fn spawn_named(actor: usize, body: ActorBody) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("scorte-actor-{actor}"))
        .spawn(body)
}

/// [`run_benchmark`] with the thread spawner supplied by the caller.
pub(crate) fn run_benchmark_with<S>(
    counter: &Arc<Counter>,
    config: &BenchmarkConfig,
    mut spawn: S,
) -> Result<RunResult>
where
    S: FnMut(usize, ActorBody) -> io::Result<JoinHandle<()>>,
{
    config.validate()?;

    let strategy = counter.kind();
    let initial_quantity = counter.quantity();
    let retries_before = counter.retries();

    let gate = Arc::new(Latch::new(1));
    let done = Arc::new(Latch::new(config.actors));
    let aborted = Arc::new(AtomicBool::new(false));
    let tally = Arc::new(Tally::new());
    let shared = Arc::new(config.clone());

    debug!(
        %strategy,
        actors = config.actors,
        ops_per_actor = config.ops_per_actor,
        workload = %config.workload,
        initial_quantity,
        "spawning actors"
    );

    let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(config.actors);
    for actor in 0..config.actors {
        let actor_counter = Arc::clone(counter);
        let actor_config = Arc::clone(&shared);
        let actor_gate = Arc::clone(&gate);
        let actor_done = Arc::clone(&done);
        let actor_aborted = Arc::clone(&aborted);
        let actor_tally = Arc::clone(&tally);

        let body: ActorBody = Box::new(move || {
            let _done = CountDownOnDrop(&actor_done);
            run_actor(
                actor,
                &actor_counter,
                &actor_config,
                &actor_gate,
                &actor_aborted,
                &actor_tally,
            );
        });

        let spawned = spawn(actor, body);

        match spawned {
            Ok(handle) => handles.push(handle),
            Err(source) => {
                aborted.store(true, Ordering::Release);
                gate.count_down();
                return Err(HarnessError::Spawn { actor, source });
            }
        }
    }

    let start = Instant::now();
    gate.count_down();
    debug!(%strategy, actors = config.actors, "actors released");

    if !done.wait_timeout(config.timeout) {
        let finished = config.actors - done.remaining();
        warn!(
            %strategy,
            finished,
            actors = config.actors,
            timeout = ?config.timeout,
            "actors did not finish in time"
        );
        return Err(HarnessError::Timeout {
            timeout: config.timeout,
            finished,
            actors: config.actors,
        });
    }
    let elapsed = start.elapsed();

    for (actor, handle) in handles.into_iter().enumerate() {
        if handle.join().is_err() {
            return Err(HarnessError::ActorPanicked { actor });
        }
    }

    let result = RunResult {
        strategy,
        workload: config.workload,
        level: config.level(),
        amount: config.amount,
        initial_quantity,
        final_quantity: counter.quantity(),
        elapsed,
        totals: tally.totals(),
        retries: counter.retries().saturating_sub(retries_before),
    };

    info!(
        %strategy,
        level = %result.level,
        elapsed_ms = u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX),
        successes = result.successes(),
        failures = result.failures(),
        final_quantity = result.final_quantity,
        retries = result.retries,
        "benchmark finished"
    );

    Ok(result)
}
