//! Lock-free stock built on compare-and-swap.
//!
//! Increment is a single `fetch_add` and never retries. Decrement is an
//! optimistic loop expressed as an explicit state machine:
//!
//! ```text
//!            ┌──────────────────────────────────────────┐
//!            ▼                                          │
//!   ┌──────────────┐    ┌───────────┐    ┌────────┐   ┌─┴─────┐
//!   │     Read     │──► │  Compare  │──► │ Commit │──►│ Retry │
//!   └──────────────┘    └─────┬─────┘    └───┬────┘   └───┬───┘
//!                             │ current <    │ CAS ok     │ budget spent
//!                             ▼ amount       ▼            ▼
//!                           Fail           done         Fail
//! ```
//!
//! Insufficient stock fails immediately: it is not a transient condition and
//! retrying would not help. A failed CAS means another actor changed the
//! quantity in between; the loop starts over from `Read`. Under
//! [`RetryPolicy::Bounded`] the attempt counter makes exhaustion a reachable
//! terminal state reported as [`StockError::RetryExhausted`]. Under
//! [`RetryPolicy::Unbounded`] the loop keeps going until it wins.
//!
//! In both failure states the quantity is left exactly as the other actors
//! made it: the only write is the successful CAS itself.

use std::fmt::{self, Debug};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crossbeam_utils::CachePadded;
use tracing::{trace, warn};

use crate::counter::{Quantity, StockStrategy, StrategyKind, DEFAULT_RETRY_BUDGET};
use crate::error::StockError;

/// How many times a decrement may attempt its compare-and-swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Give up after this many failed attempts.
    Bounded(NonZeroU32),
    /// Retry until the compare-and-swap succeeds.
    Unbounded,
}

impl RetryPolicy {
    #[inline]
    fn exhausted(&self, attempts: u32) -> bool {
        match self {
            RetryPolicy::Bounded(budget) => attempts >= budget.get(),
            RetryPolicy::Unbounded => false,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::Bounded(DEFAULT_RETRY_BUDGET)
    }
}

/// States of one decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CasStep {
    Read,
    Compare { current: Quantity },
    Commit { current: Quantity, next: Quantity },
    Retry,
    Fail(StockError),
}

/// Stock updated with lock-free atomic operations.
///
/// # Examples
///
/// ```rust
/// use scorte::counter::cas::{Cas, RetryPolicy};
/// use scorte::counter::StockStrategy;
///
/// let stock = Cas::new(100, RetryPolicy::default());
/// stock.increment(10);
/// assert!(stock.decrement(110).is_ok());
/// assert_eq!(stock.quantity(), 0);
/// ```
pub struct Cas {
    quantity: CachePadded<AtomicI64>,
    retries: CachePadded<AtomicU64>,
    policy: RetryPolicy,
}

impl Cas {
    /// Creates the stock at `initial` with the given retry policy.
    pub const fn new(initial: Quantity, policy: RetryPolicy) -> Self {
        Self {
            quantity: CachePadded::new(AtomicI64::new(initial)),
            retries: CachePadded::new(AtomicU64::new(0)),
            policy,
        }
    }

    /// The retry policy in use.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Drives the decrement state machine. `before_commit` runs right before
    /// every compare-and-swap.
    pub(crate) fn decrement_with(
        &self,
        amount: u32,
        mut before_commit: impl FnMut(),
    ) -> Result<(), StockError> {
        let requested = Quantity::from(amount);
        let mut attempts: u32 = 0;
        let mut step = CasStep::Read;

        loop {
            step = match step {
                CasStep::Read => CasStep::Compare {
                    current: self.quantity.load(Ordering::Acquire),
                },
                CasStep::Compare { current } if current < requested => {
                    CasStep::Fail(StockError::InsufficientStock {
                        requested,
                        available: current,
                    })
                }
                CasStep::Compare { current } => CasStep::Commit {
                    current,
                    next: current - requested,
                },
                CasStep::Commit { current, next } => {
                    before_commit();
                    attempts += 1;
                    // strong CAS: a spurious failure would burn retry budget
                    match self.quantity.compare_exchange(
                        current,
                        next,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(_) => return Ok(()),
                        Err(_) => CasStep::Retry,
                    }
                }
                CasStep::Retry if self.policy.exhausted(attempts) => {
                    warn!(attempts, amount, "cas decrement retry budget exhausted");
                    CasStep::Fail(StockError::RetryExhausted { attempts })
                }
                CasStep::Retry => {
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    trace!(attempts, "cas decrement lost race, retrying");
                    CasStep::Read
                }
                CasStep::Fail(err) => return Err(err),
            };
        }
    }
}

impl StockStrategy for Cas {
    fn kind(&self) -> StrategyKind {
        match self.policy {
            RetryPolicy::Bounded(_) => StrategyKind::Cas,
            RetryPolicy::Unbounded => StrategyKind::CasUnbounded,
        }
    }

    #[inline]
    fn increment(&self, amount: u32) {
        self.quantity
            .fetch_add(Quantity::from(amount), Ordering::AcqRel);
    }

    #[inline]
    fn decrement(&self, amount: u32) -> Result<(), StockError> {
        self.decrement_with(amount, || {})
    }

    #[inline]
    fn quantity(&self) -> Quantity {
        self.quantity.load(Ordering::Acquire)
    }

    fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }
}

impl Debug for Cas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cas")
            .field("quantity", &self.quantity())
            .field("retries", &self.retries())
            .field("policy", &self.policy)
            .finish()
    }
}
