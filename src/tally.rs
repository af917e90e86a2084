//! Sharded aggregation of actor outcomes.
//!
//! Outcome counting must not become a second point of contention that
//! distorts the benchmark. [`Tally`] therefore uses the sharded counter
//! layout: each thread writes to its own cache-padded slot and totals are
//! computed by summing all slots on read.
//!
//! ```text
//!                          ┌─────────────────────────────────────┐
//!                          │               Tally                 │
//!                          ├─────────────────────────────────────┤
//!   Actor 0 ──records──►   │ [Slot 0] inc dec short exh (padded) │
//!   Actor 1 ──records──►   │ [Slot 1] inc dec short exh (padded) │
//!        ...               │    ...                              │
//!   Actor 63 ─records──►   │ [Slot 63] ...                       │
//!                          └─────────────────────────────────────┘
//!                                          │
//!                                          ▼
//!                                  totals() sums slots
//! ```
//!
//! Slots are assigned round-robin the first time a thread records anything.
//! After 64 threads the assignment wraps and threads share slots, which only
//! costs some contention, never accuracy.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use crate::result::{ActorOutcome, FailureReason, Operation, Totals};

/// Number of shards in a [`Tally`].
pub(crate) const NUM_SLOTS: usize = 64;

/// Global counter for assigning slot IDs to threads.
static NEXT_SLOT_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// Slot index of the current thread, assigned lazily and stable for the
    /// thread's lifetime.
    static THREAD_SLOT_INDEX: usize = next_slot_id();
}

/// Returns the next slot index in `[0, NUM_SLOTS)`.
///
/// `Relaxed` suffices: two threads landing on the same slot only adds
/// contention.
fn next_slot_id() -> usize {
    NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed) % NUM_SLOTS
}

#[derive(Default)]
struct Slot {
    increments: AtomicU64,
    decrements: AtomicU64,
    insufficient_stock: AtomicU64,
    retry_exhausted: AtomicU64,
}

impl Slot {
    fn load(&self) -> Totals {
        Totals {
            increments: self.increments.load(Ordering::Relaxed),
            decrements: self.decrements.load(Ordering::Relaxed),
            insufficient_stock: self.insufficient_stock.load(Ordering::Relaxed),
            retry_exhausted: self.retry_exhausted.load(Ordering::Relaxed),
        }
    }
}

/// Concurrency-safe accumulator of [`ActorOutcome`]s.
///
/// # Examples
///
/// ```rust
/// use scorte::result::ActorOutcome;
/// use scorte::tally::Tally;
///
/// let tally = Tally::new();
/// tally.record(&ActorOutcome::incremented(0));
/// tally.record(&ActorOutcome::decremented(0, Ok(())));
/// assert_eq!(tally.totals().successes(), 2);
/// ```
pub struct Tally {
    slots: [CachePadded<Slot>; NUM_SLOTS],
}

impl Tally {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| CachePadded::new(Slot::default())),
        }
    }

    #[inline]
    fn local_slot(&self) -> &Slot {
        THREAD_SLOT_INDEX.with(|idx| &self.slots[*idx])
    }

    /// Records one outcome in the current thread's slot.
    #[inline]
    pub fn record(&self, outcome: &ActorOutcome) {
        let slot = self.local_slot();
        let field = match (outcome.operation, outcome.failure) {
            (Operation::Increment, _) => &slot.increments,
            (Operation::Decrement, None) => &slot.decrements,
            (Operation::Decrement, Some(FailureReason::InsufficientStock)) => {
                &slot.insufficient_stock
            }
            (Operation::Decrement, Some(FailureReason::RetryExhausted)) => &slot.retry_exhausted,
        };
        field.fetch_add(1, Ordering::Relaxed);
    }

    /// Sums all slots.
    ///
    /// The sum is exact once every recording thread has been synchronized
    /// with (joined, or released a lock the reader then acquired).
    pub fn totals(&self) -> Totals {
        self.slots.iter().fold(Totals::default(), |acc, slot| {
            let slot = slot.load();
            Totals {
                increments: acc.increments + slot.increments,
                decrements: acc.decrements + slot.decrements,
                insufficient_stock: acc.insufficient_stock + slot.insufficient_stock,
                retry_exhausted: acc.retry_exhausted + slot.retry_exhausted,
            }
        })
    }
}

impl Default for Tally {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Tally {
    /// Formats the tally showing non-empty slots.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tally{{")?;
        for (i, slot) in self.slots.iter().enumerate() {
            let totals = slot.load();
            if totals != Totals::default() {
                write!(
                    f,
                    " [{i}]:{}/{}",
                    totals.successes(),
                    totals.successes() + totals.failures()
                )?;
            }
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StockError;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty() {
        assert_eq!(Tally::new().totals(), Totals::default());
    }

    #[test]
    fn test_record_by_reason() {
        let tally = Tally::new();
        tally.record(&ActorOutcome::incremented(0));
        tally.record(&ActorOutcome::decremented(0, Ok(())));
        tally.record(&ActorOutcome::decremented(
            0,
            Err(StockError::InsufficientStock {
                requested: 1,
                available: 0,
            }),
        ));
        tally.record(&ActorOutcome::decremented(
            0,
            Err(StockError::RetryExhausted { attempts: 100 }),
        ));

        let totals = tally.totals();
        assert_eq!(totals.increments, 1);
        assert_eq!(totals.decrements, 1);
        assert_eq!(totals.insufficient_stock, 1);
        assert_eq!(totals.retry_exhausted, 1);
        assert_eq!(totals.successes(), 2);
        assert_eq!(totals.failures(), 2);
    }

    #[test]
    fn test_multiple_threads() {
        let tally = Arc::new(Tally::new());
        let mut handles = vec![];

        for actor in 0..100 {
            let tally = Arc::clone(&tally);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    tally.record(&ActorOutcome::incremented(actor));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tally.totals().increments, 10_000);
    }

    #[test]
    fn test_slot_ids_in_range() {
        for _ in 0..(NUM_SLOTS * 2) {
            assert!(next_slot_id() < NUM_SLOTS);
        }
    }

    #[test]
    fn test_debug() {
        let tally = Tally::new();
        tally.record(&ActorOutcome::incremented(0));
        let debug_str = format!("{:?}", tally);
        assert!(debug_str.starts_with("Tally{"));
        assert!(debug_str.contains("1/1"));
        assert!(debug_str.ends_with("}"));
    }
}
