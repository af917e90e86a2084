//! Lock-based stock with mutual exclusion around every operation.
//!
//! Two acquisition styles share one contract and the same guarantees:
//!
//! - [`AcquireStyle::Monitor`]: the quantity lives inside the mutex and is
//!   only reachable through the guard, whose scope is the operation body.
//! - [`AcquireStyle::Explicit`]: a separate lock object is acquired before
//!   touching the quantity and released explicitly once the operation is done.
//!   Early returns release it as well, since the guard is dropped on every
//!   exit path.
//!
//! Reads take the lock too, so a reader never observes a value in the middle
//! of another actor's update.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;

use crate::counter::{Quantity, StockStrategy, StrategyKind};
use crate::error::StockError;

/// How the lock is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStyle {
    /// Quantity guarded by the lock itself.
    Monitor,
    /// Standalone lock object, acquired and released by hand.
    Explicit,
}

enum Guarded {
    Monitor(Mutex<Quantity>),
    // the quantity is only touched while `lock` is held; the atomic makes
    // the type `Sync` without `unsafe`
    Explicit { lock: Mutex<()>, quantity: AtomicI64 },
}

/// Stock serialized by a single mutex.
///
/// # Examples
///
/// ```rust
/// use scorte::counter::locked::{AcquireStyle, Locked};
/// use scorte::counter::StockStrategy;
///
/// let stock = Locked::new(AcquireStyle::Explicit, 5);
/// assert!(stock.decrement(10).is_err());
/// assert_eq!(stock.quantity(), 5);
/// ```
pub struct Locked {
    guarded: Guarded,
}

impl Locked {
    /// Creates the stock at `initial` using the given acquisition style.
    pub fn new(style: AcquireStyle, initial: Quantity) -> Self {
        let guarded = match style {
            AcquireStyle::Monitor => Guarded::Monitor(Mutex::new(initial)),
            AcquireStyle::Explicit => Guarded::Explicit {
                lock: Mutex::new(()),
                quantity: AtomicI64::new(initial),
            },
        };
        Self { guarded }
    }

    /// The acquisition style in use.
    pub fn style(&self) -> AcquireStyle {
        match self.guarded {
            Guarded::Monitor(_) => AcquireStyle::Monitor,
            Guarded::Explicit { .. } => AcquireStyle::Explicit,
        }
    }

    /// Runs `f` on the quantity while holding the lock.
    #[inline]
    fn with_lock<R>(&self, f: impl FnOnce(&mut Quantity) -> R) -> R {
        match &self.guarded {
            Guarded::Monitor(mutex) => {
                let mut guard = mutex.lock();
                f(&mut *guard)
            }
            Guarded::Explicit { lock, quantity } => {
                let guard = lock.lock();
                let mut value = quantity.load(Ordering::Relaxed);
                let result = f(&mut value);
                quantity.store(value, Ordering::Relaxed);
                // release before handing the result back
                drop(guard);
                result
            }
        }
    }
}

fn try_take(quantity: &mut Quantity, amount: u32) -> Result<(), StockError> {
    let requested = Quantity::from(amount);
    if *quantity < requested {
        return Err(StockError::InsufficientStock {
            requested,
            available: *quantity,
        });
    }
    *quantity -= requested;
    Ok(())
}

impl StockStrategy for Locked {
    fn kind(&self) -> StrategyKind {
        match self.style() {
            AcquireStyle::Monitor => StrategyKind::Monitor,
            AcquireStyle::Explicit => StrategyKind::Mutex,
        }
    }

    fn increment(&self, amount: u32) {
        self.with_lock(|quantity| *quantity = quantity.wrapping_add(Quantity::from(amount)))
    }

    fn decrement(&self, amount: u32) -> Result<(), StockError> {
        self.with_lock(|quantity| try_take(quantity, amount))
    }

    fn quantity(&self) -> Quantity {
        self.with_lock(|quantity| *quantity)
    }
}

impl Debug for Locked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locked")
            .field("style", &self.style())
            .field("quantity", &self.quantity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const STYLES: [AcquireStyle; 2] = [AcquireStyle::Monitor, AcquireStyle::Explicit];

    #[test]
    fn test_kind_follows_style() {
        assert_eq!(
            Locked::new(AcquireStyle::Monitor, 0).kind(),
            StrategyKind::Monitor
        );
        assert_eq!(
            Locked::new(AcquireStyle::Explicit, 0).kind(),
            StrategyKind::Mutex
        );
    }

    #[test]
    fn test_increment_decrement() {
        for style in STYLES {
            let stock = Locked::new(style, 10);
            stock.increment(5);
            assert_eq!(stock.decrement(15), Ok(()));
            assert_eq!(stock.quantity(), 0);
        }
    }

    #[test]
    fn test_failed_decrement_keeps_quantity() {
        for style in STYLES {
            let stock = Locked::new(style, 5);
            assert!(matches!(
                stock.decrement(10),
                Err(StockError::InsufficientStock { .. })
            ));
            assert_eq!(stock.quantity(), 5);
        }
    }

    #[test]
    fn test_lock_released_after_failure() {
        for style in STYLES {
            let stock = Locked::new(style, 0);
            assert!(stock.decrement(1).is_err());
            // a leaked guard would deadlock here
            stock.increment(1);
            assert_eq!(stock.quantity(), 1);
        }
    }

    #[test]
    fn test_explicit_lock_released_after_each_operation() {
        let stock = Locked::new(AcquireStyle::Explicit, 1);
        let lock = match &stock.guarded {
            Guarded::Explicit { lock, .. } => lock,
            Guarded::Monitor(_) => unreachable!(),
        };

        stock.increment(2);
        assert!(lock.try_lock().is_some());
        assert!(stock.decrement(3).is_ok());
        assert!(lock.try_lock().is_some());
        assert!(stock.decrement(1).is_err());
        assert!(lock.try_lock().is_some());
        assert_eq!(stock.quantity(), 0);
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_multiple_threads() {
        for style in STYLES {
            let stock = Arc::new(Locked::new(style, 0));
            let mut handles = vec![];

            for _ in 0..8 {
                let stock = Arc::clone(&stock);
                handles.push(thread::spawn(move || {
                    for _ in 0..1000 {
                        stock.increment(1);
                    }
                }));
            }

            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(stock.quantity(), 8000);
        }
    }

    #[test]
    fn test_debug() {
        let stock = Locked::new(AcquireStyle::Monitor, 4);
        let debug_str = format!("{:?}", stock);
        assert!(debug_str.contains("Monitor"));
        assert!(debug_str.contains("quantity: 4"));
    }
}
