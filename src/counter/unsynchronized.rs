//! Unsynchronized stock with no ordering between concurrent callers.
//!
//! This strategy exists to demonstrate anomalies. Each operation is a plain
//! load followed by a plain store, so two actors that read the same value
//! both write `value ± amount` and one update is lost:
//!
//! ```text
//!   actor A: load 7 ──────────────── store 8
//!   actor B:      load 7 ──────────────────── store 8     (expected 9)
//! ```
//!
//! Decrement is check-then-act: the availability check and the subtraction
//! read the quantity separately, so concurrent decrements can both pass the
//! check and oversell the stock below zero.
//!
//! The quantity is kept in an `AtomicI64` accessed with `Relaxed` loads and
//! stores. Individual accesses are therefore free of data races at the
//! language level while the read-modify-write sequence remains unsynchronized.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicI64, Ordering};
use std::thread;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::counter::{Quantity, StockStrategy, StrategyKind};
use crate::error::StockError;

/// Delay injected between the read and the write of every update.
///
/// Widening the window makes lost updates reproducible with few actors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum RaceWindow {
    /// No delay.
    #[default]
    None,
    /// Yield the time slice to the scheduler.
    Yield,
    /// Sleep for the given duration.
    Sleep(Duration),
}

impl RaceWindow {
    #[inline]
    fn open(&self) {
        match self {
            RaceWindow::None => {}
            RaceWindow::Yield => thread::yield_now(),
            RaceWindow::Sleep(delay) => thread::sleep(*delay),
        }
    }
}

/// Stock updated with an unsynchronized read-modify-write.
///
/// # Examples
///
/// ```rust
/// use scorte::counter::unsynchronized::Unsynchronized;
/// use scorte::counter::StockStrategy;
///
/// let stock = Unsynchronized::new(10);
/// stock.increment(5);
/// assert!(stock.decrement(3).is_ok());
/// assert_eq!(stock.quantity(), 12);
/// ```
pub struct Unsynchronized {
    quantity: AtomicI64,
    window: RaceWindow,
}

impl Unsynchronized {
    /// Creates the stock at `initial` with no race window.
    pub const fn new(initial: Quantity) -> Self {
        Self {
            quantity: AtomicI64::new(initial),
            window: RaceWindow::None,
        }
    }

    /// Sets the delay injected between read and write.
    pub const fn with_race_window(self, window: RaceWindow) -> Self {
        Self { window, ..self }
    }

    #[inline]
    fn load(&self) -> Quantity {
        self.quantity.load(Ordering::Relaxed)
    }

    #[inline]
    fn store(&self, value: Quantity) {
        self.quantity.store(value, Ordering::Relaxed)
    }
}

impl StockStrategy for Unsynchronized {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Unsynchronized
    }

    fn increment(&self, amount: u32) {
        let current = self.load();
        self.window.open();
        self.store(current.wrapping_add(Quantity::from(amount)));
    }

    fn decrement(&self, amount: u32) -> Result<(), StockError> {
        let requested = Quantity::from(amount);
        let available = self.load();
        if available < requested {
            return Err(StockError::InsufficientStock {
                requested,
                available,
            });
        }

        // re-read: another actor may have moved the stock since the check
        let current = self.load();
        self.window.open();
        self.store(current.wrapping_sub(requested));
        Ok(())
    }

    fn quantity(&self) -> Quantity {
        self.load()
    }
}

impl Debug for Unsynchronized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsynchronized")
            .field("quantity", &self.load())
            .field("window", &self.window)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_sequential_is_exact() {
        let stock = Unsynchronized::new(0);
        for _ in 0..1000 {
            stock.increment(1);
        }
        assert_eq!(stock.quantity(), 1000);
    }

    #[test]
    fn test_insufficient_stock() {
        let stock = Unsynchronized::new(5);
        assert_eq!(
            stock.decrement(10),
            Err(StockError::InsufficientStock {
                requested: 10,
                available: 5
            })
        );
        assert_eq!(stock.quantity(), 5);
    }

    #[test]
    fn test_race_window_builder() {
        let stock = Unsynchronized::new(1).with_race_window(RaceWindow::Yield);
        assert_eq!(stock.window, RaceWindow::Yield);
        stock.increment(1);
        assert_eq!(stock.quantity(), 2);
    }

    #[test]
    fn test_lost_updates_with_race_window() {
        const THREADS: usize = 64;

        let stock = Arc::new(
            Unsynchronized::new(0).with_race_window(RaceWindow::Sleep(Duration::from_millis(20))),
        );
        let barrier = Arc::new(Barrier::new(THREADS));
        let mut handles = vec![];

        for _ in 0..THREADS {
            let stock = Arc::clone(&stock);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                stock.increment(1);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(stock.quantity() < THREADS as Quantity);
    }

    #[test]
    fn test_debug() {
        let stock = Unsynchronized::new(3);
        let debug_str = format!("{:?}", stock);
        assert!(debug_str.starts_with("Unsynchronized"));
        assert!(debug_str.contains("quantity: 3"));
    }
}
