//! The stock counter and its synchronization strategies.
//!
//! A [`Counter`] is one stock entity (identifier, display name, unit price)
//! whose quantity is owned by an injected [`StockStrategy`]. Every strategy
//! honours the same contract and differs only in how concurrent callers are
//! serialized:
//!
//! | Kind | Module | Guarantees |
//! |------|--------|------------|
//! | [`StrategyKind::Unsynchronized`] | [`unsynchronized`] | none, lost updates and overselling are expected |
//! | [`StrategyKind::Mutex`] | [`locked`] | explicit lock object, acquired and released around each operation |
//! | [`StrategyKind::Monitor`] | [`locked`] | quantity lives inside the lock, guard scoped to the operation |
//! | [`StrategyKind::Cas`] | [`cas`] | lock-free, bounded optimistic retry |
//! | [`StrategyKind::CasUnbounded`] | [`cas`] | lock-free, retries until it converges |
//!
//! # Contract
//!
//! ```text
//!   increment(amount)  -> ()                       always succeeds
//!   decrement(amount)  -> Ok(()) | InsufficientStock | RetryExhausted
//!   quantity()         -> Quantity                 serialized for lock-based kinds
//! ```
//!
//! A failed decrement never changes the quantity.
//!
//! # Examples
//!
//! ```rust
//! use scorte::counter::{new_counter, StrategyKind};
//!
//! let counter = new_counter(StrategyKind::Cas, 5).unwrap();
//! assert!(counter.decrement(10).is_err());
//! assert_eq!(counter.quantity(), 5);
//! ```

pub mod cas;
pub mod locked;
pub mod unsynchronized;

use std::fmt::{self, Debug, Display};
use std::num::NonZeroU32;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::StockError;

use self::cas::{Cas, RetryPolicy};
use self::locked::{AcquireStyle, Locked};
use self::unsynchronized::{RaceWindow, Unsynchronized};

/// Stock level. Signed so that overselling by racy strategies is observable.
pub type Quantity = i64;

/// Default number of compare-and-swap attempts before a decrement gives up.
pub const DEFAULT_RETRY_BUDGET: NonZeroU32 = match NonZeroU32::new(100) {
    Some(n) => n,
    None => unreachable!(),
};

/// Selects one of the synchronization strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum StrategyKind {
    /// Plain read-modify-write with no synchronization.
    Unsynchronized,
    /// Explicit lock object acquired and released around each operation.
    Mutex,
    /// Quantity guarded by the lock itself, access scoped to the guard.
    Monitor,
    /// Lock-free compare-and-swap with a bounded retry budget.
    Cas,
    /// Lock-free compare-and-swap retrying until it succeeds.
    CasUnbounded,
}

impl StrategyKind {
    /// Every strategy, in presentation order.
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Unsynchronized,
        StrategyKind::Mutex,
        StrategyKind::Monitor,
        StrategyKind::Cas,
        StrategyKind::CasUnbounded,
    ];

    /// Short identifier, also accepted by [`FromStr`].
    pub const fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Unsynchronized => "unsynchronized",
            StrategyKind::Mutex => "mutex",
            StrategyKind::Monitor => "monitor",
            StrategyKind::Cas => "cas",
            StrategyKind::CasUnbounded => "cas-unbounded",
        }
    }

    /// The consistency guarantee this strategy claims.
    pub const fn correctness(&self) -> CorrectnessClass {
        match self {
            StrategyKind::Unsynchronized => CorrectnessClass::Racy,
            _ => CorrectnessClass::Consistent,
        }
    }
}

impl Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown strategy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy `{0}` (expected one of: unsynchronized, mutex, monitor, cas, cas-unbounded)")]
pub struct ParseStrategyError(String);

impl FromStr for StrategyKind {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseStrategyError(s.to_string()))
    }
}

/// Whether a strategy promises per-operation atomicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum CorrectnessClass {
    /// Every operation is atomic: `initial + added - removed == final`.
    Consistent,
    /// No guarantee; anomalies are the expected outcome.
    Racy,
}

/// Tuning knobs applied when a strategy is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StrategyOptions {
    /// Attempts granted to [`StrategyKind::Cas`] before it reports exhaustion.
    pub retry_budget: NonZeroU32,
    /// Delay injected by [`StrategyKind::Unsynchronized`] between read and write.
    pub race_window: RaceWindow,
}

impl Default for StrategyOptions {
    fn default() -> Self {
        Self {
            retry_budget: DEFAULT_RETRY_BUDGET,
            race_window: RaceWindow::None,
        }
    }
}

/// Capability set shared by every synchronization strategy.
///
/// Implementors own the quantity. `Counter` only forwards to them, so a
/// single run never mixes two disciplines on the same quantity.
pub trait StockStrategy: Send + Sync + Debug {
    /// Which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Adds `amount` to the quantity. Never fails.
    fn increment(&self, amount: u32);

    /// Removes `amount` if at least that much is available.
    ///
    /// On error the quantity is unchanged.
    fn decrement(&self, amount: u32) -> Result<(), StockError>;

    /// Returns the current quantity.
    fn quantity(&self) -> Quantity;

    /// Total compare-and-swap retries performed so far. Zero for strategies
    /// that never retry.
    fn retries(&self) -> u64 {
        0
    }
}

/// A stock entity whose quantity is governed by one [`StockStrategy`].
///
/// Share it across actors with `Arc<Counter>`; the strategy is fixed for the
/// counter's lifetime.
pub struct Counter {
    id: u64,
    name: &'static str,
    unit_price: u64,
    stock: Box<dyn StockStrategy>,
}

impl Counter {
    /// Wraps `stock` in a counter with no name, id 0 and a zero unit price.
    pub fn new(stock: impl StockStrategy + 'static) -> Self {
        Self {
            id: 0,
            name: "",
            unit_price: 0,
            stock: Box::new(stock),
        }
    }

    /// Builds a counter for `kind` starting at `initial`.
    ///
    /// # Errors
    ///
    /// Returns [`StockError::NegativeQuantity`] if `initial` is below zero.
    pub fn with_strategy(
        kind: StrategyKind,
        initial: Quantity,
        options: &StrategyOptions,
    ) -> Result<Self, StockError> {
        if initial < 0 {
            return Err(StockError::NegativeQuantity(initial));
        }

        let counter = match kind {
            StrategyKind::Unsynchronized => {
                Counter::new(Unsynchronized::new(initial).with_race_window(options.race_window))
            }
            StrategyKind::Mutex => Counter::new(Locked::new(AcquireStyle::Explicit, initial)),
            StrategyKind::Monitor => Counter::new(Locked::new(AcquireStyle::Monitor, initial)),
            StrategyKind::Cas => {
                Counter::new(Cas::new(initial, RetryPolicy::Bounded(options.retry_budget)))
            }
            StrategyKind::CasUnbounded => Counter::new(Cas::new(initial, RetryPolicy::Unbounded)),
        };
        Ok(counter)
    }

    /// Sets the identifier, returning `self` for method chaining.
    pub fn with_id(self, id: u64) -> Self {
        Self { id, ..self }
    }

    /// Sets the display name, returning `self` for method chaining.
    pub fn with_name(self, name: &'static str) -> Self {
        Self { name, ..self }
    }

    /// Sets the fixed unit price, returning `self` for method chaining.
    pub fn with_unit_price(self, unit_price: u64) -> Self {
        Self { unit_price, ..self }
    }

    /// Opaque identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Display name, empty if none was set.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Unit price. Immutable after construction.
    pub fn unit_price(&self) -> u64 {
        self.unit_price
    }

    /// The strategy governing the quantity.
    pub fn kind(&self) -> StrategyKind {
        self.stock.kind()
    }

    /// Adds `amount` units.
    #[inline]
    pub fn increment(&self, amount: u32) {
        self.stock.increment(amount)
    }

    /// Removes `amount` units if available.
    #[inline]
    pub fn decrement(&self, amount: u32) -> Result<(), StockError> {
        self.stock.decrement(amount)
    }

    /// Current quantity.
    #[inline]
    pub fn quantity(&self) -> Quantity {
        self.stock.quantity()
    }

    /// Compare-and-swap retries performed so far.
    pub fn retries(&self) -> u64 {
        self.stock.retries()
    }

    /// Value of the stock on hand (`quantity * unit_price`), clamped at zero.
    pub fn stock_value(&self) -> u128 {
        u128::from(self.quantity().max(0).unsigned_abs()) * u128::from(self.unit_price)
    }
}

impl Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("unit_price", &self.unit_price)
            .field("stock", &self.stock)
            .finish()
    }
}

impl Display for Counter {
    /// Formats the counter as `name:quantity` if named, or just `quantity` otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.name.is_empty() {
            write!(f, "{}:{}", self.name, self.quantity())
        } else {
            write!(f, "{}", self.quantity())
        }
    }
}

/// Builds a counter for `kind` with default [`StrategyOptions`].
///
/// # Errors
///
/// Returns [`StockError::NegativeQuantity`] if `initial` is below zero.
pub fn new_counter(kind: StrategyKind, initial: Quantity) -> Result<Counter, StockError> {
    Counter::with_strategy(kind, initial, &StrategyOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_counter_every_kind() {
        for kind in StrategyKind::ALL {
            let counter = new_counter(kind, 42).unwrap();
            assert_eq!(counter.kind(), kind);
            assert_eq!(counter.quantity(), 42);
        }
    }

    #[test]
    fn test_negative_initial_rejected() {
        assert_eq!(
            new_counter(StrategyKind::Mutex, -1).unwrap_err(),
            StockError::NegativeQuantity(-1)
        );
    }

    #[test]
    fn test_decrement_beyond_stock_leaves_quantity() {
        for kind in StrategyKind::ALL {
            let counter = new_counter(kind, 5).unwrap();
            assert_eq!(
                counter.decrement(10),
                Err(StockError::InsufficientStock {
                    requested: 10,
                    available: 5
                }),
                "{kind}"
            );
            assert_eq!(counter.quantity(), 5, "{kind}");
        }
    }

    #[test]
    fn test_sequential_drain_to_zero() {
        for kind in StrategyKind::ALL {
            let counter = new_counter(kind, 100).unwrap();
            for _ in 0..100 {
                counter.decrement(1).unwrap();
            }
            assert_eq!(counter.quantity(), 0, "{kind}");
            assert!(counter.decrement(1).is_err(), "{kind}");
        }
    }

    #[test]
    fn test_builder_attributes() {
        let counter = new_counter(StrategyKind::Monitor, 3)
            .unwrap()
            .with_id(1)
            .with_name("MacBook")
            .with_unit_price(2_000_000);
        assert_eq!(counter.id(), 1);
        assert_eq!(counter.name(), "MacBook");
        assert_eq!(counter.unit_price(), 2_000_000);
        assert_eq!(counter.stock_value(), 6_000_000);
        assert_eq!(counter.to_string(), "MacBook:3");
    }

    #[test]
    fn test_display_unnamed() {
        let counter = new_counter(StrategyKind::Cas, 7).unwrap();
        assert_eq!(counter.to_string(), "7");
    }

    #[test]
    fn test_parse_strategy() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
        }
        assert_eq!("CAS".parse::<StrategyKind>().unwrap(), StrategyKind::Cas);
        assert!("spinlock".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_correctness_class() {
        assert_eq!(
            StrategyKind::Unsynchronized.correctness(),
            CorrectnessClass::Racy
        );
        for kind in [
            StrategyKind::Mutex,
            StrategyKind::Monitor,
            StrategyKind::Cas,
            StrategyKind::CasUnbounded,
        ] {
            assert_eq!(kind.correctness(), CorrectnessClass::Consistent);
        }
    }

    #[test]
    fn test_default_options() {
        let options = StrategyOptions::default();
        assert_eq!(options.retry_budget.get(), 100);
        assert_eq!(options.race_window, RaceWindow::None);
    }
}
