//! Error types for stock operations and benchmark runs.
//!
//! Two families are kept apart:
//!
//! - [`StockError`] describes why a single operation on a counter failed.
//!   It is plain data: actors capture it as an outcome and never propagate it
//!   across thread boundaries.
//! - [`HarnessError`] describes why a whole run could not produce a result
//!   (timeout, panicking actor, bad configuration). It aborts result collection.
//!
//! Invariant violations found after a run are not errors at all; see
//! [`crate::validate`].

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::counter::Quantity;

/// Failure of a single stock operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StockError {
    /// The decrement asked for more than was available. Expected under load,
    /// counted as a failed attempt.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        /// Amount the caller tried to remove.
        requested: Quantity,
        /// Quantity observed when the request was rejected.
        available: Quantity,
    },

    /// The optimistic retry loop did not converge within its budget.
    /// The counter was left untouched.
    #[error("failed to decrement after {attempts} attempts due to high contention")]
    RetryExhausted {
        /// Number of compare-and-swap attempts that were made.
        attempts: u32,
    },

    /// A counter cannot start below zero.
    #[error("negative initial quantity: {0}")]
    NegativeQuantity(Quantity),
}

/// Failure of a benchmark run as a whole.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Actors did not finish within the configured bound. This points at
    /// deadlock or starvation, not at a data-consistency problem.
    #[error("{finished} of {actors} actors finished within {timeout:?}")]
    Timeout {
        /// The bound that expired.
        timeout: Duration,
        /// Actors that completed before the deadline.
        finished: usize,
        /// Actors that were dispatched.
        actors: usize,
    },

    /// An actor thread panicked while running its operations.
    #[error("actor {actor} panicked")]
    ActorPanicked {
        /// Index of the failing actor.
        actor: usize,
    },

    /// The benchmark configuration was rejected before any actor started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// The operating system refused to start an actor thread.
    #[error("failed to spawn actor {actor}: {source}")]
    Spawn {
        /// Index of the actor that could not be started.
        actor: usize,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Result type for benchmark runs.
pub type Result<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_error_display() {
        let err = StockError::InsufficientStock {
            requested: 10,
            available: 5,
        };
        assert_eq!(err.to_string(), "insufficient stock: requested 10, available 5");

        let err = StockError::RetryExhausted { attempts: 100 };
        assert_eq!(
            err.to_string(),
            "failed to decrement after 100 attempts due to high contention"
        );
    }

    #[test]
    fn test_harness_error_display() {
        let err = HarnessError::Timeout {
            timeout: Duration::from_secs(1),
            finished: 3,
            actors: 4,
        };
        assert_eq!(err.to_string(), "3 of 4 actors finished within 1s");
        assert_eq!(
            HarnessError::InvalidConfig("actors must be positive").to_string(),
            "invalid configuration: actors must be positive"
        );
    }

    #[test]
    fn test_spawn_error_source() {
        use std::error::Error as _;

        let err = HarnessError::Spawn {
            actor: 7,
            source: io::Error::new(io::ErrorKind::Other, "no threads left"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("actor 7"));
    }
}
