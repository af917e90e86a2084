//! # Scorte - A Contention Laboratory for Shared Stock
//!
//! A Rust library for observing what happens to a single shared stock level
//! when many threads update it at once under different synchronization
//! strategies. It lets you reproduce **lost updates**, measure the
//! throughput cost of each discipline at increasing contention, and check
//! the data-consistency invariants every run is supposed to keep.
//!
//! ## The Problem
//!
//! A stock decrement is a read-modify-write: read the quantity, check that
//! enough is available, write the new value. Without synchronization two
//! threads can read the same value and both write their result, so one
//! update vanishes. Worse, two decrements can both pass the availability
//! check and oversell the stock below zero.
//!
//! Each fix has a price. A mutex serializes every caller. A compare-and-swap
//! loop never blocks but may retry indefinitely under heavy contention, which
//! is why the bounded variant gives up after a retry budget.
//!
//! ## Strategies
//!
//! | Strategy | Type | Guarantees |
//! |----------|------|------------|
//! | `unsynchronized` | [`Unsynchronized`](counter::unsynchronized::Unsynchronized) | none, used to demonstrate anomalies |
//! | `mutex` | [`Locked`](counter::locked::Locked) (explicit) | one operation at a time, reads included |
//! | `monitor` | [`Locked`](counter::locked::Locked) (monitor) | same as `mutex`, data owned by the lock |
//! | `cas` | [`Cas`](counter::cas::Cas) (bounded) | lock-free, fails after 100 lost races by default |
//! | `cas-unbounded` | [`Cas`](counter::cas::Cas) (unbounded) | lock-free, retries until it wins |
//!
//! All of them sit behind the [`StockStrategy`](counter::StockStrategy) trait
//! and are wrapped by a single [`Counter`](counter::Counter) entity.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use scorte::counter::{new_counter, StrategyKind};
//! use scorte::harness::{run_benchmark, BenchmarkConfig, Workload};
//! use scorte::validate::validate;
//!
//! // 1000 units of stock, drained by 4 actors doing 250 decrements each
//! let counter = Arc::new(new_counter(StrategyKind::Cas, 1000).unwrap());
//! let config = BenchmarkConfig::new(4, 250).with_workload(Workload::Decrement);
//!
//! let result = run_benchmark(&counter, &config).unwrap();
//! assert_eq!(result.final_quantity, 0);
//!
//! let violations = validate(&result, 1000, StrategyKind::Cas.correctness());
//! assert!(violations.is_empty());
//! ```
//!
//! ## How a Run Works
//!
//! 1. **Spawn**: one OS thread per actor, each blocked on a shared start gate.
//! 2. **Release**: the gate opens and every actor starts at once.
//! 3. **Operate**: each actor performs its operations and records every
//!    outcome in a sharded [`Tally`](tally::Tally), so counting does not add
//!    contention of its own.
//! 4. **Collect**: the harness waits on a completion latch with a timeout and
//!    builds a [`RunResult`](result::RunResult).
//!
//! A timeout is a harness failure ([`HarnessError::Timeout`](error::HarnessError::Timeout)),
//! never a per-operation one. Per-operation failures (insufficient stock,
//! retry exhaustion) are outcome data.
//!
//! ## Validation
//!
//! [`validate`](validate::validate) checks that every dispatched operation
//! was recorded, that consistent strategies conserve stock
//! (`initial + added - removed == final`) and that the stock never ends
//! negative. Violations are returned as a list, never raised.
//!
//! ## Logging
//!
//! The library emits [`tracing`] events: run start and release at `debug`,
//! a run summary at `info`, retry exhaustion and harness timeouts at `warn`,
//! individual CAS retries at `trace`. Install any subscriber to see them.
//!
//! ## Observers
//!
//! | Feature | Module | Description |
//! |---------|--------|-------------|
//! | `table` | [`observers::table`] | Comparison tables with relative speed |
//! | `json` | [`observers::json`] | Serialize runs to JSON |
//! | `serde` | [`snapshot`] | Serializable run and suite snapshots |
//! | `full` | All observers | Enables all observer modules |
//!
//! ```rust,ignore
//! use scorte::observers::table::TableObserver;
//! use scorte::validate::ValidationReport;
//!
//! let reports = vec![ValidationReport::new(result)];
//! println!("{}", TableObserver::new().render(reports.iter()));
//! ```

pub mod counter;
pub mod error;
pub mod harness;
pub mod observers;
pub mod result;
pub mod tally;
pub mod validate;

#[cfg(feature = "serde")]
pub mod snapshot;
