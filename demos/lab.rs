//! Contention lab: run strategies side by side and validate the outcome.
//!
//! Run with:
//! ```bash
//! cargo run --example lab --features demo -- --help
//! cargo run --example lab --features demo -- --preset high
//! cargo run --example lab --features demo -- --workload increment --actors 1000 --ops 1 \
//!     --race-window-ms 100 --strategy unsynchronized --strategy mutex
//! RUST_LOG=scorte=debug cargo run --example lab --features demo
//! ```

use std::num::NonZeroU32;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use scorte::counter::unsynchronized::RaceWindow;
use scorte::counter::{Counter, StrategyKind, StrategyOptions, DEFAULT_RETRY_BUDGET};
use scorte::harness::{run_benchmark, BenchmarkConfig, ContentionPreset, Workload};
use scorte::observers::json::JsonObserver;
use scorte::observers::table::{TableObserver, TableStyle};
use scorte::validate::ValidationReport;
use tracing_subscriber::EnvFilter;

/// Output format for the results.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Comparison table
    Table,
    /// JSON document
    Json,
}

/// Table style selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum StyleChoice {
    Ascii,
    #[default]
    Rounded,
    Sharp,
    Modern,
    Markdown,
}

impl From<StyleChoice> for TableStyle {
    fn from(choice: StyleChoice) -> Self {
        match choice {
            StyleChoice::Ascii => TableStyle::Ascii,
            StyleChoice::Rounded => TableStyle::Rounded,
            StyleChoice::Sharp => TableStyle::Sharp,
            StyleChoice::Modern => TableStyle::Modern,
            StyleChoice::Markdown => TableStyle::Markdown,
        }
    }
}

/// Contention preset selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetChoice {
    Low,
    Medium,
    High,
    Extreme,
}

impl From<PresetChoice> for ContentionPreset {
    fn from(choice: PresetChoice) -> Self {
        match choice {
            PresetChoice::Low => ContentionPreset::Low,
            PresetChoice::Medium => ContentionPreset::Medium,
            PresetChoice::High => ContentionPreset::High,
            PresetChoice::Extreme => ContentionPreset::Extreme,
        }
    }
}

/// Run synchronization strategies against a shared stock counter.
#[derive(Parser, Debug)]
#[command(name = "lab")]
#[command(about = "Compare stock synchronization strategies under contention")]
struct Args {
    /// Strategies to run (repeatable); all of them if omitted
    #[arg(short, long, value_parser = clap::value_parser!(StrategyKind))]
    strategy: Vec<StrategyKind>,

    /// Use a predefined contention level (overrides actors, ops and initial; stock scales with amount)
    #[arg(short, long, value_enum)]
    preset: Option<PresetChoice>,

    /// Number of concurrent actors
    #[arg(short, long, default_value_t = 4)]
    actors: usize,

    /// Operations per actor
    #[arg(short, long, default_value_t = 250)]
    ops: usize,

    /// Initial stock
    #[arg(short, long, default_value_t = 1000)]
    initial: i64,

    /// Operation mix: increment, decrement or mixed
    #[arg(short, long, default_value = "decrement")]
    workload: Workload,

    /// Units per operation
    #[arg(long, default_value_t = 1)]
    amount: u32,

    /// CAS attempts before a decrement gives up
    #[arg(long, default_value_t = DEFAULT_RETRY_BUDGET)]
    retry_budget: NonZeroU32,

    /// Sleep between read and write in the unsynchronized strategy
    #[arg(long)]
    race_window_ms: Option<u64>,

    /// Sleep each actor takes after release
    #[arg(long)]
    start_delay_ms: Option<u64>,

    /// Harness timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Table style
    #[arg(long, value_enum, default_value_t = StyleChoice::Rounded)]
    style: StyleChoice,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn scenario(&self) -> (String, BenchmarkConfig, i64) {
        let (label, config, initial) = match self.preset {
            Some(choice) => {
                let preset = ContentionPreset::from(choice);
                (preset.to_string(), preset.config(), preset.stock_for(self.amount))
            }
            None => (
                "custom".to_string(),
                BenchmarkConfig::new(self.actors, self.ops).with_workload(self.workload),
                self.initial,
            ),
        };

        let mut config = config
            .with_amount(self.amount)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(ms) = self.start_delay_ms {
            config = config.with_start_delay(Duration::from_millis(ms));
        }
        (label, config, initial)
    }

    fn options(&self) -> StrategyOptions {
        StrategyOptions {
            retry_budget: self.retry_budget,
            race_window: self
                .race_window_ms
                .map(|ms| RaceWindow::Sleep(Duration::from_millis(ms)))
                .unwrap_or(RaceWindow::None),
        }
    }

    fn strategies(&self) -> Vec<StrategyKind> {
        if self.strategy.is_empty() {
            StrategyKind::ALL.to_vec()
        } else {
            self.strategy.clone()
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let (label, config, initial) = args.scenario();
    let options = args.options();

    let mut reports = Vec::new();
    for kind in args.strategies() {
        let counter = match Counter::with_strategy(kind, initial, &options) {
            Ok(counter) => Arc::new(counter.with_id(1).with_name("Item").with_unit_price(1000)),
            Err(err) => {
                eprintln!("cannot create {kind} counter: {err}");
                return ExitCode::FAILURE;
            }
        };

        match run_benchmark(&counter, &config) {
            Ok(result) => reports.push(ValidationReport::new(result)),
            Err(err) => {
                eprintln!("{kind}: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    match args.format {
        OutputFormat::Table => {
            let title = format!(
                "{label}: {} | initial stock {initial} | {} x{}",
                config.level(),
                config.workload,
                config.amount
            );
            let observer = TableObserver::new()
                .with_style(args.style.into())
                .with_title(title);
            println!("{}", observer.render(reports.iter()));
        }
        OutputFormat::Json => {
            let observer = JsonObserver::new()
                .pretty(args.pretty)
                .with_timestamp(true)
                .with_scenario(label);
            match observer.to_json(reports.iter()) {
                Ok(json) => println!("{json}"),
                Err(err) => {
                    eprintln!("{err}");
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}
