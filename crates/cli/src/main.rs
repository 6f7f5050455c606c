//! Tally CLI: load trials against the cache/store coherence strategies.
//!
//! - `tally run --strategy naive`: one trial, one strategy
//! - `tally compare`: the same trial against every strategy
//! - `tally strategies`: list strategy names

mod commands;
mod format;
mod parse;

use std::process;

use tally_engine::{compare, CachePriming, Dispatcher, LoadTest, TallyConfig, TrialReport};
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{format_comparison, format_error, format_report, format_strategies, OutputMode};
use parse::{matches_to_action, CliAction};

/// Initialize tracing from `--log-level`, else `RUST_LOG`, else `warn`.
fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(false)
        .compact()
        .init();
}

fn main() {
    let matches = build_cli().get_matches();

    init_tracing(matches.get_one::<String>("log-level").map(String::as_str));

    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let result = matches_to_action(&matches).and_then(|action| match action {
        CliAction::Run { config } => {
            run_single(&config).map(|report| format_report(&report, output_mode))
        }
        CliAction::Compare { config, kinds } => compare(&config, &kinds)
            .map(|reports| format_comparison(&reports, output_mode))
            .map_err(|e| e.to_string()),
        CliAction::Strategies => Ok(format_strategies(output_mode)),
    });

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("{}", format_error(&e, output_mode));
            process::exit(1);
        }
    }
}

fn run_single(config: &TallyConfig) -> Result<TrialReport, String> {
    let dispatcher = Dispatcher::from_config(config).map_err(|e| e.to_string())?;
    tracing::debug!(
        strategy = %dispatcher.strategy(),
        threads = config.load.threads,
        calls_per_thread = config.load.calls_per_thread,
        "starting trial"
    );
    dispatcher
        .prime(CachePriming::for_strategy(dispatcher.strategy()))
        .map_err(|e| e.to_string())?;
    LoadTest::from_config(config)
        .and_then(|test| test.run(&dispatcher))
        .map_err(|e| e.to_string())
}
