//! ArgMatches → CliAction conversion.
//!
//! Loads the configuration file (or defaults), applies flag overrides, and
//! validates the result before anything runs.

use clap::ArgMatches;
use tally_concurrency::StrategyKind;
use tally_engine::TallyConfig;

/// The result of parsing the command line.
#[derive(Debug)]
pub enum CliAction {
    /// One trial with the configured strategy.
    Run { config: TallyConfig },
    /// One trial per listed strategy.
    Compare {
        config: TallyConfig,
        kinds: Vec<StrategyKind>,
    },
    /// Print the strategy table.
    Strategies,
}

/// Convert clap ArgMatches into a CliAction.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    let (sub_name, sub_matches) = matches
        .subcommand()
        .ok_or_else(|| "No command provided".to_string())?;

    match sub_name {
        "run" => {
            let mut config = load_config(matches)?;
            if let Some(name) = sub_matches.get_one::<String>("strategy") {
                config.strategy.kind = parse_kind(name)?;
            }
            apply_overrides(&mut config, sub_matches)?;
            Ok(CliAction::Run { config })
        }
        "compare" => {
            let mut config = load_config(matches)?;
            apply_overrides(&mut config, sub_matches)?;
            let kinds = match sub_matches.get_many::<String>("strategies") {
                Some(names) => names.map(|n| parse_kind(n)).collect::<Result<Vec<_>, _>>()?,
                None => StrategyKind::ALL.to_vec(),
            };
            Ok(CliAction::Compare { config, kinds })
        }
        "strategies" => Ok(CliAction::Strategies),
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn load_config(matches: &ArgMatches) -> Result<TallyConfig, String> {
    match matches.get_one::<String>("config") {
        Some(path) => TallyConfig::load(path).map_err(|e| e.to_string()),
        None => Ok(TallyConfig::default()),
    }
}

fn parse_kind(name: &str) -> Result<StrategyKind, String> {
    name.trim().parse().map_err(|e: tally_core::Error| e.to_string())
}

fn apply_overrides(config: &mut TallyConfig, m: &ArgMatches) -> Result<(), String> {
    if let Some(&threads) = m.get_one::<usize>("threads") {
        config.load.threads = threads;
    }
    if let Some(&calls) = m.get_one::<usize>("calls") {
        config.load.calls_per_thread = calls;
    }
    if let Some(&delay) = m.get_one::<u64>("delay-ms") {
        config.strategy.delay_ms = delay;
    }
    if let Some(&seed) = m.get_one::<i64>("seed") {
        config.seed = seed;
    }
    if let Some(&attempts) = m.get_one::<u32>("max-attempts") {
        config.strategy.max_attempts = Some(attempts);
    }
    config.validate().map_err(|e| e.to_string())
}
