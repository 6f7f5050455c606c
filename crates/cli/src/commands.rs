//! clap command tree.

use clap::{value_parser, Arg, ArgAction, Command};

/// Flags shared by `run` and `compare` that override the config file.
fn load_args() -> Vec<Arg> {
    vec![
        Arg::new("threads")
            .long("threads")
            .short('t')
            .value_parser(value_parser!(usize))
            .help("Concurrent callers"),
        Arg::new("calls")
            .long("calls")
            .short('n')
            .value_parser(value_parser!(usize))
            .help("Increments per caller"),
        Arg::new("delay-ms")
            .long("delay-ms")
            .short('d')
            .value_parser(value_parser!(u64))
            .help("Injected processing delay in milliseconds"),
        Arg::new("seed")
            .long("seed")
            .value_parser(value_parser!(i64))
            .allow_negative_numbers(true)
            .help("Initial counter value"),
        Arg::new("max-attempts")
            .long("max-attempts")
            .value_parser(value_parser!(u32))
            .help("Bound on optimistic commit attempts"),
    ]
}

/// Build the top-level command.
pub fn build_cli() -> Command {
    Command::new("tally")
        .about("Compare cache/store coherence strategies under concurrent increments")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print reports as JSON"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .help("Log filter, overrides RUST_LOG (e.g. info, tally_concurrency=debug)"),
        )
        .subcommand(
            Command::new("run")
                .about("Run one load trial with a single strategy")
                .arg(
                    Arg::new("strategy")
                        .long("strategy")
                        .short('s')
                        .help("Strategy name (see `tally strategies`)"),
                )
                .args(load_args()),
        )
        .subcommand(
            Command::new("compare")
                .about("Run the same trial against several strategies")
                .arg(
                    Arg::new("strategies")
                        .long("strategies")
                        .short('s')
                        .value_delimiter(',')
                        .num_args(1..)
                        .help("Comma-separated strategy names; all when omitted"),
                )
                .args(load_args()),
        )
        .subcommand(Command::new("strategies").about("List available strategies"))
}
