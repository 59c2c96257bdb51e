//! `dnsweep` binary entrypoint.
//!
//! Parses CLI arguments and dispatches to `commands::base::Cli::handle`.
//! The binary is intentionally a thin wrapper: everything past argument
//! parsing happens in `dnsweep::commands::run`.
//!
//! Examples
//!
//! Resolve every host in a wordlist-expanded list, 50 workers, JSON output:
//!
//! $ dnsweep -l hosts.txt -w words.txt -t 50 -j -o out.jsonl
//!
//! Enumerate a CIDR block for PTR records with wildcard filtering:
//!
//! $ dnsweep 10.0.0.0/24 -ptr -wd example.com -wt 5
//!
//! Resume a previously interrupted run:
//!
//! $ dnsweep -l hosts.txt -resume

use clap::Parser;

use dnsweep::commands::base::Cli;
use dnsweep::CommandHandler;

fn main() -> dnsweep::error::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);
    cli.handle()
}

/// Default level `info` unless `RUST_LOG` is set, narrowed to `warn` by
/// `-silent` or widened to `debug` by `-verbose` before the subscriber is
/// installed, so the flags actually gate which records env_logger's own
/// filter lets through rather than only the global fast-path level.
fn init_logging(cli: &Cli) {
    let no_color = std::env::var("NO_COLOR").map(|v| v == "true").unwrap_or(false);
    let style = if no_color {
        env_logger::WriteStyle::Never
    } else {
        env_logger::WriteStyle::Auto
    };

    let default_level = if cli.verbose {
        "debug"
    } else if cli.silent {
        "warn"
    } else {
        "info"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .write_style(style)
        .init();
}
