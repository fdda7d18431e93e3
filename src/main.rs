//! fwgate - allow-list packet filter
//!
//! Command-line front end for the rule index.
//!
//! # Usage
//!
//! ```bash
//! fwgate check -r fw.csv inbound tcp 80 192.168.1.2   # prints accept/deny
//! fwgate batch -r fw.csv queries.csv                  # one verdict per query row
//! fwgate stats -r fw.csv                              # rule/key/entry counts
//! ```
//!
//! When `--rules` is omitted the `rules_path` from the config file is used.
//! If the rule table cannot be loaded nothing is accepted: the command exits
//! with status 2 and reports why.

use clap::{Parser, Subcommand};
use fwgate::config::{self, AppConfig};
use fwgate::core::error::Error;
use fwgate::core::index::RuleIndex;
use fwgate::core::loader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

/// Exit status for a denied `check`
const EXIT_DENY: u8 = 1;
/// Exit status for any error, including a rule table that failed to load
const EXIT_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = "fwgate")]
#[command(about = "Allow-list packet filter over a static rule table", long_about = None)]
struct Cli {
    /// Config file (default: $FWGATE_CONFIG, then the user config directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a single packet against the rule table
    Check {
        /// Rule file (.csv or .json)
        #[arg(short, long, value_name = "FILE")]
        rules: Option<PathBuf>,
        /// inbound or outbound
        direction: String,
        /// tcp or udp
        protocol: String,
        /// Destination port (1-65535)
        port: u16,
        /// IPv4 address in dotted-quad form
        ip: String,
    },
    /// Check every query in a CSV file (direction,protocol,port,address)
    Batch {
        /// Rule file (.csv or .json)
        #[arg(short, long, value_name = "FILE")]
        rules: Option<PathBuf>,
        /// Query file
        queries: PathBuf,
    },
    /// Show rule table size
    Stats {
        /// Rule file (.csv or .json)
        #[arg(short, long, value_name = "FILE")]
        rules: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            report(&e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    init_logging(cli.verbose, &config);

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            report(&e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_logging(verbose: u8, config: &AppConfig) {
    let level = match verbose {
        0 => tracing::Level::from_str(&config.log_level).unwrap_or(tracing::Level::WARN),
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn report(error: &Error) {
    let translation = error.translate();
    eprintln!("Error: {error}");
    eprintln!("{}", translation.user_message);
    for suggestion in &translation.suggestions {
        eprintln!("  - {suggestion}");
    }
}

/// Loads the rule table named on the command line or in the config.
fn open_index(rules: Option<&Path>, config: &AppConfig) -> Result<RuleIndex, Error> {
    let path = rules
        .or(config.rules_path.as_deref())
        .ok_or(Error::NoRuleSource)?;

    loader::load_index(path, config.limits()).inspect_err(|e| {
        tracing::error!(
            "Firewall could not be loaded from {}: {}; denying all traffic",
            path.display(),
            e
        );
    })
}

fn verdict(accepted: bool) -> &'static str {
    if accepted { "accept" } else { "deny" }
}

fn run(command: Commands, config: &AppConfig) -> Result<ExitCode, Error> {
    match command {
        Commands::Check {
            rules,
            direction,
            protocol,
            port,
            ip,
        } => {
            let index = open_index(rules.as_deref(), config)?;
            let accepted = index.accept(&direction, &protocol, port, &ip)?;
            println!("{}", verdict(accepted));
            Ok(if accepted {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_DENY)
            })
        }
        Commands::Batch { rules, queries } => {
            let index = open_index(rules.as_deref(), config)?;
            let packets = loader::load_packets(&queries)?;
            let mut accepted = 0;
            for packet in &packets {
                let allowed = index.accept_packet(packet);
                accepted += usize::from(allowed);
                println!(
                    "{},{},{},{},{}",
                    packet.direction,
                    packet.protocol,
                    packet.port,
                    packet.address,
                    verdict(allowed)
                );
            }
            tracing::info!(
                "Checked {} queries: {} accepted, {} denied",
                packets.len(),
                accepted,
                packets.len() - accepted
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::Stats { rules } => {
            let index = open_index(rules.as_deref(), config)?;
            let stats = index.stats();
            println!("Rules:   {}", stats.rules);
            println!("Keys:    {}", stats.keys);
            println!("Entries: {}", stats.entries);
            Ok(ExitCode::SUCCESS)
        }
    }
}
