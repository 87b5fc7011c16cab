//! Command-line argument parsing for fulfillsla

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// Parse command line arguments
#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub channel: Option<String>,
    pub location: Option<String>,
    pub at: Option<String>,
    pub json: bool,
    pub validate: bool,
    pub help: bool,
}

impl Args {
    /// Order instant from `--at`, or `now` when the flag is absent
    pub fn ordered_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match &self.at {
            Some(raw) => Ok(DateTime::parse_from_rfc3339(raw.trim())
                .with_context(|| format!("--at '{}' is not an RFC 3339 timestamp", raw))?
                .with_timezone(&Utc)),
            None => Ok(now),
        }
    }
}

pub fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    parse_args_from(&args)
}

/// Parse from an explicit argv, first element being the program name
pub fn parse_args_from(args: &[String]) -> Args {
    let mut result = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--channel" | "-c" => {
                if i + 1 < args.len() {
                    i += 1;
                    result.channel = Some(args[i].clone());
                }
            }
            "--location" | "-l" => {
                if i + 1 < args.len() {
                    i += 1;
                    result.location = Some(args[i].clone());
                }
            }
            "--at" => {
                if i + 1 < args.len() {
                    i += 1;
                    result.at = Some(args[i].clone());
                }
            }
            "--json" => result.json = true,
            "--validate" => result.validate = true,
            "--help" | "-h" => result.help = true,
            _ => {}
        }
        i += 1;
    }

    result
}

pub fn print_help() {
    println!("fulfillsla - Expected fulfillment timestamp calculator\n");
    println!("USAGE:");
    println!("    fulfillsla --channel <NAME> --location <CC> [OPTIONS]\n");
    println!("OPTIONS:");
    println!("    --channel, -c NAME      Sales channel (case-insensitive, e.g. retail)");
    println!("    --location, -l CC       2-letter fulfillment location (e.g. US)");
    println!("    --at TIMESTAMP          Order time in RFC 3339 (default: now)");
    println!("    --json                  Print the full estimate as JSON");
    println!("    --validate              Validate configuration and exit");
    println!("    --help, -h              Show this help message\n");
    println!("ENVIRONMENT:");
    println!("    SLA_CONFIG_PATH         JSON config file (overrides the variables below)");
    println!("    SLA_CUTOFFS             e.g. wholesale=20,retail=15");
    println!("    SLA_WORKDAYS            e.g. CA=1,2,3,4,5,6;US=1,2,3,4,5 (0 = Sunday)");
    println!("    SLA_UTC_OFFSET_HOURS    Reference timezone offset from UTC (default: 4)");
    println!("    SLA_HOUR_CONVERSION     wrapped | legacy (default: wrapped)");
}
