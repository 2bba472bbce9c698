//! Command-line interface for the carpool route engine.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tokio::runtime::Runtime;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::util::SubscriberInitExt;

mod error;
mod fs;
mod geocode;
mod route;

pub use error::CliError;

use geocode::{GeocodeArgs, ReverseArgs, run_geocode, run_reverse};
use route::{RouteArgs, run_route};

const ARG_ROUTE_REQUEST: &str = "request-path";
const ENV_ROUTE_REQUEST: &str = "CARPOOL_CMDS_ROUTE_REQUEST_PATH";
const ARG_GEOCODE_QUERY: &str = "query";
const ENV_GEOCODE_QUERY: &str = "CARPOOL_CMDS_GEOCODE_QUERY";
const ARG_REVERSE_LAT: &str = "lat";
const ENV_REVERSE_LAT: &str = "CARPOOL_CMDS_REVERSE_LAT";
const ARG_REVERSE_LNG: &str = "lng";
const ENV_REVERSE_LNG: &str = "CARPOOL_CMDS_REVERSE_LNG";

/// Run the carpool CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    init_logging(cli.verbose)?;
    match cli.command {
        Command::Route(args) => run_route(args),
        Command::Geocode(args) => run_geocode(args),
        Command::Reverse(args) => run_reverse(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "carpool",
    about = "Plan shared car journeys: order pickups and geocode places",
    version
)]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Order pickups between an origin and a destination.
    Route(RouteArgs),
    /// Resolve a place name to coordinates.
    Geocode(GeocodeArgs),
    /// Describe the address at a coordinate.
    Reverse(ReverseArgs),
}

const fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Logs go to stderr so stdout stays machine-readable JSON.
fn init_logging(verbose: u8) -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_max_level(level_for(verbose))
        .with_writer(std::io::stderr)
        .finish()
        .try_init()
        .map_err(CliError::Logging)
}

pub(crate) fn runtime() -> Result<Runtime, CliError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}

pub(crate) fn write_json<T: Serialize + ?Sized>(
    writer: &mut dyn Write,
    value: &T,
) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *writer, value).map_err(CliError::SerialiseOutput)?;
    writeln!(writer).map_err(CliError::WriteOutput)
}

#[cfg(test)]
mod tests;
