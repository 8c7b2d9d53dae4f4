//! Command-line interface (CLI) for reproduction number [Commands](Command).

use crate::rt::{EstimateArgs, LocateArgs};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

/// CLI arguments to locate surveillance data or estimate the reproduction number.
#[derive(Debug, Deserialize, Parser, Serialize)]
#[clap(about = "Locate surveillance data and estimate the reproduction number.")]
pub struct Args {
    /// Reproduction number command: Locate, Estimate
    #[clap(subcommand)]
    pub command: Command,
}

/// CLI reproduction number [commands](#variants).
#[derive(Debug, Deserialize, Serialize, Subcommand)]
pub enum Command {
    // ------------------------------------------------------------------------
    /// Pass CLI arguments to the [locate](crate::rt::locate()) method.
    /// ## Examples
    /// ```rust
    /// use covsurv::{Cli, cli::Command, cli::rt};
    /// use clap::Parser;
    /// let input   = ["covsurv", "rt", "locate", "--retries", "2"];
    /// match Cli::parse_from(input).command {
    ///   Command::Rt(args) => match args.command {
    ///     rt::Command::Locate(args) => assert_eq!(args.fetch.retries, 2),
    ///     _                         => assert!(false),
    ///   },
    ///   _                 => assert!(false),
    /// }
    /// ```
    #[clap(about = "Print the link to the latest surveillance data archive.")]
    Locate(LocateArgs),
    // ------------------------------------------------------------------------
    /// Pass CLI arguments to the [estimate](crate::rt::estimate()) method.
    /// ## Examples
    /// ```rust
    /// use covsurv::{Cli, cli::Command, cli::rt};
    /// use clap::Parser;
    /// use chrono::NaiveDate;
    /// let input   = ["covsurv", "rt", "estimate", "-o", "rt", "--archive", "data.zip", "--archive-date", "2021-06-15", "--smoothing", "50"];
    /// match Cli::parse_from(input).command {
    ///   Command::Rt(args) => match args.command {
    ///     rt::Command::Estimate(args) => {
    ///       assert_eq!(args.archive_date, NaiveDate::from_ymd_opt(2021, 6, 15));
    ///       assert_eq!(args.params.smoothing, 50.0);
    ///       assert_eq!(args.trailing_days, 3);
    ///     }
    ///     _ => assert!(false),
    ///   },
    ///   _ => assert!(false),
    /// }
    /// ```
    #[clap(about = "Estimate the reproduction number.")]
    #[clap(arg_required_else_help = true)]
    Estimate(EstimateArgs),
}
