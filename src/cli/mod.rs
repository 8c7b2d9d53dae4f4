//! [Command-line interface](Cli) (CLI) of the main binary.

pub mod rt;

use crate::surveillance::MutationsArgs;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

// ----------------------------------------------------------------------------
// CLI Entry Point
// ----------------------------------------------------------------------------

/// The command-line interface (CLI).
/// ---
/// The CLI parses user input from the command-line in the main function, with the `parse`
/// function reading [`std::env::args`](https://doc.rust-lang.org/std/env/fn.args.html).
/// ```no_run
/// use clap::Parser;
/// let args = covsurv::Cli::parse();
/// ```
/// Here is a manual example of setting the command-line input:
/// ```rust
/// # use clap::Parser;
/// let input = ["covsurv", "mutations", "--metadata", "metadata.tsv", "--mutations", "mutations.tsv", "--output-dir", "report", "--bin", "seven-day"];
/// let args = covsurv::Cli::parse_from(input);
/// serde_json::to_string_pretty(&args)?;
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Debug, Deserialize, Parser, Serialize)]
#[clap(name = "covsurv", author, version)]
#[clap(about = "covsurv reports SARS-CoV-2 lineages and mutations over time, and estimates the reproduction number.")]
pub struct Cli {
    #[clap(subcommand)]
    /// Pass CLI arguments to a particular [Command].
    #[clap(help = "Set the command.")]
    pub command: Command,

    /// Set the output [Verbosity] level.
    #[clap(short = 'v', long)]
    #[clap(value_enum, default_value_t = Verbosity::default())]
    #[clap(hide_possible_values = false)]
    #[clap(global = true)]
    #[clap(help = "Set the output verbosity level.")]
    pub verbosity: Verbosity,
}

/// CLI [commands](#variants). Used to decide which runtime [Command](#variants) the CLI arguments should be passed to.
#[derive(Debug, Deserialize, Serialize, Subcommand)]
pub enum Command {
    /// Pass CLI arguments to the [mutations report](crate::surveillance::report()).
    /// ## Examples
    /// ```rust
    /// use covsurv::{Cli, cli::Command};
    /// use clap::Parser;
    /// let input = ["covsurv", "mutations", "--metadata", "m.tsv", "--mutations", "n.tsv", "-o", "out", "--mutation", "S:N501Y", "--mutation", "S:E484K"];
    /// match Cli::parse_from(input).command {
    ///   Command::Mutations(args) => assert_eq!(args.mutation, ["S:N501Y", "S:E484K"]),
    ///   _                        => assert!(false),
    /// }
    /// ```
    #[clap(about = "Summarize genome mutations and lineages over time.")]
    #[clap(arg_required_else_help = true)]
    Mutations(MutationsArgs),
    /// Pass CLI arguments to the [reproduction number](rt::Command) subcommands.
    #[clap(about = "Locate surveillance data and estimate the reproduction number.")]
    Rt(rt::Args),
}

// -----------------------------------------------------------------------------
// Verbosity
// -----------------------------------------------------------------------------

/// The output verbosity level.
///
/// ```rust
/// use covsurv::Verbosity;
/// assert_eq!(Verbosity::Debug.to_string(), "debug");
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, ValueEnum)]
pub enum Verbosity {
    #[default]
    Info,
    Warn,
    Debug,
    Error,
}

impl Display for Verbosity {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        // Convert to lowercase for RUST_LOG env var compatibility
        let lowercase = format!("{:?}", self).to_lowercase();
        write!(f, "{lowercase}")
    }
}
