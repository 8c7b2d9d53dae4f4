#[cfg(feature = "cli")]
use clap::Parser;
use color_eyre::eyre::{Report, Result};
#[cfg(feature = "cli")]
use covsurv::{
    cli::rt::Command::{Estimate, Locate},
    cli::Command,
    Cli,
};

#[tokio::main]
async fn main() -> Result<(), Report> {
    #[cfg(feature = "cli")]
    {
        // ------------------------------------------------------------------------
        // CLI Setup

        // Parse CLI parameters
        let args = Cli::parse();

        // initialize color_eyre crate for colorized logs
        color_eyre::install()?;

        // Set logging/verbosity level via RUST_LOG
        std::env::set_var("RUST_LOG", args.verbosity.to_string());

        // initialize env_logger crate for logging/verbosity level
        env_logger::init();

        // check which CLI command we're running (mutations, rt)
        match args.command {
            // Mutation surveillance report
            Command::Mutations(args) => covsurv::surveillance::report(&args)?,
            // Reproduction number
            Command::Rt(args) => match args.command {
                // Print the latest archive link
                #[cfg(feature = "download")]
                Locate(args) => {
                    let link = covsurv::rt::locate(&args).await?;
                    println!("{}\t{}", link.date, link.url);
                }
                #[cfg(not(feature = "download"))]
                Locate(_) => {
                    return Err(color_eyre::eyre::eyre!("Locating archives requires the 'download' feature."))
                }
                // Estimate and print the most recent days
                Estimate(args) => {
                    let estimates = covsurv::rt::estimate(&args).await?;
                    println!("{}", covsurv::rt::tail_table(&estimates, args.last_days));
                }
            },
        }
    }

    Ok(())
}
