//! Write the mutation surveillance report: summary, tables and charts.

use crate::plot;
use crate::surveillance::{
    aggregate, mutation_frequency, mutations_per_genome, top_mutations, Dataset, Grouping,
    Summary, TimeBin,
};
use crate::utils;
#[cfg(feature = "cli")]
use clap::Parser;
use color_eyre::eyre::{Report, Result};
use covsurv_plot::Chart;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ----------------------------------------------------------------------------
// Mutations Args
// ----------------------------------------------------------------------------

/// Summarize genome mutations and their frequencies over time.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
pub struct MutationsArgs {
    /// Genome metadata table (genome_id, date, country, species, lineage).
    #[cfg_attr(feature = "cli", clap(long, required = true))]
    pub metadata: PathBuf,

    /// Mutations table (genome_id, position, gene, aa_change, mutation_type).
    #[cfg_attr(feature = "cli", clap(long, required = true))]
    pub mutations: PathBuf,

    /// Output directory.
    ///
    /// If the directory does not exist, it will be created.
    #[cfg_attr(feature = "cli", clap(short = 'o', long, required = true))]
    pub output_dir: PathBuf,

    /// Time bin of sample dates.
    #[cfg_attr(feature = "cli", clap(long, value_enum, default_value_t = TimeBin::default()))]
    pub bin: TimeBin,

    /// Collapse lineages outside the N most frequent into 'Other'.
    #[cfg_attr(feature = "cli", clap(long))]
    pub top_lineages: Option<usize>,

    /// Plot presence/absence over time of this mutation (ex. S:N501Y). Repeatable.
    #[cfg_attr(feature = "cli", clap(long))]
    pub mutation: Vec<String>,

    /// Number of most frequent mutations to tabulate and plot.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = MutationsArgs::default().top_mutations))]
    pub top_mutations: usize,

    /// Chart theme (JSON).
    #[cfg_attr(feature = "cli", clap(long))]
    pub theme: Option<PathBuf>,
}

impl Default for MutationsArgs {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationsArgs {
    pub fn new() -> Self {
        MutationsArgs {
            metadata: PathBuf::new(),
            mutations: PathBuf::new(),
            output_dir: PathBuf::new(),
            bin: TimeBin::default(),
            top_lineages: None,
            mutation: Vec::new(),
            top_mutations: 20,
            theme: None,
        }
    }
}

/// Returns a file-name safe version of a mutation label (ex. `S:N501Y` => `S_N501Y`).
///
/// ```rust
/// use covsurv::surveillance::report::file_label;
/// assert_eq!(file_label("S:N501Y"), "S_N501Y");
/// assert_eq!(file_label("ORF1ab:del3675/3677"), "ORF1ab_del3675_3677");
/// ```
pub fn file_label(label: &str) -> String {
    label.chars().map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' }).collect()
}

// ----------------------------------------------------------------------------
// Report
// ----------------------------------------------------------------------------

/// Read genomes and mutations, then write the summary, tables and charts.
///
/// ## Examples
///
/// ```rust
/// use covsurv::surveillance::{report, MutationsArgs};
///
/// let dir = tempfile::tempdir()?;
/// let metadata = dir.path().join("metadata.tsv");
/// let mutations = dir.path().join("mutations.tsv");
/// std::fs::write(&metadata, "genome_id\tdate\tcountry\tspecies\tlineage\ng1\t2021-01-04\tDenmark\tHuman\tB.1.1.7\ng2\t2021-01-12\tDenmark\tMink\tB.1\n")?;
/// std::fs::write(&mutations, "genome_id\tposition\tgene\taa_change\tmutation_type\ng1\t23063\tS\tN501Y\tN\n")?;
///
/// let args = MutationsArgs {
///     metadata,
///     mutations,
///     output_dir: dir.path().join("report"),
///     mutation: vec!["S:N501Y".to_string()],
///     ..Default::default()
/// };
/// report(&args)?;
/// assert!(args.output_dir.join("presence_S_N501Y.png").exists());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn report(args: &MutationsArgs) -> Result<(), Report> {
    let dataset = Dataset::read(&args.metadata, &args.mutations)?;
    let theme = plot::load_theme(args.theme.as_ref())?;
    let output_dir = &args.output_dir;
    utils::create_output_dir(output_dir)?;

    // ------------------------------------------------------------------------
    // Summary

    let summary = Summary::from_dataset(&dataset);
    info!("Dataset summary:\n{}", summary.pretty_print());
    utils::write_json(&summary, &output_dir.join("summary.json"))?;

    let per_genome = mutations_per_genome(&dataset);
    utils::write_table(&per_genome, &output_dir.join("mutations_per_genome.tsv"))?;

    let top = top_mutations(&dataset, args.top_mutations);
    utils::write_table(&top, &output_dir.join("top_mutations.tsv"))?;
    debug!("Most frequent mutations:\n{}", tabled::Table::new(&top));

    // ------------------------------------------------------------------------
    // Lineages

    info!("Aggregating lineages by {}.", args.bin);
    let lineages = aggregate(&dataset, args.bin, &Grouping::Lineage { top: args.top_lineages })?;
    utils::write_table(&lineages.rows(), &output_dir.join("lineages.tsv"))?;
    plot::count_bars(&lineages, "Genomes by lineage")
        .write_png(&output_dir.join("lineages.png"), &theme)?;
    plot::frequency_lines(&lineages, "Lineage frequency")
        .write_png(&output_dir.join("lineage_frequency.png"), &theme)?;

    // ------------------------------------------------------------------------
    // Mutations

    let labels = top.iter().map(|m| m.label.clone()).collect_vec();
    info!("Aggregating {} most frequent mutations by {}.", labels.len(), args.bin);
    let frequency = mutation_frequency(&dataset, args.bin, &labels)?;
    utils::write_table(&frequency.rows(), &output_dir.join("mutation_frequency.tsv"))?;
    if !labels.is_empty() {
        plot::frequency_facets(&frequency, "Mutation frequency")
            .write_png(&output_dir.join("mutation_frequency.png"), &theme)?;
    }

    for label in &args.mutation {
        info!("Aggregating presence of mutation: {label}");
        let presence = aggregate(&dataset, args.bin, &Grouping::Mutation(label.clone()))?;
        let name = file_label(label);
        utils::write_table(&presence.rows(), &output_dir.join(format!("presence_{name}.tsv")))?;
        plot::presence_bars(&presence, label)
            .write_png(&output_dir.join(format!("presence_{name}.png")), &theme)?;
    }

    info!("Done.");
    Ok(())
}
