//! Genomic surveillance: load genome metadata and mutations, summarize them, and
//! aggregate them over time.

mod bin;
mod genome;
pub mod report;
mod summary;

#[cfg(test)]
mod tests;

#[doc(inline)]
pub use bin::*;
#[doc(inline)]
pub use genome::*;
#[doc(inline)]
pub use report::{report, MutationsArgs};
#[doc(inline)]
pub use summary::*;

use crate::utils;
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use itertools::Itertools;
use log::{debug, info};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;
use std::path::Path;

// ----------------------------------------------------------------------------
// Dataset
// ----------------------------------------------------------------------------

/// Genomes and the mutations observed in them.
///
/// Every [`Mutation`] references an existing [`Genome`], and genome identifiers are unique.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub genomes: Vec<Genome>,
    pub mutations: Vec<Mutation>,
}

impl Dataset {
    /// Returns a [`Dataset`], checking that identifiers are unique and referenced.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use covsurv::surveillance::{Dataset, Genome, Mutation, MutationType};
    /// use chrono::NaiveDate;
    ///
    /// let genome = Genome {
    ///     genome_id: "g1".to_string(),
    ///     date: NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(),
    ///     country: "Denmark".to_string(),
    ///     species: "Human".to_string(),
    ///     lineage: "B.1.1.7".to_string(),
    /// };
    /// let mutation = Mutation {
    ///     genome_id: "g2".to_string(),
    ///     position: 23063,
    ///     gene: "S".to_string(),
    ///     aa_change: "N501Y".to_string(),
    ///     mutation_type: MutationType::Nonsynonymous,
    /// };
    /// // g2 does not exist
    /// assert!(Dataset::new(vec![genome], vec![mutation]).is_err());
    /// ```
    pub fn new(genomes: Vec<Genome>, mutations: Vec<Mutation>) -> Result<Self, Report> {
        let mut ids = HashSet::new();
        if let Some(genome) = genomes.iter().find(|g| !ids.insert(g.genome_id.as_str())) {
            return Err(eyre!("Duplicate genome identifier in metadata: {:?}", genome.genome_id));
        }

        let orphans = mutations
            .iter()
            .filter(|m| !ids.contains(m.genome_id.as_str()))
            .map(|m| m.genome_id.as_str())
            .unique()
            .collect_vec();
        if !orphans.is_empty() {
            let preview = orphans.iter().take(5).join(", ");
            return Err(eyre!(
                "{} genome identifier(s) in the mutations table are missing from the metadata: {preview}",
                orphans.len()
            ))
            .suggestion("Were the metadata and mutations exported from the same genome set?");
        }

        Ok(Dataset { genomes, mutations })
    }

    /// Read a [`Dataset`] from a metadata table and a mutations table.
    ///
    /// Tables may be `.tsv`, `.csv`, or `.txt`, optionally compressed with `.zst`.
    pub fn read<P>(metadata: &P, mutations: &P) -> Result<Self, Report>
    where
        P: AsRef<Path> + Debug,
    {
        info!("Reading metadata: {metadata:?}");
        let genomes: Vec<Genome> = utils::read_table(metadata)?;
        debug!("Read {} genomes.", genomes.len());

        info!("Reading mutations: {mutations:?}");
        let mutations: Vec<Mutation> = utils::read_table(mutations)?;
        debug!("Read {} mutations.", mutations.len());

        Dataset::new(genomes, mutations)
    }

    /// Returns the mutations of each genome, keyed by genome identifier.
    ///
    /// Genomes without mutations are included with an empty list.
    pub fn mutations_by_genome(&self) -> BTreeMap<&str, Vec<&Mutation>> {
        let mut map: BTreeMap<&str, Vec<&Mutation>> =
            self.genomes.iter().map(|g| (g.genome_id.as_str(), Vec::new())).collect();
        self.mutations.iter().for_each(|m| {
            map.entry(m.genome_id.as_str()).or_default().push(m);
        });
        map
    }

    /// Returns the identifiers of genomes carrying the mutation with this label.
    pub fn carriers(&self, label: &str) -> HashSet<&str> {
        self.mutations
            .iter()
            .filter(|m| m.label() == label)
            .map(|m| m.genome_id.as_str())
            .collect()
    }

    /// Like [`Dataset::carriers`], but an unknown label is an error.
    pub fn require_carriers(&self, label: &str) -> Result<HashSet<&str>, Report> {
        let carriers = self.carriers(label);
        if carriers.is_empty() {
            return Err(eyre!("Mutation {label:?} was not found in the mutations table."))
                .suggestion("Labels are gene:aa_change (ex. S:N501Y) or the genomic position.")
                .suggestion("See top_mutations.tsv for the most frequent labels.");
        }
        Ok(carriers)
    }
}
