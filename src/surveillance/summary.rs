use crate::surveillance::{Dataset, Mutation, MutationType};
use chrono::NaiveDate;
use indoc::formatdoc;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tabled::Tabled;

// ----------------------------------------------------------------------------
// Summary
// ----------------------------------------------------------------------------

/// Descriptive counts of a [`Dataset`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Summary {
    pub genomes: usize,
    /// Number of mutation records (genome × mutation).
    pub mutations: usize,
    pub genomes_without_mutations: usize,
    /// Distinct genomic positions with a synonymous mutation.
    pub synonymous_sites: usize,
    /// Distinct genomic positions with a nonsynonymous mutation.
    pub nonsynonymous_sites: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub lineages: BTreeMap<String, usize>,
    pub countries: BTreeMap<String, usize>,
    pub species: BTreeMap<String, usize>,
}

impl Summary {
    /// Summarize a [`Dataset`].
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let sites = |mutation_type: MutationType| {
            dataset
                .mutations
                .iter()
                .filter(|m| m.mutation_type == mutation_type)
                .map(|m| m.position)
                .collect::<BTreeSet<_>>()
                .len()
        };
        let with_mutations: HashSet<&str> =
            dataset.mutations.iter().map(|m| m.genome_id.as_str()).collect();
        let (first_date, last_date) = match dataset.genomes.iter().map(|g| g.date).minmax() {
            itertools::MinMaxResult::NoElements => (None, None),
            itertools::MinMaxResult::OneElement(d) => (Some(d), Some(d)),
            itertools::MinMaxResult::MinMax(min, max) => (Some(min), Some(max)),
        };
        let tally = |values: Vec<&String>| {
            values.into_iter().fold(BTreeMap::new(), |mut map, v| {
                *map.entry(v.clone()).or_insert(0) += 1;
                map
            })
        };

        Summary {
            genomes: dataset.genomes.len(),
            mutations: dataset.mutations.len(),
            genomes_without_mutations: dataset
                .genomes
                .iter()
                .filter(|g| !with_mutations.contains(g.genome_id.as_str()))
                .count(),
            synonymous_sites: sites(MutationType::Synonymous),
            nonsynonymous_sites: sites(MutationType::Nonsynonymous),
            first_date,
            last_date,
            lineages: tally(dataset.genomes.iter().map(|g| &g.lineage).collect()),
            countries: tally(dataset.genomes.iter().map(|g| &g.country).collect()),
            species: tally(dataset.genomes.iter().map(|g| &g.species).collect()),
        }
    }

    /// Human-readable multi-line summary, for the log.
    pub fn pretty_print(&self) -> String {
        let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "NA".into());
        formatdoc!(
            "genomes: {}
            mutations: {}
            genomes_without_mutations: {}
            synonymous_sites: {}
            nonsynonymous_sites: {}
            dates: {} to {}
            lineages: {}
            countries: {}",
            self.genomes,
            self.mutations,
            self.genomes_without_mutations,
            self.synonymous_sites,
            self.nonsynonymous_sites,
            date(self.first_date),
            date(self.last_date),
            self.lineages.len(),
            self.countries.iter().map(|(c, n)| format!("{c} ({n})")).join(", "),
        )
    }
}

// ----------------------------------------------------------------------------
// Per-genome Counts
// ----------------------------------------------------------------------------

/// Number of mutations in one genome.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Tabled)]
pub struct GenomeMutations {
    pub genome_id: String,
    pub date: NaiveDate,
    pub lineage: String,
    pub mutations: usize,
    pub synonymous: usize,
    pub nonsynonymous: usize,
}

/// Returns mutation counts for every genome, in metadata order.
///
/// Genomes without any mutations are reported with zero counts.
pub fn mutations_per_genome(dataset: &Dataset) -> Vec<GenomeMutations> {
    let by_genome = dataset.mutations_by_genome();
    dataset
        .genomes
        .iter()
        .map(|genome| {
            let mutations = by_genome.get(genome.genome_id.as_str()).cloned().unwrap_or_default();
            let count = |t: MutationType| mutations.iter().filter(|m| m.mutation_type == t).count();
            GenomeMutations {
                genome_id: genome.genome_id.clone(),
                date: genome.date,
                lineage: genome.lineage.clone(),
                mutations: mutations.len(),
                synonymous: count(MutationType::Synonymous),
                nonsynonymous: count(MutationType::Nonsynonymous),
            }
        })
        .collect()
}

// ----------------------------------------------------------------------------
// Mutation Frequencies
// ----------------------------------------------------------------------------

/// How many genomes carry a mutation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Tabled)]
pub struct MutationFrequency {
    pub label: String,
    pub gene: String,
    pub position: usize,
    pub mutation_type: MutationType,
    pub genomes: usize,
    #[tabled(display_with = "display_frequency")]
    pub frequency: f64,
}

fn display_frequency(frequency: &f64) -> String {
    format!("{frequency:.3}")
}

/// Returns the `n` mutations carried by the most genomes.
///
/// Ties are ordered by position, then label.
pub fn top_mutations(dataset: &Dataset, n: usize) -> Vec<MutationFrequency> {
    // a genome counts once per label, even if the table repeats a record
    let mut carriers: HashMap<String, (HashSet<&str>, &Mutation)> =
        HashMap::new();
    dataset.mutations.iter().for_each(|m| {
        carriers.entry(m.label()).or_insert_with(|| (HashSet::new(), m)).0.insert(m.genome_id.as_str());
    });

    let total = dataset.genomes.len().max(1) as f64;
    carriers
        .into_iter()
        .map(|(label, (genomes, m))| MutationFrequency {
            label,
            gene: m.gene.clone(),
            position: m.position,
            mutation_type: m.mutation_type,
            genomes: genomes.len(),
            frequency: genomes.len() as f64 / total,
        })
        .sorted_by(|a, b| {
            b.genomes.cmp(&a.genomes).then(a.position.cmp(&b.position)).then(a.label.cmp(&b.label))
        })
        .take(n)
        .collect()
}
