use chrono::NaiveDate;
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumIter};

// ----------------------------------------------------------------------------
// Genome
// ----------------------------------------------------------------------------

/// Per-genome metadata, one row of the metadata table.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Genome {
    pub genome_id: String,
    /// Sample collection date.
    pub date: NaiveDate,
    pub country: String,
    pub species: String,
    /// Pangolin lineage (ex. B.1.1.7).
    pub lineage: String,
}

// ----------------------------------------------------------------------------
// Mutation Type
// ----------------------------------------------------------------------------

/// Whether a mutation changes the encoded amino acid.
///
/// Parsed from the short codes (`S`, `N`), the long names, or SnpEff effect names.
///
/// ## Examples
///
/// ```rust
/// use covsurv::surveillance::MutationType;
/// use std::str::FromStr;
///
/// assert_eq!(MutationType::from_str("S")?,                MutationType::Synonymous);
/// assert_eq!(MutationType::from_str("missense_variant")?, MutationType::Nonsynonymous);
/// assert_eq!(MutationType::Nonsynonymous.to_string(),   "nonsynonymous");
/// assert!(MutationType::from_str("frameshift").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(
    Clone, Copy, Debug, Deserialize, Display, EnumIter, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum MutationType {
    #[strum(serialize = "synonymous")]
    Synonymous,
    #[strum(serialize = "nonsynonymous")]
    Nonsynonymous,
}

impl FromStr for MutationType {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self, Report> {
        match s.to_lowercase().as_str() {
            "s" | "synonymous" | "synonymous_variant" => Ok(MutationType::Synonymous),
            "n" | "nonsynonymous" | "missense_variant" => Ok(MutationType::Nonsynonymous),
            _ => Err(eyre!("Unknown mutation type: {s:?}"))
                .suggestion("Options: S, N, synonymous, nonsynonymous, synonymous_variant, missense_variant"),
        }
    }
}

impl TryFrom<String> for MutationType {
    type Error = Report;
    fn try_from(s: String) -> Result<Self, Report> {
        MutationType::from_str(&s)
    }
}

impl From<MutationType> for String {
    fn from(mutation_type: MutationType) -> String {
        mutation_type.to_string()
    }
}

// ----------------------------------------------------------------------------
// Mutation
// ----------------------------------------------------------------------------

/// A single annotated mutation observed in a genome, one row of the mutations table.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Mutation {
    /// [`Genome`] this mutation was observed in.
    pub genome_id: String,
    /// 1-based genomic coordinate.
    pub position: usize,
    pub gene: String,
    /// Amino acid change (ex. N501Y), empty for intergenic mutations.
    #[serde(default)]
    pub aa_change: String,
    pub mutation_type: MutationType,
}

impl Mutation {
    /// Returns a display label: `gene:aa_change`, or the position when either is missing.
    ///
    /// ```rust
    /// use covsurv::surveillance::{Mutation, MutationType};
    ///
    /// let mut mutation = Mutation {
    ///     genome_id: "g1".to_string(),
    ///     position: 23063,
    ///     gene: "S".to_string(),
    ///     aa_change: "N501Y".to_string(),
    ///     mutation_type: MutationType::Nonsynonymous,
    /// };
    /// assert_eq!(mutation.label(), "S:N501Y");
    /// mutation.aa_change = String::new();
    /// assert_eq!(mutation.label(), "23063");
    /// ```
    pub fn label(&self) -> String {
        if self.gene.is_empty() || self.aa_change.is_empty() {
            self.position.to_string()
        } else {
            format!("{}:{}", self.gene, self.aa_change)
        }
    }
}
