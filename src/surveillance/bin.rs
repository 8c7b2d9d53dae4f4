use crate::surveillance::Dataset;
use chrono::{Datelike, Duration, NaiveDate};
#[cfg(feature = "cli")]
use clap::ValueEnum;
use color_eyre::eyre::{Report, Result};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use strum::EnumIter;
use tabled::Tabled;

/// Category of lineages outside the most frequent ones.
pub const OTHER: &str = "Other";
/// Category of genomes when no grouping is requested.
pub const ALL: &str = "all";
/// Categories of the mutation presence/absence grouping.
pub const ABSENT: &str = "absent";
pub const PRESENT: &str = "present";

// ----------------------------------------------------------------------------
// Time Bin
// ----------------------------------------------------------------------------

/// How sample dates are grouped into buckets.
#[derive(Clone, Copy, Debug, Default, Deserialize, EnumIter, Eq, PartialEq, Serialize)]
#[cfg_attr(feature = "cli", derive(ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum TimeBin {
    /// ISO weeks, starting on Monday.
    #[default]
    Week,
    /// Consecutive 7-day intervals starting at the earliest sample date.
    SevenDay,
}

impl Display for TimeBin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let bin = match self {
            TimeBin::Week => "week",
            TimeBin::SevenDay => "seven-day",
        };
        write!(f, "{bin}")
    }
}

impl TimeBin {
    /// Returns the first day of the bucket containing `date`.
    ///
    /// `anchor` is the start of the first [`TimeBin::SevenDay`] interval and is ignored
    /// for [`TimeBin::Week`].
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use covsurv::surveillance::TimeBin;
    /// use chrono::NaiveDate;
    ///
    /// let date   = NaiveDate::from_ymd_opt(2021, 6, 17).unwrap(); // Thursday
    /// let anchor = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
    /// assert_eq!(TimeBin::Week.bucket(date, anchor),     NaiveDate::from_ymd_opt(2021, 6, 14).unwrap());
    /// assert_eq!(TimeBin::SevenDay.bucket(date, anchor), NaiveDate::from_ymd_opt(2021, 6, 15).unwrap());
    /// ```
    pub fn bucket(&self, date: NaiveDate, anchor: NaiveDate) -> NaiveDate {
        match self {
            TimeBin::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
            TimeBin::SevenDay => {
                let offset = (date - anchor).num_days().div_euclid(7);
                anchor + Duration::days(offset * 7)
            }
        }
    }

    /// Returns a short label for the bucket starting at `start`.
    ///
    /// ```rust
    /// use covsurv::surveillance::TimeBin;
    /// use chrono::NaiveDate;
    ///
    /// let start = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
    /// assert_eq!(TimeBin::Week.label(start),     "2021-W01");
    /// assert_eq!(TimeBin::SevenDay.label(start), "2021-01-04");
    /// ```
    pub fn label(&self, start: NaiveDate) -> String {
        match self {
            TimeBin::Week => start.format("%G-W%V").to_string(),
            TimeBin::SevenDay => start.to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Grouping
// ----------------------------------------------------------------------------

/// The category each genome is counted under, within a time bucket.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub enum Grouping {
    /// All genomes in one category ([`ALL`]).
    #[default]
    None,
    /// One category per lineage. With `top`, lineages outside the `top` most frequent
    /// are collapsed into [`OTHER`].
    Lineage { top: Option<usize> },
    /// [`PRESENT`] or [`ABSENT`], by whether the genome carries the labelled mutation.
    Mutation(String),
}

// ----------------------------------------------------------------------------
// Binned Counts
// ----------------------------------------------------------------------------

/// One bucket × category cell of [`BinnedCounts`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Tabled)]
pub struct BinnedRow {
    pub bucket: NaiveDate,
    pub category: String,
    pub count: usize,
    /// Genomes in the bucket.
    pub total: usize,
    #[tabled(display_with = "display_frequency")]
    pub frequency: f64,
}

fn display_frequency(frequency: &f64) -> String {
    format!("{frequency:.3}")
}

/// Counts of genomes per time bucket and category.
///
/// The table is rectangular: every bucket between the first and last populated bucket is
/// present, and every bucket has a count (possibly 0) for every category.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct BinnedCounts {
    pub bin: TimeBin,
    /// Bucket start dates, ascending.
    pub buckets: Vec<NaiveDate>,
    pub categories: Vec<String>,
    /// Counts indexed as `counts[bucket][category]`.
    pub counts: Vec<Vec<usize>>,
    /// Genomes per bucket.
    pub totals: Vec<usize>,
}

impl BinnedCounts {
    /// Returns the count of a bucket and category, if both exist.
    pub fn get(&self, bucket: NaiveDate, category: &str) -> Option<usize> {
        let b = self.buckets.iter().position(|d| *d == bucket)?;
        let c = self.categories.iter().position(|name| name == category)?;
        Some(self.counts[b][c])
    }

    /// Returns all cells, bucket-major and category-minor.
    pub fn rows(&self) -> Vec<BinnedRow> {
        self.buckets
            .iter()
            .enumerate()
            .flat_map(|(b, bucket)| {
                self.categories.iter().enumerate().map(move |(c, category)| {
                    let count = self.counts[b][c];
                    let total = self.totals[b];
                    BinnedRow {
                        bucket: *bucket,
                        category: category.clone(),
                        count,
                        total,
                        frequency: if total == 0 { 0.0 } else { count as f64 / total as f64 },
                    }
                })
            })
            .collect()
    }

    /// Returns `counts[bucket][category] / totals[bucket]`, 0 for empty buckets.
    pub fn frequencies(&self) -> Vec<Vec<f64>> {
        self.counts
            .iter()
            .zip(&self.totals)
            .map(|(row, total)| {
                row.iter()
                    .map(|count| if *total == 0 { 0.0 } else { *count as f64 / *total as f64 })
                    .collect()
            })
            .collect()
    }

    /// Bucket labels, in bucket order.
    pub fn labels(&self) -> Vec<String> {
        self.buckets.iter().map(|b| self.bin.label(*b)).collect()
    }
}

/// Returns every bucket start from the bucket of the earliest date to that of the latest.
fn bucket_range(bin: TimeBin, dates: impl Iterator<Item = NaiveDate>) -> (NaiveDate, Vec<NaiveDate>) {
    let Some((first, last)) = dates.minmax().into_option() else {
        return (NaiveDate::default(), Vec::new());
    };
    let anchor = first;
    let (start, end) = (bin.bucket(first, anchor), bin.bucket(last, anchor));
    let n = (end - start).num_days() / 7;
    let buckets = (0..=n).map(|i| start + Duration::days(i * 7)).collect();
    (anchor, buckets)
}

/// Returns the `top` most frequent lineages. Ties are broken by name.
fn top_lineages(dataset: &Dataset, top: usize) -> BTreeSet<&str> {
    dataset
        .genomes
        .iter()
        .map(|g| g.lineage.as_str())
        .counts()
        .into_iter()
        .sorted_by(|(a, n_a), (b, n_b)| n_b.cmp(n_a).then(a.cmp(b)))
        .take(top)
        .map(|(lineage, _)| lineage)
        .collect()
}

/// Count genomes per time bucket and category.
///
/// ## Examples
///
/// ```rust
/// use covsurv::surveillance::{aggregate, Dataset, Genome, Grouping, TimeBin};
/// use chrono::NaiveDate;
///
/// let genome = |id: &str, day: u32, lineage: &str| Genome {
///     genome_id: id.to_string(),
///     date: NaiveDate::from_ymd_opt(2021, 3, day).unwrap(),
///     country: "Denmark".to_string(),
///     species: "Human".to_string(),
///     lineage: lineage.to_string(),
/// };
/// // two genomes in week 2021-W09, none in W10, one in W11
/// let genomes = vec![genome("a", 1, "B.1"), genome("b", 2, "B.1.1.7"), genome("c", 15, "B.1.1.7")];
/// let dataset = Dataset::new(genomes, Vec::new())?;
///
/// let counts = aggregate(&dataset, TimeBin::Week, &Grouping::Lineage { top: None })?;
/// assert_eq!(counts.categories, ["B.1", "B.1.1.7"]);
/// assert_eq!(counts.counts, [[1, 1], [0, 0], [0, 1]]);
/// assert_eq!(counts.totals, [2, 0, 1]);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn aggregate(dataset: &Dataset, bin: TimeBin, grouping: &Grouping) -> Result<BinnedCounts, Report> {
    let (anchor, buckets) = bucket_range(bin, dataset.genomes.iter().map(|g| g.date));
    let bucket_index: HashMap<NaiveDate, usize> =
        buckets.iter().enumerate().map(|(i, b)| (*b, i)).collect();

    // the category of each genome, in genome order
    let categories: Vec<String> = match grouping {
        Grouping::None => dataset.genomes.iter().map(|_| ALL.to_string()).collect(),
        Grouping::Lineage { top: None } => dataset.genomes.iter().map(|g| g.lineage.clone()).collect(),
        Grouping::Lineage { top: Some(top) } => {
            let keep = top_lineages(dataset, *top);
            debug!("Keeping lineages: {}", keep.iter().join(", "));
            dataset
                .genomes
                .iter()
                .map(|g| match keep.contains(g.lineage.as_str()) {
                    true => g.lineage.clone(),
                    false => OTHER.to_string(),
                })
                .collect()
        }
        Grouping::Mutation(label) => {
            let carriers = dataset.require_carriers(label)?;
            dataset
                .genomes
                .iter()
                .map(|g| match carriers.contains(g.genome_id.as_str()) {
                    true => PRESENT.to_string(),
                    false => ABSENT.to_string(),
                })
                .collect()
        }
    };

    // sorted category names, with the collapsed lineages last
    let mut names = categories.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect_vec();
    if let Grouping::Mutation(_) = grouping {
        names = vec![ABSENT.to_string(), PRESENT.to_string()];
    } else if let Grouping::Lineage { top: Some(_) } = grouping {
        if let Some(i) = names.iter().position(|n| n == OTHER) {
            let other = names.remove(i);
            names.push(other);
        }
    }
    let name_index: HashMap<&str, usize> =
        names.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();

    let mut counts = vec![vec![0; names.len()]; buckets.len()];
    let mut totals = vec![0; buckets.len()];
    for (genome, category) in dataset.genomes.iter().zip(&categories) {
        let b = bucket_index[&bin.bucket(genome.date, anchor)];
        counts[b][name_index[category.as_str()]] += 1;
        totals[b] += 1;
    }

    Ok(BinnedCounts { bin, buckets, categories: names, counts, totals })
}

/// Count the genomes carrying each labelled mutation, per time bucket.
///
/// Categories are the labels, in the given order. Totals are all genomes in the bucket.
pub fn mutation_frequency(
    dataset: &Dataset,
    bin: TimeBin,
    labels: &[String],
) -> Result<BinnedCounts, Report> {
    let (anchor, buckets) = bucket_range(bin, dataset.genomes.iter().map(|g| g.date));
    let bucket_index: HashMap<NaiveDate, usize> =
        buckets.iter().enumerate().map(|(i, b)| (*b, i)).collect();
    let genome_bucket: BTreeMap<&str, usize> = dataset
        .genomes
        .iter()
        .map(|g| (g.genome_id.as_str(), bucket_index[&bin.bucket(g.date, anchor)]))
        .collect();

    let mut counts = vec![vec![0; labels.len()]; buckets.len()];
    let mut totals = vec![0; buckets.len()];
    genome_bucket.values().for_each(|b| totals[*b] += 1);

    for (c, label) in labels.iter().enumerate() {
        for genome_id in dataset.require_carriers(label)? {
            counts[genome_bucket[genome_id]][c] += 1;
        }
    }

    Ok(BinnedCounts { bin, buckets, categories: labels.to_vec(), counts, totals })
}
