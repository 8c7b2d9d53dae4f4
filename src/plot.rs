//! Build [`covsurv_plot`] charts from surveillance and reproduction number results.

use crate::rt::REstimate;
use crate::surveillance::{BinnedCounts, ABSENT, PRESENT};
use chrono::NaiveDate;
use color_eyre::eyre::{Report, Result};
use covsurv_plot::guide::Tick;
use covsurv_plot::{BarChart, FacetChart, LineChart, Series, Theme};
use itertools::Itertools;
use log::info;
use std::fmt::Debug;
use std::path::Path;

/// Maximum number of labelled date ticks on a continuous date axis.
const MAX_DATE_TICKS: usize = 8;

/// Load a [`Theme`] from JSON, or the default theme.
pub fn load_theme<P>(path: Option<&P>) -> Result<Theme, Report>
where
    P: AsRef<Path> + Debug,
{
    match path {
        Some(path) => {
            info!("Loading theme: {path:?}");
            Theme::read(path)
        }
        None => Ok(Theme::default()),
    }
}

/// Returns evenly spaced date ticks, with x measured in days since `origin`.
///
/// ```rust
/// use covsurv::plot::date_ticks;
/// use chrono::NaiveDate;
///
/// let origin = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
/// let dates = (0..3).map(|d| origin + chrono::Duration::days(d)).collect::<Vec<_>>();
/// let ticks = date_ticks(origin, &dates);
/// assert_eq!(ticks[0], (0.0, "2021-01-01".to_string()));
/// assert_eq!(ticks.len(), 3);
/// ```
pub fn date_ticks(origin: NaiveDate, dates: &[NaiveDate]) -> Vec<Tick> {
    let step = dates.len().div_ceil(MAX_DATE_TICKS).max(1);
    dates
        .iter()
        .step_by(step)
        .map(|d| (days_since(origin, *d), d.format("%Y-%m-%d").to_string()))
        .collect()
}

fn days_since(origin: NaiveDate, date: NaiveDate) -> f32 {
    (date - origin).num_days() as f32
}

/// Returns one tick per bucket, at its index.
fn bucket_ticks(counts: &BinnedCounts) -> Vec<Tick> {
    counts.labels().into_iter().enumerate().map(|(i, label)| (i as f32, label)).collect()
}

// ----------------------------------------------------------------------------
// Surveillance
// ----------------------------------------------------------------------------

/// Stacked bars of genomes per bucket, colored by category.
pub fn count_bars(counts: &BinnedCounts, title: &str) -> BarChart {
    BarChart {
        title: title.to_string(),
        x_title: format!("Sample date ({})", counts.bin),
        y_title: "Genomes".to_string(),
        x_labels: counts.labels(),
        categories: counts.categories.clone(),
        values: counts.counts.iter().map(|row| row.iter().map(|c| *c as f32).collect()).collect(),
        stacked: true,
    }
}

/// Frequency per bucket of each category, as points joined by lines.
pub fn frequency_lines(counts: &BinnedCounts, title: &str) -> LineChart {
    let frequencies = counts.frequencies();
    let series = counts
        .categories
        .iter()
        .enumerate()
        .map(|(c, category)| Series {
            label: category.clone(),
            points: frequencies.iter().enumerate().map(|(b, row)| (b as f32, row[c] as f32)).collect(),
            band: None,
        })
        .collect_vec();

    LineChart {
        title: title.to_string(),
        x_title: format!("Sample date ({})", counts.bin),
        y_title: "Frequency".to_string(),
        series,
        x_ticks: bucket_ticks(counts),
        y_range: Some((0.0, 1.0)),
        points: true,
        lines: true,
        legend: true,
        ..Default::default()
    }
}

/// One panel per category of [`frequency_lines`].
pub fn frequency_facets(counts: &BinnedCounts, title: &str) -> FacetChart {
    let lines = frequency_lines(counts, title);
    let columns = (lines.series.len() as f32).sqrt().ceil() as usize;
    let panels = lines
        .series
        .iter()
        .enumerate()
        .map(|(i, series)| LineChart {
            title: series.label.clone(),
            x_title: String::new(),
            series: vec![series.clone()],
            legend: false,
            color_offset: i,
            ..lines.clone()
        })
        .collect();

    FacetChart { title: title.to_string(), panels, columns: columns.max(1) }
}

/// Stacked bars of genomes with and without a mutation, per bucket.
pub fn presence_bars(counts: &BinnedCounts, label: &str) -> BarChart {
    // absent first, so carriers stack on top
    let order = [ABSENT, PRESENT];
    let values = counts
        .buckets
        .iter()
        .map(|bucket| order.iter().map(|c| counts.get(*bucket, c).unwrap_or(0) as f32).collect())
        .collect();
    BarChart {
        categories: order.iter().map(|c| c.to_string()).collect(),
        values,
        ..count_bars(counts, &format!("Genomes with {label}"))
    }
}

// ----------------------------------------------------------------------------
// Reproduction Number
// ----------------------------------------------------------------------------

/// The reproduction number over time, with its confidence interval as a ribbon and a
/// reference line at R = 1.
pub fn rt_line(estimates: &[REstimate], title: &str) -> LineChart {
    let Some(origin) = estimates.first().map(|e| e.date) else {
        return LineChart { title: title.to_string(), ..Default::default() };
    };
    let series = Series {
        label: "R".to_string(),
        points: estimates.iter().map(|e| (days_since(origin, e.date), e.r as f32)).collect(),
        band: Some(
            estimates
                .iter()
                .map(|e| (days_since(origin, e.date), e.lower as f32, e.upper as f32))
                .collect(),
        ),
    };
    let dates = estimates.iter().map(|e| e.date).collect_vec();

    LineChart {
        title: title.to_string(),
        x_title: "Date".to_string(),
        y_title: "Reproduction number".to_string(),
        series: vec![series],
        x_ticks: date_ticks(origin, &dates),
        lines: true,
        reference: Some(1.0),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surveillance::TimeBin;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, d).unwrap()
    }

    #[test]
    fn presence_bars_stack_carriers_last() {
        // only carriers in the second bucket
        let counts = BinnedCounts {
            bin: TimeBin::Week,
            buckets: vec![date(1), date(8)],
            categories: vec![ABSENT.to_string(), PRESENT.to_string()],
            counts: vec![vec![3, 1], vec![0, 2]],
            totals: vec![4, 2],
        };
        let chart = presence_bars(&counts, "S:N501Y");
        assert_eq!(chart.categories, [ABSENT, PRESENT]);
        assert_eq!(chart.values, [[3.0, 1.0], [0.0, 2.0]]);
        assert_eq!(chart.x_labels, ["2021-W09", "2021-W10"]);
        assert!(chart.stacked);
    }

    #[test]
    fn facets_keep_category_colors() {
        let counts = BinnedCounts {
            bin: TimeBin::SevenDay,
            buckets: vec![date(1)],
            categories: vec!["S:N501Y".to_string(), "S:E484K".to_string(), "S:D614G".to_string()],
            counts: vec![vec![2, 1, 4]],
            totals: vec![4],
        };
        let chart = frequency_facets(&counts, "Mutation frequency");
        assert_eq!(chart.panels.len(), 3);
        assert_eq!(chart.grid(), (2, 2));
        assert_eq!(chart.panels[2].color_offset, 2);
        assert_eq!(chart.panels[2].series[0].points, [(0.0, 1.0)]);
    }

    #[test]
    fn rt_line_days_since_first_estimate() {
        let estimate = |d: u32, r: f64| REstimate { date: date(d), r, lower: r - 0.1, upper: r + 0.1 };
        let chart = rt_line(&[estimate(1, 1.2), estimate(2, 1.1), estimate(3, 0.9)], "R");
        let series = &chart.series[0];
        assert_eq!(series.points.iter().map(|p| p.0).collect::<Vec<_>>(), [0.0, 1.0, 2.0]);
        assert_eq!(series.band.as_ref().map(|b| b.len()), Some(3));
        assert_eq!(chart.reference, Some(1.0));
        assert_eq!(chart.x_ticks[0].1, "2021-03-01");

        assert!(rt_line(&[], "R").series.is_empty());
    }
}
