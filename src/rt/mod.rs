//! Reproduction number estimation from the daily tests and positives published in the
//! surveillance data archive.

mod archive;
mod estimate;
mod locate;
mod remote_file;
mod series;

#[cfg(test)]
mod tests;

#[doc(inline)]
pub use archive::*;
#[doc(inline)]
pub use estimate::*;
#[doc(inline)]
pub use locate::*;
#[doc(inline)]
pub use remote_file::RemoteFile;
#[doc(inline)]
pub use series::*;

use crate::plot;
use crate::utils::{self, Fetch};
use chrono::{Local, NaiveDate};
#[cfg(feature = "cli")]
use clap::Parser;
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use covsurv_plot::Chart;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tabled::Table;

// ----------------------------------------------------------------------------
// Locate Args
// ----------------------------------------------------------------------------

/// Find the latest data archive.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
pub struct LocateArgs {
    /// Web page listing the data archives.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = LocateArgs::default().page_url))]
    pub page_url: String,

    #[cfg_attr(feature = "cli", command(flatten))]
    pub matcher: RegexLinkMatcher,

    #[cfg_attr(feature = "cli", command(flatten))]
    pub fetch: Fetch,
}

impl Default for LocateArgs {
    fn default() -> Self {
        Self::new()
    }
}

impl LocateArgs {
    pub fn new() -> Self {
        LocateArgs {
            page_url: DEFAULT_PAGE_URL.to_string(),
            matcher: RegexLinkMatcher::default(),
            fetch: Fetch::default(),
        }
    }
}

/// Returns the latest archive link of the data page.
#[cfg(feature = "download")]
pub async fn locate(args: &LocateArgs) -> Result<ArchiveLink, Report> {
    locate_latest_archive(&args.page_url, &args.matcher, &args.fetch).await
}

// ----------------------------------------------------------------------------
// Estimate Args
// ----------------------------------------------------------------------------

/// Estimate the reproduction number from the latest (or a given) data archive.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
pub struct EstimateArgs {
    /// Output directory.
    ///
    /// If the directory does not exist, it will be created.
    #[cfg_attr(feature = "cli", clap(short = 'o', long, required = true))]
    pub output_dir: PathBuf,

    /// Local data archive (ZIP), instead of downloading the latest one.
    #[cfg_attr(feature = "cli", clap(long))]
    pub archive: Option<PathBuf>,

    /// Publication date of the archive (YYYY-MM-DD).
    ///
    /// Required with --archive, unless --attributes provides it.
    #[cfg_attr(feature = "cli", clap(long))]
    pub archive_date: Option<NaiveDate>,

    /// Repeat a previous run from its attributes.json.
    #[cfg_attr(feature = "cli", clap(long))]
    pub attributes: Option<PathBuf>,

    /// Archive member holding the daily tests and positives.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = EstimateArgs::default().member))]
    pub member: String,

    /// First day used for estimation.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = EstimateArgs::default().lower_bound))]
    pub lower_bound: NaiveDate,

    /// Number of most recent days, before the archive date, to drop as incomplete.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = EstimateArgs::default().trailing_days))]
    pub trailing_days: i64,

    /// Column of positive tests.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = EstimateArgs::default().positives_column))]
    pub positives_column: String,

    /// Column of tests.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = EstimateArgs::default().tests_column))]
    pub tests_column: String,

    #[cfg_attr(feature = "cli", command(flatten))]
    pub params: EstimationParams,

    #[cfg_attr(feature = "cli", command(flatten))]
    pub locate: LocateArgs,

    /// Number of most recent estimates to print.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = EstimateArgs::default().last_days))]
    pub last_days: usize,

    /// Chart theme (JSON).
    #[cfg_attr(feature = "cli", clap(long))]
    pub theme: Option<PathBuf>,
}

impl Default for EstimateArgs {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimateArgs {
    pub fn new() -> Self {
        let format = SeriesFormat::default();
        EstimateArgs {
            output_dir: PathBuf::new(),
            archive: None,
            archive_date: None,
            attributes: None,
            member: DEFAULT_MEMBER.to_string(),
            lower_bound: default_lower_bound(),
            trailing_days: DEFAULT_TRAILING_DAYS,
            positives_column: format.positives_column,
            tests_column: format.tests_column,
            params: EstimationParams::default(),
            locate: LocateArgs::default(),
            last_days: 10,
            theme: None,
        }
    }

    /// Returns the case table layout, with the configured column names.
    pub fn series_format(&self) -> SeriesFormat {
        SeriesFormat {
            positives_column: self.positives_column.clone(),
            tests_column: self.tests_column.clone(),
            ..Default::default()
        }
    }
}

// ----------------------------------------------------------------------------
// Estimate
// ----------------------------------------------------------------------------

/// Returns the archive bytes and a record of where they came from.
///
/// Priority: `--archive`, then the URL of `--attributes`, then the latest archive of the
/// data page.
async fn load_archive<M>(args: &EstimateArgs, matcher: &M) -> Result<(Vec<u8>, RemoteFile), Report>
where
    M: LinkMatcher,
{
    let previous = args.attributes.as_ref().map(RemoteFile::read).transpose()?;
    let today = Local::now().date_naive();
    let mut remote = RemoteFile { member: args.member.clone(), date_downloaded: today, ..Default::default() };

    let archive_date = |fallback: Option<NaiveDate>| {
        args.archive_date
            .or(previous.as_ref().map(|p| p.date_created))
            .or(fallback)
            .ok_or_else(|| eyre!("The archive date is unknown."))
            .suggestion("Use --archive-date (YYYY-MM-DD).")
    };

    if let Some(path) = &args.archive {
        let bytes = read_archive(path)?;
        remote.local_path = Some(path.clone());
        remote.date_created = archive_date(None)?;
        return Ok((bytes, remote));
    }

    let (bytes, link) = download_latest(args, previous.as_ref(), matcher).await?;
    remote.date_created = archive_date(Some(link.date))?;
    remote.url = link.url;
    Ok((bytes, remote))
}

/// Download the archive of a previous run, or the latest archive of the data page.
#[cfg(feature = "download")]
async fn download_latest<M>(
    args: &EstimateArgs,
    previous: Option<&RemoteFile>,
    matcher: &M,
) -> Result<(Vec<u8>, ArchiveLink), Report>
where
    M: LinkMatcher,
{
    let link = match previous.filter(|p| !p.url.is_empty()) {
        Some(p) => ArchiveLink { url: p.url.clone(), date: p.date_created },
        None => locate_latest_archive(&args.locate.page_url, matcher, &args.locate.fetch).await?,
    };
    let bytes = download_archive(&link.url, &args.locate.fetch).await?;
    Ok((bytes, link))
}

#[cfg(not(feature = "download"))]
async fn download_latest<M>(
    _args: &EstimateArgs,
    _previous: Option<&RemoteFile>,
    _matcher: &M,
) -> Result<(Vec<u8>, ArchiveLink), Report>
where
    M: LinkMatcher,
{
    Err(eyre!("Downloading archives requires the 'download' feature."))
        .suggestion("Use --archive with a local data archive.")
}

/// Locate, download and parse the case series, then estimate and plot the reproduction
/// number.
///
/// Writes `attributes.json`, `cases.tsv`, `rt.tsv` and `rt.png` to the output directory,
/// and returns the estimates.
///
/// ## Examples
///
/// ```rust
/// use covsurv::rt::{estimate, EstimateArgs};
/// use chrono::NaiveDate;
/// use std::io::Write;
///
/// let dir = tempfile::tempdir()?;
/// let archive = dir.path().join("data.zip");
/// let mut zip = zip::ZipWriter::new(std::fs::File::create(&archive)?);
/// zip.start_file("Test_pos_over_time.csv", zip::write::FileOptions::default())?;
/// writeln!(zip, "Date;NewPositive;Tested")?;
/// for day in 1..=20 {
///     writeln!(zip, "2021-06-{day:02};{};1.200", 100 + day)?;
/// }
/// writeln!(zip, "Antal personer;2.210;")?;
/// writeln!(zip, "I alt;2.210;24.000")?;
/// zip.finish()?;
///
/// let args = EstimateArgs {
///     output_dir: dir.path().join("rt"),
///     archive: Some(archive),
///     archive_date: NaiveDate::from_ymd_opt(2021, 6, 21),
///     ..Default::default()
/// };
/// let estimates = tokio_test::block_on(estimate(&args))?;
/// // 2021-06-01 to 2021-06-18
/// assert_eq!(estimates.len(), 18);
/// assert!(args.output_dir.join("rt.png").exists());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub async fn estimate(args: &EstimateArgs) -> Result<Vec<REstimate>, Report> {
    estimate_with(args, &TestAdjustedEstimator, &args.locate.matcher).await
}

/// [`estimate`] with a custom estimator, and a custom link matcher for the data page.
pub async fn estimate_with<E, M>(
    args: &EstimateArgs,
    estimator: &E,
    matcher: &M,
) -> Result<Vec<REstimate>, Report>
where
    E: ReproductionEstimator,
    M: LinkMatcher,
{
    args.params.validate()?;
    let (archive, remote) = load_archive(args, matcher).await?;

    let member = extract_member(&archive, &args.member)?;
    let series = CaseSeries::parse(&member, &args.series_format())?;
    debug!(
        "Case series: {} days from {:?} to {:?}",
        series.len(),
        series.first_date(),
        series.last_date()
    );

    let window = DateWindow::new(args.lower_bound, remote.date_created, args.trailing_days)?;
    let cases = window.filter(&series);

    info!("Estimating the reproduction number.");
    let estimates = estimator.estimate(&cases, &args.params)?;

    let theme = plot::load_theme(args.theme.as_ref())?;
    let output_dir = &args.output_dir;
    utils::create_output_dir(output_dir)?;
    remote.write(&output_dir.join("attributes.json"))?;
    utils::write_table(&cases.records, &output_dir.join("cases.tsv"))?;
    utils::write_table(&estimates, &output_dir.join("rt.tsv"))?;
    let title = format!("Reproduction number ({} archive)", remote.date_created);
    plot::rt_line(&estimates, &title).write_png(&output_dir.join("rt.png"), &theme)?;

    info!("Done.");
    Ok(estimates)
}

/// Returns a console table of the `n` most recent estimates.
pub fn tail_table(estimates: &[REstimate], n: usize) -> Table {
    let start = estimates.len().saturating_sub(n);
    Table::new(&estimates[start..])
}
