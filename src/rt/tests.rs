use crate::rt::*;
use chrono::{Duration, NaiveDate};
use color_eyre::eyre::{Report, Result};
use std::io::Write;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn series(start: NaiveDate, days: i64) -> CaseSeries {
    let records = (0..days)
        .map(|d| CaseRecord { date: start + Duration::days(d), tests: 50_000, positives: 400 })
        .collect();
    CaseSeries::new(records).unwrap()
}

/// Returns an in-memory ZIP archive with the given members.
fn zip_archive(members: &[(&str, &str)]) -> Result<Vec<u8>, Report> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    let mut zip = zip::ZipWriter::new(&mut buffer);
    for (name, content) in members {
        zip.start_file(*name, zip::write::FileOptions::default())?;
        zip.write_all(content.as_bytes())?;
    }
    zip.finish()?;
    drop(zip);
    Ok(buffer.into_inner())
}

// ----------------------------------------------------------------------------
// Locate

#[test]
fn link_date_from_url() -> Result<(), Report> {
    let html = r#"<p><a href="https://files.ssi.dk/covid19/overvagning/data/download-fil-20210615-x7q2">Data</a></p>"#;
    let link = RegexLinkMatcher::default().latest(html)?;
    assert_eq!(link.date, date(2021, 6, 15));
    assert_eq!(link.url, "https://files.ssi.dk/covid19/overvagning/data/download-fil-20210615-x7q2");
    Ok(())
}

#[test]
fn latest_of_several_links() -> Result<(), Report> {
    let html = r#"
        <a href="https://files.ssi.dk/covid19/overvagning/data/download-fil-20210613-aaaa">13</a>
        <a href="https://files.ssi.dk/covid19/overvagning/data/download-fil-20210615-bbbb">15</a>
        <a href="https://files.ssi.dk/covid19/overvagning/data/download-fil-20210614-cccc">14</a>
    "#;
    let matcher = RegexLinkMatcher::default();
    assert_eq!(matcher.find_links(html)?.len(), 3);
    let link = matcher.latest(html)?;
    assert!(link.url.ends_with("bbbb"));
    Ok(())
}

#[test]
fn missing_link_is_an_error() {
    let html = r#"<a href="https://example.org/data.zip">Data</a>"#;
    let error = RegexLinkMatcher::default().latest(html).unwrap_err();
    assert!(error.to_string().contains("pattern not found"));
}

#[test]
fn link_with_bad_date_is_skipped() -> Result<(), Report> {
    let html = r#"
        <a href="https://files.ssi.dk/covid19/overvagning/data/download-fil-20210615-abcd">Data</a>
        <a href="https://files.ssi.dk/covid19/overvagning/data/bilag-99999999-x">Bilag</a>
    "#;
    let matcher = RegexLinkMatcher::default();
    assert_eq!(matcher.find_links(html)?.len(), 1);
    assert_eq!(matcher.latest(html)?.date, date(2021, 6, 15));

    // no link with a valid date
    let html = r#"<a href="https://files.ssi.dk/covid19/overvagning/data/bilag-99999999-x">Bilag</a>"#;
    let error = matcher.latest(html).unwrap_err();
    assert!(error.to_string().contains("pattern not found"));
    Ok(())
}

#[test]
fn link_pattern_without_groups_is_an_error() {
    let matcher = RegexLinkMatcher { pattern: r#"href="[^"]+""#.to_string(), ..Default::default() };
    assert!(matcher.find_links("").is_err());
}

// ----------------------------------------------------------------------------
// Archive

#[test]
fn missing_member_lists_archive() -> Result<(), Report> {
    let archive = zip_archive(&[("Cases_by_age.csv", "a;b\n"), ("Municipality.csv", "a;b\n")])?;
    let error = extract_member(&archive, DEFAULT_MEMBER).unwrap_err();
    assert!(error.to_string().contains("Test_pos_over_time.csv"));
    Ok(())
}

#[test]
fn member_exact_name_wins() -> Result<(), Report> {
    let archive = zip_archive(&[("old/Test_pos_over_time.csv", "old"), ("Test_pos_over_time.csv", "new")])?;
    assert_eq!(extract_member(&archive, DEFAULT_MEMBER)?, b"new");
    Ok(())
}

#[test]
fn invalid_archive_is_an_error() {
    assert!(extract_member(b"not a zip", DEFAULT_MEMBER).is_err());
}

// ----------------------------------------------------------------------------
// Series

const TABLE: &str = "Date;NewPositive;NotPrevPos;PrevPos;Tested;Tested_kumulativ\n\
                     2021-06-10;1.012;60.000;1.100;61.112;100.000\n\
                     2021-06-11;987;58.500;1.050;59.550;159.550\n\
                     2021-06-12;1.104;64.000;1.200;65.200;224.750\n\
                     Antal personer;3.103;;;;\n\
                     I alt;3.103;;;185.862;\n";

#[test]
fn summary_rows_are_dropped() -> Result<(), Report> {
    let series = CaseSeries::parse(TABLE.as_bytes(), &SeriesFormat::default())?;
    assert_eq!(series.len(), 3);
    assert_eq!(series.last_date(), Some(date(2021, 6, 12)));
    Ok(())
}

#[test]
fn thousands_separators_parse() -> Result<(), Report> {
    let series = CaseSeries::parse(TABLE.as_bytes(), &SeriesFormat::default())?;
    let first = series.records[0];
    assert_eq!((first.positives, first.tests), (1012, 61112));
    Ok(())
}

#[test]
fn configurable_columns() -> Result<(), Report> {
    let format = SeriesFormat { tests_column: "Tested_kumulativ".to_string(), ..Default::default() };
    let series = CaseSeries::parse(TABLE.as_bytes(), &format)?;
    assert_eq!(series.records[2].tests, 224750);

    let format = SeriesFormat { tests_column: "Tests".to_string(), ..Default::default() };
    let error = CaseSeries::parse(TABLE.as_bytes(), &format).unwrap_err();
    assert!(error.to_string().contains("Tests"));
    Ok(())
}

#[test]
fn gap_in_series_is_an_error() {
    let table = "Date;NewPositive;Tested\n\
                 2021-06-10;10;100\n\
                 2021-06-12;10;100\n\
                 Antal personer;20;\n\
                 I alt;20;200\n";
    let error = CaseSeries::parse(table.as_bytes(), &SeriesFormat::default()).unwrap_err();
    assert!(error.to_string().contains("2021-06-10"));
}

#[test]
fn unsorted_series_is_an_error() {
    let records = vec![
        CaseRecord { date: date(2021, 6, 2), tests: 1, positives: 1 },
        CaseRecord { date: date(2021, 6, 1), tests: 1, positives: 1 },
    ];
    assert!(CaseSeries::new(records).is_err());
}

// ----------------------------------------------------------------------------
// Window

#[test]
fn window_from_archive_date() -> Result<(), Report> {
    let window = DateWindow::new(default_lower_bound(), date(2021, 6, 15), DEFAULT_TRAILING_DAYS)?;
    assert_eq!(window.start, date(2020, 4, 1));
    assert_eq!(window.end, date(2021, 6, 12));

    let filtered = window.filter(&series(date(2020, 3, 1), 500));
    assert_eq!(filtered.first_date(), Some(date(2020, 4, 1)));
    assert_eq!(filtered.last_date(), Some(date(2021, 6, 12)));
    Ok(())
}

#[test]
fn window_filter_is_idempotent() -> Result<(), Report> {
    let window = DateWindow::new(date(2021, 1, 10), date(2021, 2, 1), 3)?;
    let once = window.filter(&series(date(2021, 1, 1), 40));
    let twice = window.filter(&once);
    assert_eq!(once, twice);
    Ok(())
}

#[test]
fn window_out_of_range_is_an_error() {
    let archive_date = date(2021, 6, 15);
    assert!(DateWindow::new(default_lower_bound(), archive_date, 1_000_000_000).is_err());
    assert!(DateWindow::new(default_lower_bound(), archive_date, i64::MAX).is_err());
    assert!(DateWindow::new(default_lower_bound(), archive_date, i64::MIN).is_err());
}

// ----------------------------------------------------------------------------
// Estimate

#[test]
fn two_day_constant_series() -> Result<(), Report> {
    let estimates = TestAdjustedEstimator.estimate(&series(date(2021, 6, 1), 2), &EstimationParams::default())?;
    assert_eq!(estimates.len(), 2);
    for estimate in estimates {
        assert!((estimate.r - 1.0).abs() < 1e-12);
        assert!(estimate.lower < 1.0 && estimate.upper > 1.0);
    }
    Ok(())
}

#[test]
fn single_day_is_an_error() {
    let result = TestAdjustedEstimator.estimate(&series(date(2021, 6, 1), 1), &EstimationParams::default());
    assert!(result.is_err());
}

#[test]
fn more_tests_lower_r() -> Result<(), Report> {
    // constant positives with rising testing means falling test-adjusted incidence
    let start = date(2021, 6, 1);
    let records = (0..30)
        .map(|d| CaseRecord { date: start + Duration::days(d), tests: 10_000 + 500 * d as u64, positives: 500 })
        .collect();
    let series = CaseSeries::new(records)?;
    let estimates = TestAdjustedEstimator.estimate(&series, &EstimationParams::default())?;
    assert!(estimates.iter().all(|e| e.r < 1.0));

    let params = EstimationParams { test_exponent: 0.0, ..Default::default() };
    let estimates = TestAdjustedEstimator.estimate(&series, &params)?;
    assert!(estimates.iter().all(|e| (e.r - 1.0).abs() < 1e-9));
    Ok(())
}

#[test]
fn wider_confidence_wider_interval() -> Result<(), Report> {
    let series = series(date(2021, 6, 1), 10);
    let narrow = TestAdjustedEstimator.estimate(&series, &EstimationParams { confidence: 0.5, ..Default::default() })?;
    let wide = TestAdjustedEstimator.estimate(&series, &EstimationParams { confidence: 0.99, ..Default::default() })?;
    assert!(wide[5].upper - wide[5].lower > narrow[5].upper - narrow[5].lower);
    Ok(())
}

#[test]
fn invalid_params_are_rejected() {
    let series = series(date(2021, 6, 1), 10);
    for params in [
        EstimationParams { confidence: 1.0, ..Default::default() },
        EstimationParams { generation_time: 0.0, ..Default::default() },
        EstimationParams { smoothing: -1.0, ..Default::default() },
    ] {
        assert!(TestAdjustedEstimator.estimate(&series, &params).is_err());
    }
}

// ----------------------------------------------------------------------------
// Run

#[test]
fn estimate_from_attributes() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let archive = dir.path().join("data.zip");
    let mut table = "Date;NewPositive;Tested\n".to_string();
    for day in 1..=30 {
        table.push_str(&format!("2021-05-{day:02};{};2.000\n", 200 + day));
    }
    table.push_str("Antal personer;1;\nI alt;1;1\n");
    std::fs::write(&archive, zip_archive(&[("Test_pos_over_time.csv", &table)])?)?;

    // a previous run on this archive, published 2021-06-01
    let attributes = dir.path().join("attributes.json");
    let previous = RemoteFile {
        member: DEFAULT_MEMBER.to_string(),
        local_path: Some(archive.clone()),
        date_created: date(2021, 6, 1),
        date_downloaded: date(2021, 6, 1),
        ..Default::default()
    };
    previous.write(&attributes)?;

    let args = EstimateArgs {
        output_dir: dir.path().join("rt"),
        archive: Some(archive),
        attributes: Some(attributes),
        ..Default::default()
    };
    let estimates = tokio_test::block_on(estimate(&args))?;
    assert_eq!(estimates.last().map(|e| e.date), Some(date(2021, 5, 29)));

    for file in ["attributes.json", "cases.tsv", "rt.tsv", "rt.png"] {
        assert!(args.output_dir.join(file).exists(), "missing {file}");
    }
    let written = RemoteFile::read(&args.output_dir.join("attributes.json"))?;
    assert_eq!(written.date_created, date(2021, 6, 1));

    assert_eq!(tail_table(&estimates, 5).count_rows(), 6);
    Ok(())
}

/// Returns R = 2 on every day.
struct ConstantEstimator;

impl ReproductionEstimator for ConstantEstimator {
    fn estimate(&self, series: &CaseSeries, _params: &EstimationParams) -> Result<Vec<REstimate>, Report> {
        let estimates = series
            .records
            .iter()
            .map(|record| REstimate { date: record.date, r: 2.0, lower: 1.5, upper: 2.5 })
            .collect();
        Ok(estimates)
    }
}

/// Always points to the same archive.
struct FixedLinkMatcher;

impl LinkMatcher for FixedLinkMatcher {
    fn find_links(&self, _html: &str) -> Result<Vec<ArchiveLink>, Report> {
        Ok(vec![ArchiveLink { url: "https://example.org/data.zip".to_string(), date: date(2021, 6, 15) }])
    }
}

#[test]
fn custom_estimator() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let archive = dir.path().join("data.zip");
    let mut table = "Date;NewPositive;Tested\n".to_string();
    for day in 1..=10 {
        table.push_str(&format!("2021-06-{day:02};{};1.000\n", 50 + day));
    }
    table.push_str("Antal personer;1;\nI alt;1;1\n");
    std::fs::write(&archive, zip_archive(&[("Test_pos_over_time.csv", &table)])?)?;

    let args = EstimateArgs {
        output_dir: dir.path().join("rt"),
        archive: Some(archive),
        archive_date: Some(date(2021, 6, 11)),
        ..Default::default()
    };
    let estimates = tokio_test::block_on(estimate_with(&args, &ConstantEstimator, &FixedLinkMatcher))?;
    // 2021-06-01 to 2021-06-08
    assert_eq!(estimates.len(), 8);
    assert!(estimates.iter().all(|e| e.r == 2.0));

    let written: Vec<REstimate> = crate::utils::read_table(&args.output_dir.join("rt.tsv"))?;
    assert_eq!(written, estimates);
    Ok(())
}

#[test]
fn local_archive_needs_a_date() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let archive = dir.path().join("data.zip");
    std::fs::write(&archive, zip_archive(&[("Test_pos_over_time.csv", "Date;NewPositive;Tested\n")])?)?;
    let args = EstimateArgs { output_dir: dir.path().join("rt"), archive: Some(archive), ..Default::default() };
    let error = tokio_test::block_on(estimate(&args)).unwrap_err();
    assert!(error.to_string().contains("archive date"));
    Ok(())
}
