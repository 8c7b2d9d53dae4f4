use chrono::{Duration, NaiveDate};
use color_eyre::eyre::{eyre, ContextCompat, Report, Result, WrapErr};
use color_eyre::Help;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Days before the archive date that are dropped as incomplete.
pub const DEFAULT_TRAILING_DAYS: i64 = 3;

/// Start of the reliable testing regime, the earliest day used for estimation.
pub fn default_lower_bound() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 4, 1).unwrap_or_default()
}

// ----------------------------------------------------------------------------
// Case Series
// ----------------------------------------------------------------------------

/// Tests and positive tests of one day.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, Tabled)]
pub struct CaseRecord {
    pub date: NaiveDate,
    pub tests: u64,
    pub positives: u64,
}

/// Layout of the daily tests table.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SeriesFormat {
    pub delimiter: char,
    pub date_column: String,
    pub positives_column: String,
    pub tests_column: String,
    /// Summary rows (ex. totals) at the end of the table.
    pub summary_rows: usize,
}

impl Default for SeriesFormat {
    fn default() -> Self {
        SeriesFormat {
            delimiter: ';',
            date_column: "Date".to_string(),
            positives_column: "NewPositive".to_string(),
            tests_column: "Tested".to_string(),
            summary_rows: 2,
        }
    }
}

/// Parse a count that may use `.` as a thousands separator (ex. `12.345`).
///
/// ```rust
/// use covsurv::rt::parse_count;
/// assert_eq!(parse_count("1.234.567")?, 1234567);
/// assert_eq!(parse_count(" 42 ")?, 42);
/// assert!(parse_count("4,2").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn parse_count(value: &str) -> Result<u64, Report> {
    let digits: String = value.trim().chars().filter(|c| *c != '.').collect();
    digits.parse().wrap_err(format!("Failed to parse count: {value:?}"))
}

/// Daily case records, strictly increasing by one day.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CaseSeries {
    pub records: Vec<CaseRecord>,
}

impl CaseSeries {
    /// Returns a [`CaseSeries`], checking that dates are consecutive days.
    pub fn new(records: Vec<CaseRecord>) -> Result<Self, Report> {
        for (prev, next) in records.iter().zip(records.iter().skip(1)) {
            if next.date != prev.date + Duration::days(1) {
                return Err(eyre!("Case series is not consecutive daily data: {} is followed by {}", prev.date, next.date))
                    .suggestion("Dates must be strictly increasing, without gaps.");
            }
        }
        Ok(CaseSeries { records })
    }

    /// Parse a delimited daily tests table.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use covsurv::rt::{CaseSeries, SeriesFormat};
    ///
    /// let text = "Date;NewPositive;NotPrevPos;PrevPos;Tested\n\
    ///             2021-06-01;512;70.100;1.120;71.732\n\
    ///             2021-06-02;498;69.870;1.090;71.458\n\
    ///             Antal personer;1.010;;;\n\
    ///             I alt;1.010;;;143.190\n";
    /// let series = CaseSeries::parse(text.as_bytes(), &SeriesFormat::default())?;
    /// assert_eq!(series.len(), 2);
    /// assert_eq!(series.records[0].tests, 71732);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn parse(bytes: &[u8], format: &SeriesFormat) -> Result<Self, Report> {
        let text = String::from_utf8_lossy(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(format.delimiter as u8)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers().wrap_err("Failed to read case table header.")?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .wrap_err(format!("Column {name:?} not found in case table."))
                .suggestion(format!("Columns: {}", headers.iter().collect::<Vec<_>>().join(", ")))
        };
        let (date_i, positives_i, tests_i) =
            (column(&format.date_column)?, column(&format.positives_column)?, column(&format.tests_column)?);

        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .wrap_err("Failed to read case table rows.")?;
        let keep = rows.len().saturating_sub(format.summary_rows);
        debug!("Dropping {} summary row(s).", rows.len() - keep);

        let records = rows[..keep]
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let cell = |j: usize| row.get(j).unwrap_or_default();
                // header is line 1
                let line = i + 2;
                let date = NaiveDate::parse_from_str(cell(date_i), "%Y-%m-%d")
                    .wrap_err(format!("Failed to parse date {:?} on line {line}.", cell(date_i)))?;
                let positives = parse_count(cell(positives_i)).wrap_err(format!("Line {line}"))?;
                let tests = parse_count(cell(tests_i)).wrap_err(format!("Line {line}"))?;
                Ok(CaseRecord { date, tests, positives })
            })
            .collect::<Result<Vec<_>, Report>>()?;

        CaseSeries::new(records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }
}

// ----------------------------------------------------------------------------
// Date Window
// ----------------------------------------------------------------------------

/// Inclusive range of dates used for estimation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Returns the window from `start` to `trailing_days` before `archive_date`.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use covsurv::rt::{default_lower_bound, DateWindow};
    /// use chrono::NaiveDate;
    ///
    /// let archive_date = NaiveDate::from_ymd_opt(2021, 6, 15).unwrap();
    /// let window = DateWindow::new(default_lower_bound(), archive_date, 3)?;
    /// assert_eq!(window.end, NaiveDate::from_ymd_opt(2021, 6, 12).unwrap());
    ///
    /// let too_early = NaiveDate::from_ymd_opt(2020, 4, 2).unwrap();
    /// assert!(DateWindow::new(default_lower_bound(), too_early, 3).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn new(start: NaiveDate, archive_date: NaiveDate, trailing_days: i64) -> Result<Self, Report> {
        let end = Duration::try_days(trailing_days)
            .and_then(|trailing| archive_date.checked_sub_signed(trailing))
            .ok_or_else(|| eyre!("Date window end is out of range: {archive_date} minus {trailing_days} days."))
            .suggestion("Check --archive-date and --trailing-days.")?;
        if end < start {
            return Err(eyre!("Date window ends ({end}) before it starts ({start})."))
                .suggestion("Check --archive-date, --lower-bound and --trailing-days.");
        }
        Ok(DateWindow { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Returns the records of `series` within the window.
    pub fn filter(&self, series: &CaseSeries) -> CaseSeries {
        let records: Vec<CaseRecord> =
            series.records.iter().filter(|r| self.contains(r.date)).copied().collect();
        info!(
            "Keeping {} of {} days between {} and {}.",
            records.len(),
            series.len(),
            self.start,
            self.end
        );
        // a contiguous subset of a contiguous series
        CaseSeries { records }
    }
}
