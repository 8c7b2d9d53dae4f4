#[cfg(feature = "download")]
use crate::utils::Fetch;
use chrono::NaiveDate;
#[cfg(feature = "cli")]
use clap::Args as ClapArgs;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
#[cfg(feature = "download")]
use log::info;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Page listing the daily surveillance data archives.
pub const DEFAULT_PAGE_URL: &str =
    "https://covid19.ssi.dk/overvagningsdata/download-fil-med-overvaagningdata";
/// Archive link pattern. Group 1 is the URL, group 2 the embedded date.
pub const DEFAULT_LINK_PATTERN: &str =
    r#"href="(https://files\.ssi\.dk/covid19/overvagning/data/[^"]*?-(\d{8})[^"]*)""#;
/// Format of the date embedded in archive links.
pub const DEFAULT_DATE_FORMAT: &str = "%Y%m%d";

// ----------------------------------------------------------------------------
// Archive Link
// ----------------------------------------------------------------------------

/// A dated link to a data archive.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ArchiveLink {
    pub url: String,
    /// Date embedded in the link, the date the archive was published.
    pub date: NaiveDate,
}

// ----------------------------------------------------------------------------
// Link Matcher
// ----------------------------------------------------------------------------

/// Finds dated archive links in a web page.
pub trait LinkMatcher {
    /// Returns every archive link in the page, in page order.
    fn find_links(&self, html: &str) -> Result<Vec<ArchiveLink>, Report>;

    /// Returns the archive link with the latest date.
    ///
    /// A page without any matching link is an error.
    fn latest(&self, html: &str) -> Result<ArchiveLink, Report> {
        let links = self.find_links(html)?;
        debug!("Found {} archive link(s): {}", links.len(), links.iter().map(|l| &l.url).join(", "));
        // max_by_key keeps the last of equal dates, prefer the first on the page
        links.into_iter().rev().max_by_key(|link| link.date).ok_or_else(|| {
            eyre!("Archive link pattern not found in page.")
                .suggestion("The page layout may have changed, try a new --link-pattern or --date-format.")
        })
    }
}

/// A [`LinkMatcher`] based on a regular expression.
///
/// The pattern must have two capture groups: the URL, then the date.
///
/// ## Examples
///
/// ```rust
/// use covsurv::rt::{LinkMatcher, RegexLinkMatcher};
/// use chrono::NaiveDate;
///
/// let html = r#"
///   <a href="https://files.ssi.dk/covid19/overvagning/data/data-epidemiologiske-rapport-14062021-a1b2">14 juni</a>
///   <a href="https://files.ssi.dk/covid19/overvagning/data/overvaagningsdata-covid19-15062021-kd81">15 juni</a>
/// "#;
/// let matcher = RegexLinkMatcher { date_format: "%d%m%Y".to_string(), ..Default::default() };
/// let link = matcher.latest(html)?;
/// assert_eq!(link.date, NaiveDate::from_ymd_opt(2021, 6, 15).unwrap());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[cfg_attr(feature = "cli", derive(ClapArgs))]
pub struct RegexLinkMatcher {
    /// Regular expression of archive links, capturing the URL then the date.
    #[cfg_attr(feature = "cli", arg(long = "link-pattern", default_value_t = RegexLinkMatcher::default().pattern))]
    pub pattern: String,
    /// Format of the date captured from archive links.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = RegexLinkMatcher::default().date_format))]
    pub date_format: String,
}

impl Default for RegexLinkMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RegexLinkMatcher {
    pub fn new() -> Self {
        RegexLinkMatcher {
            pattern: DEFAULT_LINK_PATTERN.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    fn regex(&self) -> Result<Regex, Report> {
        let regex = Regex::new(&self.pattern)
            .wrap_err(format!("Invalid link pattern: {:?}", self.pattern))?;
        // group 0 is the whole match
        if regex.captures_len() < 3 {
            return Err(eyre!("Link pattern needs two capture groups (url, date): {:?}", self.pattern));
        }
        Ok(regex)
    }
}

impl LinkMatcher for RegexLinkMatcher {
    /// Links whose date does not parse are skipped.
    fn find_links(&self, html: &str) -> Result<Vec<ArchiveLink>, Report> {
        let regex = self.regex()?;
        let links = regex
            .captures_iter(html)
            .filter_map(|captures| {
                let group = |i| captures.get(i).map(|m| m.as_str()).unwrap_or_default();
                let (url, date) = (group(1), group(2));
                match NaiveDate::parse_from_str(date, &self.date_format) {
                    Ok(date) => Some(ArchiveLink { url: url.replace("&amp;", "&"), date }),
                    Err(e) => {
                        warn!("Skipping link, date {date:?} does not match {:?} ({e}): {url}", self.date_format);
                        None
                    }
                }
            })
            .collect();
        Ok(links)
    }
}

/// Fetch a web page and return its latest archive link.
#[cfg(feature = "download")]
pub async fn locate_latest_archive<M>(
    page_url: &str,
    matcher: &M,
    fetch: &Fetch,
) -> Result<ArchiveLink, Report>
where
    M: LinkMatcher,
{
    info!("Searching for the latest archive: {page_url}");
    let html = fetch.text(page_url).await?;
    let link = matcher.latest(&html).wrap_err(format!("Failed to locate archive: {page_url}"))?;
    info!("Latest archive ({}): {}", link.date, link.url);
    Ok(link)
}
