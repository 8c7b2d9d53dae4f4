//! Shared helpers: table IO, decompression and HTTP.

#[cfg(feature = "cli")]
use clap::Args as ClapArgs;
use color_eyre::eyre::{eyre, ContextCompat, Report, Result, WrapErr};
use color_eyre::Help;
#[cfg(feature = "download")]
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use zstd::stream::read::Decoder;

#[cfg(test)]
mod tests;

pub enum Decompress {
    Zst,
}

impl FromStr for Decompress {
    type Err = Report;
    fn from_str(s: &str) -> Result<Self, Report> {
        match s {
            "zst" => Ok(Decompress::Zst),
            _ext => Err(eyre!("Decompression for {_ext:?} is not implemented yet.")),
        }
    }
}

/// Returns the lowercase extension of a path.
fn get_extension<P>(path: &P) -> Result<String, Report>
where
    P: AsRef<Path> + Debug,
{
    let ext = path
        .as_ref()
        .extension()
        .wrap_err(format!("Failed to get file extension: {path:?}"))?
        .to_str()
        .wrap_err(format!("Failed to convert file extension to str: {path:?}"))?;
    Ok(ext.to_lowercase())
}

/// Open a file for reading, decompressing on the fly if it ends in a known compression
/// extension (ex. `.zst`).
///
/// ## Examples
///
/// ```rust
/// use covsurv::utils::open_reader;
/// use std::io::Read;
///
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("table.tsv.zst");
/// let compressed = zstd::encode_all("a\tb\n1\t2\n".as_bytes(), 0)?;
/// std::fs::write(&path, compressed)?;
///
/// let mut text = String::new();
/// open_reader(&path)?.read_to_string(&mut text)?;
/// assert_eq!(text, "a\tb\n1\t2\n");
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn open_reader<P>(path: &P) -> Result<Box<dyn Read>, Report>
where
    P: AsRef<Path> + Debug,
{
    let file = std::fs::File::open(path).wrap_err(format!("Failed to open: {path:?}"))?;
    let ext = get_extension(path).unwrap_or_default();
    match Decompress::from_str(&ext) {
        Ok(Decompress::Zst) => {
            let decoder = Decoder::new(file).wrap_err(format!("Failed to decode: {path:?}"))?;
            Ok(Box::new(decoder))
        }
        Err(_) => Ok(Box::new(std::io::BufReader::new(file))),
    }
}

/// Get delimiter based on file extension, ignoring a trailing compression extension.
///
/// ## Arguments
///
/// - `path` - File path.
///
/// ## Examples
///
/// - `.tsv` => `\t`
/// - `.txt` => `\t`
/// - `.csv` => `,`
///
/// Note that `.txt` is assumed to be tab-delimited!
///
/// ```rust
/// use covsurv::utils::get_delimiter;
///
/// assert_eq!(get_delimiter(&"file.tsv")?, '\t');
/// assert_eq!(get_delimiter(&"file.csv")?, ',');
/// assert_eq!(get_delimiter(&"file.txt")?, '\t');
/// assert_eq!(get_delimiter(&"file.tsv.zst")?, '\t');
/// assert!(get_delimiter(&"file").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn get_delimiter<P>(path: &P) -> Result<char, Report>
where
    P: AsRef<Path> + Debug,
{
    let path = path.as_ref();
    let ext = get_extension(&path)?;
    // look behind the compression extension (ex. metadata.tsv.zst)
    let ext = match Decompress::from_str(&ext) {
        Ok(_) => get_extension(&path.with_extension(""))?,
        Err(_) => ext,
    };
    // convert extension to the expected delimiter
    match ext.as_str() {
        "tsv" | "txt" => Ok('\t'),
        "csv" => Ok(','),
        _ext => {
            Err(eyre!("Unknown file extension: {_ext:?}").suggestion("Options: tsv, csv, or txt"))
        }
    }
}

/// Deserialize delimited records (with a header line) from a reader.
///
/// `source` names the input in error messages.
pub fn read_records<T, R>(reader: R, delim: char, source: &str) -> Result<Vec<T>, Report>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delim as u8)
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader
        .deserialize()
        .map(|record| record.wrap_err(format!("Failed to parse table: {source}")))
        .collect()
}

/// Deserialize delimited records from a file, picking the delimiter from its extension.
pub fn read_table<T, P>(path: &P) -> Result<Vec<T>, Report>
where
    T: DeserializeOwned,
    P: AsRef<Path> + Debug,
{
    let delim = get_delimiter(path)?;
    let reader = open_reader(path)?;
    read_records(reader, delim, &format!("{path:?}"))
}

/// Serialize records to a delimited file, picking the delimiter from its extension.
///
/// ## Examples
///
/// ```rust
/// use covsurv::utils::write_table;
///
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("counts.tsv");
/// let rows = vec![("a".to_string(), 1), ("b".to_string(), 2)];
/// write_table(&rows, &path)?;
///
/// let text = std::fs::read_to_string(&path)?;
/// assert_eq!(text, "a\t1\nb\t2\n");
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn write_table<T, P>(records: &[T], path: &P) -> Result<(), Report>
where
    T: Serialize,
    P: AsRef<Path> + Debug,
{
    let delim = get_delimiter(path)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delim as u8)
        .from_path(path)
        .wrap_err(format!("Unable to create file: {path:?}"))?;
    for record in records {
        writer.serialize(record).wrap_err(format!("Unable to write table rows: {path:?}"))?;
    }
    writer.flush().wrap_err(format!("Unable to write table: {path:?}"))?;
    Ok(())
}

/// Write a value as pretty JSON.
pub fn write_json<T, P>(value: &T, path: &P) -> Result<(), Report>
where
    T: Serialize + Debug,
    P: AsRef<Path> + Debug,
{
    let output =
        serde_json::to_string_pretty(value).wrap_err(eyre!("Failed to serialize: {value:?}"))?;
    std::fs::write(path, format!("{output}\n")).wrap_err(eyre!("Failed to write: {path:?}"))?;
    Ok(())
}

/// Create an output directory, warning if it already exists.
pub fn create_output_dir<P>(path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    if path.as_ref().exists() {
        log::warn!("Proceed with caution! --output-dir {path:?} already exists.");
    } else {
        log::info!("Creating output directory: {path:?}");
        std::fs::create_dir_all(path).wrap_err(format!("Failed to create directory: {path:?}"))?;
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// HTTP
// ----------------------------------------------------------------------------

/// Network settings for fetching remote files.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[cfg_attr(feature = "cli", derive(ClapArgs))]
pub struct Fetch {
    /// Request timeout in seconds.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = Fetch::default().timeout))]
    pub timeout: u64,
    /// Number of extra attempts after a failed request, with exponential backoff.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = Fetch::default().retries))]
    pub retries: u32,
}

impl Default for Fetch {
    fn default() -> Self {
        Fetch { timeout: 30, retries: 0 }
    }
}

impl Fetch {
    /// Delay before retry number `attempt` (0-based): 1s, 2s, 4s, ... capped at 64s.
    ///
    /// ```rust
    /// use covsurv::utils::Fetch;
    /// use std::time::Duration;
    /// assert_eq!(Fetch::backoff(0), Duration::from_secs(1));
    /// assert_eq!(Fetch::backoff(3), Duration::from_secs(8));
    /// assert_eq!(Fetch::backoff(20), Duration::from_secs(64));
    /// ```
    pub fn backoff(attempt: u32) -> std::time::Duration {
        std::time::Duration::from_secs(1 << attempt.min(6))
    }

    /// GET a URL, failing on non-success status codes.
    #[cfg(feature = "download")]
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, Report> {
        let user_agent = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout))
            .user_agent(user_agent)
            .build()
            .wrap_err("Failed to build HTTP client.")?;

        let mut attempt = 0;
        loop {
            debug!("Requesting: {url} (attempt {})", attempt + 1);
            let error = match client.get(url).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => eyre!("Failed to download: {url:?}")
                    .suggestion(format!("Status code: {}", response.status())),
                Err(e) => Report::new(e).wrap_err(format!("Failed to download: {url:?}")),
            };
            if attempt >= self.retries {
                return Err(error);
            }
            let delay = Fetch::backoff(attempt);
            warn!("Request failed, retrying in {delay:?}: {url}");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Download a URL as text.
    #[cfg(feature = "download")]
    pub async fn text(&self, url: &str) -> Result<String, Report> {
        let response = self.get(url).await?;
        let text = response.text().await.wrap_err(format!("Failed to read response: {url:?}"))?;
        Ok(text)
    }

    /// Download a URL as bytes.
    #[cfg(feature = "download")]
    pub async fn bytes(&self, url: &str) -> Result<Vec<u8>, Report> {
        let response = self.get(url).await?;
        let bytes = response.bytes().await.wrap_err(format!("Failed to read response: {url:?}"))?;
        Ok(bytes.to_vec())
    }
}
