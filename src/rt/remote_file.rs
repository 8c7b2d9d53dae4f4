use chrono::NaiveDate;
use color_eyre::eyre::{Report, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};

// ----------------------------------------------------------------------------
// Remote File
// ----------------------------------------------------------------------------

/// The data archive an estimate was computed from.
///
/// Written as `attributes.json` next to the results, and accepted by `rt estimate
/// --attributes` to repeat a run on the same archive.
///
/// ## Examples
///
/// ```rust
/// use covsurv::rt::RemoteFile;
/// use chrono::NaiveDate;
///
/// let remote = RemoteFile {
///     url: "https://files.ssi.dk/covid19/overvagning/data/overvaagningsdata-covid19-20210615".to_string(),
///     member: "Test_pos_over_time.csv".to_string(),
///     date_created: NaiveDate::from_ymd_opt(2021, 6, 15).unwrap(),
///     ..Default::default()
/// };
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("attributes.json");
/// remote.write(&path)?;
/// assert_eq!(RemoteFile::read(&path)?, remote);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RemoteFile {
    /// Archive URL, empty when read from a local file.
    pub url: String,
    /// Archive member holding the case series.
    pub member: String,
    /// Local archive path, if any.
    pub local_path: Option<PathBuf>,
    /// Date the archive was published.
    pub date_created: NaiveDate,
    /// Date the archive was downloaded or read.
    pub date_downloaded: NaiveDate,
}

impl Default for RemoteFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteFile {
    pub fn new() -> Self {
        RemoteFile {
            url: String::new(),
            member: String::new(),
            local_path: None,
            date_created: NaiveDate::default(),
            date_downloaded: NaiveDate::default(),
        }
    }

    /// Read [`RemoteFile`] from JSON.
    pub fn read<P>(path: &P) -> Result<RemoteFile, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let remote = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read file: {path:?}."))?;
        let remote = serde_json::from_str(&remote)
            .wrap_err_with(|| format!("Failed to parse file: {path:?}"))?;
        Ok(remote)
    }

    /// Write [`RemoteFile`] to JSON.
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        crate::utils::write_json(self, path)
    }
}
