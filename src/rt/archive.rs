#[cfg(feature = "download")]
use crate::utils::Fetch;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::{debug, info};
use std::fmt::Debug;
use std::io::{Cursor, Read};
use std::path::Path;

/// Archive member holding the daily tests and positives.
pub const DEFAULT_MEMBER: &str = "Test_pos_over_time.csv";

/// Download a ZIP archive into memory.
#[cfg(feature = "download")]
pub async fn download_archive(url: &str, fetch: &Fetch) -> Result<Vec<u8>, Report> {
    info!("Downloading archive: {url}");
    let bytes = fetch.bytes(url).await?;
    debug!("Downloaded {} bytes.", bytes.len());
    Ok(bytes)
}

/// Read a local ZIP archive into memory.
pub fn read_archive<P>(path: &P) -> Result<Vec<u8>, Report>
where
    P: AsRef<Path> + Debug,
{
    info!("Reading archive: {path:?}");
    std::fs::read(path).wrap_err(format!("Failed to read archive: {path:?}"))
}

/// Returns the contents of the archive member named `member`.
///
/// A member in a subdirectory whose file name is `member` also matches.
///
/// ## Examples
///
/// ```rust
/// use covsurv::rt::extract_member;
/// use std::io::Write;
///
/// let mut buffer = std::io::Cursor::new(Vec::new());
/// let mut zip = zip::ZipWriter::new(&mut buffer);
/// zip.start_file("data/Test_pos_over_time.csv", zip::write::FileOptions::default())?;
/// zip.write_all(b"Date;NewPositive;Tested\n")?;
/// zip.finish()?;
/// drop(zip);
///
/// let bytes = extract_member(buffer.get_ref(), "Test_pos_over_time.csv")?;
/// assert_eq!(bytes, b"Date;NewPositive;Tested\n");
/// assert!(extract_member(buffer.get_ref(), "Municipality.csv").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn extract_member(archive: &[u8], member: &str) -> Result<Vec<u8>, Report> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).wrap_err("Failed to open ZIP archive.")?;
    let names = zip.file_names().map(String::from).sorted().collect_vec();

    let suffix = format!("/{member}");
    let name = names
        .iter()
        .find(|name| *name == member)
        .or_else(|| names.iter().find(|name| name.ends_with(&suffix)))
        .ok_or_else(|| eyre!("Archive member not found: {member:?}"))
        .suggestion(format!("Archive members: {}", names.join(", ")))?;
    debug!("Extracting archive member: {name}");

    let mut file = zip.by_name(name).wrap_err(format!("Failed to open archive member: {name:?}"))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).wrap_err(format!("Failed to read archive member: {name:?}"))?;
    Ok(bytes)
}
