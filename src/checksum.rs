use camino::Utf8Path;
use tracing::debug;

use crate::client::{ArchiveClient, convert_ftp_url};
use crate::domain::FORMATS;
use crate::error::NgdError;
use crate::fs_util;
use crate::summary::AssemblyEntry;

pub const MANIFEST_NAME: &str = "md5checksums.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    pub checksum: String,
    pub file: String,
}

impl ChecksumEntry {
    pub fn new(checksum: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            checksum: checksum.into(),
            file: file.into(),
        }
    }
}

pub fn manifest_url(entry: &AssemblyEntry) -> String {
    format!("{}/{MANIFEST_NAME}", convert_ftp_url(entry.ftp_path()))
}

pub fn grab_checksums_file(
    client: &dyn ArchiveClient,
    entry: &AssemblyEntry,
) -> Result<String, NgdError> {
    client.get_text(&manifest_url(entry))
}

pub fn parse_checksums(content: &str) -> Vec<ChecksumEntry> {
    let mut entries = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [checksum, file] = tokens.as_slice() else {
            debug!(line, "skipping unexpected checksum line");
            continue;
        };
        let file = file.strip_prefix("./").unwrap_or(*file);
        entries.push(ChecksumEntry::new(*checksum, file));
    }
    entries
}

// `*_cds_from_genomic.fna.gz` and `*_rna_from_genomic.fna.gz` also end in
// `_genomic.fna.gz`, so `_from_` files only match suffixes that contain `_from_`.
pub fn get_name_and_checksum<'a>(
    checksums: &'a [ChecksumEntry],
    suffix: &str,
) -> Result<&'a ChecksumEntry, NgdError> {
    checksums
        .iter()
        .filter(|entry| entry.file.ends_with(suffix))
        .find(|entry| suffix.contains("_from_") || !entry.file.contains("_from_"))
        .ok_or_else(|| NgdError::MissingFormat(suffix.to_string()))
}

pub fn format_suffix(file_format: &str) -> Result<&'static str, NgdError> {
    FORMATS.get(file_format).ok_or_else(|| NgdError::UnsupportedChoice {
        field: FORMATS.name(),
        value: file_format.to_string(),
    })
}

pub fn lookup<'a>(
    checksums: &'a [ChecksumEntry],
    file_format: &str,
) -> Result<&'a ChecksumEntry, NgdError> {
    get_name_and_checksum(checksums, format_suffix(file_format)?)
}

pub fn has_file_changed(
    directory: &Utf8Path,
    checksums: &[ChecksumEntry],
    file_format: &str,
) -> Result<bool, NgdError> {
    let expected = lookup(checksums, file_format)?;
    let local_file = directory.join(&expected.file);
    if !local_file.is_file() {
        return Ok(true);
    }
    Ok(fs_util::md5sum(&local_file)? != expected.checksum)
}

pub fn need_to_create_symlink(
    directory: &Utf8Path,
    checksums: &[ChecksumEntry],
    file_format: &str,
    symlink_dir: Option<&Utf8Path>,
) -> Result<bool, NgdError> {
    let Some(symlink_dir) = symlink_dir else {
        return Ok(false);
    };
    let expected = lookup(checksums, file_format)?;
    let local_file = directory.join(&expected.file);
    let symlink = symlink_dir.join(&expected.file);
    Ok(!fs_util::points_to(&symlink, &local_file)?)
}
