use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, error};

use crate::checksum::{self, ChecksumEntry};
use crate::client::{ArchiveClient, convert_ftp_url};
use crate::config::NgdConfig;
use crate::error::NgdError;
use crate::fs_util;
use crate::metadata::MetadataTable;
use crate::store::{LOCAL_MANIFEST_NAME, Store};
use crate::summary::AssemblyEntry;

const MANIFEST_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub full_url: Option<String>,
    pub local_file: Utf8PathBuf,
    pub expected_checksum: Option<String>,
    pub symlink_path: Option<Utf8PathBuf>,
}

pub fn download_file_job(
    entry: &AssemblyEntry,
    checksum: &ChecksumEntry,
    directory: &Utf8Path,
    symlink_dir: Option<&Utf8Path>,
    metadata: Option<&MetadataTable>,
) -> Result<DownloadJob, NgdError> {
    let local_file = directory.join(&checksum.file);
    if let Some(table) = metadata {
        table.add(entry, &local_file)?;
    }
    Ok(DownloadJob {
        full_url: Some(format!(
            "{}/{}",
            convert_ftp_url(entry.ftp_path()),
            checksum.file
        )),
        local_file,
        expected_checksum: Some(checksum.checksum.clone()),
        symlink_path: symlink_dir.map(|dir| dir.join(&checksum.file)),
    })
}

pub fn create_symlink_job(
    directory: &Utf8Path,
    checksum: &ChecksumEntry,
    symlink_dir: &Utf8Path,
) -> DownloadJob {
    DownloadJob {
        full_url: None,
        local_file: directory.join(&checksum.file),
        expected_checksum: None,
        symlink_path: Some(symlink_dir.join(&checksum.file)),
    }
}

pub fn create_downloadjob(
    entry: &AssemblyEntry,
    group: &str,
    config: &NgdConfig,
    client: &dyn ArchiveClient,
    metadata: Option<&MetadataTable>,
) -> Result<Vec<DownloadJob>, NgdError> {
    let store = Store::new(config.output(), config.flat_output());
    let directory = store.create_dir(entry, config.section(), group)?;
    let symlink_dir = if config.human_readable() {
        Some(store.create_readable_dir(entry, config.section(), group)?)
    } else {
        None
    };

    let checksums = match load_checksums(entry, &directory, store.is_flat(), client) {
        Ok(checksums) => checksums,
        Err(err) if err.is_connection() => return Err(err),
        Err(err @ (NgdError::HttpStatus { .. } | NgdError::Http(_))) => {
            error!(accession = entry.accession(), "no checksum manifest: {err}");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err),
    };

    let mut jobs = Vec::new();
    for file_format in config.file_formats() {
        let expected = match checksum::lookup(&checksums, file_format) {
            Ok(expected) => expected,
            Err(err) => {
                error!(
                    accession = entry.accession(),
                    format = file_format.as_str(),
                    "{err}"
                );
                continue;
            }
        };

        if checksum::has_file_changed(&directory, &checksums, file_format)? {
            jobs.push(download_file_job(
                entry,
                expected,
                &directory,
                symlink_dir.as_deref(),
                metadata,
            )?);
        } else if let Some(symlink_dir) = symlink_dir.as_deref()
            && checksum::need_to_create_symlink(
                &directory,
                &checksums,
                file_format,
                Some(symlink_dir),
            )?
        {
            jobs.push(create_symlink_job(&directory, expected, symlink_dir));
        } else {
            debug!(file = expected.file.as_str(), "already up to date");
        }
    }

    Ok(jobs)
}

fn load_checksums(
    entry: &AssemblyEntry,
    directory: &Utf8Path,
    flat: bool,
    client: &dyn ArchiveClient,
) -> Result<Vec<ChecksumEntry>, NgdError> {
    if flat {
        let content = checksum::grab_checksums_file(client, entry)?;
        return Ok(checksum::parse_checksums(&content));
    }

    let local_manifest = directory.join(LOCAL_MANIFEST_NAME);
    let content = if fs_util::is_fresh(&local_manifest, MANIFEST_MAX_AGE) {
        debug!(path = %local_manifest, "reusing checksum manifest");
        fs::read_to_string(local_manifest.as_std_path())
            .map_err(|err| NgdError::Filesystem(format!("read {local_manifest}: {err}")))?
    } else {
        let content = checksum::grab_checksums_file(client, entry)?;
        fs_util::write_bytes_atomic(&local_manifest, content.as_bytes())?;
        content
    };
    Ok(checksum::parse_checksums(&content))
}
