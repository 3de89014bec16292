use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use tracing::debug;

use crate::config::NgdConfig;
use crate::domain::Section;
use crate::error::NgdError;
use crate::fs_util;

pub const SUMMARY_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct SummaryCache {
    root: Utf8PathBuf,
    max_age: Duration,
}

impl SummaryCache {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_age: SUMMARY_MAX_AGE,
        }
    }

    // `<user cache dir>/ncbi-genome-download`.
    pub fn from_user_dirs() -> Result<Self, NgdError> {
        let root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.cache_dir().join("ncbi-genome-download")).ok()
            })
            .ok_or_else(|| NgdError::Filesystem("unable to resolve cache directory".to_string()))?;
        Ok(Self::new(root))
    }

    pub fn for_config(config: &NgdConfig) -> Result<Option<Self>, NgdError> {
        if !config.use_cache() {
            return Ok(None);
        }
        Self::from_user_dirs().map(Some)
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn path(&self, section: Section, group: &str) -> Utf8PathBuf {
        self.root
            .join(format!("{section}_{group}_assembly_summary.txt"))
    }

    pub fn load(&self, section: Section, group: &str) -> Result<Option<String>, NgdError> {
        let path = self.path(section, group);
        if !fs_util::is_fresh(&path, self.max_age) {
            return Ok(None);
        }
        debug!(path = %path, "using cached assembly summary");
        fs::read_to_string(path.as_std_path())
            .map(Some)
            .map_err(|err| NgdError::Filesystem(format!("read {path}: {err}")))
    }

    pub fn store(&self, section: Section, group: &str, content: &str) -> Result<(), NgdError> {
        fs_util::ensure_dir(&self.root)?;
        fs_util::write_bytes_atomic(&self.path(section, group), content.as_bytes())
    }
}
