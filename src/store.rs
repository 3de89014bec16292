use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{Section, VIRAL_GROUP};
use crate::error::NgdError;
use crate::fs_util::ensure_dir;
use crate::summary::AssemblyEntry;

pub const HUMAN_READABLE_DIR: &str = "human_readable";
pub const LOCAL_MANIFEST_NAME: &str = "MD5SUMS";

#[derive(Debug, Clone)]
pub struct Store {
    output: Utf8PathBuf,
    flat: bool,
}

impl Store {
    pub fn new(output: impl Into<Utf8PathBuf>, flat: bool) -> Self {
        Self {
            output: output.into(),
            flat,
        }
    }

    pub fn output(&self) -> &Utf8Path {
        &self.output
    }

    pub fn is_flat(&self) -> bool {
        self.flat
    }

    pub fn assembly_dir(
        &self,
        entry: &AssemblyEntry,
        section: Section,
        group: &str,
    ) -> Utf8PathBuf {
        if self.flat {
            return self.output.clone();
        }
        self.output
            .join(section.as_str())
            .join(group)
            .join(entry.accession())
    }

    pub fn readable_dir(
        &self,
        entry: &AssemblyEntry,
        section: Section,
        group: &str,
    ) -> Utf8PathBuf {
        let base = self
            .output
            .join(HUMAN_READABLE_DIR)
            .join(section.as_str())
            .join(group);
        if group == VIRAL_GROUP {
            return base
                .join(entry.organism_name().replace(' ', "_"))
                .join(get_strain_label(entry, true));
        }
        base.join(get_genus_label(entry))
            .join(get_species_label(entry))
            .join(get_strain_label(entry, false))
    }

    pub fn create_dir(
        &self,
        entry: &AssemblyEntry,
        section: Section,
        group: &str,
    ) -> Result<Utf8PathBuf, NgdError> {
        let dir = self.assembly_dir(entry, section, group);
        ensure_dir(&dir)?;
        Ok(dir)
    }

    pub fn create_readable_dir(
        &self,
        entry: &AssemblyEntry,
        section: Section,
        group: &str,
    ) -> Result<Utf8PathBuf, NgdError> {
        let dir = self.readable_dir(entry, section, group);
        ensure_dir(&dir)?;
        Ok(dir)
    }
}

pub fn get_genus_label(entry: &AssemblyEntry) -> &str {
    entry.organism_name().split(' ').next().unwrap_or("")
}

pub fn get_species_label(entry: &AssemblyEntry) -> &str {
    entry.organism_name().split(' ').nth(1).unwrap_or("sp.")
}

pub fn get_strain(entry: &AssemblyEntry, viral: bool) -> String {
    let infraspecific = entry.get("infraspecific_name");
    if !infraspecific.is_empty() {
        return infraspecific
            .rsplit('=')
            .next()
            .unwrap_or(infraspecific)
            .to_string();
    }

    let isolate = entry.get("isolate");
    if !isolate.is_empty() {
        return isolate.to_string();
    }

    let tokens: Vec<&str> = entry.organism_name().split(' ').collect();
    if !viral && tokens.len() > 2 {
        return tokens[2..].join(" ");
    }

    entry.accession().to_string()
}

pub fn get_strain_label(entry: &AssemblyEntry, viral: bool) -> String {
    sanitize_label(&get_strain(entry, viral))
}

pub fn sanitize_label(raw: &str) -> String {
    raw.trim().replace([' ', ';', '/', '\\'], "_")
}
