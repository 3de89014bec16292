use std::io::Cursor;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::SummaryCache;
use crate::client::ArchiveClient;
use crate::config::NgdConfig;
use crate::error::NgdError;
use crate::store::get_strain_label;
use crate::summary::{AssemblyEntry, SummaryReader};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub entry: AssemblyEntry,
    pub group: String,
}

pub fn summary_url(config: &NgdConfig, group: &str) -> String {
    format!(
        "{}/{}/{}/assembly_summary.txt",
        config.uri(),
        config.section(),
        group
    )
}

pub fn get_summary(
    config: &NgdConfig,
    group: &str,
    client: &dyn ArchiveClient,
    cache: Option<&SummaryCache>,
) -> Result<String, NgdError> {
    let cache = cache.filter(|_| config.use_cache());
    if let Some(cache) = cache
        && let Some(content) = cache.load(config.section(), group)?
    {
        return Ok(content);
    }

    let url = summary_url(config, group);
    info!(url, "downloading assembly summary");
    let content = client.get_text(&url)?;
    if let Some(cache) = cache {
        cache.store(config.section(), group, &content)?;
    }
    Ok(content)
}

// Cheapest filters first.
pub fn filter_entries<I>(entries: I, config: &NgdConfig) -> Result<Vec<AssemblyEntry>, NgdError>
where
    I: IntoIterator<Item = Result<AssemblyEntry, NgdError>>,
{
    let mut selected = Vec::new();
    for entry in entries {
        let entry = entry?;
        if is_selected(&entry, config) {
            selected.push(entry);
        }
    }
    Ok(selected)
}

fn is_selected(entry: &AssemblyEntry, config: &NgdConfig) -> bool {
    let accession = entry.accession();
    if !config.is_compatible_type_material(entry.relation_to_type_material()) {
        debug!(accession, "skipping, type material mismatch");
        return false;
    }
    if !config.is_compatible_genus(entry.organism_name()) {
        debug!(accession, "skipping, genus mismatch");
        return false;
    }
    if !config.strains().is_empty()
        && !config.is_compatible_strain(&get_strain_label(entry, false))
    {
        debug!(accession, "skipping, strain mismatch");
        return false;
    }
    if !config.is_compatible_species_taxid(entry.species_taxid()) {
        debug!(accession, "skipping, species taxid mismatch");
        return false;
    }
    if !config.is_compatible_taxid(entry.taxid()) {
        debug!(accession, "skipping, taxid mismatch");
        return false;
    }
    if !config.is_compatible_assembly_accession(accession) {
        debug!(accession, "skipping, accession mismatch");
        return false;
    }
    if !config.is_compatible_assembly_level(entry.assembly_level()) {
        debug!(accession, "skipping, assembly level mismatch");
        return false;
    }
    if !config.is_compatible_refseq_category(entry.refseq_category()) {
        debug!(accession, "skipping, refseq category mismatch");
        return false;
    }
    if entry.ftp_path() == "na" {
        warn!(accession, "skipping, no ftp path available");
        return false;
    }
    true
}

pub fn select_candidates(
    config: &NgdConfig,
    client: &dyn ArchiveClient,
    cache: Option<&SummaryCache>,
) -> Result<Vec<Candidate>, NgdError> {
    let mut candidates = Vec::new();
    for group in config.groups() {
        let content = get_summary(config, group, client, cache)?;
        let reader = SummaryReader::new(Cursor::new(content))?;
        let entries = filter_entries(reader, config)?;
        info!(group = group.as_str(), count = entries.len(), "selected assemblies");
        candidates.extend(entries.into_iter().map(|entry| Candidate {
            entry,
            group: group.clone(),
        }));
    }
    Ok(candidates)
}
