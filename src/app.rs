use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::cache::SummaryCache;
use crate::client::ArchiveClient;
use crate::config::NgdConfig;
use crate::domain::VIRAL_GROUP;
use crate::error::NgdError;
use crate::jobs::{DownloadJob, create_downloadjob};
use crate::metadata::MetadataTable;
use crate::select::{Candidate, select_candidates};
use crate::store::get_strain_label;
use crate::worker::{Cancellation, RunSummary, run_jobs};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_RETRY: u8 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    NoMatches,
    Failure,
    Retry,
}

impl Outcome {
    pub fn code(self) -> u8 {
        match self {
            Outcome::Success => EXIT_SUCCESS,
            Outcome::NoMatches | Outcome::Failure => EXIT_FAILURE,
            Outcome::Retry => EXIT_RETRY,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DryRunEntry {
    pub accession: String,
    pub organism_name: String,
    pub strain: String,
    pub group: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: Outcome,
    pub candidates: usize,
    pub jobs: usize,
    pub done: usize,
    pub failed: usize,
    pub dry_run: Option<Vec<DryRunEntry>>,
}

impl RunReport {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            candidates: 0,
            jobs: 0,
            done: 0,
            failed: 0,
            dry_run: None,
        }
    }
}

#[derive(Clone)]
pub struct Downloader<C: ArchiveClient> {
    client: C,
    cache: Option<SummaryCache>,
}

impl<C: ArchiveClient> Downloader<C> {
    pub fn new(client: C, cache: Option<SummaryCache>) -> Self {
        Self { client, cache }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn download(
        &self,
        config: &NgdConfig,
        cancel: &Cancellation,
    ) -> Result<RunReport, NgdError> {
        match self.run(config, cancel) {
            Ok(report) => Ok(report),
            Err(err) if err.is_connection() => {
                error!("{err}");
                Ok(RunReport::new(Outcome::Retry))
            }
            Err(NgdError::Interrupted) => {
                info!("interrupted, stopping");
                Ok(RunReport::new(Outcome::Failure))
            }
            Err(err) => Err(err),
        }
    }

    fn run(&self, config: &NgdConfig, cancel: &Cancellation) -> Result<RunReport, NgdError> {
        let candidates = select_candidates(config, &self.client, self.cache.as_ref())?;
        if candidates.is_empty() {
            error!("no downloads matched your filter, please check your options");
            return Ok(RunReport::new(Outcome::NoMatches));
        }

        if config.dry_run() {
            let listing = candidates.iter().map(dry_run_entry).collect();
            return Ok(RunReport {
                candidates: candidates.len(),
                dry_run: Some(listing),
                ..RunReport::new(Outcome::Success)
            });
        }

        let metadata = config
            .metadata_table()
            .map(|_| MetadataTable::default());
        let jobs = self.build_jobs(&candidates, config, metadata.as_ref(), cancel)?;
        info!(
            candidates = candidates.len(),
            jobs = jobs.len(),
            "starting downloads"
        );

        let RunSummary { done, failed } = run_jobs(
            &jobs,
            config.parallel(),
            &self.client,
            cancel,
            config.decompress(),
        )?;

        if let (Some(path), Some(table)) = (config.metadata_table(), metadata.as_ref()) {
            debug!(path = %path, rows = table.len(), "writing metadata table");
            table.write_to_path(path)?;
        }

        Ok(RunReport {
            candidates: candidates.len(),
            jobs: jobs.len(),
            done,
            failed,
            ..RunReport::new(Outcome::Success)
        })
    }

    fn build_jobs(
        &self,
        candidates: &[Candidate],
        config: &NgdConfig,
        metadata: Option<&MetadataTable>,
        cancel: &Cancellation,
    ) -> Result<Vec<DownloadJob>, NgdError> {
        let build = |candidate: &Candidate| {
            if cancel.is_cancelled() {
                return Err(NgdError::Interrupted);
            }
            create_downloadjob(
                &candidate.entry,
                &candidate.group,
                config,
                &self.client,
                metadata,
            )
        };

        let per_entry = if config.parallel() <= 1 {
            candidates.iter().map(build).collect::<Result<Vec<_>, _>>()?
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.parallel())
                .build()
                .map_err(|err| NgdError::WorkerPool(err.to_string()))?;
            pool.install(|| {
                candidates
                    .par_iter()
                    .map(build)
                    .collect::<Result<Vec<_>, _>>()
            })?
        };

        Ok(per_entry.into_iter().flatten().collect())
    }
}

fn dry_run_entry(candidate: &Candidate) -> DryRunEntry {
    let entry = &candidate.entry;
    DryRunEntry {
        accession: entry.accession().to_string(),
        organism_name: entry.organism_name().to_string(),
        strain: get_strain_label(entry, candidate.group == VIRAL_GROUP),
        group: candidate.group.clone(),
    }
}
