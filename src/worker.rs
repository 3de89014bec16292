use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::client::ArchiveClient;
use crate::error::NgdError;
use crate::fs_util;
use crate::jobs::DownloadJob;

#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Done,
    Failed,
    Interrupted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub done: usize,
    pub failed: usize,
}

// Only connection errors are returned, everything else is logged as `Failed`.
pub fn worker(
    job: &DownloadJob,
    client: &dyn ArchiveClient,
    cancel: &Cancellation,
    decompress: bool,
) -> Result<JobOutcome, NgdError> {
    match run_job(job, client, cancel, decompress) {
        Ok(outcome) => Ok(outcome),
        Err(NgdError::Interrupted) => {
            debug!(file = %job.local_file, "download interrupted");
            Ok(JobOutcome::Interrupted)
        }
        Err(err) if err.is_connection() => Err(err),
        Err(err) => {
            error!(file = %job.local_file, "{err}");
            Ok(JobOutcome::Failed)
        }
    }
}

fn run_job(
    job: &DownloadJob,
    client: &dyn ArchiveClient,
    cancel: &Cancellation,
    decompress: bool,
) -> Result<JobOutcome, NgdError> {
    if cancel.is_cancelled() {
        return Err(NgdError::Interrupted);
    }

    if let Some(url) = &job.full_url {
        info!(url, "downloading");
        client.download(url, job.local_file.as_std_path(), cancel)?;

        let actual = fs_util::md5sum(&job.local_file)?;
        if let Some(expected) = &job.expected_checksum
            && &actual != expected
        {
            error!(
                file = %job.local_file,
                expected,
                actual,
                "checksum mismatch"
            );
            return Ok(JobOutcome::Failed);
        }

        if decompress && job.local_file.as_str().ends_with(".gz") {
            let inflated = fs_util::gunzip(&job.local_file)?;
            debug!(file = %inflated, "decompressed");
        }
    }

    if let Some(symlink) = &job.symlink_path {
        fs_util::create_symlink(&job.local_file, symlink)?;
    }

    Ok(JobOutcome::Done)
}

pub fn run_jobs(
    jobs: &[DownloadJob],
    parallel: usize,
    client: &dyn ArchiveClient,
    cancel: &Cancellation,
    decompress: bool,
) -> Result<RunSummary, NgdError> {
    let outcomes = if parallel <= 1 {
        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in jobs {
            let outcome = worker(job, client, cancel, decompress)?;
            if outcome == JobOutcome::Interrupted {
                return Err(NgdError::Interrupted);
            }
            outcomes.push(outcome);
        }
        outcomes
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallel)
            .build()
            .map_err(|err| NgdError::WorkerPool(err.to_string()))?;
        let outcomes = pool.install(|| {
            jobs.par_iter()
                .map(|job| worker(job, client, cancel, decompress))
                .collect::<Result<Vec<_>, _>>()
        })?;
        if cancel.is_cancelled() {
            return Err(NgdError::Interrupted);
        }
        outcomes
    };

    let summary = RunSummary {
        done: outcomes
            .iter()
            .filter(|outcome| **outcome == JobOutcome::Done)
            .count(),
        failed: outcomes
            .iter()
            .filter(|outcome| **outcome != JobOutcome::Done)
            .count(),
    };
    if summary.failed > 0 {
        warn!(failed = summary.failed, total = jobs.len(), "some downloads failed");
    }
    Ok(summary)
}
