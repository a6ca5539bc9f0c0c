//! `RepositoryConnector` (component H, spec.md §4.H): drives a batch of
//! artifact/metadata transfers against one repository through a
//! [`Transporter`], bounding concurrency, retrying transient failures,
//! and enforcing checksum policy on every downloaded file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use depot_core::repository::{ChecksumPolicyKind, RemoteRepository};
use depot_util::errors::DepotError;
use depot_util::hash::Algorithm;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::checksum::{self, ChecksumOutcome, ChecksumSource};
use crate::transporter::{GetResponse, RangeRequest, TransportRequest, Transporter};

/// One download to perform: a repository-relative source path, the
/// destination on disk, and whatever checksums are already known for it
/// (e.g. supplied by a lockfile) before the remote is even contacted.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub remote_path: String,
    pub destination: PathBuf,
    pub provided_checksums: Vec<(Algorithm, String)>,
    pub checksum_policy: ChecksumPolicyKind,
}

/// One upload to perform (component O "deploy").
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub remote_path: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub remote_path: String,
    pub result: Result<(), String>,
}

/// How many times to retry a transfer that failed with a transient
/// transfer error (not a not-found, which never succeeds on retry).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff delay before attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

pub struct RepositoryConnector {
    transporter: Arc<dyn Transporter>,
    max_concurrency: usize,
    retry_policy: RetryPolicy,
}

impl RepositoryConnector {
    pub fn new(transporter: Arc<dyn Transporter>, max_concurrency: usize) -> Self {
        Self {
            transporter,
            max_concurrency: max_concurrency.max(1),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Fetch every task in `tasks` against `repository`, bounded to
    /// `max_concurrency` concurrent transfers (spec.md §4.H "parallel
    /// batched transfers").
    pub async fn get_batch(
        &self,
        repository: Arc<RemoteRepository>,
        tasks: Vec<DownloadTask>,
    ) -> Vec<TransferOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut joinset: JoinSet<TransferOutcome> = JoinSet::new();

        for task in tasks {
            let semaphore = Arc::clone(&semaphore);
            let transporter = Arc::clone(&self.transporter);
            let repository = Arc::clone(&repository);
            let retry_policy = self.retry_policy;

            joinset.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let remote_path = task.remote_path.clone();
                let result = fetch_with_retry(transporter.as_ref(), &repository, &task, retry_policy).await;
                TransferOutcome {
                    remote_path,
                    result: result.map_err(|e| e.to_string()),
                }
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = joinset.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => outcomes.push(TransferOutcome {
                    remote_path: "<unknown>".to_string(),
                    result: Err(format!("task panicked: {e}")),
                }),
            }
        }
        outcomes
    }

    pub async fn put_batch(
        &self,
        repository: Arc<RemoteRepository>,
        tasks: Vec<UploadTask>,
    ) -> Vec<TransferOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut joinset: JoinSet<TransferOutcome> = JoinSet::new();

        for task in tasks {
            let semaphore = Arc::clone(&semaphore);
            let transporter = Arc::clone(&self.transporter);
            let repository = Arc::clone(&repository);

            joinset.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let remote_path = task.remote_path.clone();
                let request = TransportRequest {
                    path: task.remote_path.clone(),
                };
                let result = transporter.put(&repository, &request, &task.data).await;
                TransferOutcome {
                    remote_path,
                    result: result.map_err(|e| e.to_string()),
                }
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = joinset.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => outcomes.push(TransferOutcome {
                    remote_path: "<unknown>".to_string(),
                    result: Err(format!("task panicked: {e}")),
                }),
            }
        }
        outcomes
    }
}

async fn fetch_with_retry(
    transporter: &dyn Transporter,
    repository: &RemoteRepository,
    task: &DownloadTask,
    retry_policy: RetryPolicy,
) -> miette::Result<()> {
    let mut last_err = None;
    for attempt in 1..=retry_policy.max_attempts {
        match fetch_one(transporter, repository, task).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                let is_not_found = e.downcast_ref::<DepotError>().map(|e| e.is_not_found()).unwrap_or(false);
                if is_not_found {
                    return Err(e);
                }
                warn!(path = %task.remote_path, attempt, "transfer failed, will retry");
                last_err = Some(e);
                if attempt < retry_policy.max_attempts {
                    tokio::time::sleep(retry_policy.delay_for(attempt)).await;
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        DepotError::Transfer {
            message: format!("exhausted retries for {}", task.remote_path),
        }
        .into()
    }))
}

async fn fetch_one(
    transporter: &dyn Transporter,
    repository: &RemoteRepository,
    task: &DownloadTask,
) -> miette::Result<()> {
    let request = TransportRequest {
        path: task.remote_path.clone(),
    };
    let response = transporter.get(repository, &request).await?;

    verify_and_write(task, &response)?;
    info!(path = %task.remote_path, bytes = response.data.len(), "downloaded");
    Ok(())
}

fn verify_and_write(task: &DownloadTask, response: &GetResponse) -> miette::Result<()> {
    let digests: Vec<(Algorithm, String)> = Algorithm::default_order()
        .iter()
        .map(|algo| (*algo, algo.digest_hex(&response.data)))
        .collect();

    let provided = &task.provided_checksums;
    let outcome = checksum::validate(&digests, |algo| {
        provided
            .iter()
            .find(|(a, _)| *a == algo)
            .map(|(_, v)| ChecksumSource::Provided(v.clone()))
    });

    if matches!(outcome, ChecksumOutcome::NoChecksumAvailable) && checksum::should_warn(task.checksum_policy, &outcome)
    {
        warn!(path = %task.remote_path, "no checksum available to verify download");
    }
    if let ChecksumOutcome::Mismatch { .. } = &outcome {
        if checksum::should_warn(task.checksum_policy, &outcome) {
            warn!(path = %task.remote_path, "checksum mismatch, continuing per policy");
        }
    }
    checksum::apply_policy(task.checksum_policy, &outcome)?;

    depot_util::fs::write_atomic_checked(&task.destination, &response.data)?;
    Ok(())
}

/// Resume a partially-downloaded file at `task.destination`, falling
/// back to a clean restart if the remote does not honor the range or the
/// partial file's length looks wrong (spec.md §4.H "resumable
/// downloads").
pub async fn resume_download(
    transporter: &dyn Transporter,
    repository: &RemoteRepository,
    task: &DownloadTask,
) -> miette::Result<()> {
    let existing_len = std::fs::metadata(&task.destination).map(|m| m.len()).unwrap_or(0);
    let request = TransportRequest {
        path: task.remote_path.clone(),
    };
    let response = transporter
        .get_resumable(repository, &request, RangeRequest { resume_from: existing_len })
        .await?;

    let mut full_data = if existing_len > 0 && response.content_length.unwrap_or(0) > 0 {
        std::fs::read(&task.destination).unwrap_or_default()
    } else {
        Vec::new()
    };
    full_data.extend_from_slice(&response.data);

    let merged = GetResponse {
        data: full_data,
        content_length: response.content_length,
    };
    verify_and_write(task, &merged)
}
