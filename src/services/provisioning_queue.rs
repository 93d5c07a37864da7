use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::services::provisioner::{ProvisionReport, ProvisionRequest, TenantProvisioner};

const QUEUE_CAPACITY: usize = 64;
const FINISHED_JOB_RETENTION_MINUTES: i64 = 60;
const MAX_FINISHED_JOBS: usize = 256;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Provisioning queue is not accepting jobs")]
    Closed,

    #[error("Provisioning queue is full")]
    Full,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Finished { report: Box<ProvisionReport> },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningJob {
    pub id: Uuid,
    pub subdomain: String,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: JobState,
}

impl ProvisioningJob {
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Finished { .. } | JobState::Failed { .. })
    }
}

struct QueuedRequest {
    id: Uuid,
    request: ProvisionRequest,
}

type JobTable = Arc<RwLock<HashMap<Uuid, ProvisioningJob>>>;

/// Background provisioning for tenants that must wait on DNS or TLS before
/// they become reachable. One worker drains the channel in submission order.
pub struct ProvisioningQueue {
    sender: mpsc::Sender<QueuedRequest>,
    jobs: JobTable,
    retention: Duration,
    max_finished: usize,
}

impl ProvisioningQueue {
    /// Spawn the worker on the current runtime
    pub fn start(provisioner: Arc<TenantProvisioner>) -> Arc<Self> {
        Self::with_retention(
            provisioner,
            Duration::minutes(FINISHED_JOB_RETENTION_MINUTES),
            MAX_FINISHED_JOBS,
        )
    }

    /// Finished and failed jobs stay queryable for `retention`, and at most
    /// `max_finished` of them are kept. Queued and running jobs are never dropped.
    pub fn with_retention(provisioner: Arc<TenantProvisioner>, retention: Duration, max_finished: usize) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let jobs: JobTable = Arc::new(RwLock::new(HashMap::new()));

        tokio::spawn(run_worker(provisioner, receiver, jobs.clone()));
        Arc::new(Self {
            sender,
            jobs,
            retention,
            max_finished,
        })
    }

    pub async fn enqueue(&self, request: ProvisionRequest) -> Result<Uuid, QueueError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let job = ProvisioningJob {
            id,
            subdomain: request.subdomain.clone(),
            submitted_at: now,
            updated_at: now,
            state: JobState::Queued,
        };
        // Visible before the worker can pick it up
        {
            let mut jobs = self.jobs.write().await;
            prune_finished(&mut jobs, now, self.retention, self.max_finished);
            jobs.insert(id, job);
        }

        if let Err(e) = self.sender.try_send(QueuedRequest { id, request }) {
            self.jobs.write().await.remove(&id);
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => QueueError::Full,
                mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
            });
        }

        info!(job_id = %id, "Provisioning job queued");
        Ok(id)
    }

    pub async fn status(&self, id: Uuid) -> Option<ProvisioningJob> {
        self.jobs.read().await.get(&id).cloned()
    }
}

async fn run_worker(
    provisioner: Arc<TenantProvisioner>,
    mut receiver: mpsc::Receiver<QueuedRequest>,
    jobs: JobTable,
) {
    while let Some(QueuedRequest { id, request }) = receiver.recv().await {
        set_state(&jobs, id, JobState::Running).await;

        let state = match provisioner.provision(request).await {
            Ok(report) => {
                if !report.is_complete() {
                    warn!(job_id = %id, failed = ?report.failed_steps(), "Queued provisioning incomplete");
                }
                JobState::Finished { report: Box::new(report) }
            }
            Err(e) => {
                error!(job_id = %id, error = %e, "Queued provisioning rejected");
                JobState::Failed { error: e.to_string() }
            }
        };
        set_state(&jobs, id, state).await;
    }
    info!("Provisioning worker stopped");
}

fn prune_finished(jobs: &mut HashMap<Uuid, ProvisioningJob>, now: DateTime<Utc>, retention: Duration, max_finished: usize) {
    let before = jobs.len();
    jobs.retain(|_, job| !job.is_terminal() || now - job.updated_at < retention);

    let mut finished: Vec<(DateTime<Utc>, Uuid)> = jobs
        .values()
        .filter(|job| job.is_terminal())
        .map(|job| (job.updated_at, job.id))
        .collect();
    if finished.len() > max_finished {
        finished.sort_unstable();
        for (_, id) in &finished[..finished.len() - max_finished] {
            jobs.remove(id);
        }
    }

    let pruned = before - jobs.len();
    if pruned > 0 {
        debug!(pruned, "Pruned finished provisioning jobs");
    }
}

async fn set_state(jobs: &JobTable, id: Uuid, state: JobState) {
    if let Some(job) = jobs.write().await.get_mut(&id) {
        job.state = state;
        job.updated_at = Utc::now();
    }
}
