//! Verification queue backends
//!
//! - `http`: POST each job as JSON to a queue endpoint
//! - `local`: bounded in-process channel drained by a background worker.
//!   Best effort only: a job that fails twice is logged and dropped, and
//!   queued jobs are lost on shutdown. Use `http` for at-least-once delivery.
//! - `disabled`: nothing is queued

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use concierge_agent::{AgentError, VerificationOutcome, VerificationProcessor};
use concierge_config::{QueueConfig, QueueKind};
use concierge_core::{Error, Result, VerificationJob, VerificationQueue};

use crate::ServerError;

const HTTP_QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Queue reached over HTTP
pub struct HttpQueue {
    client: reqwest::Client,
    url: String,
}

impl HttpQueue {
    pub fn new(url: impl Into<String>) -> std::result::Result<Self, ServerError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_QUEUE_TIMEOUT)
            .build()
            .map_err(|e| ServerError::Configuration(format!("queue client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl VerificationQueue for HttpQueue {
    async fn enqueue(&self, job: &VerificationJob) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(job)
            .send()
            .await
            .map_err(|e| Error::Queue(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Queue(format!("HTTP {}", status)));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// In-process queue feeding a verification worker
pub struct LocalQueue {
    sender: mpsc::Sender<VerificationJob>,
}

impl LocalQueue {
    /// Create the queue and start its worker
    pub fn spawn(processor: Arc<VerificationProcessor>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<VerificationJob>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                if let Err(e) = process_with_retry(&processor, &job).await {
                    tracing::error!(question = %job.question, error = %e, "Local verification failed, job dropped");
                }
            }
            tracing::debug!("Verification worker stopped");
        });

        (Self { sender }, worker)
    }
}

/// Process a job, retrying once on failure
async fn process_with_retry(
    processor: &VerificationProcessor,
    job: &VerificationJob,
) -> std::result::Result<VerificationOutcome, AgentError> {
    match processor.process_job(job).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            tracing::warn!(question = %job.question, error = %e, "Local verification failed, retrying");
            processor.process_job(job).await
        }
    }
}

#[async_trait]
impl VerificationQueue for LocalQueue {
    async fn enqueue(&self, job: &VerificationJob) -> Result<()> {
        self.sender
            .try_send(job.clone())
            .map_err(|e| Error::Queue(e.to_string()))
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Build the configured queue
///
/// The local kind needs a processor to drain it; without one nothing is
/// queued.
pub fn build_queue(
    config: &QueueConfig,
    processor: Option<Arc<VerificationProcessor>>,
) -> std::result::Result<Option<Arc<dyn VerificationQueue>>, ServerError> {
    match config.kind {
        QueueKind::Disabled => {
            tracing::info!("Verification queue disabled");
            Ok(None)
        }
        QueueKind::Http => {
            let url = config
                .url
                .as_deref()
                .filter(|u| !u.is_empty())
                .ok_or_else(|| ServerError::Configuration("http queue requires a url".to_string()))?;
            tracing::info!(url = %url, "Using HTTP verification queue");
            Ok(Some(Arc::new(HttpQueue::new(url)?)))
        }
        QueueKind::Local => match processor {
            Some(processor) => {
                let (queue, _worker) = LocalQueue::spawn(processor, config.capacity);
                tracing::info!(capacity = config.capacity, "Using local verification queue");
                Ok(Some(Arc::new(queue)))
            }
            None => {
                tracing::warn!("No verification model, local queue disabled");
                Ok(None)
            }
        },
    }
}
