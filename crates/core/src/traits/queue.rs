//! Verification queue trait

use crate::{Result, VerificationJob};
use async_trait::async_trait;

/// Sink for answered turns awaiting offline verification
#[async_trait]
pub trait VerificationQueue: Send + Sync + 'static {
    /// Hand one job to the queue
    async fn enqueue(&self, job: &VerificationJob) -> Result<()>;

    /// Queue name for logging
    fn name(&self) -> &str;
}
