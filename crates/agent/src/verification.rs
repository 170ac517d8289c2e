//! Offline hallucination verification
//!
//! Consumes batches of queued turns. Each record is checked independently;
//! records that cannot be decoded or checked are reported back so the queue
//! can redeliver them.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use concierge_core::{HallucinationFlag, VerificationJob};

use crate::agent::ConversationalAgent;
use crate::AgentError;

/// Batch of queue records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(rename = "Records", default)]
    pub records: Vec<QueueRecord>,
}

/// One delivered message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRecord {
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(default)]
    pub body: String,
}

/// Records that failed and should be redelivered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(rename = "batchItemFailures")]
    pub batch_item_failures: Vec<BatchItemFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemFailure {
    #[serde(rename = "itemIdentifier")]
    pub item_identifier: String,
}

/// Verdict for one verified turn
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    pub question: String,
    pub answer: String,
    pub context: String,
    pub rationale: String,
    pub latency_ms: u64,
    pub hallucination: HallucinationFlag,
}

/// Runs hallucination detection over queued turns
pub struct VerificationProcessor {
    agent: Arc<ConversationalAgent>,
    concurrency: usize,
}

impl VerificationProcessor {
    pub fn new(agent: Arc<ConversationalAgent>, concurrency: usize) -> Self {
        Self {
            agent,
            concurrency: concurrency.max(1),
        }
    }

    /// Check every record, returning the ids of those that failed
    pub async fn process_batch(&self, records: Vec<QueueRecord>) -> BatchResponse {
        let total = records.len();
        let results: Vec<(usize, String, Result<VerificationOutcome, AgentError>)> =
            stream::iter(records.into_iter().enumerate())
                .map(|(index, record)| async move {
                    let result = self.process_record(&record).await;
                    (index, record.message_id, result)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut failures: Vec<(usize, String)> = results
            .into_iter()
            .filter_map(|(index, message_id, result)| match result {
                Ok(_) => None,
                Err(e) => {
                    tracing::error!(message_id = %message_id, error = %e, "Verification failed");
                    Some((index, message_id))
                }
            })
            .collect();
        failures.sort_by_key(|(index, _)| *index);

        tracing::info!(records = total, failures = failures.len(), "Verification batch processed");

        BatchResponse {
            batch_item_failures: failures
                .into_iter()
                .map(|(_, item_identifier)| BatchItemFailure { item_identifier })
                .collect(),
        }
    }

    /// Decode and check one record
    pub async fn process_record(&self, record: &QueueRecord) -> Result<VerificationOutcome, AgentError> {
        let job: VerificationJob = serde_json::from_str(&record.body)
            .map_err(|e| AgentError::InvalidJob(e.to_string()))?;
        self.process_job(&job).await
    }

    /// Check one job
    pub async fn process_job(&self, job: &VerificationJob) -> Result<VerificationOutcome, AgentError> {
        let result = self
            .agent
            .detect_hallucination(&job.question, &job.answer, &job.context)
            .await?;

        let hallucination = HallucinationFlag::from(result.classification);
        metrics::counter!(
            "concierge_verification_results_total",
            "classification" => result.classification.as_str()
        )
        .increment(1);

        let outcome = VerificationOutcome {
            question: job.question.clone(),
            answer: job.answer.clone(),
            context: job.context.clone(),
            rationale: result.rationale,
            latency_ms: result.latency_ms,
            hallucination,
        };

        match hallucination {
            HallucinationFlag::False => {
                tracing::info!(question = %outcome.question, "No hallucination detected")
            }
            HallucinationFlag::True => tracing::warn!(
                question = %outcome.question,
                answer = %outcome.answer,
                rationale = %outcome.rationale,
                "Hallucination detected"
            ),
            HallucinationFlag::Undetermined => tracing::error!(
                question = %outcome.question,
                rationale = %outcome.rationale,
                "Hallucination check undetermined"
            ),
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_wire_format() {
        let request: BatchRequest = serde_json::from_str(
            r#"{"Records":[{"messageId":"m-1","body":"{}","attributes":{}}]}"#,
        )
        .unwrap();
        assert_eq!(request.records.len(), 1);
        assert_eq!(request.records[0].message_id, "m-1");

        let response = BatchResponse {
            batch_item_failures: vec![BatchItemFailure {
                item_identifier: "m-1".to_string(),
            }],
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"batchItemFailures":[{"itemIdentifier":"m-1"}]}"#
        );
    }

    #[test]
    fn test_missing_job_fields_decode_empty() {
        let job: VerificationJob = serde_json::from_str(r#"{"question":"q"}"#).unwrap();
        assert_eq!(job.question, "q");
        assert!(job.answer.is_empty());
        assert!(job.context.is_empty());
    }
}
