//! Verification jobs and verdicts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict of an evaluation, comparison or hallucination check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "CORRECT")]
    Correct,
    #[serde(rename = "HALLUCINATED")]
    Hallucinated,
    #[serde(rename = "PASSED")]
    Passed,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "NO_EVALUATION")]
    NoEvaluation,
    #[serde(rename = "ANSWER_1")]
    Answer1,
    #[serde(rename = "ANSWER_2")]
    Answer2,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Correct => "CORRECT",
            Classification::Hallucinated => "HALLUCINATED",
            Classification::Passed => "PASSED",
            Classification::Failed => "FAILED",
            Classification::Error => "ERROR",
            Classification::NoEvaluation => "NO_EVALUATION",
            Classification::Answer1 => "ANSWER_1",
            Classification::Answer2 => "ANSWER_2",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed verdict plus what produced it
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    pub classification: Classification,
    pub rationale: String,
    pub latency_ms: u64,
    /// Rendered prompt, flattened
    pub prompt: String,
    pub raw_response: serde_json::Value,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

/// Hallucination flag derived from a detection verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HallucinationFlag {
    True,
    False,
    Undetermined,
}

impl From<Classification> for HallucinationFlag {
    fn from(classification: Classification) -> Self {
        match classification {
            Classification::Hallucinated => HallucinationFlag::True,
            Classification::Correct => HallucinationFlag::False,
            _ => HallucinationFlag::Undetermined,
        }
    }
}

/// Answered turn queued for offline verification
///
/// Missing fields decode as empty so partially written jobs still run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationJob {
    /// Dialog event that produced the answer
    pub event: serde_json::Value,
    pub question: String,
    pub answer: String,
    /// Evidence the answer was generated from
    pub context: String,
}

impl VerificationJob {
    pub fn new(
        event: serde_json::Value,
        question: impl Into<String>,
        answer: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            event,
            question: question.into(),
            answer: answer.into(),
            context: context.into(),
        }
    }
}
