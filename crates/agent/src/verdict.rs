//! Verdict parsing for evaluation, comparison and detection output
//!
//! The model is asked to answer on two lines: a verdict line, then the
//! rationale. The verdict line is matched against an ordered list of
//! keywords; the first hit wins.

use concierge_core::Classification;

pub const MISSING_NEWLINE: &str = "missing newline in result";
pub const UNSUPPORTED_RESULT: &str = "unsupported result";

const EVALUATION_RULES: [(&str, Classification); 2] = [
    ("yes", Classification::Passed),
    ("no", Classification::Failed),
];

const COMPARISON_RULES: [(&str, Classification); 3] = [
    ("1", Classification::Answer1),
    ("2", Classification::Answer2),
    ("0", Classification::NoEvaluation),
];

const DETECTION_RULES: [(&str, Classification); 2] = [
    ("hallucinated", Classification::Hallucinated),
    ("correct", Classification::Correct),
];

/// Parsed verdict and rationale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub classification: Classification,
    pub rationale: String,
}

impl Verdict {
    fn error(rationale: &str) -> Self {
        Self {
            classification: Classification::Error,
            rationale: rationale.to_string(),
        }
    }
}

/// `yes` passes, `no` fails
pub fn parse_evaluation(prediction: &str) -> Verdict {
    parse_verdict(prediction, &EVALUATION_RULES)
}

/// `1`, `2`, then `0`
pub fn parse_comparison(prediction: &str) -> Verdict {
    parse_verdict(prediction, &COMPARISON_RULES)
}

/// `hallucinated`, then `correct`
pub fn parse_detection(prediction: &str) -> Verdict {
    parse_verdict(prediction, &DETECTION_RULES)
}

fn parse_verdict(prediction: &str, rules: &[(&str, Classification)]) -> Verdict {
    let prediction = prediction.trim();
    let Some((first, rest)) = prediction.split_once('\n') else {
        return Verdict::error(MISSING_NEWLINE);
    };

    let verdict = first.trim().to_lowercase();
    let rationale = rest.split('\n').collect::<Vec<_>>().join(" ").trim().to_string();

    match rules.iter().find(|(keyword, _)| verdict.contains(keyword)) {
        Some((_, classification)) => Verdict {
            classification: *classification,
            rationale,
        },
        None => Verdict::error(UNSUPPORTED_RESULT),
    }
}
