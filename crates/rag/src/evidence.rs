//! Evidence assembly

use concierge_core::Evidence;

/// One ranked result as returned by the knowledge base
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPassage {
    pub text: Option<String>,
    pub score: Option<f32>,
}

impl ScoredPassage {
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: Some(text.into()),
            score: Some(score),
        }
    }
}

/// Concatenate accepted passages in ranked order
///
/// A passage is accepted when it has text and a score at or above
/// `min_score`. Each accepted text is followed by a newline. Returns the
/// evidence and the number of accepted passages.
pub fn assemble_evidence(passages: &[ScoredPassage], min_score: f32) -> (Evidence, usize) {
    let mut text = String::new();
    let mut accepted = 0;

    for passage in passages {
        let (Some(passage_text), Some(score)) = (&passage.text, passage.score) else {
            continue;
        };
        if score >= min_score {
            text.push_str(passage_text);
            text.push('\n');
            accepted += 1;
        }
    }

    if accepted == 0 {
        (Evidence::None, 0)
    } else {
        (Evidence::Passages(text), accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::NO_INFORMATION;

    fn passages() -> Vec<ScoredPassage> {
        vec![
            ScoredPassage::new("The pool is open from 7am to 10pm.", 0.82),
            ScoredPassage::new("Towels are provided poolside.", 0.40),
            ScoredPassage::new("The spa offers massages.", 0.39),
            ScoredPassage {
                text: None,
                score: Some(0.99),
            },
            ScoredPassage {
                text: Some("Unscored passage.".to_string()),
                score: None,
            },
        ]
    }

    #[test]
    fn test_only_passages_at_or_above_threshold() {
        let (evidence, accepted) = assemble_evidence(&passages(), 0.40);
        assert_eq!(accepted, 2);
        assert_eq!(
            evidence,
            Evidence::Passages(
                "The pool is open from 7am to 10pm.\nTowels are provided poolside.\n".to_string()
            )
        );
    }

    #[test]
    fn test_threshold_above_one_yields_sentinel() {
        let (evidence, accepted) = assemble_evidence(&passages(), 1.01);
        assert_eq!(accepted, 0);
        assert_eq!(evidence.prompt_text(), NO_INFORMATION);
    }

    #[test]
    fn test_no_results_yields_sentinel() {
        let (evidence, _) = assemble_evidence(&[], 0.0);
        assert!(evidence.is_empty());
    }
}
