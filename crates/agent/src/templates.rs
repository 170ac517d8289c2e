//! Prompt template tables
//!
//! Each model family gets one table mapping every template kind to its text.
//! Tables are selected by the model descriptor's template set.

use concierge_config::TemplateSet;

/// Kinds of template in a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Answer,
    AnswerNoContext,
    GuardrailsOn,
    GuardrailsOff,
    Evaluation,
    Comparison,
    Detection,
}

/// Template text per kind, plus how the family wants its output handled
#[derive(Debug, Clone)]
pub struct TemplateTable {
    pub answer: String,
    pub answer_no_context: String,
    pub guardrails_on: String,
    pub guardrails_off: String,
    pub evaluation: String,
    pub comparison: String,
    pub detection: String,
    /// Templates carry `System:`/`Human:`/`Assistant:` marker lines
    pub role_tagged: bool,
    /// Upper-case the first character of generated answers
    pub capitalize_response: bool,
}

macro_rules! template_file {
    ($set:literal, $kind:literal) => {
        trim_final_newline(include_str!(concat!(
            "../templates/",
            $set,
            "/",
            $kind,
            ".txt"
        )))
    };
}

fn trim_final_newline(text: &str) -> String {
    text.strip_suffix('\n').unwrap_or(text).to_string()
}

impl TemplateTable {
    pub fn for_set(set: TemplateSet) -> Self {
        match set {
            TemplateSet::Standard => Self::standard(),
            TemplateSet::RoleTagged => Self::role_tagged(),
            TemplateSet::Titan => Self::titan(),
        }
    }

    /// Instruction-tagged templates for most instruction-tuned models
    pub fn standard() -> Self {
        Self {
            answer: template_file!("standard", "answer"),
            answer_no_context: template_file!("standard", "answer_no_context"),
            guardrails_on: template_file!("standard", "guardrails_on"),
            guardrails_off: template_file!("standard", "guardrails_off"),
            evaluation: template_file!("standard", "evaluation"),
            comparison: template_file!("standard", "comparison"),
            detection: template_file!("standard", "detection"),
            role_tagged: false,
            capitalize_response: false,
        }
    }

    /// Role-tagged templates with a randomized instruction tag
    pub fn role_tagged() -> Self {
        Self {
            answer: template_file!("role_tagged", "answer"),
            answer_no_context: template_file!("role_tagged", "answer_no_context"),
            guardrails_on: template_file!("role_tagged", "guardrails_on"),
            guardrails_off: template_file!("role_tagged", "guardrails_off"),
            evaluation: template_file!("role_tagged", "evaluation"),
            comparison: template_file!("role_tagged", "comparison"),
            detection: template_file!("role_tagged", "detection"),
            role_tagged: true,
            capitalize_response: true,
        }
    }

    /// Single-block templates
    pub fn titan() -> Self {
        Self {
            answer: template_file!("titan", "answer"),
            answer_no_context: template_file!("titan", "answer_no_context"),
            guardrails_on: template_file!("titan", "guardrails_on"),
            guardrails_off: template_file!("titan", "guardrails_off"),
            evaluation: template_file!("titan", "evaluation"),
            comparison: template_file!("titan", "comparison"),
            detection: template_file!("titan", "detection"),
            role_tagged: false,
            capitalize_response: false,
        }
    }

    pub fn get(&self, kind: TemplateKind) -> &str {
        match kind {
            TemplateKind::Answer => &self.answer,
            TemplateKind::AnswerNoContext => &self.answer_no_context,
            TemplateKind::GuardrailsOn => &self.guardrails_on,
            TemplateKind::GuardrailsOff => &self.guardrails_off,
            TemplateKind::Evaluation => &self.evaluation,
            TemplateKind::Comparison => &self.comparison,
            TemplateKind::Detection => &self.detection,
        }
    }

    /// Replace one template, e.g. from an operator override
    pub fn with_template(mut self, kind: TemplateKind, text: impl Into<String>) -> Self {
        let slot = match kind {
            TemplateKind::Answer => &mut self.answer,
            TemplateKind::AnswerNoContext => &mut self.answer_no_context,
            TemplateKind::GuardrailsOn => &mut self.guardrails_on,
            TemplateKind::GuardrailsOff => &mut self.guardrails_off,
            TemplateKind::Evaluation => &mut self.evaluation,
            TemplateKind::Comparison => &mut self.comparison,
            TemplateKind::Detection => &mut self.detection,
        };
        *slot = text.into();
        self
    }
}
