//! Prompt rendering
//!
//! Templates are rendered by literal token substitution. Trusted template
//! parts (the guardrail block and the instruction tag) are expanded first;
//! caller-supplied values are inserted in a single pass so a value can never
//! introduce a placeholder of its own.
//!
//! Role-tagged templates are split on their marker lines before any value is
//! inserted, so evidence containing `Human:` or `Assistant:` cannot move a
//! role boundary.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rand::Rng;

use concierge_config::{DelimiterConfig, DelimiterKind};
use concierge_core::{PromptInput, PromptSegment, Role};

use crate::templates::{TemplateKind, TemplateTable};

/// Placeholder tokens understood by the templates
pub mod placeholders {
    pub const CURRENT_DATE: &str = "{current_date}";
    pub const CONTEXT: &str = "{context}";
    pub const GUARDRAILS: &str = "{guardrails}";
    pub const USER_QUESTION: &str = "{user_question}";
    pub const QUESTION: &str = "{question}";
    pub const GROUND_TRUTH: &str = "{ground_truth}";
    pub const ANSWER: &str = "{answer}";
    pub const ANSWER_1: &str = "{answer_1}";
    pub const ANSWER_2: &str = "{answer_2}";
    pub const DOCUMENT: &str = "{document}";
    pub const RANDOMIZED: &str = "{randomized}";
}

/// Date format used for `{current_date}`, e.g. "October 19, 2026"
pub const DATE_FORMAT: &str = "%B %-d, %Y";

/// Replace known tokens in a single left-to-right pass
///
/// Tokens without a value stay in the output. Inserted values are never
/// scanned again.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match values.iter().find(|(token, _)| tail.starts_with(token)) {
            Some((token, value)) => {
                out.push_str(value);
                rest = &tail[token.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Source of the instruction tag name, one per render
pub trait DelimiterStrategy: Send + Sync {
    fn next_tag(&self) -> String;
}

/// Plain `instructions` tag
#[derive(Debug, Clone, Default)]
pub struct PlainDelimiter;

impl DelimiterStrategy for PlainDelimiter {
    fn next_tag(&self) -> String {
        "instructions".to_string()
    }
}

/// `{prefix}{n}` with `n` drawn uniformly from `min..=max`
#[derive(Debug, Clone)]
pub struct RandomNumericDelimiter {
    prefix: String,
    min: u32,
    max: u32,
}

impl RandomNumericDelimiter {
    pub fn new(prefix: impl Into<String>, min: u32, max: u32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            prefix: prefix.into(),
            min,
            max,
        }
    }
}

impl DelimiterStrategy for RandomNumericDelimiter {
    fn next_tag(&self) -> String {
        let n = rand::thread_rng().gen_range(self.min..=self.max);
        format!("{}{}", self.prefix, n)
    }
}

/// Unpredictable tag built from a v4 UUID
#[derive(Debug, Clone, Default)]
pub struct UuidDelimiter;

impl DelimiterStrategy for UuidDelimiter {
    fn next_tag(&self) -> String {
        format!("tag{}", uuid::Uuid::new_v4().simple())
    }
}

/// Build the configured delimiter strategy
pub fn delimiter_from_config(config: &DelimiterConfig) -> Arc<dyn DelimiterStrategy> {
    match config.strategy {
        DelimiterKind::None => Arc::new(PlainDelimiter),
        DelimiterKind::RandomNumeric => Arc::new(RandomNumericDelimiter::new(
            config.prefix.clone(),
            config.min,
            config.max,
        )),
        DelimiterKind::Uuid => Arc::new(UuidDelimiter),
    }
}

/// Renders templates from a table into model prompts
#[derive(Clone)]
pub struct PromptBuilder {
    delimiter: Arc<dyn DelimiterStrategy>,
    /// Fixed date, used instead of today when set
    date: Option<NaiveDate>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(delimiter_from_config(&DelimiterConfig::default()))
    }
}

impl PromptBuilder {
    pub fn new(delimiter: Arc<dyn DelimiterStrategy>) -> Self {
        Self {
            delimiter,
            date: None,
        }
    }

    /// Pin `{current_date}` to a fixed day
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn current_date(&self) -> String {
        self.date
            .unwrap_or_else(|| Local::now().date_naive())
            .format(DATE_FORMAT)
            .to_string()
    }

    /// Render one template of a table
    ///
    /// `guardrails` picks the on or off block for `{guardrails}`. Role-tagged
    /// tables produce a segmented prompt; all others a flat one.
    pub fn build(
        &self,
        table: &TemplateTable,
        kind: TemplateKind,
        guardrails: bool,
        values: &[(&str, &str)],
    ) -> PromptInput {
        let mut template = table.get(kind).to_string();

        if template.contains(placeholders::GUARDRAILS) {
            let block = if guardrails {
                &table.guardrails_on
            } else {
                &table.guardrails_off
            };
            template = template.replace(placeholders::GUARDRAILS, block);
        }
        if template.contains(placeholders::RANDOMIZED) {
            let tag = self.delimiter.next_tag();
            template = template.replace(placeholders::RANDOMIZED, &tag);
        }

        let date = self.current_date();
        let mut all = Vec::with_capacity(values.len() + 1);
        all.push((placeholders::CURRENT_DATE, date.as_str()));
        all.extend_from_slice(values);

        if table.role_tagged {
            let segments = split_role_lines(&template)
                .into_iter()
                .filter_map(|(role, text)| {
                    let text = text.trim();
                    if text.is_empty() {
                        return None;
                    }
                    Some(PromptSegment::new(role, render(text, &all)))
                })
                .collect();
            PromptInput::Segmented(segments)
        } else {
            PromptInput::Flat(render(&template, &all))
        }
    }
}

/// Split a template on lines that begin with a role marker
///
/// Text after the marker on the same line belongs to that role. Text before
/// the first marker is treated as user text.
fn split_role_lines(template: &str) -> Vec<(Role, &str)> {
    let mut segments = Vec::new();
    let mut current: Option<(Role, usize)> = None;
    let mut offset = 0;

    for line in template.split_inclusive('\n') {
        if let Some((role, marker_len)) = role_marker(line) {
            match current.take() {
                Some((role, start)) => segments.push((role, &template[start..offset])),
                None => segments.push((Role::User, &template[..offset])),
            }
            current = Some((role, offset + marker_len));
        }
        offset += line.len();
    }

    match current {
        Some((role, start)) => segments.push((role, &template[start..])),
        None => segments.push((Role::User, template)),
    }
    segments
}

fn role_marker(line: &str) -> Option<(Role, usize)> {
    [Role::System, Role::User, Role::Assistant]
        .into_iter()
        .map(|role| (role, role.marker()))
        .find(|(_, marker)| line.starts_with(marker))
        .map(|(role, marker)| (role, marker.len()))
}
