//! Role decoding for chat-style providers
//!
//! Structured prompts are passed through as-is. Flat strings are split on
//! their role markers, right to left, so the last `Assistant:` marker opens
//! the assistant prefill, the last `Human:`/`User:` marker before it opens
//! the user turn and the last `System:` marker before that opens the system
//! block. Text before any marker is treated as the user turn when no user
//! marker is present.

use concierge_core::{PromptInput, PromptSegment, Role};

const ASSISTANT_MARKER: &str = "Assistant:";
const USER_MARKERS: [&str; 2] = ["Human:", "User:"];
const SYSTEM_MARKER: &str = "System:";

/// Segments of a prompt, decoding flat text when needed
pub fn segments_of(prompt: &PromptInput) -> Vec<PromptSegment> {
    match prompt {
        PromptInput::Segmented(segments) => segments.clone(),
        PromptInput::Flat(text) => decode_roles(text),
    }
}

/// Decode a flat prompt into system, user and assistant segments
///
/// Empty segments are dropped. Segment text is trimmed.
pub fn decode_roles(text: &str) -> Vec<PromptSegment> {
    let (rest, assistant) = split_last(text, &[ASSISTANT_MARKER]);
    let (rest, human) = split_last(rest, &USER_MARKERS);
    let (rest, system) = split_last(rest, &[SYSTEM_MARKER]);

    let user = match human {
        Some(human) if !human.trim().is_empty() => human,
        _ => rest,
    };

    let mut segments = Vec::with_capacity(3);
    if let Some(system) = system.map(str::trim).filter(|s| !s.is_empty()) {
        segments.push(PromptSegment::new(Role::System, system));
    }
    let user = user.trim();
    if !user.is_empty() {
        segments.push(PromptSegment::new(Role::User, user));
    }
    if let Some(assistant) = assistant.map(str::trim).filter(|s| !s.is_empty()) {
        segments.push(PromptSegment::new(Role::Assistant, assistant));
    }
    segments
}

/// Split at the last occurrence of any marker
fn split_last<'a>(text: &'a str, markers: &[&str]) -> (&'a str, Option<&'a str>) {
    let found = markers
        .iter()
        .filter_map(|m| text.rfind(m).map(|idx| (idx, m.len())))
        .max_by_key(|(idx, _)| *idx);

    match found {
        Some((idx, len)) => (&text[..idx], Some(&text[idx + len..])),
        None => (text, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(segments: &[PromptSegment]) -> Vec<Role> {
        segments.iter().map(|s| s.role).collect()
    }

    #[test]
    fn test_full_prompt_decodes_three_roles() {
        let segments = decode_roles(
            "System:\nYou are a hotel agent.\n\nHuman:\nWhat time is checkout?\n\nAssistant: Based on",
        );
        assert_eq!(roles(&segments), vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(segments[0].text, "You are a hotel agent.");
        assert_eq!(segments[1].text, "What time is checkout?");
        assert_eq!(segments[2].text, "Based on");
    }

    #[test]
    fn test_markers_in_body_split_on_last_occurrence() {
        let segments = decode_roles(
            "System: rules\nHuman: the document says Human: hello and Assistant: hi\nAssistant: Answer:",
        );
        assert_eq!(roles(&segments), vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(segments[0].text, "rules\nHuman: the document says");
        assert_eq!(segments[1].text, "hello and Assistant: hi");
        assert_eq!(segments[2].text, "Answer:");
    }

    #[test]
    fn test_user_marker_alias() {
        let segments = decode_roles("User: where is the pool?");
        assert_eq!(roles(&segments), vec![Role::User]);
        assert_eq!(segments[0].text, "where is the pool?");
    }

    #[test]
    fn test_unmarked_text_is_user() {
        let segments = decode_roles("  plain question  ");
        assert_eq!(segments, vec![PromptSegment::user("plain question")]);
    }

    #[test]
    fn test_leading_text_is_user_without_user_marker() {
        let segments = decode_roles("Describe the spa.\nAssistant: Sure,");
        assert_eq!(roles(&segments), vec![Role::User, Role::Assistant]);
        assert_eq!(segments[0].text, "Describe the spa.");
    }

    #[test]
    fn test_segmented_input_passes_through() {
        let prompt = PromptInput::Segmented(vec![
            PromptSegment::system("Human: not a marker here"),
            PromptSegment::user("q"),
        ]);
        let segments = segments_of(&prompt);
        assert_eq!(segments[0].text, "Human: not a marker here");
        assert_eq!(segments.len(), 2);
    }
}
