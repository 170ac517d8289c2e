//! Dialog platform events
//!
//! Routes one dialog event to the handler for its intent and builds the
//! `Close` response the platform speaks back. Known intents get session
//! hygiene before routing; expired contexts are dropped afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use concierge_agent::{BrandSlot, TurnOrchestrator, TurnRequest};
use concierge_config::SpeechConversion;
use concierge_core::session::keys;
use concierge_core::{SessionAttributes, SWITCH_OFF, SWITCH_ON};

pub const INPUT_MODE_SPEECH: &str = "Speech";
pub const CONTENT_PLAIN_TEXT: &str = "PlainText";
pub const CONTENT_SSML: &str = "SSML";

const HELP_MESSAGE: &str = "You can ask questions about our company, Example Corp Hospitality Group, \
or about our hotel brands including Seaside Resorts, Luxury Suites, Waypoint Inns, Family Getaways, \
and Party Times.";
const TRANSFER_MESSAGE: &str = "OK, let me get you to an agent to help.";
const GOODBYE_MESSAGE: &str = "Thank you for contacting Example Corp Hospitality Group. Goodbye!";
const MODEL_CHANGED: &str = "Switched to the {ragLLM} LLM.";
const MODEL_CHANGE_ERROR: &str = "I'm sorry, I was not able to change the LLM for you.";
const KNOWLEDGE_BASE_CHANGED: &str = "Switched to the {knowledgeBase} knowledge base.";
const KNOWLEDGE_BASE_CHANGE_ERROR: &str =
    "I'm sorry, I was not able to change the knowledge base for you.";
const CONTEXT_TOGGLED: &str = "OK, changed the LLM context setting to {context_switch}.";
const GUARDRAILS_TOGGLED: &str = "OK, changed the LLM guardrails setting to {guardrails_switch}.";
const EMPTY_INPUT_PROMPT: &str = "(no input)";

// Slot names as defined in the bot
const BRAND_SLOT: &str = "brand";
const MODEL_SLOT: &str = "ragLLM";
const KNOWLEDGE_BASE_SLOT: &str = "knowledgeBase";
const CONTEXT_SLOT: &str = "contextSwitch";
const GUARDRAILS_SLOT: &str = "guardrailsSwitch";

/// Incoming dialog event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogEvent {
    #[serde(default)]
    pub session_state: SessionState,
    #[serde(default)]
    pub input_transcript: String,
    #[serde(default)]
    pub input_mode: Option<String>,
    #[serde(default)]
    pub request_attributes: serde_json::Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DialogEvent {
    pub fn is_speech(&self) -> bool {
        self.input_mode.as_deref() == Some(INPUT_MODE_SPEECH)
    }

    /// Slot value, preferring the interpreted value
    pub fn slot_value(&self, slot: &str) -> Option<&str> {
        let value = self.session_state.intent.slot(slot)?;
        value
            .interpreted_value
            .as_deref()
            .or(value.original_value.as_deref())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    pub session_attributes: SessionAttributes,
    #[serde(default)]
    pub intent: Intent,
    #[serde(default)]
    pub active_contexts: Vec<ActiveContext>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Intent {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slots: HashMap<String, Option<Slot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Intent {
    fn slot(&self, name: &str) -> Option<&SlotValue> {
        self.slots.get(name)?.as_ref()?.value.as_ref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Slot {
    #[serde(default)]
    pub value: Option<SlotValue>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotValue {
    #[serde(default)]
    pub original_value: Option<String>,
    #[serde(default)]
    pub interpreted_value: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveContext {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub time_to_live: TimeToLive,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ActiveContext {
    fn is_live(&self) -> bool {
        self.time_to_live.turns_to_live > 0 && self.time_to_live.time_to_live_in_seconds > 0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeToLive {
    #[serde(default)]
    pub turns_to_live: i64,
    #[serde(default)]
    pub time_to_live_in_seconds: i64,
}

/// Response returned to the dialog platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogResponse {
    pub messages: Vec<Message>,
    pub session_state: ResponseSessionState,
    pub request_attributes: serde_json::Value,
}

impl DialogResponse {
    /// Content of the first message
    pub fn text(&self) -> &str {
        self.messages.first().map(|m| m.content.as_str()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub content_type: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSessionState {
    pub active_contexts: Vec<ActiveContext>,
    pub intent: Intent,
    pub session_attributes: SessionAttributes,
    pub dialog_action: DialogAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogAction {
    #[serde(rename = "type")]
    pub action_type: String,
}

impl DialogAction {
    fn close() -> Self {
        Self {
            action_type: "Close".to_string(),
        }
    }
}

/// Handler an intent is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Topic,
    Fallback,
    TransferToAgent,
    Help,
    Goodbye,
    SelectModel,
    SelectKnowledgeBase,
    ToggleContext,
    ToggleGuardrails,
}

impl Route {
    pub fn for_intent(name: &str) -> Option<Self> {
        let route = match name {
            "Accommodations" | "Amenities" | "BrandPortfolio" | "CorporateLoyaltyProgram"
            | "CorporateOverview" | "CorporateSustainability" | "Locations" | "Parking"
            | "Policies" | "Services" | "SwitchBrand" | "Welcome" => Route::Topic,
            "FallbackIntent" => Route::Fallback,
            "Booking" | "SpeakToAgent" => Route::TransferToAgent,
            "Help" => Route::Help,
            "Goodbye" => Route::Goodbye,
            "SelectLLM" => Route::SelectModel,
            "SelectKnowledgeBase" => Route::SelectKnowledgeBase,
            "ToggleLLMContext" => Route::ToggleContext,
            "ToggleLLMGuardrails" => Route::ToggleGuardrails,
            _ => return None,
        };
        Some(route)
    }
}

/// What a handler produced
struct Reply {
    content: String,
    content_type: &'static str,
    /// Evidence for labeled checks, set by the topic path
    evidence: Option<String>,
}

impl Reply {
    fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: CONTENT_PLAIN_TEXT,
            evidence: None,
        }
    }
}

/// Routes dialog events to intent handlers
pub struct DialogDispatcher {
    orchestrator: Arc<TurnOrchestrator>,
    speech_conversions: Vec<SpeechConversion>,
    default_model: String,
    default_knowledge_base: String,
}

impl DialogDispatcher {
    pub fn new(orchestrator: Arc<TurnOrchestrator>) -> Self {
        Self {
            orchestrator,
            speech_conversions: Vec::new(),
            default_model: concierge_config::constants::conversation::DEFAULT_ALIAS.to_string(),
            default_knowledge_base: concierge_config::constants::conversation::DEFAULT_ALIAS
                .to_string(),
        }
    }

    pub fn with_speech_conversions(mut self, conversions: Vec<SpeechConversion>) -> Self {
        self.speech_conversions = conversions;
        self
    }

    pub fn with_defaults(mut self, model: &str, knowledge_base: &str) -> Self {
        self.default_model = model.to_string();
        self.default_knowledge_base = knowledge_base.to_string();
        self
    }

    /// Handle one dialog event
    pub async fn dispatch(&self, event: DialogEvent) -> DialogResponse {
        let intent_name = event.session_state.intent.name.clone();
        let Some(route) = Route::for_intent(&intent_name) else {
            let message = format!("Configuration error - no intent handler for {}", intent_name);
            tracing::error!(intent = %intent_name, "No intent handler");
            metrics::counter!("concierge_unknown_intents_total").increment(1);
            let DialogEvent {
                session_state,
                request_attributes,
                ..
            } = event;
            return DialogResponse {
                messages: vec![Message {
                    content_type: CONTENT_PLAIN_TEXT.to_string(),
                    content: message,
                }],
                session_state: ResponseSessionState {
                    active_contexts: session_state.active_contexts,
                    intent: session_state.intent,
                    session_attributes: session_state.session_attributes,
                    dialog_action: DialogAction::close(),
                },
                request_attributes,
            };
        };

        tracing::debug!(intent = %intent_name, route = ?route, "Routing dialog event");

        let mut attrs = event.session_state.session_attributes.clone();
        attrs.purge_diagnostics();
        attrs.rotate_prompt_tracking();
        attrs.apply_defaults(&self.default_model, &self.default_knowledge_base);

        let reply = match route {
            Route::Topic => self.topic(&event, &mut attrs).await,
            Route::Fallback => self.fallback(&event, &mut attrs).await,
            Route::TransferToAgent => transfer_to_agent(&mut attrs),
            Route::Help => help(&event, &mut attrs),
            Route::Goodbye => goodbye(&event, &mut attrs),
            Route::SelectModel => self.select_model(&event, &mut attrs),
            Route::SelectKnowledgeBase => self.select_knowledge_base(&event, &mut attrs),
            Route::ToggleContext => toggle(
                &event,
                &mut attrs,
                CONTEXT_SLOT,
                keys::CONTEXT_SWITCH,
                "Toggle-LLM-Context-Success",
                CONTEXT_TOGGLED,
            ),
            Route::ToggleGuardrails => toggle(
                &event,
                &mut attrs,
                GUARDRAILS_SLOT,
                keys::GUARDRAILS_SWITCH,
                "Toggle-LLM-Guardrails-Success",
                GUARDRAILS_TOGGLED,
            ),
        };

        if attrs.get_non_empty(keys::GROUND_TRUTH).is_some() {
            let answer = strip_ssml(&reply.content);
            self.orchestrator
                .run_labeled_checks(
                    &mut attrs,
                    &event.input_transcript,
                    answer,
                    reply.evidence.as_deref(),
                )
                .await;
        }

        let DialogEvent {
            session_state,
            request_attributes,
            ..
        } = event;
        let mut intent = session_state.intent;
        intent.state = Some("Fulfilled".to_string());

        let active_contexts: Vec<ActiveContext> = session_state
            .active_contexts
            .into_iter()
            .filter(|context| {
                let live = context.is_live();
                if !live {
                    tracing::debug!(context = %context.name, "Dropping expired context");
                }
                live
            })
            .collect();

        DialogResponse {
            messages: vec![Message {
                content_type: reply.content_type.to_string(),
                content: reply.content,
            }],
            session_state: ResponseSessionState {
                active_contexts,
                intent,
                session_attributes: attrs,
                dialog_action: DialogAction::close(),
            },
            request_attributes,
        }
    }

    async fn topic(&self, event: &DialogEvent, attrs: &mut SessionAttributes) -> Reply {
        let mut request = TurnRequest::new(&event.session_state.intent.name, &event.input_transcript)
            .with_event(serde_json::to_value(event).unwrap_or_default());
        if let Some(value) = event.session_state.intent.slot(BRAND_SLOT) {
            request = request.with_brand_slot(BrandSlot {
                original_value: value.original_value.clone(),
                interpreted_value: value.interpreted_value.clone(),
            });
        }

        let outcome = self.orchestrator.answer(&request, attrs).await;
        let mut reply = if event.is_speech() {
            Reply {
                content: speak(&self.convert_for_speech(&outcome.answer)),
                content_type: CONTENT_SSML,
                evidence: None,
            }
        } else {
            Reply::plain(outcome.answer)
        };
        reply.evidence = outcome.evidence;
        reply
    }

    async fn fallback(&self, event: &DialogEvent, attrs: &mut SessionAttributes) -> Reply {
        if event.is_speech() && event.input_transcript.is_empty() {
            tracing::info!("Empty speech transcript, staying silent");
            attrs.set_prompt("Fallback-Empty-Input", EMPTY_INPUT_PROMPT);
            return Reply {
                content: speak(""),
                content_type: CONTENT_SSML,
                evidence: None,
            };
        }
        self.topic(event, attrs).await
    }

    fn select_model(&self, event: &DialogEvent, attrs: &mut SessionAttributes) -> Reply {
        let registry = self.orchestrator.registry();
        match event.slot_value(MODEL_SLOT).filter(|name| registry.has_model(name)) {
            Some(name) => {
                tracing::info!(model = %name, "Model selected");
                attrs.set(keys::RAG_LLM, name);
                attrs.set_prompt("LLM-Changed", MODEL_CHANGED);
                spoken(event, MODEL_CHANGED.replace("{ragLLM}", name))
            }
            None => {
                tracing::warn!(model = ?event.slot_value(MODEL_SLOT), "Model selection rejected");
                attrs.set_prompt("LLM-Change-Error", MODEL_CHANGE_ERROR);
                spoken(event, MODEL_CHANGE_ERROR.to_string())
            }
        }
    }

    fn select_knowledge_base(&self, event: &DialogEvent, attrs: &mut SessionAttributes) -> Reply {
        let registry = self.orchestrator.registry();
        match event
            .slot_value(KNOWLEDGE_BASE_SLOT)
            .filter(|name| registry.has_knowledge_base(name))
        {
            Some(name) => {
                tracing::info!(knowledge_base = %name, "Knowledge base selected");
                attrs.set(keys::KNOWLEDGE_BASE, name);
                attrs.set_prompt("KnowledgeBase-Changed", KNOWLEDGE_BASE_CHANGED);
                spoken(event, KNOWLEDGE_BASE_CHANGED.replace("{knowledgeBase}", name))
            }
            None => {
                tracing::warn!(
                    knowledge_base = ?event.slot_value(KNOWLEDGE_BASE_SLOT),
                    "Knowledge base selection rejected"
                );
                attrs.set_prompt("KnowledgeBase-Change-Error", KNOWLEDGE_BASE_CHANGE_ERROR);
                spoken(event, KNOWLEDGE_BASE_CHANGE_ERROR.to_string())
            }
        }
    }

    /// Apply the configured replacements in order
    pub fn convert_for_speech(&self, text: &str) -> String {
        self.speech_conversions
            .iter()
            .fold(text.to_string(), |acc, c| acc.replace(&c.from, &c.to))
    }
}

fn transfer_to_agent(attrs: &mut SessionAttributes) -> Reply {
    attrs.set_prompt("Transfer-To-Agent-Response", TRANSFER_MESSAGE);
    attrs.set(keys::SEND_TO_AGENT, SWITCH_ON);
    Reply::plain(TRANSFER_MESSAGE)
}

fn help(event: &DialogEvent, attrs: &mut SessionAttributes) -> Reply {
    attrs.set_prompt("Help-Message", HELP_MESSAGE);
    let message = match attrs.get_non_empty(keys::FIRST_NAME) {
        Some(first_name) => format!("{}, {}", first_name, HELP_MESSAGE),
        None => HELP_MESSAGE.to_string(),
    };
    spoken(event, message)
}

fn goodbye(event: &DialogEvent, attrs: &mut SessionAttributes) -> Reply {
    attrs.set_prompt("Goodbye-Message", GOODBYE_MESSAGE);
    spoken(event, GOODBYE_MESSAGE.to_string())
}

fn toggle(
    event: &DialogEvent,
    attrs: &mut SessionAttributes,
    slot: &str,
    key: &str,
    prompt_id: &str,
    template: &str,
) -> Reply {
    let requested = event.slot_value(slot).unwrap_or("on");
    let value = match requested {
        "off" => SWITCH_OFF,
        _ => SWITCH_ON,
    };
    attrs.set(key, value);
    attrs.set_prompt(prompt_id, template);
    tracing::info!(switch = %key, value = %value, "Switch changed");

    let placeholder = format!("{{{}}}", key);
    spoken(event, template.replace(&placeholder, requested))
}

/// Wrap in SSML for speech sessions
fn spoken(event: &DialogEvent, text: String) -> Reply {
    if event.is_speech() {
        Reply {
            content: speak(&text),
            content_type: CONTENT_SSML,
            evidence: None,
        }
    } else {
        Reply::plain(text)
    }
}

fn speak(text: &str) -> String {
    format!("<speak>{}</speak>", text)
}

fn strip_ssml(text: &str) -> &str {
    text.strip_prefix("<speak>")
        .and_then(|t| t.strip_suffix("</speak>"))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_table() {
        assert_eq!(Route::for_intent("Amenities"), Some(Route::Topic));
        assert_eq!(Route::for_intent("Welcome"), Some(Route::Topic));
        assert_eq!(Route::for_intent("Booking"), Some(Route::TransferToAgent));
        assert_eq!(Route::for_intent("SelectLLM"), Some(Route::SelectModel));
        assert_eq!(Route::for_intent("OrderPizza"), None);
    }

    #[test]
    fn test_event_decoding() {
        let event: DialogEvent = serde_json::from_value(serde_json::json!({
            "sessionState": {
                "sessionAttributes": {"ragLLM": "Default"},
                "intent": {
                    "name": "Amenities",
                    "slots": {
                        "brand": {"value": {"originalValue": "party times", "interpretedValue": "Example Corp Party Times"}},
                        "other": null
                    },
                    "confirmationState": "None"
                },
                "activeContexts": [
                    {"name": "c1", "timeToLive": {"turnsToLive": 2, "timeToLiveInSeconds": 90}}
                ]
            },
            "inputTranscript": "Is the party times pool heated?",
            "inputMode": "Speech",
            "requestAttributes": {}
        }))
        .unwrap();

        assert!(event.is_speech());
        assert_eq!(event.slot_value("brand"), Some("Example Corp Party Times"));
        assert_eq!(event.slot_value("other"), None);
        assert!(event.session_state.active_contexts[0].is_live());

        let round_trip = serde_json::to_value(&event.session_state.intent).unwrap();
        assert_eq!(round_trip["confirmationState"], "None");
    }

    #[test]
    fn test_expired_contexts() {
        let context = |turns, secs| ActiveContext {
            name: "c".to_string(),
            time_to_live: TimeToLive {
                turns_to_live: turns,
                time_to_live_in_seconds: secs,
            },
            extra: Default::default(),
        };
        assert!(context(1, 10).is_live());
        assert!(!context(0, 10).is_live());
        assert!(!context(3, 0).is_live());
    }

    #[test]
    fn test_strip_ssml() {
        assert_eq!(strip_ssml("<speak>hi</speak>"), "hi");
        assert_eq!(strip_ssml("hi"), "hi");
    }
}
