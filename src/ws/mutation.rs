//! Applies inbound client messages to a session's state and decides what,
//! if anything, gets relayed to the other members.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{
    HighlightMessage, Question, QuestionIndexMessage, QuestionUpdateMessage, ResetTestMessage,
    SearchMessage, Section, Test, ViewMessage,
};
use super::session::SessionState;

/// Upper bound on section/question indices accepted by `question_update`.
pub const MAX_SLOT_INDEX: usize = 4096;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("message must be a JSON object")]
    NotAnObject,
    #[error("message has no type")]
    MissingType,
    #[error("invalid message type '{0}'")]
    UnknownType(String),
    #[error("malformed '{kind}' message: {reason}")]
    Malformed { kind: &'static str, reason: String },
}

/// How unknown or malformed messages are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessagePolicy {
    /// Leave state alone and relay the message unchanged.
    #[default]
    Permissive,
    /// Leave state alone and answer the sender with an `error` message.
    Strict,
}

impl MessagePolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            MessagePolicy::Strict
        } else {
            MessagePolicy::Permissive
        }
    }
}

/// What the gateway should do with an inbound message.
#[derive(Debug, PartialEq)]
pub enum Dispatch {
    /// Fan out to every connection in the session, sender included.
    Broadcast(Value),
    /// Answer the sender only.
    Reply(MessageError),
}

/// Parse a raw text frame, apply it, and pick the dispatch per `policy`.
pub fn process(state: &mut SessionState, raw: &str, policy: MessagePolicy) -> Dispatch {
    let mut message: Value = match serde_json::from_str(raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) | Err(_) => return Dispatch::Reply(MessageError::NotAnObject),
    };

    match apply(state, &mut message) {
        Ok(()) => Dispatch::Broadcast(message),
        Err(e) => {
            warn!(error = %e, "rejected session message");
            match policy {
                MessagePolicy::Permissive => Dispatch::Broadcast(message),
                MessagePolicy::Strict => Dispatch::Reply(e),
            }
        }
    }
}

/// Apply one message to `state`. On error the state is left untouched.
///
/// The message may be rewritten in place to carry normalized fields for the
/// broadcast.
pub fn apply(state: &mut SessionState, message: &mut Value) -> Result<(), MessageError> {
    let kind = match message.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        _ => return Err(MessageError::MissingType),
    };

    match kind.as_str() {
        "highlight" => {
            let msg: HighlightMessage = payload("highlight", message)?;
            if let Some(highlight) = msg.highlight {
                state.highlights.push(highlight);
            }
        }
        "search" => {
            let msg: SearchMessage = payload("search", message)?;
            state.search = msg.term.unwrap_or_default();
        }
        "view" => {
            let msg: ViewMessage = payload("view", message)?;
            state.shared.view_mode = msg.view.unwrap_or_default();
            state.clear_annotations();
            match msg.test_id {
                Some(test_id) => {
                    if !state.shared.tests.contains_key(&test_id) {
                        debug!(test_id = %test_id, "view activates a test that is not loaded");
                    }
                    state.shared.active_test_id = Some(test_id.clone());
                    if let Some(obj) = message.as_object_mut() {
                        obj.insert("testId".to_string(), Value::String(test_id));
                    }
                }
                None => state.shared.active_test_id = None,
            }
        }
        "question_index" => {
            let msg: QuestionIndexMessage = payload("question_index", message)?;
            state.question_index = msg.index;
            state.clear_annotations();
        }
        "question_update" => {
            let msg: QuestionUpdateMessage = payload("question_update", message)?;
            upsert_question(state, msg)?;
        }
        "reset_test" => {
            let msg: ResetTestMessage = payload("reset_test", message)?;
            reset_test(state, msg.test_id.as_deref());
        }
        "submit_test" => {}
        _ => return Err(MessageError::UnknownType(kind)),
    }
    Ok(())
}

fn payload<T: DeserializeOwned>(kind: &'static str, message: &Value) -> Result<T, MessageError> {
    T::deserialize(message).map_err(|e| MessageError::Malformed {
        kind,
        reason: e.to_string(),
    })
}

fn upsert_question(state: &mut SessionState, msg: QuestionUpdateMessage) -> Result<(), MessageError> {
    let QuestionUpdateMessage {
        test_id,
        section_index,
        question_index,
        question,
    } = msg;
    if section_index > MAX_SLOT_INDEX || question_index > MAX_SLOT_INDEX {
        return Err(MessageError::Malformed {
            kind: "question_update",
            reason: format!("index out of range (max {MAX_SLOT_INDEX})"),
        });
    }

    let test = state
        .shared
        .tests
        .entry(test_id.clone())
        .or_insert_with(|| Test::new(&test_id));
    if test.sections.len() <= section_index {
        test.sections.resize_with(section_index + 1, Section::default);
    }
    let questions = &mut test.sections[section_index].questions;
    if questions.len() <= question_index {
        questions.resize_with(question_index + 1, Question::default);
    }
    questions[question_index] = question;
    Ok(())
}

fn reset_test(state: &mut SessionState, test_id: Option<&str>) {
    let Some(test) = test_id.and_then(|id| state.shared.tests.get_mut(id)) else {
        return;
    };
    for question in test.sections.iter_mut().flat_map(|s| s.questions.iter_mut()) {
        question.clear_answers();
    }
}
