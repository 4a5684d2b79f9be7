use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Question, QuestionIndex, SharedState, ViewMode};

#[derive(Deserialize, Debug)]
pub struct HighlightMessage {
    pub highlight: Option<Value>,
}

#[derive(Deserialize, Debug)]
pub struct SearchMessage {
    pub term: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ViewMessage {
    pub view: Option<ViewMode>,
    pub test_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct QuestionIndexMessage {
    pub index: QuestionIndex,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QuestionUpdateMessage {
    pub test_id: String,
    #[serde(default)]
    pub section_index: usize,
    #[serde(default)]
    pub question_index: usize,
    pub question: Question,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResetTestMessage {
    pub test_id: Option<String>,
}

/// Full snapshot sent once when a connection becomes active.
#[derive(Serialize, Debug)]
pub struct StateMessage<'a> {
    pub state: &'a SharedState,
    pub highlights: &'a [Value],
    pub search: &'a str,
    pub view: ViewMode,
    pub question_index: QuestionIndex,
}

#[derive(Serialize, Debug)]
pub struct ErrorMessage {
    pub message: String,
}

/// Messages originated by the server rather than relayed from a client.
#[derive(Serialize, Debug)]
#[serde(tag = "type")]
pub enum SendMessage<'a> {
    #[serde(rename = "state")]
    State(StateMessage<'a>),
    #[serde(rename = "error")]
    Error(ErrorMessage),
}
