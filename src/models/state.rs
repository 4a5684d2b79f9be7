use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Which screen the collaborating clients are looking at.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Home,
    Edit,
    Display,
}

/// Navigation cursor inside the active test.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuestionIndex {
    pub section: u32,
    pub question: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stem: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_choice: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_choice: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revealed_incorrect_choice: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eliminated_choices: Option<Vec<bool>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Question {
    /// Drop every answer-tracking field, keeping the content.
    pub fn clear_answers(&mut self) {
        self.selected_choice = None;
        self.revealed_incorrect_choice = None;
        self.eliminated_choices = None;
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Section {
    #[serde(default)]
    pub passage: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Test {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(rename = "type", default = "default_test_kind")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Test {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            sections: Vec::new(),
            kind: default_test_kind(),
            extra: Map::new(),
        }
    }
}

fn default_test_kind() -> String {
    "LR".to_string()
}

/// The document every member of a session sees and mutates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SharedState {
    #[serde(default)]
    pub tests: BTreeMap<String, Test>,
    #[serde(default)]
    pub active_test_id: Option<String>,
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_uses_defaults() {
        let state: SharedState = serde_json::from_value(json!({})).unwrap();
        assert!(state.tests.is_empty());
        assert_eq!(state.active_test_id, None);
        assert_eq!(state.view_mode, ViewMode::Home);
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"tests": {}, "activeTestId": null, "viewMode": "home"})
        );
    }

    #[test]
    fn unknown_fields_survive() {
        let input = json!({
            "tests": {
                "t1": {
                    "id": "t1",
                    "name": "Practice",
                    "type": "RC",
                    "sections": [{
                        "passage": "p",
                        "questions": [{"stem": "s", "choices": ["a"], "selectedChoice": 0, "note": "keep"}]
                    }]
                }
            },
            "activeTestId": "t1",
            "viewMode": "display",
            "sessionInfo": {"role": "tutor"}
        });
        let state: SharedState = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(state.extra.get("sessionInfo"), Some(&json!({"role": "tutor"})));
        assert_eq!(serde_json::to_value(&state).unwrap(), input);
    }

    #[test]
    fn clear_answers_keeps_content() {
        let mut q: Question = serde_json::from_value(json!({
            "stem": "why",
            "choices": ["a", "b"],
            "correctChoice": 1,
            "selectedChoice": 0,
            "revealedIncorrectChoice": 0,
            "eliminatedChoices": [true, false]
        }))
        .unwrap();
        q.clear_answers();
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({"stem": "why", "choices": ["a", "b"], "correctChoice": 1})
        );
    }
}
