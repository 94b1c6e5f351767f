use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const QUIZ_ANSWERED: &str = "quiz.answered";

/// Envelope published to the event stream: a type tag plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_type: String,
    pub payload: Map<String, Value>,
}

impl DomainEvent {
    pub fn new(event_type: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }

    pub fn quiz_answered(
        user_id: &str,
        question_id: &str,
        correct: bool,
        xp_earned: i32,
        coins_earned: i32,
    ) -> Self {
        let mut payload = Map::new();
        payload.insert("user_id".to_string(), Value::from(user_id));
        payload.insert("question_id".to_string(), Value::from(question_id));
        payload.insert("correct".to_string(), Value::from(correct));
        payload.insert("xp_earned".to_string(), Value::from(xp_earned));
        payload.insert("coins_earned".to_string(), Value::from(coins_earned));
        Self::new(QUIZ_ANSWERED, payload)
    }
}
