use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(length(min = 1, max = 128))]
    pub question_id: String,
    #[validate(range(min = 0))]
    pub selected_index: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub correct: bool,
    pub xp_earned: i32,
    pub coins_earned: i32,
    pub explanation: String,
    pub streak_count: u32,
    /// Non-fatal problems hit after the answer was recorded (e.g. undelivered event).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Everything the ledger needs to write one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnswer {
    pub user_id: String,
    pub question_id: String,
    pub selected_index: i32,
    pub correct: bool,
    pub xp_earned: i32,
    pub coins_earned: i32,
}

/// Immutable, append-only record of a single submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: String,
    pub user_id: String,
    pub question_id: String,
    pub selected_index: i32,
    pub correct: bool,
    pub xp_earned: i32,
    pub coins_earned: i32,
    pub answered_at: DateTime<Utc>,
}

impl From<NewAnswer> for AnswerRecord {
    fn from(answer: NewAnswer) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: answer.user_id,
            question_id: answer.question_id,
            selected_index: answer.selected_index,
            correct: answer.correct,
            xp_earned: answer.xp_earned,
            coins_earned: answer.coins_earned,
            answered_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_rejects_negative_index_and_empty_ids() {
        let req = SubmitAnswerRequest {
            user_id: String::new(),
            question_id: "q1".to_string(),
            selected_index: -1,
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("user_id"));
        assert!(fields.contains_key("selected_index"));
        assert!(!fields.contains_key("question_id"));
    }

    #[test]
    fn warnings_are_omitted_when_empty() {
        let result = SubmissionResult {
            correct: true,
            xp_earned: 10,
            coins_earned: 5,
            explanation: "nice".to_string(),
            streak_count: 1,
            warnings: Vec::new(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("warnings").is_none());
        assert_eq!(json["streak_count"], 1);
    }
}
