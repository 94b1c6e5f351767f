use serde::{Deserialize, Serialize};

/// A published quiz item. Owned by the question store and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub thumbnail_emoji: String,
    pub options: Vec<String>,
    pub correct_index: i32,
    pub explanation: String,
    pub difficulty: String,
}

impl Question {
    /// Whether `index` points at one of this question's options.
    pub fn has_option(&self, index: i32) -> bool {
        usize::try_from(index).is_ok_and(|i| i < self.options.len())
    }

    pub fn is_correct(&self, index: i32) -> bool {
        self.correct_index == index
    }
}

#[derive(Debug, Deserialize)]
pub struct RandomQuestionQuery {
    pub user_id: String,
    pub difficulty: Option<String>,
}
