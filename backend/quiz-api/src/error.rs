use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("Question {0} not found")]
    QuestionNotFound(String),

    #[error("No question available for difficulty filter {0:?}")]
    NoQuestionAvailable(Option<String>),

    #[error("Selected index {index} is out of range for a question with {options} options")]
    InvalidSelection { index: i32, options: usize },

    #[error("Deadline exceeded before {0} completed")]
    DeadlineExceeded(&'static str),

    /// Lost a compare-and-swap race on the user's stats record.
    #[error("Concurrent stats update for user {0}")]
    StatsConflict(String),

    #[error("Persistence failure: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

impl QuizError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            QuizError::QuestionNotFound(_) | QuizError::NoQuestionAvailable(_)
        )
    }

    pub fn is_client_error(&self) -> bool {
        self.is_not_found() || matches!(self, QuizError::InvalidSelection { .. })
    }
}

/// Delivery failures of the event notifier. Never fail a submission.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Event publish timed out after {0:?}")]
    Timeout(Duration),

    #[error("Event broker unavailable: {0}")]
    Unavailable(String),

    #[error("Event broker rejected message: {0}")]
    Broker(String),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_client_errors() {
        assert!(QuizError::QuestionNotFound("q".into()).is_client_error());
        assert!(QuizError::NoQuestionAvailable(Some("hard".into())).is_not_found());
        assert!(QuizError::InvalidSelection {
            index: 7,
            options: 4
        }
        .is_client_error());
        assert!(!QuizError::DeadlineExceeded("answer append").is_client_error());
        assert!(!QuizError::Persistence(anyhow::anyhow!("db down")).is_client_error());
    }

    #[test]
    fn persistence_error_shows_context_chain() {
        let err = anyhow::anyhow!("connection reset").context("Failed to insert answer");
        let msg = QuizError::from(err).to_string();
        assert!(msg.contains("Failed to insert answer"));
        assert!(msg.contains("connection reset"));
    }
}
