pub mod answer;
pub mod event;
pub mod question;
pub mod stats;

pub use answer::{AnswerRecord, NewAnswer, SubmissionResult, SubmitAnswerRequest};
pub use event::{DomainEvent, QUIZ_ANSWERED};
pub use question::{Question, RandomQuestionQuery};
pub use stats::{UserStats, UserStatsView, DEFAULT_LIVES};
