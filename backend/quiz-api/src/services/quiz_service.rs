use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;

use crate::error::QuizError;
use crate::metrics::record_answer;
use crate::models::{
    AnswerRecord, DomainEvent, NewAnswer, Question, SubmissionResult, UserStats, UserStatsView,
    QUIZ_ANSWERED,
};

use super::answer_ledger::AnswerLedger;
use super::event_notifier::EventNotifier;
use super::question_store::QuestionStore;
use super::stats_store::StatsStore;

pub const XP_PER_CORRECT_ANSWER: i32 = 10;
pub const COINS_PER_CORRECT_ANSWER: i32 = 5;

/// Coordinates one answer submission across the question bank, the answer
/// ledger, the stats store and the event notifier.
///
/// The ledger append and the stats transition are load-bearing: a failure in
/// either fails the submission. They are not wrapped in a shared transaction,
/// so a ledger record can outlive a failed stats update. Event emission is
/// advisory and only ever produces a warning.
pub struct QuizService {
    questions: Arc<dyn QuestionStore>,
    ledger: Arc<dyn AnswerLedger>,
    stats: Arc<dyn StatsStore>,
    notifier: EventNotifier,
}

impl QuizService {
    pub fn new(
        questions: Arc<dyn QuestionStore>,
        ledger: Arc<dyn AnswerLedger>,
        stats: Arc<dyn StatsStore>,
        notifier: EventNotifier,
    ) -> Self {
        Self {
            questions,
            ledger,
            stats,
            notifier,
        }
    }

    pub async fn get_random_question(
        &self,
        user_id: &str,
        difficulty: Option<&str>,
    ) -> Result<Question, QuizError> {
        tracing::debug!(
            "Picking random question for user={}, difficulty={:?}",
            user_id,
            difficulty
        );
        self.questions.get_random(difficulty).await
    }

    pub async fn get_question_by_id(&self, question_id: &str) -> Result<Question, QuizError> {
        self.questions.get_by_id(question_id).await
    }

    /// Users without any submission get the default record.
    pub async fn get_user_stats(&self, user_id: &str) -> Result<UserStatsView, QuizError> {
        let stats = self
            .stats
            .get(user_id)
            .await?
            .unwrap_or_else(|| UserStats::new(user_id));
        Ok(UserStatsView::from(&stats))
    }

    pub async fn submit_answer(
        &self,
        user_id: &str,
        question_id: &str,
        selected_index: i32,
    ) -> Result<SubmissionResult, QuizError> {
        self.submit(user_id, question_id, selected_index, None)
            .await
    }

    /// Like [`submit_answer`](Self::submit_answer), but gives up with
    /// `DeadlineExceeded` if the question lookup is still running at
    /// `deadline`, or if the deadline has passed before the ledger append
    /// starts. Once the append has started, the append and the stats update
    /// run to completion, even if the caller stops waiting.
    pub async fn submit_answer_with_deadline(
        &self,
        user_id: &str,
        question_id: &str,
        selected_index: i32,
        deadline: Instant,
    ) -> Result<SubmissionResult, QuizError> {
        self.submit(user_id, question_id, selected_index, Some(deadline))
            .await
    }

    async fn submit(
        &self,
        user_id: &str,
        question_id: &str,
        selected_index: i32,
        deadline: Option<Instant>,
    ) -> Result<SubmissionResult, QuizError> {
        tracing::info!(
            "Processing answer submission: user={}, question={}, selected={}",
            user_id,
            question_id,
            selected_index
        );

        let question = before_deadline(
            deadline,
            "question lookup",
            self.questions.get_by_id(question_id),
        )
        .await?;

        if !question.has_option(selected_index) {
            return Err(QuizError::InvalidSelection {
                index: selected_index,
                options: question.options.len(),
            });
        }

        let correct = question.is_correct(selected_index);
        let (xp_earned, coins_earned) = if correct {
            (XP_PER_CORRECT_ANSWER, COINS_PER_CORRECT_ANSWER)
        } else {
            (0, 0)
        };

        let answer = NewAnswer {
            user_id: user_id.to_string(),
            question_id: question_id.to_string(),
            selected_index,
            correct,
            xp_earned,
            coins_earned,
        };
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(QuizError::DeadlineExceeded("answer append"));
        }
        let (record, stats) = self.record_to_completion(answer).await?;

        let mut warnings = Vec::new();
        let event =
            DomainEvent::quiz_answered(user_id, question_id, correct, xp_earned, coins_earned);
        if let Err(e) = self.notifier.emit(event).await {
            warnings.push(format!("{} event was not delivered: {}", QUIZ_ANSWERED, e));
        }

        tracing::info!(
            "Answer processed: record={}, user={}, correct={}, streak={}, lives={}",
            record.id,
            user_id,
            correct,
            stats.current_streak,
            stats.lives
        );

        Ok(SubmissionResult {
            correct,
            xp_earned,
            coins_earned,
            explanation: question.explanation,
            streak_count: stats.current_streak,
            warnings,
        })
    }

    /// Appends the answer and applies its outcome on one spawned task, so that
    /// dropping the request future after the append has begun cannot leave a
    /// ledger record without its stats transition.
    async fn record_to_completion(
        &self,
        answer: NewAnswer,
    ) -> Result<(AnswerRecord, UserStats), QuizError> {
        let ledger = Arc::clone(&self.ledger);
        let stats = Arc::clone(&self.stats);

        tokio::spawn(async move {
            let user_id = answer.user_id.clone();
            let correct = answer.correct;
            let record = ledger.append(answer).await?;
            let stats = stats.apply_outcome(&user_id, correct).await?;
            record_answer(correct);
            Ok::<_, QuizError>((record, stats))
        })
        .await
        .map_err(|e| QuizError::Persistence(anyhow::anyhow!("Answer recording task failed: {}", e)))?
    }

    pub async fn check_stats_store(&self) -> Result<(), QuizError> {
        self.stats.ping().await
    }

    pub async fn check_event_broker(&self) -> Result<(), crate::error::NotifyError> {
        self.notifier.ping().await
    }
}

async fn before_deadline<T>(
    deadline: Option<Instant>,
    stage: &'static str,
    step: impl Future<Output = Result<T, QuizError>>,
) -> Result<T, QuizError> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => Err(QuizError::DeadlineExceeded(stage)),
        Some(deadline) => tokio::time::timeout_at(deadline, step)
            .await
            .map_err(|_| QuizError::DeadlineExceeded(stage))?,
        None => step.await,
    }
}
