use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIVES: i32 = 3;

/// Running statistics for one user. Only raw counters are stored;
/// accuracy is always derived from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    pub user_id: String,
    pub total_answered: u32,
    pub correct_count: u32,
    pub current_streak: u32,
    pub best_streak: u32,
    /// Not clamped: repeated wrong answers drive this below zero.
    pub lives: i32,
    /// Bumped on every persisted transition; used for compare-and-swap.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl UserStats {
    /// The record a user has before their first submission.
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            total_answered: 0,
            correct_count: 0,
            current_streak: 0,
            best_streak: 0,
            lives: DEFAULT_LIVES,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Scoring transition for one answered question.
    pub fn apply_outcome(&mut self, correct: bool) {
        self.total_answered += 1;
        if correct {
            self.correct_count += 1;
            self.current_streak += 1;
            self.best_streak = self.best_streak.max(self.current_streak);
        } else {
            self.current_streak = 0;
            self.lives -= 1;
        }
        self.version += 1;
        self.updated_at = Utc::now();
    }

    pub fn accuracy(&self) -> f64 {
        if self.total_answered == 0 {
            return 0.0;
        }
        f64::from(self.correct_count) / f64::from(self.total_answered)
    }
}

/// Stats as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatsView {
    pub user_id: String,
    pub total_answered: u32,
    pub correct_count: u32,
    pub current_streak: u32,
    pub best_streak: u32,
    pub lives: i32,
    pub accuracy: f64,
}

impl From<&UserStats> for UserStatsView {
    fn from(stats: &UserStats) -> Self {
        Self {
            user_id: stats.user_id.clone(),
            total_answered: stats.total_answered,
            correct_count: stats.correct_count,
            current_streak: stats.current_streak,
            best_streak: stats.best_streak,
            lives: stats.lives,
            accuracy: stats.accuracy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_has_defaults() {
        let stats = UserStats::new("u1");
        assert_eq!(stats.total_answered, 0);
        assert_eq!(stats.correct_count, 0);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.best_streak, 0);
        assert_eq!(stats.lives, DEFAULT_LIVES);
        assert_eq!(stats.accuracy(), 0.0);
    }

    #[test]
    fn correct_answers_extend_streak_and_best() {
        let mut stats = UserStats::new("u1");
        for expected in 1..=4 {
            stats.apply_outcome(true);
            assert_eq!(stats.current_streak, expected);
            assert_eq!(stats.best_streak, expected);
        }
        assert_eq!(stats.lives, DEFAULT_LIVES);
        assert_eq!(stats.version, 4);
    }

    #[test]
    fn incorrect_answer_resets_streak_and_costs_a_life() {
        let mut stats = UserStats::new("u1");
        stats.apply_outcome(true);
        stats.apply_outcome(true);
        stats.apply_outcome(false);

        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.best_streak, 2);
        assert_eq!(stats.lives, DEFAULT_LIVES - 1);

        stats.apply_outcome(true);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.best_streak, 2);
    }

    #[test]
    fn lives_go_negative() {
        let mut stats = UserStats::new("u1");
        for _ in 0..5 {
            stats.apply_outcome(false);
        }
        assert_eq!(stats.lives, DEFAULT_LIVES - 5);
        assert_eq!(stats.total_answered, 5);
        assert_eq!(stats.correct_count, 0);
    }

    #[test]
    fn accuracy_tracks_counters() {
        let mut stats = UserStats::new("u1");
        stats.apply_outcome(true);
        stats.apply_outcome(false);
        stats.apply_outcome(true);

        assert_eq!(stats.total_answered, 3);
        assert!((stats.accuracy() - 2.0 / 3.0).abs() < f64::EPSILON);

        let view = UserStatsView::from(&stats);
        assert_eq!(view.accuracy, stats.accuracy());
        assert_eq!(view.lives, DEFAULT_LIVES - 1);
    }
}
