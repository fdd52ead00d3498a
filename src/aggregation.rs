//! Aggregation Engine
//!
//! Count-weighted score averages over franchise detail rows, and the
//! vote-count confidence factor applied to combo rankings.

use crate::query::result::ResultSet;
use crate::storage::columnar::GameColumn;
use serde::{Deserialize, Serialize};

pub const CRITIC_WEIGHT: f64 = 0.6;
pub const USER_WEIGHT: f64 = 0.4;
/// User scores are on 0-10, critic scores on 0-100
pub const USER_SCALE: f64 = 10.0;

/// Sigmoid centre and spread of the confidence in a critic score, by vote count
pub const CRITIC_CONFIDENCE: (f64, f64) = (20.0, 10.0);
/// Sigmoid centre and spread of the confidence in a user score, by vote count
pub const USER_CONFIDENCE: (f64, f64) = (200.0, 100.0);

/// Weighted statistics of a set of detail rows
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedStats {
    /// Σ(critic·count)/Σ(count); None when the weight sum is zero
    pub critic_weighted_avg: Option<f64>,
    pub user_weighted_avg: Option<f64>,
    /// 0.6·critic + 0.4·user·10; a missing side contributes zero, both missing is None
    pub combo_score: Option<f64>,
    /// Rows with at least one score
    pub titles_considered: usize,
    pub critic_count_sum: i64,
    pub user_count_sum: i64,
}

/// Scores and vote counts of one detail row
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScoreRow {
    pub critic_score: Option<f64>,
    pub critic_count: Option<f64>,
    pub user_score: Option<f64>,
    pub user_count: Option<f64>,
}

#[derive(Default)]
struct WeightedSum {
    numerator: f64,
    weight: f64,
}

impl WeightedSum {
    fn add(&mut self, score: Option<f64>, count: Option<f64>) -> Option<f64> {
        let (score, count) = (score?, count?);
        self.numerator += score * count;
        self.weight += count;
        Some(count)
    }

    fn average(&self) -> Option<f64> {
        (self.weight != 0.0).then(|| self.numerator / self.weight)
    }
}

pub fn combo(critic: Option<f64>, user: Option<f64>) -> Option<f64> {
    if critic.is_none() && user.is_none() {
        return None;
    }
    Some(CRITIC_WEIGHT * critic.unwrap_or(0.0) + USER_WEIGHT * user.unwrap_or(0.0) * USER_SCALE)
}

/// Confidence in a score given its vote count, in (0, 1). A missing count
/// leaves the score unscaled.
pub fn confidence(count: Option<f64>, (center, spread): (f64, f64)) -> f64 {
    match count {
        Some(count) => 1.0 / (1.0 + ((center - count) / spread).exp()),
        None => 1.0,
    }
}

/// Per-row combo used by combo rankings: the 60/40 blend scaled by the mean
/// confidence of the two vote counts
pub fn confidence_weighted_combo(row: &ScoreRow) -> Option<f64> {
    let base = combo(row.critic_score, row.user_score)?;
    let factor = 0.5 * confidence(row.critic_count, CRITIC_CONFIDENCE) + 0.5 * confidence(row.user_count, USER_CONFIDENCE);
    Some(base * factor)
}

pub fn weight_rows(rows: &[ScoreRow]) -> WeightedStats {
    let mut critic = WeightedSum::default();
    let mut user = WeightedSum::default();
    let mut critic_count_sum = 0.0;
    let mut user_count_sum = 0.0;
    let mut titles_considered = 0;

    for row in rows {
        if row.critic_score.is_some() || row.user_score.is_some() {
            titles_considered += 1;
        }
        if let Some(count) = critic.add(row.critic_score, row.critic_count) {
            critic_count_sum += count;
        }
        if let Some(count) = user.add(row.user_score, row.user_count) {
            user_count_sum += count;
        }
    }

    let critic_weighted_avg = critic.average();
    let user_weighted_avg = user.average();
    WeightedStats {
        critic_weighted_avg,
        user_weighted_avg,
        combo_score: combo(critic_weighted_avg, user_weighted_avg),
        titles_considered,
        critic_count_sum: critic_count_sum.round() as i64,
        user_count_sum: user_count_sum.round() as i64,
    }
}

/// Weight the detail rows of a franchise result set.
/// Missing score or count columns are treated as all-null.
pub fn weight(result: &ResultSet) -> WeightedStats {
    let column = |c: GameColumn| result.column_index(c.name());
    let critic_score = column(GameColumn::CriticScore);
    let critic_count = column(GameColumn::CriticCount);
    let user_score = column(GameColumn::UserScore);
    let user_count = column(GameColumn::UserCount);

    let rows: Vec<ScoreRow> = result
        .rows
        .iter()
        .map(|row| {
            let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(|v| v.as_f64());
            ScoreRow {
                critic_score: cell(critic_score),
                critic_count: cell(critic_count),
                user_score: cell(user_score),
                user_count: cell(user_count),
            }
        })
        .collect();
    weight_rows(&rows)
}
