use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::models::Stats;
use crate::store::{Collection, Store};

/// Ratings at or above this value count as satisfied.
pub const SATISFIED_THRESHOLD: i16 = 4;

/// Shown when the backend cannot be read.
pub const FALLBACK_STATS: Stats = Stats {
    average_rating: 4.6,
    total_feedbacks: 465,
    satisfaction_rate: 98,
};

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Arithmetic mean rounded to one decimal; 0 for no ratings.
pub fn mean_rating(values: &[i16]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let total: i64 = values.iter().map(|v| i64::from(*v)).sum();
    round_to_tenth(total as f64 / values.len() as f64)
}

/// Percentage of ratings at or above 4, rounded to a whole number.
pub fn satisfaction_rate(values: &[i16]) -> u32 {
    if values.is_empty() {
        return 0;
    }
    let satisfied = values.iter().filter(|v| **v >= SATISFIED_THRESHOLD).count();
    ((satisfied as f64 / values.len() as f64) * 100.0).round() as u32
}

pub fn summarize(values: &[i16], ratings: u64, surveys: u64, feedbacks: u64) -> Stats {
    Stats {
        average_rating: mean_rating(values),
        total_feedbacks: ratings + surveys + feedbacks,
        satisfaction_rate: satisfaction_rate(values),
    }
}

/// Reads every rating plus the three collection counts. Read-only.
pub async fn compute_stats<S: Store + ?Sized>(store: &S) -> Result<Stats, PersistenceError> {
    let values = store.rating_values(None).await?;
    let ratings = store.count(Collection::Ratings).await?;
    let surveys = store.count(Collection::SurveyResponses).await?;
    let feedbacks = store.count(Collection::Feedbacks).await?;

    debug!(ratings, surveys, feedbacks, "collected feedback counts");
    Ok(summarize(&values, ratings, surveys, feedbacks))
}

pub fn stats_or_fallback(result: Result<Stats, PersistenceError>) -> Stats {
    match result {
        Ok(stats) => stats,
        Err(err) => {
            warn!(error = %err, "failed to load stats, showing defaults");
            FALLBACK_STATS
        }
    }
}
