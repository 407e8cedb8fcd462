//! Keeps each professor's `rating` and `reviews_count` in step with the
//! `ratings` table.
//!
//! Known race: the insert and the recompute are separate round trips with no
//! transaction around them. Two submissions for the same professor can
//! interleave so that the later recompute is written first, leaving the
//! professor one review short until the next rating for them is recorded.

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::models::{NewRating, Rating};
use crate::stats::mean_rating;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfessorAggregate {
    pub rating: f64,
    pub reviews_count: i32,
}

pub fn aggregate(values: &[i16]) -> Option<ProfessorAggregate> {
    if values.is_empty() {
        return None;
    }
    Some(ProfessorAggregate {
        rating: mean_rating(values),
        reviews_count: i32::try_from(values.len()).unwrap_or(i32::MAX),
    })
}

/// Inserts the rating, then recomputes the professor from a full scan of
/// their ratings.
pub async fn record_rating<S: Store + ?Sized>(
    store: &S,
    rating: &NewRating,
) -> Result<Rating, PersistenceError> {
    let saved = store.insert_rating(rating).await?;
    refresh_professor_rating(store, rating.professor_id).await?;
    Ok(saved)
}

/// Leaves the professor untouched when no ratings reference them.
pub async fn refresh_professor_rating<S: Store + ?Sized>(
    store: &S,
    professor_id: Uuid,
) -> Result<Option<ProfessorAggregate>, PersistenceError> {
    let values = store.rating_values(Some(professor_id)).await?;
    let Some(summary) = aggregate(&values) else {
        debug!(%professor_id, "no ratings to aggregate");
        return Ok(None);
    };

    store
        .update_professor_rating(professor_id, summary.rating, summary.reviews_count)
        .await?;
    info!(
        %professor_id,
        rating = summary.rating,
        reviews = summary.reviews_count,
        "professor rating updated"
    );
    Ok(Some(summary))
}
