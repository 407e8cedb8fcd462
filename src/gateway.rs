//! Submission gateway: one validated request type per submission kind, each
//! persisted as a single insert.
//!
//! Requests can only be built through their `new` constructors, so anything
//! that reaches the store has already passed validation.

use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::NPS_QUESTION_ID;
use crate::error::{PersistenceError, ValidationError};
use crate::models::{
    Feedback, FeedbackKind, FeedbackStatus, NewFeedback, NewRating, NewSurveyResponse, Professor,
    Rating, SurveyAnswer, SurveyAnswers, SurveyResponse,
};
use crate::ratings::record_rating;
use crate::store::Store;

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Star count checked on its own, so the CLI can reject it before looking
/// up the professor.
pub fn stars(value: i64) -> Result<i16, ValidationError> {
    if !(1..=5).contains(&value) {
        return Err(ValidationError::RatingOutOfRange(value));
    }
    Ok(value as i16)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingRequest {
    professor_id: Uuid,
    rating: i16,
    comment: Option<String>,
    user_name: Option<String>,
    user_phone: Option<String>,
}

impl RatingRequest {
    pub fn new(
        professor_id: Uuid,
        rating: i64,
        comment: Option<String>,
        user_name: Option<String>,
        user_phone: Option<String>,
    ) -> Result<Self, ValidationError> {
        if professor_id.is_nil() {
            return Err(ValidationError::Missing("professor"));
        }
        Ok(Self {
            professor_id,
            rating: stars(rating)?,
            comment: optional(comment),
            user_name: optional(user_name),
            user_phone: optional(user_phone),
        })
    }

    pub fn rating(&self) -> i16 {
        self.rating
    }

    fn into_record(self) -> NewRating {
        NewRating {
            professor_id: self.professor_id,
            rating: self.rating,
            comment: self.comment,
            user_name: self.user_name,
            user_phone: self.user_phone,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurveyRequest {
    user_name: String,
    user_phone: String,
    user_email: Option<String>,
    answers: SurveyAnswers,
    accept_marketing: bool,
}

impl SurveyRequest {
    pub fn new(
        user_name: &str,
        user_phone: &str,
        user_email: Option<String>,
        answers: SurveyAnswers,
        accept_marketing: bool,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            user_name: required(user_name, "name")?,
            user_phone: required(user_phone, "phone")?,
            user_email: optional(user_email),
            answers,
            accept_marketing,
        })
    }

    /// NPS comes from the fixed NPS question, and only when it holds a
    /// score inside 0–10.
    pub fn nps_score(&self) -> Option<i16> {
        self.answers
            .get(NPS_QUESTION_ID)
            .and_then(SurveyAnswer::as_score)
            .filter(|score| (0..=10).contains(score))
            .map(|score| score as i16)
    }

    fn into_record(self) -> NewSurveyResponse {
        let nps_score = self.nps_score();
        NewSurveyResponse {
            user_name: self.user_name,
            user_phone: self.user_phone,
            user_email: self.user_email,
            answers: self.answers,
            nps_score,
            accept_marketing: self.accept_marketing,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRequest {
    kind: FeedbackKind,
    category: String,
    message: String,
    user_name: Option<String>,
    user_phone: Option<String>,
    is_anonymous: bool,
}

impl FeedbackRequest {
    pub fn new(
        kind: FeedbackKind,
        category: &str,
        message: &str,
        user_name: Option<String>,
        user_phone: Option<String>,
        is_anonymous: bool,
    ) -> Result<Self, ValidationError> {
        let category = required(category, "category")?;
        let message = required(message, "message")?;
        let (user_name, user_phone) = if is_anonymous {
            (None, None)
        } else {
            (optional(user_name), optional(user_phone))
        };
        Ok(Self {
            kind,
            category,
            message,
            user_name,
            user_phone,
            is_anonymous,
        })
    }

    fn into_record(self) -> NewFeedback {
        NewFeedback {
            kind: self.kind,
            category: self.category,
            message: self.message,
            user_name: self.user_name,
            user_phone: self.user_phone,
            is_anonymous: self.is_anonymous,
            status: FeedbackStatus::Pending,
        }
    }
}

/// Persists the rating and recomputes the professor's aggregate.
pub async fn submit_rating<S: Store + ?Sized>(
    store: &S,
    request: RatingRequest,
) -> Result<Rating, PersistenceError> {
    let record = request.into_record();
    let saved = record_rating(store, &record).await?;
    info!(professor_id = %saved.professor_id, rating = saved.rating, "rating submitted");
    Ok(saved)
}

pub async fn submit_survey<S: Store + ?Sized>(
    store: &S,
    request: SurveyRequest,
) -> Result<SurveyResponse, PersistenceError> {
    let record = request.into_record();
    let saved = store.insert_survey(&record).await?;
    info!(
        answers = saved.answers.len(),
        nps = ?saved.nps_score,
        "survey submitted"
    );
    Ok(saved)
}

pub async fn submit_feedback<S: Store + ?Sized>(
    store: &S,
    request: FeedbackRequest,
) -> Result<Feedback, PersistenceError> {
    let record = request.into_record();
    let saved = store.insert_feedback(&record).await?;
    info!(
        kind = %saved.kind,
        category = %saved.category,
        anonymous = saved.is_anonymous,
        "feedback submitted"
    );
    Ok(saved)
}

/// Submissions are fire-and-forget for the member: a failure is logged and
/// the flow still moves on to the thank-you screen.
pub fn settle<T>(what: &str, result: Result<T, PersistenceError>) -> Option<T> {
    match result {
        Ok(saved) => Some(saved),
        Err(err) => {
            warn!(error = %err, "failed to submit {what}");
            None
        }
    }
}

/// Matches a professor by id, exact name, or a unique name fragment.
pub fn resolve_professor<'a>(
    professors: &'a [Professor],
    key: &str,
) -> Result<&'a Professor, ValidationError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ValidationError::Missing("professor"));
    }
    if let Ok(id) = Uuid::parse_str(key) {
        if let Some(found) = professors.iter().find(|p| p.id == id) {
            return Ok(found);
        }
    }

    let needle = key.to_lowercase();
    if let Some(found) = professors.iter().find(|p| p.name.to_lowercase() == needle) {
        return Ok(found);
    }

    let mut partial = professors
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle));
    match (partial.next(), partial.next()) {
        (Some(found), None) => Ok(found),
        _ => Err(ValidationError::UnknownProfessor(key.to_string())),
    }
}

/// Parses a `QUESTION=VALUE` survey answer; integers become scores.
pub fn parse_answer_arg(raw: &str) -> Result<(String, SurveyAnswer), ValidationError> {
    let (question, value) = raw
        .split_once('=')
        .ok_or_else(|| ValidationError::MalformedAnswer(raw.to_string()))?;
    let question = question.trim();
    let value = value.trim();
    if question.is_empty() || value.is_empty() {
        return Err(ValidationError::MalformedAnswer(raw.to_string()));
    }

    let answer = match value.parse::<i64>() {
        Ok(score) => SurveyAnswer::Score(score),
        Err(_) => SurveyAnswer::Text(value.to_string()),
    };
    Ok((question.to_string(), answer))
}
