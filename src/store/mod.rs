//! Storage seam over the four feedback collections.
//!
//! Every operation is a single passthrough to the backend: filter, order,
//! insert, update, count. Nothing here is transactional across calls.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::config::{BackendKind, Config};
use crate::error::{FeedbackError, PersistenceError};
use crate::models::{
    Feedback, NewFeedback, NewProfessor, NewRating, NewSurveyResponse, Professor, Rating,
    SurveyResponse,
};

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod rest;

pub use postgres::PgStore;
pub use rest::RestStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Professors,
    Ratings,
    SurveyResponses,
    Feedbacks,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Professors => "professors",
            Collection::Ratings => "ratings",
            Collection::SurveyResponses => "survey_responses",
            Collection::Feedbacks => "feedbacks",
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Professors ordered by name.
    async fn list_professors(&self, active_only: bool) -> Result<Vec<Professor>, PersistenceError>;

    async fn upsert_professor(&self, professor: &NewProfessor) -> Result<Professor, PersistenceError>;

    async fn insert_rating(&self, rating: &NewRating) -> Result<Rating, PersistenceError>;

    /// Raw rating values, optionally restricted to one professor.
    async fn rating_values(&self, professor_id: Option<Uuid>) -> Result<Vec<i16>, PersistenceError>;

    async fn update_professor_rating(
        &self,
        professor_id: Uuid,
        rating: f64,
        reviews_count: i32,
    ) -> Result<(), PersistenceError>;

    async fn insert_survey(
        &self,
        survey: &NewSurveyResponse,
    ) -> Result<SurveyResponse, PersistenceError>;

    async fn insert_feedback(&self, feedback: &NewFeedback) -> Result<Feedback, PersistenceError>;

    /// Feedback tickets, newest first.
    async fn list_feedbacks(&self) -> Result<Vec<Feedback>, PersistenceError>;

    async fn count(&self, collection: Collection) -> Result<u64, PersistenceError>;
}

/// The backend chosen by the url scheme at startup. Opening it does no I/O.
pub enum Backend {
    Postgres(PgStore),
    Rest(RestStore),
}

impl Backend {
    pub fn open(config: &Config) -> Result<Self, FeedbackError> {
        debug!(backend = ?config.backend, "opening backend");
        match config.backend {
            BackendKind::Postgres => Ok(Backend::Postgres(PgStore::new(config)?)),
            BackendKind::Rest => Ok(Backend::Rest(RestStore::new(config)?)),
        }
    }

    pub fn store(&self) -> &dyn Store {
        match self {
            Backend::Postgres(store) => store,
            Backend::Rest(store) => store,
        }
    }
}
