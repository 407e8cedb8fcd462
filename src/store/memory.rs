use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::models::{
    Feedback, NewFeedback, NewProfessor, NewRating, NewSurveyResponse, Professor, Rating,
    SurveyResponse,
};
use crate::store::{Collection, Store};

#[derive(Default)]
struct Tables {
    professors: Vec<Professor>,
    ratings: Vec<Rating>,
    surveys: Vec<SurveyResponse>,
    feedbacks: Vec<Feedback>,
}

/// In-process store for tests. `failing()` makes every call error out.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_professor(self, name: &str, specialty: &str) -> Self {
        self.tables
            .lock()
            .unwrap()
            .professors
            .push(professor(name, specialty));
        self
    }

    pub fn professor(&self, id: Uuid) -> Option<Professor> {
        self.tables
            .lock()
            .unwrap()
            .professors
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn professor_named(&self, name: &str) -> Professor {
        self.tables
            .lock()
            .unwrap()
            .professors
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .unwrap()
    }

    pub fn feedbacks(&self) -> Vec<Feedback> {
        self.tables.lock().unwrap().feedbacks.clone()
    }

    pub fn surveys(&self) -> Vec<SurveyResponse> {
        self.tables.lock().unwrap().surveys.clone()
    }

    fn guard(&self) -> Result<(), PersistenceError> {
        if self.failing {
            return Err(PersistenceError::Backend {
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }
}

fn professor(name: &str, specialty: &str) -> Professor {
    Professor {
        id: Uuid::new_v4(),
        name: name.to_string(),
        specialty: specialty.to_string(),
        avatar: String::new(),
        rating: 0.0,
        reviews_count: 0,
        active: true,
        created_at: Some(Utc::now()),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_professors(&self, active_only: bool) -> Result<Vec<Professor>, PersistenceError> {
        self.guard()?;
        let mut professors: Vec<Professor> = self
            .tables
            .lock()
            .unwrap()
            .professors
            .iter()
            .filter(|p| !active_only || p.active)
            .cloned()
            .collect();
        professors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(professors)
    }

    async fn upsert_professor(&self, new: &NewProfessor) -> Result<Professor, PersistenceError> {
        self.guard()?;
        let mut tables = self.tables.lock().unwrap();
        if let Some(existing) = tables.professors.iter_mut().find(|p| p.name == new.name) {
            existing.specialty = new.specialty.clone();
            existing.avatar = new.avatar.clone();
            existing.active = new.active;
            return Ok(existing.clone());
        }
        let mut created = professor(&new.name, &new.specialty);
        created.avatar = new.avatar.clone();
        created.active = new.active;
        tables.professors.push(created.clone());
        Ok(created)
    }

    async fn insert_rating(&self, rating: &NewRating) -> Result<Rating, PersistenceError> {
        self.guard()?;
        let mut tables = self.tables.lock().unwrap();
        if !tables.professors.iter().any(|p| p.id == rating.professor_id) {
            return Err(PersistenceError::NotFound(format!(
                "professor {}",
                rating.professor_id
            )));
        }
        let stored = Rating {
            id: Uuid::new_v4(),
            professor_id: rating.professor_id,
            rating: rating.rating,
            comment: rating.comment.clone(),
            user_name: rating.user_name.clone(),
            user_phone: rating.user_phone.clone(),
            created_at: Utc::now(),
        };
        tables.ratings.push(stored.clone());
        Ok(stored)
    }

    async fn rating_values(&self, professor_id: Option<Uuid>) -> Result<Vec<i16>, PersistenceError> {
        self.guard()?;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .ratings
            .iter()
            .filter(|r| professor_id.map_or(true, |id| r.professor_id == id))
            .map(|r| r.rating)
            .collect())
    }

    async fn update_professor_rating(
        &self,
        professor_id: Uuid,
        rating: f64,
        reviews_count: i32,
    ) -> Result<(), PersistenceError> {
        self.guard()?;
        let mut tables = self.tables.lock().unwrap();
        let professor = tables
            .professors
            .iter_mut()
            .find(|p| p.id == professor_id)
            .ok_or_else(|| PersistenceError::NotFound(format!("professor {professor_id}")))?;
        professor.rating = rating;
        professor.reviews_count = reviews_count;
        Ok(())
    }

    async fn insert_survey(
        &self,
        survey: &NewSurveyResponse,
    ) -> Result<SurveyResponse, PersistenceError> {
        self.guard()?;
        let stored = SurveyResponse {
            id: Uuid::new_v4(),
            user_name: survey.user_name.clone(),
            user_phone: survey.user_phone.clone(),
            user_email: survey.user_email.clone(),
            answers: survey.answers.clone(),
            nps_score: survey.nps_score,
            accept_marketing: survey.accept_marketing,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().surveys.push(stored.clone());
        Ok(stored)
    }

    async fn insert_feedback(&self, feedback: &NewFeedback) -> Result<Feedback, PersistenceError> {
        self.guard()?;
        let stored = Feedback {
            id: Uuid::new_v4(),
            kind: feedback.kind,
            category: feedback.category.clone(),
            message: feedback.message.clone(),
            user_name: feedback.user_name.clone(),
            user_phone: feedback.user_phone.clone(),
            is_anonymous: feedback.is_anonymous,
            status: feedback.status,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().feedbacks.push(stored.clone());
        Ok(stored)
    }

    async fn list_feedbacks(&self) -> Result<Vec<Feedback>, PersistenceError> {
        self.guard()?;
        let mut feedbacks = self.tables.lock().unwrap().feedbacks.clone();
        feedbacks.reverse();
        Ok(feedbacks)
    }

    async fn count(&self, collection: Collection) -> Result<u64, PersistenceError> {
        self.guard()?;
        let tables = self.tables.lock().unwrap();
        let total = match collection {
            Collection::Professors => tables.professors.len(),
            Collection::Ratings => tables.ratings.len(),
            Collection::SurveyResponses => tables.surveys.len(),
            Collection::Feedbacks => tables.feedbacks.len(),
        };
        Ok(total as u64)
    }
}
