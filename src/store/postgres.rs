use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ConfigError, FeedbackError, PersistenceError};
use crate::models::{
    Feedback, FeedbackStatus, NewFeedback, NewProfessor, NewRating, NewSurveyResponse, Professor,
    Rating, SurveyAnswers, SurveyResponse,
};
use crate::store::{Collection, Store};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

const PROFESSOR_COLUMNS: &str =
    "id, name, specialty, avatar, rating, reviews_count, active, created_at";
const RATING_COLUMNS: &str = "id, professor_id, rating, comment, user_name, user_phone, created_at";
const SURVEY_COLUMNS: &str =
    "id, user_name, user_phone, user_email, answers, nps_score, accept_marketing, created_at";
const FEEDBACK_COLUMNS: &str =
    "id, type, category, message, user_name, user_phone, is_anonymous, status, created_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Builds a lazy pool: nothing is dialled until the first query, so an
    /// unreachable database surfaces as a `PersistenceError` from that query.
    pub fn new(config: &Config) -> Result<Self, FeedbackError> {
        let url = Url::parse(&config.backend_url).map_err(|err| ConfigError::Invalid {
            key: crate::config::BACKEND_URL_VAR,
            value: err.to_string(),
        })?;

        let mut options = config
            .backend_url
            .parse::<PgConnectOptions>()
            .map_err(PersistenceError::from)?;
        // The api key doubles as the role password when the url carries none.
        if url.password().is_none() {
            options = options.password(&config.api_key);
        }
        options = options.application_name("gym-feedback");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy_with(options);

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn professor_from_row(row: &PgRow) -> Result<Professor, sqlx::Error> {
    Ok(Professor {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        specialty: row.try_get("specialty")?,
        avatar: row.try_get("avatar")?,
        rating: row.try_get("rating")?,
        reviews_count: row.try_get("reviews_count")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn rating_from_row(row: &PgRow) -> Result<Rating, sqlx::Error> {
    Ok(Rating {
        id: row.try_get("id")?,
        professor_id: row.try_get("professor_id")?,
        rating: row.try_get("rating")?,
        comment: row.try_get("comment")?,
        user_name: row.try_get("user_name")?,
        user_phone: row.try_get("user_phone")?,
        created_at: row.try_get("created_at")?,
    })
}

fn survey_from_row(row: &PgRow) -> Result<SurveyResponse, sqlx::Error> {
    let answers: Json<SurveyAnswers> = row.try_get("answers")?;
    Ok(SurveyResponse {
        id: row.try_get("id")?,
        user_name: row.try_get("user_name")?,
        user_phone: row.try_get("user_phone")?,
        user_email: row.try_get("user_email")?,
        answers: answers.0,
        nps_score: row.try_get("nps_score")?,
        accept_marketing: row.try_get("accept_marketing")?,
        created_at: row.try_get("created_at")?,
    })
}

fn feedback_from_row(row: &PgRow) -> Result<Feedback, PersistenceError> {
    let kind: String = row.try_get("type")?;
    let status: String = row.try_get("status")?;
    Ok(Feedback {
        id: row.try_get("id")?,
        kind: kind
            .parse()
            .map_err(|err: crate::error::ValidationError| PersistenceError::Decode(err.to_string()))?,
        category: row.try_get("category")?,
        message: row.try_get("message")?,
        user_name: row.try_get("user_name")?,
        user_phone: row.try_get("user_phone")?,
        is_anonymous: row.try_get("is_anonymous")?,
        status: status
            .parse::<FeedbackStatus>()
            .map_err(PersistenceError::Decode)?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn list_professors(&self, active_only: bool) -> Result<Vec<Professor>, PersistenceError> {
        let mut query = format!("SELECT {PROFESSOR_COLUMNS} FROM professors");
        if active_only {
            query.push_str(" WHERE active = TRUE");
        }
        query.push_str(" ORDER BY name");

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let mut professors = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            professors.push(professor_from_row(row)?);
        }
        Ok(professors)
    }

    async fn upsert_professor(&self, professor: &NewProfessor) -> Result<Professor, PersistenceError> {
        let query = format!(
            r#"
            INSERT INTO professors (id, name, specialty, avatar, active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO UPDATE
            SET specialty = EXCLUDED.specialty, avatar = EXCLUDED.avatar, active = EXCLUDED.active
            RETURNING {PROFESSOR_COLUMNS}
            "#
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&professor.name)
            .bind(&professor.specialty)
            .bind(&professor.avatar)
            .bind(professor.active)
            .fetch_one(&self.pool)
            .await?;
        Ok(professor_from_row(&row)?)
    }

    async fn insert_rating(&self, rating: &NewRating) -> Result<Rating, PersistenceError> {
        let query = format!(
            r#"
            INSERT INTO ratings (id, professor_id, rating, comment, user_name, user_phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RATING_COLUMNS}
            "#
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(rating.professor_id)
            .bind(rating.rating)
            .bind(&rating.comment)
            .bind(&rating.user_name)
            .bind(&rating.user_phone)
            .fetch_one(&self.pool)
            .await?;
        Ok(rating_from_row(&row)?)
    }

    async fn rating_values(&self, professor_id: Option<Uuid>) -> Result<Vec<i16>, PersistenceError> {
        let rows = match professor_id {
            Some(id) => {
                sqlx::query("SELECT rating FROM ratings WHERE professor_id = $1")
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT rating FROM ratings")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut values = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            values.push(row.try_get::<i16, _>("rating")?);
        }
        Ok(values)
    }

    async fn update_professor_rating(
        &self,
        professor_id: Uuid,
        rating: f64,
        reviews_count: i32,
    ) -> Result<(), PersistenceError> {
        let result =
            sqlx::query("UPDATE professors SET rating = $1, reviews_count = $2 WHERE id = $3")
                .bind(rating)
                .bind(reviews_count)
                .bind(professor_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(format!("professor {professor_id}")));
        }
        Ok(())
    }

    async fn insert_survey(
        &self,
        survey: &NewSurveyResponse,
    ) -> Result<SurveyResponse, PersistenceError> {
        let query = format!(
            r#"
            INSERT INTO survey_responses
            (id, user_name, user_phone, user_email, answers, nps_score, accept_marketing)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SURVEY_COLUMNS}
            "#
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&survey.user_name)
            .bind(&survey.user_phone)
            .bind(&survey.user_email)
            .bind(Json(&survey.answers))
            .bind(survey.nps_score)
            .bind(survey.accept_marketing)
            .fetch_one(&self.pool)
            .await?;
        Ok(survey_from_row(&row)?)
    }

    async fn insert_feedback(&self, feedback: &NewFeedback) -> Result<Feedback, PersistenceError> {
        let query = format!(
            r#"
            INSERT INTO feedbacks
            (id, type, category, message, user_name, user_phone, is_anonymous, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {FEEDBACK_COLUMNS}
            "#
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(feedback.kind.as_str())
            .bind(&feedback.category)
            .bind(&feedback.message)
            .bind(&feedback.user_name)
            .bind(&feedback.user_phone)
            .bind(feedback.is_anonymous)
            .bind(feedback.status.as_str())
            .fetch_one(&self.pool)
            .await?;
        feedback_from_row(&row)
    }

    async fn list_feedbacks(&self) -> Result<Vec<Feedback>, PersistenceError> {
        let query = format!("SELECT {FEEDBACK_COLUMNS} FROM feedbacks ORDER BY created_at DESC");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(feedback_from_row).collect()
    }

    async fn count(&self, collection: Collection) -> Result<u64, PersistenceError> {
        let query = format!("SELECT COUNT(*) AS total FROM {}", collection.table());
        let total: i64 = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;
        Ok(total.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;

    fn unreachable_config() -> Config {
        Config {
            backend_url: "postgres://feedback@127.0.0.1:1/gym".to_string(),
            api_key: "secret".to_string(),
            backend: BackendKind::Postgres,
            max_connections: 1,
        }
    }

    #[tokio::test]
    async fn unreachable_database_fails_on_first_query() {
        let store = PgStore::new(&unreachable_config()).unwrap();
        let err = store.count(Collection::Feedbacks).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Database(_)));
    }

    #[test]
    fn rejects_unparseable_url() {
        let mut config = unreachable_config();
        config.backend_url = "not a url".to_string();
        assert!(matches!(
            PgStore::new(&config),
            Err(FeedbackError::Config(ConfigError::Invalid { .. }))
        ));
    }
}
