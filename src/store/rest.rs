//! Client for the hosted REST query API (`/rest/v1/{table}`).
//!
//! Filters use the `column=op.value` query convention, inserts ask for the
//! stored row back with `Prefer: return=representation`, and counts are read
//! from the `Content-Range` header of a `HEAD` request. List reads are paged
//! with `limit`/`offset` because the server caps every response at its
//! `max-rows` setting.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_RANGE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{Config, BACKEND_URL_VAR};
use crate::error::{ConfigError, FeedbackError, PersistenceError};
use crate::models::{
    Feedback, NewFeedback, NewProfessor, NewRating, NewSurveyResponse, Professor, Rating,
    SurveyResponse,
};
use crate::store::{Collection, Store};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Kept at or below the server's `max-rows`, otherwise a capped page would
/// look like the last one.
const PAGE_SIZE: u64 = 1000;

pub struct RestStore {
    http: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct RatingValue {
    rating: i16,
}

#[derive(Serialize)]
struct ProfessorAggregate {
    rating: f64,
    reviews_count: i32,
}

impl RestStore {
    pub fn new(config: &Config) -> Result<Self, FeedbackError> {
        let invalid = |value: String| ConfigError::Invalid {
            key: BACKEND_URL_VAR,
            value,
        };

        reqwest::Url::parse(&config.backend_url).map_err(|err| invalid(err.to_string()))?;

        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| invalid("api key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| invalid("api key is not a valid header value".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PersistenceError::from)?;

        Ok(Self {
            http,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.table())
    }

    fn select(&self, collection: Collection, params: &[(&str, String)]) -> RequestBuilder {
        self.http.get(self.table_url(collection)).query(params)
    }

    fn insert<T: Serialize + ?Sized>(&self, collection: Collection, row: &T) -> RequestBuilder {
        self.http
            .post(self.table_url(collection))
            .header("Prefer", "return=representation")
            .json(&[row])
    }

    async fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, PersistenceError> {
        let response = check(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    /// Every row matching `params`, read page by page. `params` must carry an
    /// `order` so pages do not overlap.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        collection: Collection,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, PersistenceError> {
        collect_pages(PAGE_SIZE, |offset, limit| {
            let request = self
                .select(collection, params)
                .query(&[("limit", limit), ("offset", offset)]);
            Self::fetch(request)
        })
        .await
    }

    async fn fetch_one<T: DeserializeOwned>(
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, PersistenceError> {
        let mut rows: Vec<T> = Self::fetch(request).await?;
        if rows.is_empty() {
            return Err(PersistenceError::Decode(format!("{what} insert returned no rows")));
        }
        Ok(rows.swap_remove(0))
    }
}

async fn check(response: Response) -> Result<Response, PersistenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "backend rejected request");
    Err(PersistenceError::Backend {
        status: status.as_u16(),
        body,
    })
}

/// Calls `fetch_page(offset, limit)` until a page comes back shorter than
/// `page_size`.
async fn collect_pages<T, F, Fut>(
    page_size: u64,
    mut fetch_page: F,
) -> Result<Vec<T>, PersistenceError>
where
    F: FnMut(u64, u64) -> Fut,
    Fut: Future<Output = Result<Vec<T>, PersistenceError>>,
{
    let mut rows = Vec::new();
    let mut offset = 0;
    loop {
        let page = fetch_page(offset, page_size).await?;
        let received = page.len() as u64;
        rows.extend(page);
        if received < page_size {
            debug!(rows = rows.len(), "read all pages");
            return Ok(rows);
        }
        offset += received;
    }
}

/// Total from a `Content-Range` value such as `0-24/465` or `*/0`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[async_trait]
impl Store for RestStore {
    async fn list_professors(&self, active_only: bool) -> Result<Vec<Professor>, PersistenceError> {
        let mut params = vec![("select", "*".to_string()), ("order", "name.asc".to_string())];
        if active_only {
            params.push(("active", "eq.true".to_string()));
        }
        self.fetch_all(Collection::Professors, &params).await
    }

    async fn upsert_professor(&self, professor: &NewProfessor) -> Result<Professor, PersistenceError> {
        let request = self
            .http
            .post(self.table_url(Collection::Professors))
            .query(&[("on_conflict", "name")])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[professor]);
        Self::fetch_one(request, "professor").await
    }

    async fn insert_rating(&self, rating: &NewRating) -> Result<Rating, PersistenceError> {
        Self::fetch_one(self.insert(Collection::Ratings, rating), "rating").await
    }

    async fn rating_values(&self, professor_id: Option<Uuid>) -> Result<Vec<i16>, PersistenceError> {
        let mut params = vec![("select", "rating".to_string()), ("order", "id.asc".to_string())];
        if let Some(id) = professor_id {
            params.push(("professor_id", format!("eq.{id}")));
        }
        let rows: Vec<RatingValue> = self.fetch_all(Collection::Ratings, &params).await?;
        Ok(rows.into_iter().map(|row| row.rating).collect())
    }

    async fn update_professor_rating(
        &self,
        professor_id: Uuid,
        rating: f64,
        reviews_count: i32,
    ) -> Result<(), PersistenceError> {
        let request = self
            .http
            .patch(self.table_url(Collection::Professors))
            .query(&[("id", format!("eq.{professor_id}")), ("select", "id".to_string())])
            .header("Prefer", "return=representation")
            .json(&ProfessorAggregate {
                rating,
                reviews_count,
            });
        // A filter that matches nothing still answers 2xx, with an empty body.
        let updated: Vec<serde_json::Value> = Self::fetch(request).await?;
        if updated.is_empty() {
            return Err(PersistenceError::NotFound(format!("professor {professor_id}")));
        }
        Ok(())
    }

    async fn insert_survey(
        &self,
        survey: &NewSurveyResponse,
    ) -> Result<SurveyResponse, PersistenceError> {
        Self::fetch_one(self.insert(Collection::SurveyResponses, survey), "survey").await
    }

    async fn insert_feedback(&self, feedback: &NewFeedback) -> Result<Feedback, PersistenceError> {
        Self::fetch_one(self.insert(Collection::Feedbacks, feedback), "feedback").await
    }

    async fn list_feedbacks(&self) -> Result<Vec<Feedback>, PersistenceError> {
        let params = [
            ("select", "*".to_string()),
            ("order", "created_at.desc,id.asc".to_string()),
        ];
        self.fetch_all(Collection::Feedbacks, &params).await
    }

    async fn count(&self, collection: Collection) -> Result<u64, PersistenceError> {
        let request = self
            .http
            .head(self.table_url(collection))
            .query(&[("select", "*")])
            .header("Prefer", "count=exact");
        let response = check(request.send().await?).await?;

        let header = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| PersistenceError::Decode("missing Content-Range header".to_string()))?;
        debug!(table = collection.table(), range = header, "counted rows");

        parse_content_range(header)
            .ok_or_else(|| PersistenceError::Decode(format!("unreadable Content-Range: {header}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;

    fn config(url: &str) -> Config {
        Config {
            backend_url: url.to_string(),
            api_key: "anon-key".to_string(),
            backend: BackendKind::Rest,
            max_connections: 5,
        }
    }

    #[test]
    fn reads_total_from_content_range() {
        assert_eq!(parse_content_range("0-24/465"), Some(465));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-9/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[tokio::test]
    async fn pages_until_a_short_page() {
        let table: Vec<u64> = (0..2500).collect();
        let mut requested = Vec::new();
        let rows = collect_pages(1000, |offset, limit| {
            requested.push((offset, limit));
            let page: Vec<u64> = table
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .copied()
                .collect();
            async move { Ok::<_, PersistenceError>(page) }
        })
        .await
        .unwrap();

        assert_eq!(rows, table);
        assert_eq!(requested, vec![(0, 1000), (1000, 1000), (2000, 1000)]);
    }

    #[tokio::test]
    async fn exact_multiple_ends_on_an_empty_page() {
        let mut calls = 0;
        let rows = collect_pages(2, |offset, _| {
            calls += 1;
            let page: Vec<u64> = if offset < 4 { vec![offset, offset + 1] } else { Vec::new() };
            async move { Ok::<_, PersistenceError>(page) }
        })
        .await
        .unwrap();

        assert_eq!(rows, vec![0, 1, 2, 3]);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn page_error_stops_the_scan() {
        let result: Result<Vec<u64>, _> = collect_pages(10, |_, _| async {
            Err(PersistenceError::Backend {
                status: 500,
                body: "boom".to_string(),
            })
        })
        .await;
        assert!(matches!(result, Err(PersistenceError::Backend { status: 500, .. })));
    }

    /// Answers a single request with `200` and `body`, returning the base url.
    fn serve_once(body: String) -> String {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            socket
                .set_read_timeout(Some(Duration::from_millis(200)))
                .unwrap();
            let mut buf = [0u8; 1024];
            while matches!(socket.read(&mut buf), Ok(n) if n > 0) {}
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn updating_unknown_professor_is_not_found() {
        let store = RestStore::new(&config(&serve_once("[]".to_string()))).unwrap();
        let err = store
            .update_professor_rating(Uuid::new_v4(), 4.5, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
    }

    #[tokio::test]
    async fn updating_known_professor_succeeds() {
        let id = Uuid::new_v4();
        let body = format!(r#"[{{"id":"{id}"}}]"#);
        let store = RestStore::new(&config(&serve_once(body))).unwrap();
        store.update_professor_rating(id, 4.5, 2).await.unwrap();
    }

    #[test]
    fn table_urls_drop_trailing_slash() {
        let store = RestStore::new(&config("https://gym.example.co/")).unwrap();
        assert_eq!(
            store.table_url(Collection::SurveyResponses),
            "https://gym.example.co/rest/v1/survey_responses"
        );
    }

    #[test]
    fn rejects_unparseable_url() {
        assert!(matches!(
            RestStore::new(&config("https://")),
            Err(FeedbackError::Config(ConfigError::Invalid { .. }))
        ));
    }
}
