use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Professor {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub avatar: String,
    pub rating: f64,
    pub reviews_count: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

/// Roster entry used by seeding and CSV import. Derived columns start at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfessor {
    pub name: String,
    pub specialty: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: Uuid,
    pub professor_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub user_name: Option<String>,
    pub user_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRating {
    pub professor_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub user_name: Option<String>,
    pub user_phone: Option<String>,
}

/// A single survey answer: a numeric score (stars, NPS) or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SurveyAnswer {
    Score(i64),
    Text(String),
}

impl SurveyAnswer {
    pub fn as_score(&self) -> Option<i64> {
        match self {
            SurveyAnswer::Score(value) => Some(*value),
            SurveyAnswer::Text(_) => None,
        }
    }
}

/// Question id → answer. Keys are the question ids as strings.
pub type SurveyAnswers = BTreeMap<String, SurveyAnswer>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: Uuid,
    pub user_name: String,
    pub user_phone: String,
    pub user_email: Option<String>,
    pub answers: SurveyAnswers,
    pub nps_score: Option<i16>,
    pub accept_marketing: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSurveyResponse {
    pub user_name: String,
    pub user_phone: String,
    pub user_email: Option<String>,
    pub answers: SurveyAnswers,
    pub nps_score: Option<i16>,
    pub accept_marketing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Suggestion,
    Complaint,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Suggestion => "suggestion",
            FeedbackKind::Complaint => "complaint",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "suggestion" => Ok(FeedbackKind::Suggestion),
            "complaint" => Ok(FeedbackKind::Complaint),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

/// Lifecycle of a feedback ticket. Only `Pending` is ever written here;
/// staff move tickets forward from outside this tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Pending,
    InProgress,
    Resolved,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Pending => "pending",
            FeedbackStatus::InProgress => "in_progress",
            FeedbackStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for FeedbackStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(FeedbackStatus::Pending),
            "in_progress" => Ok(FeedbackStatus::InProgress),
            "resolved" => Ok(FeedbackStatus::Resolved),
            other => Err(format!("unknown feedback status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    pub category: String,
    pub message: String,
    pub user_name: Option<String>,
    pub user_phone: Option<String>,
    pub is_anonymous: bool,
    pub status: FeedbackStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFeedback {
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    pub category: String,
    pub message: String,
    pub user_name: Option<String>,
    pub user_phone: Option<String>,
    pub is_anonymous: bool,
    pub status: FeedbackStatus,
}

/// Headline numbers shown on the home screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub average_rating: f64,
    pub total_feedbacks: u64,
    pub satisfaction_rate: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: String,
    pub suggestions: usize,
    pub complaints: usize,
}

impl CategorySummary {
    pub fn total(&self) -> usize {
        self.suggestions + self.complaints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survey_answers_deserialize_as_score_or_text() {
        let answers: SurveyAnswers =
            serde_json::from_str(r#"{"1": 5, "4": "Sim", "7": "Mais aulas de spinning"}"#)
                .unwrap();
        assert_eq!(answers["1"], SurveyAnswer::Score(5));
        assert_eq!(answers["4"], SurveyAnswer::Text("Sim".to_string()));
        assert_eq!(answers["1"].as_score(), Some(5));
        assert_eq!(answers["7"].as_score(), None);
    }

    #[test]
    fn feedback_kind_parses_case_insensitively() {
        assert_eq!("Complaint".parse::<FeedbackKind>().unwrap(), FeedbackKind::Complaint);
        assert_eq!(" suggestion ".parse::<FeedbackKind>().unwrap(), FeedbackKind::Suggestion);
        assert!(matches!(
            "praise".parse::<FeedbackKind>(),
            Err(ValidationError::UnknownKind(kind)) if kind == "praise"
        ));
    }

    #[test]
    fn feedback_serializes_kind_under_type_column() {
        let feedback = NewFeedback {
            kind: FeedbackKind::Complaint,
            category: "limpeza".to_string(),
            message: "Vestiário sujo".to_string(),
            user_name: None,
            user_phone: None,
            is_anonymous: true,
            status: FeedbackStatus::Pending,
        };
        let json = serde_json::to_value(&feedback).unwrap();
        assert_eq!(json["type"], "complaint");
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn status_round_trips_through_column_text() {
        for status in [
            FeedbackStatus::Pending,
            FeedbackStatus::InProgress,
            FeedbackStatus::Resolved,
        ] {
            assert_eq!(status.as_str().parse::<FeedbackStatus>().unwrap(), status);
        }
    }
}
