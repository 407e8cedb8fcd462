//! Screen flow of the feedback app as a finite-state machine.
//!
//! Every screen is one `View` variant carrying only the data that screen
//! collects; `Action`s are the only way to move between them.

use thiserror::Error;

use crate::catalog::{self, SURVEY_QUESTIONS};
use crate::models::{FeedbackKind, Professor, SurveyAnswer, SurveyAnswers};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum View {
    #[default]
    Home,
    Rate {
        professor: Option<Professor>,
        rating: Option<i16>,
    },
    Survey {
        answers: SurveyAnswers,
    },
    Feedback {
        kind: FeedbackKind,
    },
    Thanks,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    OpenRate,
    OpenSurvey,
    OpenFeedback(FeedbackKind),
    SelectProfessor(Professor),
    SetRating(i16),
    Answer(String, SurveyAnswer),
    Submitted,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{action} is not available on the {view} screen")]
    NotAvailable {
        view: &'static str,
        action: &'static str,
    },

    #[error("pick a professor and a rating before submitting")]
    IncompleteRating,

    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i16),

    #[error("unknown survey question {0}")]
    UnknownQuestion(String),
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::Home => "home",
            View::Rate { .. } => "rate",
            View::Survey { .. } => "survey",
            View::Feedback { .. } => "feedback",
            View::Thanks => "thanks",
        }
    }

    pub fn apply(self, action: Action) -> Result<View, TransitionError> {
        match (self, action) {
            (_, Action::Reset) => Ok(View::Home),

            (View::Home, Action::OpenRate) => Ok(View::Rate {
                professor: None,
                rating: None,
            }),
            (View::Home, Action::OpenSurvey) => Ok(View::Survey {
                answers: SurveyAnswers::new(),
            }),
            (View::Home, Action::OpenFeedback(kind)) => Ok(View::Feedback { kind }),

            (View::Rate { rating, .. }, Action::SelectProfessor(professor)) => Ok(View::Rate {
                professor: Some(professor),
                rating,
            }),
            (View::Rate { professor, .. }, Action::SetRating(value)) => {
                if !(1..=5).contains(&value) {
                    return Err(TransitionError::RatingOutOfRange(value));
                }
                Ok(View::Rate {
                    professor,
                    rating: Some(value),
                })
            }
            (
                View::Rate {
                    professor: Some(_),
                    rating: Some(_),
                },
                Action::Submitted,
            ) => Ok(View::Thanks),
            (View::Rate { .. }, Action::Submitted) => Err(TransitionError::IncompleteRating),

            (View::Survey { mut answers }, Action::Answer(question, value)) => {
                if catalog::question(&question).is_none() {
                    return Err(TransitionError::UnknownQuestion(question));
                }
                answers.insert(question, value);
                Ok(View::Survey { answers })
            }
            (View::Survey { .. }, Action::Submitted) => Ok(View::Thanks),
            (View::Feedback { .. }, Action::Submitted) => Ok(View::Thanks),

            (view, action) => Err(TransitionError::NotAvailable {
                view: view.name(),
                action: action.name(),
            }),
        }
    }

    /// Fraction of survey questions answered, 0.0 outside the survey.
    pub fn survey_progress(&self) -> f64 {
        match self {
            View::Survey { answers } => answers.len() as f64 / SURVEY_QUESTIONS.len() as f64,
            _ => 0.0,
        }
    }
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::OpenRate => "open rate",
            Action::OpenSurvey => "open survey",
            Action::OpenFeedback(_) => "open feedback",
            Action::SelectProfessor(_) => "select professor",
            Action::SetRating(_) => "set rating",
            Action::Answer(..) => "answer",
            Action::Submitted => "submit",
            Action::Reset => "reset",
        }
    }
}
