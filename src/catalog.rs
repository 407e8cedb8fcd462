//! Fixed content of the feedback flow: survey questions, feedback
//! categories, rating labels, the gym's contact details and the default
//! roster used for seeding and as the offline fallback.

use std::fmt;

use uuid::Uuid;

use crate::models::{NewProfessor, Professor};

/// Question whose numeric answer is stored as the NPS score.
pub const NPS_QUESTION_ID: &str = "6";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Rating,
    YesNo,
    Nps,
    Text,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QuestionKind::Rating => "1-5",
            QuestionKind::YesNo => "Sim/Não",
            QuestionKind::Nps => "0-10",
            QuestionKind::Text => "texto",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurveyQuestion {
    pub id: &'static str,
    pub question: &'static str,
    pub kind: QuestionKind,
}

pub const SURVEY_QUESTIONS: [SurveyQuestion; 7] = [
    SurveyQuestion {
        id: "1",
        question: "Como você avalia a limpeza e higiene da academia?",
        kind: QuestionKind::Rating,
    },
    SurveyQuestion {
        id: "2",
        question: "Os equipamentos estão em bom estado de conservação?",
        kind: QuestionKind::Rating,
    },
    SurveyQuestion {
        id: "3",
        question: "A climatização (ar-condicionado/ventilação) é adequada?",
        kind: QuestionKind::Rating,
    },
    SurveyQuestion {
        id: "4",
        question: "O horário de funcionamento atende suas necessidades?",
        kind: QuestionKind::YesNo,
    },
    SurveyQuestion {
        id: "5",
        question: "Você está satisfeito com o atendimento dos professores?",
        kind: QuestionKind::Rating,
    },
    SurveyQuestion {
        id: NPS_QUESTION_ID,
        question: "De 0 a 10, qual a probabilidade de indicar a LIMIT para um amigo?",
        kind: QuestionKind::Nps,
    },
    SurveyQuestion {
        id: "7",
        question: "O que podemos melhorar para você?",
        kind: QuestionKind::Text,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
}

pub const FEEDBACK_CATEGORIES: [Category; 7] = [
    Category { id: "equipamentos", label: "Equipamentos", icon: "🏋️" },
    Category { id: "limpeza", label: "Limpeza", icon: "🧹" },
    Category { id: "atendimento", label: "Atendimento", icon: "👥" },
    Category { id: "horarios", label: "Horários", icon: "🕐" },
    Category { id: "aulas", label: "Aulas", icon: "📋" },
    Category { id: "estrutura", label: "Estrutura", icon: "🏢" },
    Category { id: "outros", label: "Outros", icon: "📝" },
];

pub fn category(id: &str) -> Option<&'static Category> {
    FEEDBACK_CATEGORIES.iter().find(|c| c.id == id)
}

pub fn question(id: &str) -> Option<&'static SurveyQuestion> {
    SURVEY_QUESTIONS.iter().find(|q| q.id == id)
}

/// Label for a 1–5 star rating.
pub fn rating_label(stars: i16) -> &'static str {
    match stars {
        1 => "😞 Péssimo",
        2 => "😕 Ruim",
        3 => "😐 Regular",
        4 => "😊 Bom",
        5 => "🤩 Excelente",
        _ => "",
    }
}

pub struct GymInfo {
    pub name: &'static str,
    pub slogan: &'static str,
    pub address: &'static str,
    pub phone: &'static str,
    pub instagram: &'static str,
    pub email: &'static str,
}

pub const GYM: GymInfo = GymInfo {
    name: "LIMIT FITNESS",
    slogan: "Treine até o seu limite!",
    address: "Av. Othon Bezerra de Melo, 2025 - Centro, Curvelo-MG",
    phone: "(38) 99866-5666",
    instagram: "academialimitfitness",
    email: "limitcurvelo@gmail.com",
};

// name, specialty, avatar, rating, reviews
const ROSTER: [(&str, &str, &str, f64, i32); 6] = [
    ("Prof. Carlos Silva", "Musculação", "💪", 4.8, 124),
    ("Prof. Ana Santos", "Funcional", "🏃‍♀️", 4.9, 98),
    ("Prof. Ricardo Lima", "Personal Trainer", "🎯", 4.7, 156),
    ("Prof. Marina Costa", "Spinning", "🚴", 4.9, 87),
    ("Prof. João Pedro", "Crossfit", "🔥", 4.6, 72),
    ("Recepção", "Atendimento Geral", "👋", 4.8, 203),
];

/// Default staff roster used by `seed`.
pub fn default_roster() -> Vec<NewProfessor> {
    ROSTER
        .iter()
        .map(|(name, specialty, avatar, _, _)| NewProfessor {
            name: name.to_string(),
            specialty: specialty.to_string(),
            avatar: avatar.to_string(),
            active: true,
        })
        .collect()
}

/// Roster shown when the backend cannot be read. Ids are fixed placeholders
/// that do not exist in storage, so ratings against them fail to persist.
pub fn fallback_professors() -> Vec<Professor> {
    ROSTER
        .iter()
        .enumerate()
        .map(|(index, (name, specialty, avatar, rating, reviews))| Professor {
            id: Uuid::from_u128(index as u128 + 1),
            name: name.to_string(),
            specialty: specialty.to_string(),
            avatar: avatar.to_string(),
            rating: *rating,
            reviews_count: *reviews,
            active: true,
            created_at: None,
        })
        .collect()
}
