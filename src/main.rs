use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod admin;
mod catalog;
mod config;
mod error;
mod gateway;
mod models;
mod ratings;
mod report;
mod stats;
mod store;
mod view;

use config::Config;
use gateway::{FeedbackRequest, RatingRequest, SurveyRequest};
use models::{FeedbackKind, Professor, Stats, SurveyAnswer, SurveyAnswers};
use store::{Backend, Store};
use view::{Action, View};

#[derive(Parser)]
#[command(name = "gym-feedback")]
#[command(about = "Staff ratings, monthly survey and suggestion box for LIMIT FITNESS", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema (postgres backend only)
    InitDb,
    /// Load the default staff roster
    Seed,
    /// Import staff from a CSV file (name,specialty,avatar,active)
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List staff with their current rating
    Professors {
        /// Include inactive staff
        #[arg(long)]
        all: bool,
    },
    /// Show survey questions and feedback categories
    Catalog,
    /// Rate a professor or the front desk
    Rate {
        /// Professor id, full name or a unique part of the name
        #[arg(long)]
        professor: String,
        #[arg(long)]
        stars: i64,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Answer the monthly satisfaction survey
    Survey {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: Option<String>,
        /// QUESTION=VALUE, repeatable
        #[arg(long = "answer", value_parser = gateway::parse_answer_arg)]
        answers: Vec<(String, SurveyAnswer)>,
        #[arg(long)]
        accept_marketing: bool,
    },
    /// Send a suggestion or a complaint
    Feedback {
        /// suggestion or complaint
        #[arg(long)]
        kind: FeedbackKind,
        #[arg(long)]
        category: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        anonymous: bool,
    },
    /// Show average rating, total feedbacks and satisfaction
    Stats,
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "feedback-report.md")]
        out: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Submissions are validated before the backend is opened.
    match cli.command {
        Commands::Catalog => print_catalog(),
        Commands::InitDb => match open_backend()? {
            Backend::Postgres(pg) => {
                store::postgres::init_db(pg.pool()).await?;
                println!("Schema ready.");
            }
            Backend::Rest(_) => {
                anyhow::bail!("init-db needs a postgres:// backend url; the REST API cannot run migrations")
            }
        },
        Commands::Seed => {
            let backend = open_backend()?;
            let seeded = admin::seed(backend.store()).await?;
            println!("Seeded {seeded} staff members.");
        }
        Commands::Import { csv } => {
            let backend = open_backend()?;
            let imported = admin::import_roster(backend.store(), &csv).await?;
            println!("Imported {imported} staff members from {}.", csv.display());
        }
        Commands::Professors { all } => {
            let backend = open_backend()?;
            let professors = load_professors(backend.store(), !all).await;
            print_professors(&professors);
        }
        Commands::Rate {
            professor,
            stars,
            comment,
            name,
            phone,
        } => {
            let stars = gateway::stars(stars)?;
            let backend = open_backend()?;
            send_rating(backend.store(), &professor, stars, comment, name, phone).await?;
        }
        Commands::Survey {
            name,
            phone,
            email,
            answers,
            accept_marketing,
        } => {
            let (request, view) = survey_request(&name, &phone, email, answers, accept_marketing)?;
            let backend = open_backend()?;
            send_survey(backend.store(), request, view).await?;
        }
        Commands::Feedback {
            kind,
            category,
            message,
            name,
            phone,
            anonymous,
        } => {
            let (request, view) =
                feedback_request(kind, &category, &message, name, phone, anonymous)?;
            let backend = open_backend()?;
            send_feedback(backend.store(), request, view).await?;
        }
        Commands::Stats => {
            let backend = open_backend()?;
            let stats = stats::stats_or_fallback(stats::compute_stats(backend.store()).await);
            print_stats(&stats);
        }
        Commands::Report { out } => {
            let backend = open_backend()?;
            let store = backend.store();
            let stats = stats::compute_stats(store).await?;
            let professors = store.list_professors(false).await?;
            let feedbacks = store.list_feedbacks().await?;
            let report = report::build_report(Utc::now(), &stats, &professors, &feedbacks);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn open_backend() -> anyhow::Result<Backend> {
    let config = Config::from_env().context("backend configuration is incomplete")?;
    debug!(?config, "loaded configuration");
    Backend::open(&config).context("failed to open the feedback backend")
}

fn survey_request(
    name: &str,
    phone: &str,
    email: Option<String>,
    answers: Vec<(String, SurveyAnswer)>,
    accept_marketing: bool,
) -> anyhow::Result<(SurveyRequest, View)> {
    let mut view = View::Home.apply(Action::OpenSurvey)?;
    for (question, answer) in answers {
        view = view.apply(Action::Answer(question, answer))?;
    }
    let collected = match &view {
        View::Survey { answers } => answers.clone(),
        _ => SurveyAnswers::new(),
    };
    debug!(progress = view.survey_progress(), "survey answers collected");

    let request = SurveyRequest::new(name, phone, email, collected, accept_marketing)?;
    Ok((request, view))
}

fn feedback_request(
    kind: FeedbackKind,
    category: &str,
    message: &str,
    name: Option<String>,
    phone: Option<String>,
    anonymous: bool,
) -> anyhow::Result<(FeedbackRequest, View)> {
    if catalog::category(category).is_none() {
        warn!(%category, "category is not in the catalog");
    }
    let request = FeedbackRequest::new(kind, category, message, name, phone, anonymous)?;
    let view = View::Home.apply(Action::OpenFeedback(kind))?;
    Ok((request, view))
}

async fn send_rating(
    store: &dyn Store,
    professor: &str,
    stars: i16,
    comment: Option<String>,
    name: Option<String>,
    phone: Option<String>,
) -> anyhow::Result<()> {
    let professors = load_professors(store, true).await;
    let chosen = gateway::resolve_professor(&professors, professor)?.clone();
    let request = RatingRequest::new(chosen.id, i64::from(stars), comment, name, phone)?;

    let view = View::Home
        .apply(Action::OpenRate)?
        .apply(Action::SelectProfessor(chosen.clone()))?
        .apply(Action::SetRating(stars))?;
    println!("{} {} {}", chosen.avatar, chosen.name, catalog::rating_label(stars));

    gateway::settle("rating", gateway::submit_rating(store, request).await);
    finish(view)
}

async fn send_survey(store: &dyn Store, request: SurveyRequest, view: View) -> anyhow::Result<()> {
    gateway::settle("survey", gateway::submit_survey(store, request).await);
    finish(view)
}

async fn send_feedback(
    store: &dyn Store,
    request: FeedbackRequest,
    view: View,
) -> anyhow::Result<()> {
    gateway::settle("feedback", gateway::submit_feedback(store, request).await);
    finish(view)
}

/// Falls back to the built-in roster when the backend cannot be read.
async fn load_professors(store: &dyn Store, active_only: bool) -> Vec<Professor> {
    match store.list_professors(active_only).await {
        Ok(professors) => professors,
        Err(err) => {
            warn!(error = %err, "failed to load staff, showing default roster");
            catalog::fallback_professors()
        }
    }
}

fn finish(view: View) -> anyhow::Result<()> {
    let view = view.apply(Action::Submitted)?;
    debug!(screen = view.name(), "submission settled");
    println!();
    println!("Obrigado! Sua opinião foi registrada.");
    println!(
        "{} · {} · Instagram @{}",
        catalog::GYM.name,
        catalog::GYM.phone,
        catalog::GYM.instagram
    );
    let home = view.apply(Action::Reset)?;
    debug!(screen = home.name(), "ready for the next member");
    Ok(())
}

fn print_professors(professors: &[Professor]) {
    if professors.is_empty() {
        println!("No staff on the roster.");
        return;
    }
    for professor in professors {
        println!(
            "{} {} ({}) {:.1} ★ across {} reviews{}",
            professor.avatar,
            professor.name,
            professor.specialty,
            professor.rating,
            professor.reviews_count,
            if professor.active { "" } else { " [inactive]" }
        );
    }
}

fn print_stats(stats: &Stats) {
    println!("{} · {}", catalog::GYM.name, catalog::GYM.slogan);
    println!("Average rating: {:.1}", stats.average_rating);
    println!("Total feedbacks: {}", stats.total_feedbacks);
    println!("Satisfaction: {}%", stats.satisfaction_rate);
}

fn print_catalog() {
    println!("Survey questions:");
    for question in catalog::SURVEY_QUESTIONS.iter() {
        println!("  {}. {} [{}]", question.id, question.question, question.kind);
    }
    println!();
    println!("Feedback categories:");
    for category in catalog::FEEDBACK_CATEGORIES.iter() {
        println!("  {} {} ({})", category.icon, category.label, category.id);
    }
    println!();
    println!("{}", catalog::GYM.address);
    println!("{} · {}", catalog::GYM.phone, catalog::GYM.email);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;
    use crate::store::memory::MemoryStore;
    use crate::store::Collection;

    fn complaint() -> (FeedbackRequest, View) {
        feedback_request(
            FeedbackKind::Complaint,
            "limpeza",
            "Vestiário sujo",
            None,
            None,
            false,
        )
        .unwrap()
    }

    #[test]
    fn invalid_submissions_are_rejected_without_a_backend() {
        let err = survey_request("", "389", None, Vec::new(), false).unwrap_err();
        assert_eq!(err.to_string(), "name is required");

        let err = feedback_request(FeedbackKind::Suggestion, "aulas", "  ", None, None, false)
            .unwrap_err();
        assert_eq!(err.to_string(), "message is required");

        let err =
            survey_request("Bia", "389", None, vec![("42".to_string(), SurveyAnswer::Score(3))], false)
                .unwrap_err();
        assert_eq!(err.to_string(), "unknown survey question 42");
    }

    #[tokio::test]
    async fn failed_feedback_still_reaches_thanks() {
        let store = MemoryStore::failing();
        let (request, view) = complaint();
        assert!(send_feedback(&store, request, view).await.is_ok());
    }

    #[tokio::test]
    async fn feedback_against_unreachable_database_still_reaches_thanks() {
        let config = Config {
            backend_url: "postgres://feedback@127.0.0.1:1/gym".to_string(),
            api_key: "secret".to_string(),
            backend: BackendKind::Postgres,
            max_connections: 1,
        };
        let backend = Backend::open(&config).unwrap();
        let (request, view) = complaint();
        assert!(send_feedback(backend.store(), request, view).await.is_ok());
    }

    #[tokio::test]
    async fn rating_uses_fallback_roster_when_backend_is_down() {
        let store = MemoryStore::failing();
        let sent = send_rating(&store, "carlos", 5, None, None, None).await;
        assert!(sent.is_ok());
    }

    #[tokio::test]
    async fn rating_for_unknown_professor_is_rejected() {
        let store = MemoryStore::new().with_professor("Prof. Ana Santos", "Funcional");
        let sent = send_rating(&store, "Ricardo", 4, None, None, None).await;
        assert!(sent.is_err());
        assert_eq!(store.count(Collection::Ratings).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn survey_is_saved_and_finishes() {
        let store = MemoryStore::new();
        let (request, view) = survey_request(
            "Bia",
            "38999990000",
            None,
            vec![("6".to_string(), SurveyAnswer::Score(9))],
            true,
        )
        .unwrap();
        send_survey(&store, request, view).await.unwrap();
        assert_eq!(store.surveys()[0].nps_score, Some(9));
    }
}
