use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::catalog::{self, GYM};
use crate::models::{CategorySummary, Feedback, FeedbackKind, FeedbackStatus, Professor, Stats};

pub fn summarize_by_category(feedbacks: &[Feedback]) -> Vec<CategorySummary> {
    let mut map: BTreeMap<String, (usize, usize)> = BTreeMap::new();

    for feedback in feedbacks {
        let entry = map.entry(feedback.category.clone()).or_insert((0, 0));
        match feedback.kind {
            FeedbackKind::Suggestion => entry.0 += 1,
            FeedbackKind::Complaint => entry.1 += 1,
        }
    }

    let mut summaries: Vec<CategorySummary> = map
        .into_iter()
        .map(|(category, (suggestions, complaints))| CategorySummary {
            category,
            suggestions,
            complaints,
        })
        .collect();

    summaries.sort_by(|a, b| b.total().cmp(&a.total()));
    summaries
}

/// Professors with the best mean first; review count breaks ties.
pub fn leaderboard(professors: &[Professor]) -> Vec<Professor> {
    let mut ranked = professors.to_vec();
    ranked.sort_by(|a, b| {
        b.rating
            .partial_cmp(&a.rating)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.reviews_count.cmp(&a.reviews_count))
    });
    ranked
}

pub fn build_report(
    generated_at: DateTime<Utc>,
    stats: &Stats,
    professors: &[Professor],
    feedbacks: &[Feedback],
) -> String {
    let ranked = leaderboard(professors);
    let summaries = summarize_by_category(feedbacks);

    let mut output = String::new();

    let _ = writeln!(output, "# {} Feedback Report", GYM.name);
    let _ = writeln!(output, "Generated {}", generated_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Headline");
    let _ = writeln!(output, "- Average rating: {:.1}", stats.average_rating);
    let _ = writeln!(output, "- Total feedbacks: {}", stats.total_feedbacks);
    let _ = writeln!(output, "- Satisfaction: {}%", stats.satisfaction_rate);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Staff Ratings");

    if ranked.is_empty() {
        let _ = writeln!(output, "No staff on the roster.");
    } else {
        for professor in ranked.iter() {
            let _ = writeln!(
                output,
                "- {} {} ({}) {:.1} across {} reviews",
                professor.avatar,
                professor.name,
                professor.specialty,
                professor.rating,
                professor.reviews_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Feedback Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No suggestions or complaints recorded.");
    } else {
        for summary in summaries.iter() {
            let label = catalog::category(&summary.category)
                .map(|c| c.label)
                .unwrap_or(summary.category.as_str());
            let _ = writeln!(
                output,
                "- {}: {} suggestions, {} complaints",
                label, summary.suggestions, summary.complaints
            );
        }
    }

    let open: Vec<&Feedback> = feedbacks
        .iter()
        .filter(|f| f.status != FeedbackStatus::Resolved)
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Open Tickets");

    if open.is_empty() {
        let _ = writeln!(output, "Nothing waiting on staff.");
    } else {
        for feedback in open.iter().take(10) {
            let _ = writeln!(
                output,
                "- [{}] {} / {} on {}: {}",
                feedback.status.as_str(),
                feedback.kind,
                feedback.category,
                feedback.created_at.date_naive(),
                feedback.message
            );
        }
    }

    output
}
