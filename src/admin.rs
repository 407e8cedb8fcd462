use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::catalog;
use crate::models::NewProfessor;
use crate::store::Store;

/// Upserts the default roster. Safe to run repeatedly.
pub async fn seed<S: Store + ?Sized>(store: &S) -> anyhow::Result<usize> {
    let roster = catalog::default_roster();
    for professor in roster.iter() {
        store
            .upsert_professor(professor)
            .await
            .with_context(|| format!("failed to seed {}", professor.name))?;
    }
    info!(count = roster.len(), "seeded roster");
    Ok(roster.len())
}

/// Reads `name,specialty,avatar,active` rows; `avatar` and `active` may be
/// left blank.
pub fn read_roster(csv_path: &Path) -> anyhow::Result<Vec<NewProfessor>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        name: String,
        specialty: String,
        avatar: Option<String>,
        active: Option<bool>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut roster = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("bad roster row {}", index + 1))?;
        let name = row.name.trim();
        if name.is_empty() {
            anyhow::bail!("roster row {} has no name", index + 1);
        }
        roster.push(NewProfessor {
            name: name.to_string(),
            specialty: row.specialty.trim().to_string(),
            avatar: row.avatar.unwrap_or_default(),
            active: row.active.unwrap_or(true),
        });
    }

    Ok(roster)
}

pub async fn import_roster<S: Store + ?Sized>(store: &S, csv_path: &Path) -> anyhow::Result<usize> {
    let roster = read_roster(csv_path)?;
    let mut imported = 0usize;

    for professor in roster.iter() {
        store.upsert_professor(professor).await?;
        imported += 1;
    }

    info!(imported, path = %csv_path.display(), "imported roster");
    Ok(imported)
}
