//! Seed data import
//!
//! A seed directory holds one JSON array per resource (`tours.json`,
//! `users.json`, `reviews.json`, `bookings.json`). Missing files are skipped.
//! Files are imported in dependency order, each one all-or-nothing, and
//! tour ratings are recomputed from the imported reviews afterwards.

use std::fmt;
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::repository::{Document, MemoryDatabase};
use crate::resources::{Collections, ResourceKind};

/// What an import loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Documents imported per resource, in import order
    pub imported: Vec<(ResourceKind, usize)>,
    /// Resources whose seed file was absent
    pub skipped: Vec<ResourceKind>,
    /// Tours whose ratings were recomputed
    pub tours_rated: usize,
}

impl SeedReport {
    /// Total number of imported documents.
    pub fn total(&self) -> usize {
        self.imported.iter().map(|(_, count)| count).sum()
    }

    pub fn count(&self, kind: ResourceKind) -> Option<usize> {
        self.imported
            .iter()
            .find(|(imported, _)| *imported == kind)
            .map(|(_, count)| *count)
    }
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .imported
            .iter()
            .map(|(kind, count)| format!("{kind}: {count}"))
            .collect();
        write!(f, "{} documents ({})", self.total(), parts.join(", "))
    }
}

/// Import every seed file found in `dir` into `collections`.
pub async fn import_dir(collections: &Collections, dir: impl AsRef<Path>) -> Result<SeedReport> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::seed(dir, "seed directory does not exist"));
    }

    let mut report = SeedReport::default();
    for kind in ResourceKind::ALL {
        let path = dir.join(kind.seed_file());
        if !path.exists() {
            tracing::debug!(collection = kind.collection(), path = %path.display(), "no seed file");
            report.skipped.push(kind);
            continue;
        }

        let docs = read_documents(&path).await?;
        let count = collections
            .get(kind)
            .import(docs, kind.import_mode())
            .await
            .map_err(|err| Error::seed(&path, err.message))?;
        tracing::info!(collection = kind.collection(), count, "seed data imported");
        report.imported.push((kind, count));
    }

    if report.count(ResourceKind::Reviews).is_some() {
        report.tours_rated = collections.ratings().recalculate_all().await?;
    }
    Ok(report)
}

/// Validate the seed files in `dir` against a scratch database.
pub async fn check_dir(dir: impl AsRef<Path>) -> Result<SeedReport> {
    let scratch = MemoryDatabase::new();
    import_dir(&Collections::register(&scratch), dir).await
}

/// Remove every document from every collection.
pub async fn clear(db: &MemoryDatabase) {
    db.clear().await;
    tracing::info!("all collections cleared");
}

async fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let value: Value = serde_json::from_str(&raw).map_err(|err| Error::seed(path, err.to_string()))?;
    let Value::Array(items) = value else {
        return Err(Error::seed(path, "expected an array of documents"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(doc) => Ok(doc),
            _ => Err(Error::seed(path, format!("item {index} is not an object"))),
        })
        .collect()
}
