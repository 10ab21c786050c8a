//! Paper record store abstraction
//!
//! The catalog query service and the moderation state machine never own
//! paper records; they hold a read/transition contract to an external
//! store. [`PaperStore`] is that contract: the PostgreSQL adapter
//! (`db::Repository`) implements it in production and [`memory::MemoryStore`]
//! implements it for tests and local runs without a database.

pub mod memory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{PageRequest, PaperCategory};
use crate::errors::{AppError, Result};
use crate::moderation::{ModerationTransition, PaperStatus};

/// A paper record as owned by the external store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub id: Uuid,
    pub title: String,
    pub abstract_text: Option<String>,
    pub category: PaperCategory,
    pub status: PaperStatus,
    pub university: String,
    pub field_of_study: String,
    /// Ordered author list; the first entry is the display author
    pub authors: Vec<String>,
    /// Submitting user, when known
    pub author_id: Option<Uuid>,
    pub keywords: Vec<String>,
    /// Opaque blob-store reference
    pub pdf_url: String,
    pub doi: Option<String>,
    pub published_at: Option<NaiveDate>,
    pub like_count: u64,
    pub download_count: u64,
    pub submitted_at: DateTime<Utc>,
}

/// Fields supplied when a paper is submitted; the store assigns the id,
/// sets `status = pending` and stamps `submitted_at`.
#[derive(Debug, Clone)]
pub struct NewPaper {
    pub title: String,
    pub abstract_text: Option<String>,
    pub category: PaperCategory,
    pub university: String,
    pub field_of_study: String,
    pub authors: Vec<String>,
    pub author_id: Option<Uuid>,
    pub keywords: Vec<String>,
    pub pdf_url: String,
    pub doi: Option<String>,
    pub published_at: Option<NaiveDate>,
    /// Content fingerprint used to dedupe resubmissions
    pub submission_key: Option<String>,
}

/// Predicate pushed to the store.
///
/// Equality filters on category/status/author, case-insensitive substring
/// filter on title, any author name, and university. The PostgreSQL
/// adapter translates the term to ILIKE server-side; stores without text
/// search apply [`PaperFilter::matches`] client-side.
#[derive(Debug, Clone, Default)]
pub struct PaperFilter {
    pub term: Option<String>,
    pub category: Option<PaperCategory>,
    pub status: Option<PaperStatus>,
    pub author_id: Option<Uuid>,
}

impl PaperFilter {
    pub fn approved() -> Self {
        Self {
            status: Some(PaperStatus::Approved),
            ..Self::default()
        }
    }

    /// Whether a record satisfies this filter
    pub fn matches(&self, record: &PaperRecord) -> bool {
        if let Some(category) = self.category {
            if record.category != category {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(author_id) = self.author_id {
            if record.author_id != Some(author_id) {
                return false;
            }
        }
        if let Some(ref term) = self.term {
            if !term_matches(record, term) {
                return false;
            }
        }
        true
    }
}

/// Case-insensitive substring match against title, any author, or
/// university. This is the whole search contract: no ranking, no
/// tokenization.
pub fn term_matches(record: &PaperRecord, term: &str) -> bool {
    let needle = term.to_lowercase();
    record.title.to_lowercase().contains(&needle)
        || record.university.to_lowercase().contains(&needle)
        || record
            .authors
            .iter()
            .any(|author| author.to_lowercase().contains(&needle))
}

/// Read/transition contract to the external paper record store.
///
/// Implementations return results in stable insertion order
/// (`submitted_at`, then id) so pagination is deterministic.
#[async_trait]
pub trait PaperStore: Send + Sync {
    /// Fetch a single record by id
    async fn find_paper(&self, id: Uuid) -> Result<Option<PaperRecord>>;

    /// Fetch one page of records matching the filter, plus the total
    /// number of matches
    async fn find_papers(
        &self,
        filter: &PaperFilter,
        page: PageRequest,
    ) -> Result<(Vec<PaperRecord>, u64)>;

    /// Count records matching the filter
    async fn count_papers(&self, filter: &PaperFilter) -> Result<u64>;

    /// Atomically apply a validated status transition and append its
    /// audit entry. Either both are committed or neither is.
    async fn apply_transition(&self, transition: &ModerationTransition) -> Result<PaperRecord>;

    /// Audit entries for a paper, oldest first
    async fn transitions_for(&self, paper_id: Uuid) -> Result<Vec<ModerationTransition>>;
}

/// Bound a store call to the configured upstream timeout.
///
/// The store is an external collaborator; rather than block indefinitely
/// on a hung connection, expiry surfaces as `Upstream` and the caller may
/// re-issue.
pub async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Upstream {
            message: format!("store call exceeded {}s bound", limit.as_secs()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, authors: &[&str], university: &str) -> PaperRecord {
        PaperRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            abstract_text: None,
            category: PaperCategory::Other,
            status: PaperStatus::Approved,
            university: university.to_string(),
            field_of_study: "Other".to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            author_id: None,
            keywords: vec![],
            pdf_url: "https://blobs.example/x.pdf".to_string(),
            doi: None,
            published_at: None,
            like_count: 0,
            download_count: 0,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_term_matches_title_case_insensitive() {
        let r = record("Quantum Entanglement in Computing", &["Prof. Maria Santos"], "Caltech");
        assert!(term_matches(&r, "entangle"));
        assert!(term_matches(&r, "ENTANGLE"));
        assert!(!term_matches(&r, "blockchain"));
    }

    #[test]
    fn test_term_matches_any_author_and_university() {
        let r = record("Smart Contracts", &["Prof. James Wilson", "Dr. Lisa Wang"], "MIT");
        assert!(term_matches(&r, "wang"));
        assert!(term_matches(&r, "mit"));
    }

    #[test]
    fn test_filter_combines_conjunctively() {
        let r = record("Neural Networks for Climate", &["Dr. Michael Brown"], "UC Berkeley");
        let mut filter = PaperFilter {
            term: Some("climate".to_string()),
            status: Some(PaperStatus::Approved),
            ..PaperFilter::default()
        };
        assert!(filter.matches(&r));

        filter.category = Some(PaperCategory::Blockchain);
        assert!(!filter.matches(&r));
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<()> = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(AppError::Upstream { .. })));
    }
}
