//! In-memory paper store
//!
//! A Vec-backed [`PaperStore`] used by the test suite and by local runs
//! without PostgreSQL. Insertion order is the iteration order, which
//! makes pagination deterministic without any sorting.

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use async_trait::async_trait;

use crate::catalog::PageRequest;
use crate::errors::{AppError, Result};
use crate::moderation::{ModerationTransition, PaperStatus};
use crate::store::{NewPaper, PaperFilter, PaperRecord, PaperStore};

#[derive(Default)]
struct Inner {
    papers: Vec<PaperRecord>,
    transitions: Vec<ModerationTransition>,
}

/// In-memory fake of the external paper record store
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a submission the way the real store would: fresh id,
    /// `pending` status, stamped `submitted_at`.
    pub async fn insert(&self, new: NewPaper) -> PaperRecord {
        let record = PaperRecord {
            id: Uuid::new_v4(),
            title: new.title,
            abstract_text: new.abstract_text,
            category: new.category,
            status: PaperStatus::Pending,
            university: new.university,
            field_of_study: new.field_of_study,
            authors: new.authors,
            author_id: new.author_id,
            keywords: new.keywords,
            pdf_url: new.pdf_url,
            doi: new.doi,
            published_at: new.published_at,
            like_count: 0,
            download_count: 0,
            submitted_at: Utc::now(),
        };
        self.inner.write().await.papers.push(record.clone());
        record
    }

    /// Seed a fully formed record, preserving its id and status
    pub async fn seed(&self, record: PaperRecord) {
        self.inner.write().await.papers.push(record);
    }

    /// Snapshot of every stored transition, for test assertions
    pub async fn all_transitions(&self) -> Vec<ModerationTransition> {
        self.inner.read().await.transitions.clone()
    }
}

#[async_trait]
impl PaperStore for MemoryStore {
    async fn find_paper(&self, id: Uuid) -> Result<Option<PaperRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.papers.iter().find(|p| p.id == id).cloned())
    }

    async fn find_papers(
        &self,
        filter: &PaperFilter,
        page: PageRequest,
    ) -> Result<(Vec<PaperRecord>, u64)> {
        let inner = self.inner.read().await;
        let matches: Vec<&PaperRecord> =
            inner.papers.iter().filter(|p| filter.matches(p)).collect();
        let total = matches.len() as u64;

        let items = matches
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .cloned()
            .collect();

        Ok((items, total))
    }

    async fn count_papers(&self, filter: &PaperFilter) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.papers.iter().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn apply_transition(&self, transition: &ModerationTransition) -> Result<PaperRecord> {
        let mut inner = self.inner.write().await;

        let paper = inner
            .papers
            .iter_mut()
            .find(|p| p.id == transition.paper_id)
            .ok_or_else(|| AppError::PaperNotFound {
                id: transition.paper_id.to_string(),
            })?;

        paper.status = transition.to_status;
        let updated = paper.clone();
        inner.transitions.push(transition.clone());

        Ok(updated)
    }

    async fn transitions_for(&self, paper_id: Uuid) -> Result<Vec<ModerationTransition>> {
        let inner = self.inner.read().await;
        Ok(inner
            .transitions
            .iter()
            .filter(|t| t.paper_id == paper_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PaperCategory;

    fn submission(title: &str) -> NewPaper {
        NewPaper {
            title: title.to_string(),
            abstract_text: None,
            category: PaperCategory::Other,
            university: "Test University".to_string(),
            field_of_study: "Other".to_string(),
            authors: vec!["A. Author".to_string()],
            author_id: None,
            keywords: vec![],
            pdf_url: "https://blobs.example/t.pdf".to_string(),
            doi: None,
            published_at: None,
            submission_key: None,
        }
    }

    #[tokio::test]
    async fn test_insertion_order_is_stable() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.insert(submission(&format!("Paper {}", i))).await;
        }

        let (page, total) = store
            .find_papers(&PaperFilter::default(), PageRequest::new(1, 3).unwrap())
            .await
            .unwrap();

        assert_eq!(total, 5);
        assert_eq!(page[0].title, "Paper 0");
        assert_eq!(page[2].title, "Paper 2");

        let (rest, _) = store
            .find_papers(&PaperFilter::default(), PageRequest::new(2, 3).unwrap())
            .await
            .unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].title, "Paper 3");
    }

    #[tokio::test]
    async fn test_new_papers_start_pending() {
        let store = MemoryStore::new();
        let record = store.insert(submission("Fresh")).await;
        assert_eq!(record.status, PaperStatus::Pending);
        assert_eq!(record.like_count, 0);
    }
}
