//! Catalog query service
//!
//! One query contract shared by the public catalog (featured listing,
//! free-text search, paper count) and the admin review queue, so every
//! page of the portal composes filters and pagination the same way.
//!
//! Results are returned in the stable insertion order of the backing
//! store (`submitted_at`, then id). There is deliberately no relevance
//! ranking: search is a case-insensitive substring match over title,
//! authors, and university, nothing more.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::{keys, Cache};
use crate::errors::{AppError, Result};
use crate::moderation::PaperStatus;
use crate::store::{bounded, PaperFilter, PaperRecord, PaperStore};
use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Research field a paper is filed under
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaperCategory {
    AiMl,
    Blockchain,
    Biomedical,
    QuantumComputing,
    Other,
}

impl PaperCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperCategory::AiMl => "ai-ml",
            PaperCategory::Blockchain => "blockchain",
            PaperCategory::Biomedical => "biomedical",
            PaperCategory::QuantumComputing => "quantum-computing",
            PaperCategory::Other => "other",
        }
    }

    /// Parse a category filter value. The sentinel `all` (or an absent
    /// value) means "no category filter" and is never an enum variant.
    pub fn parse_filter(value: Option<&str>) -> Result<Option<PaperCategory>> {
        match value {
            None | Some("all") | Some("") => Ok(None),
            Some(other) => other.parse().map(Some),
        }
    }
}

impl fmt::Display for PaperCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaperCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ai-ml" => Ok(PaperCategory::AiMl),
            "blockchain" => Ok(PaperCategory::Blockchain),
            "biomedical" => Ok(PaperCategory::Biomedical),
            "quantum-computing" => Ok(PaperCategory::QuantumComputing),
            "other" => Ok(PaperCategory::Other),
            other => Err(AppError::InvalidQuery {
                message: format!("unknown category '{}'", other),
            }),
        }
    }
}

/// One page of a query, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Validate raw pagination input. `page` must be >= 1; a zero
    /// `page_size` falls back to the default; anything above the maximum
    /// is rejected rather than clamped.
    pub fn new(page: u32, page_size: u32) -> Result<Self> {
        if page == 0 {
            return Err(AppError::InvalidQuery {
                message: "page must be >= 1".to_string(),
            });
        }
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        if page_size > MAX_PAGE_SIZE {
            return Err(AppError::InvalidQuery {
                message: format!("page_size must be <= {}", MAX_PAGE_SIZE),
            });
        }
        Ok(Self { page, page_size })
    }

    pub fn first() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Zero-based item offset of this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// A page of results plus the total match count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Query specification for the admin review queue
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    pub term: Option<String>,
    pub category: Option<PaperCategory>,
    pub status: Option<PaperStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl QuerySpec {
    /// Normalize into a store filter and a validated page request.
    /// A whitespace-only term is treated as absent here; the dedicated
    /// `search` operation is stricter.
    pub fn normalize(&self) -> Result<(PaperFilter, PageRequest)> {
        let term = self
            .term
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let page = PageRequest::new(self.page.unwrap_or(1), self.page_size.unwrap_or(0))?;

        Ok((
            PaperFilter {
                term,
                category: self.category,
                status: self.status,
                author_id: None,
            },
            page,
        ))
    }
}

/// Immutable snapshot of a paper as returned by catalog queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperSummary {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub author_name: Option<String>,
    pub author_id: Option<Uuid>,
    pub category: PaperCategory,
    pub published_date: Option<NaiveDate>,
    pub like_count: u64,
}

impl From<PaperRecord> for PaperSummary {
    fn from(record: PaperRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            abstract_text: record.abstract_text,
            author_name: record.authors.first().cloned(),
            author_id: record.author_id,
            category: record.category,
            published_date: record.published_at,
            like_count: record.like_count,
        }
    }
}

/// Catalog query service over an injected paper store.
///
/// All operations are read-only with respect to paper records; none
/// mutates anything. Store calls are bounded by the configured upstream
/// timeout. The total count may be served from a best-effort cache and
/// is allowed to lag the store.
pub struct CatalogService {
    store: Arc<dyn PaperStore>,
    cache: Option<Arc<Cache>>,
    upstream_timeout: Duration,
    count_cache_ttl_secs: u64,
}

impl CatalogService {
    pub fn new(store: Arc<dyn PaperStore>, upstream_timeout: Duration) -> Self {
        Self {
            store,
            cache: None,
            upstream_timeout,
            count_cache_ttl_secs: 60,
        }
    }

    /// Attach a cache for the paper count path
    pub fn with_cache(mut self, cache: Arc<Cache>, ttl_secs: u64) -> Self {
        self.cache = Some(cache);
        self.count_cache_ttl_secs = ttl_secs;
        self
    }

    /// Approved papers for the home page, optionally scoped to one
    /// category. `None` means all categories.
    pub async fn list_featured(
        &self,
        category: Option<PaperCategory>,
        page: PageRequest,
    ) -> Result<Page<PaperSummary>> {
        let filter = PaperFilter {
            category,
            ..PaperFilter::approved()
        };
        self.run_query("featured", &filter, page).await
    }

    /// Free-text search over approved papers.
    ///
    /// The term is matched case-insensitively as a substring of the
    /// title, any author name, or the university. An empty or
    /// whitespace-only term is a caller error.
    pub async fn search(&self, term: &str, page: PageRequest) -> Result<Page<PaperSummary>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(AppError::InvalidQuery {
                message: "search term must not be empty".to_string(),
            });
        }

        let filter = PaperFilter {
            term: Some(term.to_string()),
            ..PaperFilter::approved()
        };
        self.run_query("search", &filter, page).await
    }

    /// Total approved-paper count. Side-effect-free; served from the
    /// cache when one is attached and falls back to the store on any
    /// cache failure.
    pub async fn count(&self) -> Result<u64> {
        if let Some(ref cache) = self.cache {
            match cache.get::<u64>(keys::PAPER_COUNT).await {
                Ok(Some(count)) => {
                    crate::metrics::record_cache(true, "paper_count");
                    return Ok(count);
                }
                Ok(None) => crate::metrics::record_cache(false, "paper_count"),
                Err(e) => tracing::warn!(error = %e, "Count cache read failed, using store"),
            }
        }

        let count = bounded(
            self.upstream_timeout,
            self.store.count_papers(&PaperFilter::approved()),
        )
        .await?;

        if let Some(ref cache) = self.cache {
            if let Err(e) = cache
                .set_with_ttl(keys::PAPER_COUNT, &count, self.count_cache_ttl_secs)
                .await
            {
                tracing::warn!(error = %e, "Failed to cache paper count, continuing");
            }
        }

        Ok(count)
    }

    /// Admin review queue: free-text term AND status AND category over
    /// papers in every status, returning full records for the admin
    /// table.
    pub async fn review_queue(&self, spec: &QuerySpec) -> Result<Page<PaperRecord>> {
        let (filter, page) = spec.normalize()?;
        let start = Instant::now();

        let (records, total) =
            bounded(self.upstream_timeout, self.store.find_papers(&filter, page)).await?;

        crate::metrics::record_catalog_query(
            "review_queue",
            start.elapsed().as_secs_f64(),
            records.len(),
        );

        Ok(Page::new(records, total, page))
    }

    async fn run_query(
        &self,
        operation: &'static str,
        filter: &PaperFilter,
        page: PageRequest,
    ) -> Result<Page<PaperSummary>> {
        let start = Instant::now();

        let (records, total) =
            bounded(self.upstream_timeout, self.store.find_papers(filter, page)).await?;

        crate::metrics::record_catalog_query(
            operation,
            start.elapsed().as_secs_f64(),
            records.len(),
        );
        tracing::debug!(
            operation,
            results = records.len(),
            total,
            page = page.page,
            "Catalog query completed"
        );

        Ok(Page::new(records, total, page).map(PaperSummary::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!(
            "quantum-computing".parse::<PaperCategory>().unwrap(),
            PaperCategory::QuantumComputing
        );
        assert!("quantum computing".parse::<PaperCategory>().is_err());
    }

    #[test]
    fn test_category_filter_all_is_none() {
        assert_eq!(PaperCategory::parse_filter(Some("all")).unwrap(), None);
        assert_eq!(PaperCategory::parse_filter(None).unwrap(), None);
        assert_eq!(
            PaperCategory::parse_filter(Some("biomedical")).unwrap(),
            Some(PaperCategory::Biomedical)
        );
        assert!(PaperCategory::parse_filter(Some("physics")).is_err());
    }

    #[test]
    fn test_page_request_validation() {
        assert!(PageRequest::new(0, 20).is_err());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE + 1).is_err());

        let page = PageRequest::new(3, 0).unwrap();
        assert_eq!(page.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(page.offset(), 2 * u64::from(DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn test_query_spec_blank_term_dropped() {
        let spec = QuerySpec {
            term: Some("   ".to_string()),
            ..QuerySpec::default()
        };
        let (filter, page) = spec.normalize().unwrap();
        assert!(filter.term.is_none());
        assert_eq!(page, PageRequest::first());
    }

    #[test]
    fn test_summary_takes_first_author() {
        use crate::moderation::PaperStatus;
        use chrono::Utc;

        let record = PaperRecord {
            id: Uuid::new_v4(),
            title: "Federated Learning for Privacy-Preserving AI".to_string(),
            abstract_text: Some("abstract".to_string()),
            category: PaperCategory::AiMl,
            status: PaperStatus::Approved,
            university: "Carnegie Mellon University".to_string(),
            field_of_study: "AI/ML".to_string(),
            authors: vec!["Dr. Lisa Wang".to_string(), "Dr. Omar Haddad".to_string()],
            author_id: None,
            keywords: vec![],
            pdf_url: "https://blobs.example/fl.pdf".to_string(),
            doi: None,
            published_at: None,
            like_count: 4,
            download_count: 9,
            submitted_at: Utc::now(),
        };

        let summary = PaperSummary::from(record);
        assert_eq!(summary.author_name.as_deref(), Some("Dr. Lisa Wang"));
        assert_eq!(summary.like_count, 4);
    }
}
