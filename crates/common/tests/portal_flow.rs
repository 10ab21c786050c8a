//! End-to-end coverage of the catalog query service and the moderation
//! state machine over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use scholarport_common::catalog::{CatalogService, PageRequest, PaperCategory, QuerySpec};
use scholarport_common::errors::AppError;
use scholarport_common::moderation::{ModerationService, PaperStatus};
use scholarport_common::store::memory::MemoryStore;
use scholarport_common::store::{PaperRecord, PaperStore};

const TIMEOUT: Duration = Duration::from_secs(5);

fn record(
    title: &str,
    authors: &[&str],
    university: &str,
    category: PaperCategory,
    status: PaperStatus,
) -> PaperRecord {
    PaperRecord {
        id: Uuid::new_v4(),
        title: title.to_string(),
        abstract_text: Some(format!("{} abstract", title)),
        category,
        status,
        university: university.to_string(),
        field_of_study: category.as_str().to_string(),
        authors: authors.iter().map(|a| a.to_string()).collect(),
        author_id: None,
        keywords: vec![],
        pdf_url: "https://blobs.example/p.pdf".to_string(),
        doi: None,
        published_at: None,
        like_count: 0,
        download_count: 0,
        submitted_at: Utc::now(),
    }
}

async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    store
        .seed(record(
            "Quantum Entanglement in Computing",
            &["Prof. Maria Santos"],
            "Caltech",
            PaperCategory::QuantumComputing,
            PaperStatus::Approved,
        ))
        .await;
    store
        .seed(record(
            "Neural Networks for Climate Prediction Models",
            &["Dr. Michael Brown"],
            "UC Berkeley",
            PaperCategory::AiMl,
            PaperStatus::Approved,
        ))
        .await;
    store
        .seed(record(
            "Smart Contracts for Supply Chain Management",
            &["Prof. James Wilson"],
            "University of Washington",
            PaperCategory::Blockchain,
            PaperStatus::Approved,
        ))
        .await;
    // Pending and rejected papers must never surface publicly
    store
        .seed(record(
            "Blockchain-Based Framework for Secure Health Records",
            &["Prof. Lisa Chen"],
            "Stanford University",
            PaperCategory::Blockchain,
            PaperStatus::Pending,
        ))
        .await;
    store
        .seed(record(
            "Biomedical Applications of Graphene Nanoparticles",
            &["Prof. Sarah Johnson"],
            "Harvard University",
            PaperCategory::Biomedical,
            PaperStatus::Rejected,
        ))
        .await;

    store
}

fn catalog(store: Arc<MemoryStore>) -> CatalogService {
    CatalogService::new(store, TIMEOUT)
}

fn moderation(store: Arc<MemoryStore>) -> ModerationService {
    ModerationService::new(store, TIMEOUT)
}

// ============================================================================
// Catalog queries
// ============================================================================

#[tokio::test]
async fn featured_respects_category_filter() {
    let store = seeded_store().await;
    let catalog = catalog(store);

    let page = catalog
        .list_featured(Some(PaperCategory::Blockchain), PageRequest::first())
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    for summary in &page.items {
        assert_eq!(summary.category, PaperCategory::Blockchain);
    }
    // The pending blockchain paper is filtered out
    assert_eq!(
        page.items[0].title,
        "Smart Contracts for Supply Chain Management"
    );
}

#[tokio::test]
async fn featured_without_category_returns_all_approved() {
    let store = seeded_store().await;
    let catalog = catalog(store);

    let page = catalog
        .list_featured(None, PageRequest::first())
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert!(page
        .items
        .iter()
        .all(|p| p.title != "Biomedical Applications of Graphene Nanoparticles"));
}

#[tokio::test]
async fn search_matches_title_author_and_university() {
    let store = seeded_store().await;
    let catalog = catalog(store);

    // Title substring, case-insensitive
    let by_title = catalog
        .search("CLIMATE", PageRequest::first())
        .await
        .unwrap();
    assert_eq!(by_title.items.len(), 1);
    assert!(by_title.items[0].title.contains("Climate"));

    // Author substring
    let by_author = catalog.search("wilson", PageRequest::first()).await.unwrap();
    assert_eq!(by_author.items.len(), 1);
    assert_eq!(
        by_author.items[0].author_name.as_deref(),
        Some("Prof. James Wilson")
    );

    // University substring
    let by_university = catalog
        .search("berkeley", PageRequest::first())
        .await
        .unwrap();
    assert_eq!(by_university.items.len(), 1);
}

#[tokio::test]
async fn search_has_no_false_negatives_for_exact_substring() {
    let store = seeded_store().await;
    store
        .seed(record(
            "A Survey of Zero-Knowledge Proof Systems",
            &["Dr. Nadia Osei"],
            "ETH Zurich",
            PaperCategory::Blockchain,
            PaperStatus::Approved,
        ))
        .await;
    let catalog = catalog(store);

    let page = catalog
        .search("zero-knowledge", PageRequest::first())
        .await
        .unwrap();
    assert!(page
        .items
        .iter()
        .any(|p| p.title == "A Survey of Zero-Knowledge Proof Systems"));
}

#[tokio::test]
async fn search_rejects_blank_terms() {
    let store = seeded_store().await;
    let catalog = catalog(store);

    for term in ["", "   ", "\t"] {
        let err = catalog.search(term, PageRequest::first()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidQuery { .. }));
    }
}

#[tokio::test]
async fn reads_are_side_effect_free() {
    let store = seeded_store().await;
    let catalog = catalog(store);

    let before = catalog.count().await.unwrap();

    catalog.search("quantum", PageRequest::first()).await.unwrap();
    catalog
        .list_featured(Some(PaperCategory::AiMl), PageRequest::first())
        .await
        .unwrap();
    catalog
        .review_queue(&QuerySpec::default())
        .await
        .unwrap();

    let after = catalog.count().await.unwrap();
    assert_eq!(before, after);
    assert_eq!(before, 3);
}

#[tokio::test]
async fn pagination_is_stable_and_bounded() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..7 {
        store
            .seed(record(
                &format!("Paper {:02}", i),
                &["A. Author"],
                "Test University",
                PaperCategory::Other,
                PaperStatus::Approved,
            ))
            .await;
    }
    let catalog = catalog(store);

    let first = catalog
        .list_featured(None, PageRequest::new(1, 3).unwrap())
        .await
        .unwrap();
    let second = catalog
        .list_featured(None, PageRequest::new(2, 3).unwrap())
        .await
        .unwrap();
    let far = catalog
        .list_featured(None, PageRequest::new(9, 3).unwrap())
        .await
        .unwrap();

    assert_eq!(first.total, 7);
    assert_eq!(first.items[0].title, "Paper 00");
    assert_eq!(second.items[0].title, "Paper 03");
    assert!(far.items.is_empty());
    assert_eq!(far.total, 7);
}

#[tokio::test]
async fn review_queue_combines_filters() {
    let store = seeded_store().await;
    let catalog = catalog(store);

    let spec = QuerySpec {
        term: Some("blockchain".to_string()),
        status: Some(PaperStatus::Pending),
        ..QuerySpec::default()
    };
    let page = catalog.review_queue(&spec).await.unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].status, PaperStatus::Pending);
    assert_eq!(page.items[0].university, "Stanford University");

    // Unlike the public views, the queue spans every status
    let all = catalog.review_queue(&QuerySpec::default()).await.unwrap();
    assert_eq!(all.total, 5);
}

// ============================================================================
// Seeded end-to-end scenario
// ============================================================================

#[tokio::test]
async fn seeded_quantum_paper_scenario() {
    let store = Arc::new(MemoryStore::new());
    let quantum = record(
        "Quantum Entanglement in Computing",
        &["Prof. Maria Santos"],
        "Caltech",
        PaperCategory::QuantumComputing,
        PaperStatus::Approved,
    );
    let quantum_id = quantum.id;
    store.seed(quantum).await;

    let catalog = catalog(store);

    let results = catalog.search("entangle", PageRequest::first()).await.unwrap();
    assert_eq!(results.items.len(), 1);
    assert_eq!(results.items[0].id, quantum_id);

    let blockchain = catalog
        .list_featured(Some(PaperCategory::Blockchain), PageRequest::first())
        .await
        .unwrap();
    assert!(blockchain.items.is_empty());
    assert_eq!(blockchain.total, 0);
}

// ============================================================================
// Moderation state machine
// ============================================================================

#[tokio::test]
async fn full_review_path_then_terminal() {
    let store = Arc::new(MemoryStore::new());
    let paper = record(
        "Quantum Machine Learning for Financial Forecasting",
        &["Dr. James Wilson"],
        "MIT",
        PaperCategory::QuantumComputing,
        PaperStatus::Pending,
    );
    let paper_id = paper.id;
    store.seed(paper).await;

    let moderation = moderation(store.clone());

    let checked = moderation
        .transition(paper_id, PaperStatus::PlagiarismCheck, "admin@x")
        .await
        .unwrap();
    assert_eq!(checked.status, PaperStatus::PlagiarismCheck);

    let approved = moderation
        .transition(paper_id, PaperStatus::Approved, "admin@x")
        .await
        .unwrap();
    assert_eq!(approved.status, PaperStatus::Approved);

    // Approved is terminal
    let err = moderation
        .transition(paper_id, PaperStatus::Pending, "admin@x")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: PaperStatus::Approved,
            to: PaperStatus::Pending,
        }
    ));

    // Both applied transitions were audited, attributed to the actor
    let history = moderation.history(paper_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|t| t.actor == "admin@x"));
    assert_eq!(history[0].from_status, PaperStatus::Pending);
    assert_eq!(history[1].to_status, PaperStatus::Approved);
}

#[tokio::test]
async fn rejected_papers_stay_rejected() {
    let store = Arc::new(MemoryStore::new());
    let paper = record(
        "Biomedical Applications of Graphene Nanoparticles",
        &["Prof. Sarah Johnson"],
        "Harvard University",
        PaperCategory::Biomedical,
        PaperStatus::Rejected,
    );
    let paper_id = paper.id;
    store.seed(paper).await;

    let moderation = moderation(store.clone());

    let err = moderation
        .transition(paper_id, PaperStatus::Approved, "admin@x")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    // The stored status is unchanged and nothing was audited
    let current = store.find_paper(paper_id).await.unwrap().unwrap();
    assert_eq!(current.status, PaperStatus::Rejected);
    assert!(store.all_transitions().await.is_empty());
}

#[tokio::test]
async fn reapplying_current_status_is_a_noop() {
    let store = Arc::new(MemoryStore::new());
    let paper = record(
        "Federated Learning for Privacy-Preserving AI",
        &["Dr. Lisa Wang"],
        "Carnegie Mellon University",
        PaperCategory::AiMl,
        PaperStatus::Approved,
    );
    let paper_id = paper.id;
    store.seed(paper).await;

    let moderation = moderation(store.clone());

    let result = moderation
        .transition(paper_id, PaperStatus::Approved, "admin@x")
        .await
        .unwrap();
    assert_eq!(result.status, PaperStatus::Approved);

    // No audit side effects for a no-op
    assert!(store.all_transitions().await.is_empty());

    let current = store.find_paper(paper_id).await.unwrap().unwrap();
    assert_eq!(current.status, PaperStatus::Approved);
}

#[tokio::test]
async fn transition_on_missing_paper_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let moderation = moderation(store);

    let err = moderation
        .transition(Uuid::new_v4(), PaperStatus::Approved, "admin@x")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PaperNotFound { .. }));
}

// Moderation changes are visible to subsequent catalog reads
#[tokio::test]
async fn approval_publishes_to_catalog() {
    let store = Arc::new(MemoryStore::new());
    let paper = record(
        "Novel Drug Delivery Systems Using Nanomaterials",
        &["Prof. David Kim"],
        "Johns Hopkins University",
        PaperCategory::Biomedical,
        PaperStatus::Pending,
    );
    let paper_id = paper.id;
    store.seed(paper).await;

    let catalog = catalog(store.clone());
    let moderation = moderation(store);

    assert_eq!(catalog.count().await.unwrap(), 0);

    moderation
        .transition(paper_id, PaperStatus::Approved, "admin@x")
        .await
        .unwrap();

    assert_eq!(catalog.count().await.unwrap(), 1);
    let found = catalog
        .search("nanomaterials", PageRequest::first())
        .await
        .unwrap();
    assert_eq!(found.items.len(), 1);
    assert_eq!(found.items[0].id, paper_id);
}
