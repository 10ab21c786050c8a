//! Paper submission and detail handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use scholarport_common::{
    auth::{submission_fingerprint, AuthContext},
    catalog::{PageRequest, PaperCategory},
    db::Repository,
    errors::{AppError, Result},
    metrics,
    moderation::PaperStatus,
    store::{NewPaper, PaperFilter, PaperRecord, PaperStore},
};

/// Request to submit a new paper. The PDF itself has already been
/// uploaded to the blob store; only the reference arrives here.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitPaperRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: String,

    #[validate(length(max = 10000))]
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    pub category: PaperCategory,

    #[validate(length(min = 1, max = 200))]
    pub university: String,

    #[validate(length(min = 1, max = 200))]
    pub field_of_study: String,

    /// Ordered author names; at least one
    #[validate(length(min = 1, max = 32))]
    pub authors: Vec<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[validate(length(min = 1, max = 2000))]
    pub pdf_url: String,

    pub doi: Option<String>,

    pub published_at: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct SubmitPaperResponse {
    pub id: Uuid,
    pub status: PaperStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Full paper detail view
#[derive(Serialize)]
pub struct PaperResponse {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub category: PaperCategory,
    pub status: PaperStatus,
    pub university: String,
    pub field_of_study: String,
    pub authors: Vec<String>,
    pub author_id: Option<Uuid>,
    pub keywords: Vec<String>,
    pub doi: Option<String>,
    pub published_at: Option<NaiveDate>,
    pub like_count: u64,
    pub download_count: u64,
    pub submitted_at: DateTime<Utc>,
}

impl From<PaperRecord> for PaperResponse {
    fn from(record: PaperRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            abstract_text: record.abstract_text,
            category: record.category,
            status: record.status,
            university: record.university,
            field_of_study: record.field_of_study,
            authors: record.authors,
            author_id: record.author_id,
            keywords: record.keywords,
            doi: record.doi,
            published_at: record.published_at,
            like_count: record.like_count,
            download_count: record.download_count,
            submitted_at: record.submitted_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MyPapersParams {
    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default)]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

#[derive(Serialize)]
pub struct MyPapersResponse {
    pub papers: Vec<PaperResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Serialize)]
pub struct LikeResponse {
    pub paper_id: Uuid,
    pub like_count: u64,
}

#[derive(Serialize)]
pub struct DownloadResponse {
    pub paper_id: Uuid,
    pub pdf_url: String,
    pub download_count: u64,
}

/// Load a paper enforcing catalog visibility: approved papers are
/// public, anything else is visible only to its author or an admin.
/// Unauthorized lookups report not-found rather than leaking existence.
pub(crate) async fn load_visible_paper(
    repo: &Repository,
    paper_id: Uuid,
    auth: Option<&AuthContext>,
) -> Result<PaperRecord> {
    let paper = repo
        .find_paper(paper_id)
        .await?
        .ok_or_else(|| AppError::PaperNotFound {
            id: paper_id.to_string(),
        })?;

    if paper.status == PaperStatus::Approved {
        return Ok(paper);
    }

    let allowed = auth.is_some_and(|ctx| {
        ctx.is_admin() || paper.author_id == Some(ctx.user_id)
    });
    if allowed {
        Ok(paper)
    } else {
        Err(AppError::PaperNotFound {
            id: paper_id.to_string(),
        })
    }
}

/// Submit a new paper; it enters moderation as `pending`
pub async fn submit_paper(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<SubmitPaperRequest>,
) -> Result<(StatusCode, Json<SubmitPaperResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    state.verifier.verify(&request.pdf_url).await?;

    let repo = Repository::new(state.db.clone());

    // Dedupe resubmissions of the same content
    let fingerprint = submission_fingerprint(
        &request.title,
        request.abstract_text.as_deref().unwrap_or_default(),
    );
    if let Some(existing) = repo.find_by_submission_key(&fingerprint).await? {
        return Err(AppError::Duplicate {
            message: format!("already submitted as paper {}", existing.id),
        });
    }

    let record = repo
        .create_paper(NewPaper {
            title: request.title,
            abstract_text: request.abstract_text,
            category: request.category,
            university: request.university,
            field_of_study: request.field_of_study,
            authors: request.authors,
            author_id: Some(auth.user_id),
            keywords: request.keywords,
            pdf_url: request.pdf_url,
            doi: request.doi,
            published_at: request.published_at,
            submission_key: Some(fingerprint),
        })
        .await?;

    metrics::record_submission(record.category.as_str());
    tracing::info!(
        paper_id = %record.id,
        user_id = %auth.user_id,
        title = %record.title,
        "Paper submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitPaperResponse {
            id: record.id,
            status: record.status,
            submitted_at: record.submitted_at,
        }),
    ))
}

/// Get a paper by ID
pub async fn get_paper(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<PaperResponse>> {
    let repo = Repository::new(state.db.clone());
    let paper = load_visible_paper(&repo, paper_id, auth.as_ref()).await?;

    Ok(Json(paper.into()))
}

/// The caller's own submissions, any status
pub async fn my_papers(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<MyPapersParams>,
) -> Result<Json<MyPapersResponse>> {
    let repo = Repository::new(state.db.clone());
    let page = PageRequest::new(params.page, params.page_size)?;

    let filter = PaperFilter {
        author_id: Some(auth.user_id),
        ..PaperFilter::default()
    };
    let (records, total) = repo.find_papers(&filter, page).await?;

    Ok(Json(MyPapersResponse {
        papers: records.into_iter().map(PaperResponse::from).collect(),
        total,
        page: page.page,
        page_size: page.page_size,
    }))
}

/// Delete a paper (explicit admin action)
pub async fn delete_paper(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_admin()?;

    let repo = Repository::new(state.db.clone());
    if !repo.delete_paper(paper_id).await? {
        return Err(AppError::PaperNotFound {
            id: paper_id.to_string(),
        });
    }

    tracing::info!(
        paper_id = %paper_id,
        actor = %auth.actor(),
        "Paper deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Like a paper
pub async fn like_paper(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<LikeResponse>> {
    let repo = Repository::new(state.db.clone());
    load_visible_paper(&repo, paper_id, Some(&auth)).await?;

    let like_count = repo.increment_likes(paper_id).await?;

    Ok(Json(LikeResponse {
        paper_id,
        like_count,
    }))
}

/// Record a download and hand back the blob-store reference
pub async fn download_paper(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<DownloadResponse>> {
    let repo = Repository::new(state.db.clone());
    let paper = load_visible_paper(&repo, paper_id, auth.as_ref()).await?;

    let download_count = repo.increment_downloads(paper_id).await?;

    Ok(Json(DownloadResponse {
        paper_id,
        pdf_url: paper.pdf_url,
        download_count,
    }))
}
