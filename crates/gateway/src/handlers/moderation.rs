//! Admin moderation handlers: review queue, status transitions, audit

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use scholarport_common::{
    auth::AuthContext,
    catalog::{PaperCategory, QuerySpec},
    errors::Result,
    moderation::{ModerationTransition, PaperStatus},
    store::PaperRecord,
};

#[derive(Debug, Default, Deserialize)]
pub struct QueueParams {
    /// Free-text term over title, authors, and university
    pub q: Option<String>,

    /// Status slug, or `all`
    pub status: Option<String>,

    /// Category slug, or `all`
    pub category: Option<String>,

    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default)]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

/// One row of the admin papers table
#[derive(Serialize)]
pub struct QueueItem {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub university: String,
    pub field_of_study: String,
    pub category: PaperCategory,
    pub status: PaperStatus,
    pub submitted_at: DateTime<Utc>,
}

impl From<PaperRecord> for QueueItem {
    fn from(record: PaperRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            author: record.authors.first().cloned(),
            university: record.university,
            field_of_study: record.field_of_study,
            category: record.category,
            status: record.status,
            submitted_at: record.submitted_at,
        }
    }
}

#[derive(Serialize)]
pub struct QueueResponse {
    pub papers: Vec<QueueItem>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: PaperStatus,
}

#[derive(Serialize)]
pub struct UpdateStatusResponse {
    pub id: Uuid,
    pub status: PaperStatus,
}

#[derive(Serialize)]
pub struct TransitionView {
    pub id: Uuid,
    pub from_status: PaperStatus,
    pub to_status: PaperStatus,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

impl From<ModerationTransition> for TransitionView {
    fn from(t: ModerationTransition) -> Self {
        Self {
            id: t.id,
            from_status: t.from_status,
            to_status: t.to_status,
            actor: t.actor,
            occurred_at: t.occurred_at,
        }
    }
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub paper_id: Uuid,
    pub transitions: Vec<TransitionView>,
}

/// Filterable listing of papers in every status, for the admin table
pub async fn review_queue(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<QueueParams>,
) -> Result<Json<QueueResponse>> {
    auth.require_admin()?;

    let status = match params.status.as_deref() {
        None | Some("all") | Some("") => None,
        Some(s) => Some(s.parse::<PaperStatus>()?),
    };

    let spec = QuerySpec {
        term: params.q,
        category: PaperCategory::parse_filter(params.category.as_deref())?,
        status,
        page: Some(params.page),
        page_size: Some(params.page_size),
    };

    let result = state.catalog.review_queue(&spec).await?;

    Ok(Json(QueueResponse {
        total: result.total,
        page: result.page,
        page_size: result.page_size,
        papers: result.items.into_iter().map(QueueItem::from).collect(),
    }))
}

/// Apply a moderation transition to a paper
pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>> {
    auth.require_admin()?;

    let updated = state
        .moderation
        .transition(paper_id, request.status, auth.actor())
        .await?;

    Ok(Json(UpdateStatusResponse {
        id: updated.id,
        status: updated.status,
    }))
}

/// Audit trail for a paper, oldest first
pub async fn history(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<HistoryResponse>> {
    auth.require_admin()?;

    let transitions = state.moderation.history(paper_id).await?;

    Ok(Json(HistoryResponse {
        paper_id,
        transitions: transitions.into_iter().map(TransitionView::from).collect(),
    }))
}
