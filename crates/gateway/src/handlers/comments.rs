//! Paper comment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::handlers::papers::load_visible_paper;
use crate::AppState;
use scholarport_common::{
    auth::AuthContext,
    db::{CommentView, Repository},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct AddCommentRequest {
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub body: String,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<CommentView> for CommentResponse {
    fn from(view: CommentView) -> Self {
        Self {
            id: view.id,
            paper_id: view.paper_id,
            user_id: view.user_id,
            user_name: view.user_name,
            body: view.body,
            like_count: view.like_count,
            created_at: view.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct CommentsResponse {
    pub paper_id: Uuid,
    pub comments: Vec<CommentResponse>,
}

/// Comments on a paper, oldest first
pub async fn list_comments(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<CommentsResponse>> {
    let repo = Repository::new(state.db.clone());
    load_visible_paper(&repo, paper_id, auth.as_ref()).await?;

    let comments = repo.list_comments(paper_id).await?;

    Ok(Json(CommentsResponse {
        paper_id,
        comments: comments.into_iter().map(CommentResponse::from).collect(),
    }))
}

/// Add a comment to a paper
pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
    Json(request): Json<AddCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("body".to_string()),
    })?;

    let repo = Repository::new(state.db.clone());
    load_visible_paper(&repo, paper_id, Some(&auth)).await?;

    let comment = repo
        .add_comment(paper_id, auth.user_id, request.body)
        .await?;

    // Display name comes from the profile when one exists
    let user_name = repo
        .find_user_by_id(auth.user_id)
        .await?
        .map(|user| user.name)
        .unwrap_or_else(|| auth.email.clone());

    tracing::info!(
        paper_id = %paper_id,
        comment_id = %comment.id,
        user_id = %auth.user_id,
        "Comment added"
    );

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            id: comment.id,
            paper_id: comment.paper_id,
            user_id: comment.user_id,
            user_name,
            body: comment.body,
            like_count: comment.like_count,
            created_at: comment.created_at.into(),
        }),
    ))
}
