//! User profile and admin user-management handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use scholarport_common::{
    auth::AuthContext,
    catalog::PageRequest,
    db::{models::User, NewUser, Repository, StatusCount},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterProfileRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(min = 1, max = 200))]
    pub university: String,

    #[validate(length(min = 1, max = 200))]
    pub department: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub university: String,
    pub department: String,
    pub role: String,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            university: user.university,
            department: user.department,
            role: user.role,
            is_active: user.is_active,
            joined_at: user.joined_at.into(),
        }
    }
}

#[derive(Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub paper_count: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersParams {
    /// Free-text term over name, email, and university
    pub q: Option<String>,

    pub active: Option<bool>,

    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default)]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub papers_by_status: Vec<StatusCount>,
    pub total_users: u64,
}

/// Create the profile row for an account the auth provider just
/// registered. Idempotent: an existing profile is returned as-is.
pub async fn register_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<RegisterProfileRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());

    if let Some(existing) = repo.find_user_by_id(auth.user_id).await? {
        return Ok((StatusCode::OK, Json(existing.into())));
    }

    let user = repo
        .create_user(NewUser {
            id: auth.user_id,
            name: request.name,
            email: auth.email.clone(),
            university: request.university,
            department: request.department,
        })
        .await?;

    tracing::info!(user_id = %user.id, "User profile created");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// The caller's own profile
pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ProfileResponse>> {
    let repo = Repository::new(state.db.clone());

    let user = repo
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound {
            id: auth.user_id.to_string(),
        })?;

    let paper_count = repo.count_papers_by_author(auth.user_id).await?;

    Ok(Json(ProfileResponse {
        user: user.into(),
        paper_count,
    }))
}

/// Admin user listing with term and active-flag filters
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<UsersResponse>> {
    auth.require_admin()?;

    let page = PageRequest::new(params.page, params.page_size)?;
    let repo = Repository::new(state.db.clone());

    let (users, total) = repo
        .list_users(params.q.as_deref(), params.active, page)
        .await?;

    Ok(Json(UsersResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        total,
        page: page.page,
        page_size: page.page_size,
    }))
}

/// Reactivate a user account
pub async fn activate_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>> {
    set_active(state, auth, user_id, true).await
}

/// Deactivate a user account
pub async fn deactivate_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>> {
    set_active(state, auth, user_id, false).await
}

async fn set_active(
    state: AppState,
    auth: AuthContext,
    user_id: Uuid,
    active: bool,
) -> Result<Json<UserResponse>> {
    auth.require_admin()?;

    let repo = Repository::new(state.db.clone());
    let user = repo.set_user_active(user_id, active).await?;

    tracing::info!(
        user_id = %user_id,
        active,
        actor = %auth.actor(),
        "User active flag changed"
    );

    Ok(Json(user.into()))
}

/// Admin dashboard counts
pub async fn dashboard_stats(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<DashboardResponse>> {
    auth.require_admin()?;

    let repo = Repository::new(state.db.clone());

    let papers_by_status = repo.status_counts().await?;
    let total_users = repo.count_users().await?;

    Ok(Json(DashboardResponse {
        papers_by_status,
        total_users,
    }))
}
