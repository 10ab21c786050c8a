//! Public catalog handlers: featured listing, search, and paper count

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::AppState;
use scholarport_common::{
    catalog::{PageRequest, PaperCategory, PaperSummary},
    errors::Result,
};

#[derive(Debug, Default, Deserialize)]
pub struct FeaturedParams {
    /// Category slug, or `all` for no filter
    pub category: Option<String>,

    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default)]
    pub page_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Free-text term; must be non-empty
    pub q: Option<String>,

    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default)]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

#[derive(Serialize)]
pub struct ListingResponse {
    pub papers: Vec<PaperSummary>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total: u64,
    pub results: Vec<PaperSummary>,
    pub page: u32,
    pub page_size: u32,
    pub processing_time_ms: u64,
}

#[derive(Serialize)]
pub struct CountResponse {
    pub total: u64,
}

/// Approved papers for the home page, optionally scoped by category
pub async fn list_featured(
    State(state): State<AppState>,
    Query(params): Query<FeaturedParams>,
) -> Result<Json<ListingResponse>> {
    let category = PaperCategory::parse_filter(params.category.as_deref())?;
    let page = PageRequest::new(params.page, params.page_size)?;

    let result = state.catalog.list_featured(category, page).await?;

    Ok(Json(ListingResponse {
        total: result.total,
        page: result.page,
        page_size: result.page_size,
        papers: result.items,
    }))
}

/// Free-text search over approved papers
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();
    let term = params.q.unwrap_or_default();
    let page = PageRequest::new(params.page, params.page_size)?;

    let result = state.catalog.search(&term, page).await?;
    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        query = %term,
        results = result.items.len(),
        latency_ms = processing_time_ms,
        "Search completed"
    );

    Ok(Json(SearchResponse {
        query: term,
        total: result.total,
        page: result.page,
        page_size: result.page_size,
        results: result.items,
        processing_time_ms,
    }))
}

/// Total approved-paper count (the home page stat)
pub async fn count(State(state): State<AppState>) -> Result<Json<CountResponse>> {
    let total = state.catalog.count().await?;
    Ok(Json(CountResponse { total }))
}
