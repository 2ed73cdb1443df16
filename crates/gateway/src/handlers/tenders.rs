//! Tender listing and record handlers
//!
//! The listing is served from the search index; individual records come
//! from the graph store with the stored AI summary overlaid on the detail.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use tenderhub_common::{
    auth::ClientContext,
    errors::{AppError, Result},
    graph::{MonetaryValue, TenderDetail, TenderId, TenderPreview},
    search::{SearchFilter, SearchPage, SearchQuery, TenderDoc},
};

#[derive(Debug, Deserialize, Validate)]
pub struct ListParams {
    /// Number of items to skip
    #[serde(default)]
    pub offset: usize,

    /// Number of items to return
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: usize,

    /// Restrict to the client's saved tenders
    #[serde(default)]
    pub is_saved: bool,

    /// Search query string
    #[serde(rename = "match")]
    pub matching: Option<String>,

    pub sort_field: Option<String>,

    /// asc or desc
    pub sort_direction: Option<String>,
}

fn default_limit() -> usize {
    10
}

/// Body filters accepted alongside the listing parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListBody {
    #[serde(default)]
    pub filters: Vec<SearchFilter>,
}

/// One row of the listing response
#[derive(Debug, Serialize)]
pub struct ListedTender {
    pub tender_hash: String,
    pub tender_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub submission_date: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub n_lots: u32,
    pub pub_org_name: Option<String>,
    pub budget: Option<MonetaryValue>,
    pub location: Option<String>,
    pub contract_type: Option<String>,
    pub cpv_categories: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<ListedTender>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl From<TenderDoc> for ListedTender {
    fn from(doc: TenderDoc) -> Self {
        // The index stores the amount only; all indexed tenders are priced
        // in euros.
        let budget = doc.budget_amount.map(|amount| MonetaryValue {
            amount,
            currency: "EUR".to_string(),
        });
        Self {
            tender_hash: doc.id,
            tender_id: doc.tender_id,
            title: doc.title,
            description: doc.description,
            submission_date: doc.submission_date.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            updated: doc.updated.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            n_lots: doc.n_lots,
            pub_org_name: doc.contracting_body,
            budget,
            location: doc.location,
            contract_type: doc.contract_type,
            cpv_categories: doc.cpvs,
        }
    }
}

fn list_response(page: SearchPage) -> ListResponse {
    let items: Vec<ListedTender> = page.items.into_iter().map(Into::into).collect();
    ListResponse {
        has_next: page.offset + items.len() < page.total,
        has_prev: page.offset > 0,
        total: page.total,
        offset: page.offset,
        limit: page.limit,
        items,
    }
}

async fn run_listing(
    state: &AppState,
    ctx: &ClientContext,
    params: ListParams,
    body: ListBody,
) -> Result<ListResponse> {
    params.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let restrict_to_ids = if params.is_saved {
        Some(state.tenders.saved_ids(ctx.client_id).await?)
    } else {
        None
    };

    let query = SearchQuery {
        matching: params.matching,
        offset: params.offset,
        limit: params.limit,
        sort_field: params.sort_field,
        sort_direction: params.sort_direction,
        filters: body.filters,
        restrict_to_ids,
    };

    let page = state.search.search_tenders(&query).await?;
    Ok(list_response(page))
}

/// List tenders from the search index
pub async fn list_tenders(
    State(state): State<AppState>,
    ctx: ClientContext,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let response = run_listing(&state, &ctx, params, ListBody::default()).await?;
    Ok(Json(response))
}

/// List tenders with body filters
pub async fn search_tenders(
    State(state): State<AppState>,
    ctx: ClientContext,
    Query(params): Query<ListParams>,
    Json(body): Json<ListBody>,
) -> Result<Json<ListResponse>> {
    let response = run_listing(&state, &ctx, params, body).await?;
    Ok(Json(response))
}

/// Get the full record of one tender from the graph store
pub async fn get_tender(
    State(state): State<AppState>,
    ctx: ClientContext,
    Path(id): Path<String>,
) -> Result<Json<TenderDetail>> {
    let id = TenderId::parse(&id)?;
    let detail = state.tenders.get_detail(&id).await?;

    tracing::debug!(
        client_id = %ctx.client_id,
        tender_id = %id,
        "Tender detail served"
    );
    Ok(Json(detail))
}

/// Get the preview of one tender from the graph store
pub async fn get_preview(
    State(state): State<AppState>,
    _ctx: ClientContext,
    Path(id): Path<String>,
) -> Result<Json<TenderPreview>> {
    let id = TenderId::parse(&id)?;
    let preview = state.tenders.get_preview(&id).await?;
    Ok(Json(preview))
}
