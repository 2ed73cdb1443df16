//! AI summary handlers
//!
//! Summaries live in the relational store, keyed by tender hash. Writes
//! are guarded by a graph existence check so a summary can never outlive
//! a tender that was never there.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use tenderhub_common::{
    db::models::TenderSummary,
    auth::ClientContext,
    errors::Result,
    graph::TenderId,
};

#[derive(Debug, Deserialize)]
pub struct UpdateSummaryRequest {
    pub summary: String,

    /// Optional reference to the generated document folder
    #[serde(default)]
    pub document_ref: Option<String>,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub id: Uuid,
    pub tender_id: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TenderSummary> for SummaryResponse {
    fn from(row: TenderSummary) -> Self {
        Self {
            id: row.id,
            tender_id: row.tender_id,
            summary: row.summary,
            document_ref: row.document_ref,
            created_at: row.created_at.with_timezone(&Utc),
            updated_at: row.updated_at.with_timezone(&Utc),
        }
    }
}

/// Get the stored summary for a tender
pub async fn get_summary(
    State(state): State<AppState>,
    _ctx: ClientContext,
    Path(id): Path<String>,
) -> Result<Json<SummaryResponse>> {
    let id = TenderId::parse(&id)?;
    let summary = state.tenders.get_summary(&id).await?;
    Ok(Json(summary.into()))
}

/// Create or overwrite the summary for a tender
pub async fn update_summary(
    State(state): State<AppState>,
    ctx: ClientContext,
    Path(id): Path<String>,
    Json(request): Json<UpdateSummaryRequest>,
) -> Result<(StatusCode, Json<SummaryResponse>)> {
    let id = TenderId::parse(&id)?;
    let summary = state
        .tenders
        .update_summary(&id, &request.summary, request.document_ref.as_deref())
        .await?;

    tracing::info!(
        client_id = %ctx.client_id,
        tender_id = %id,
        "Summary updated"
    );
    Ok((StatusCode::OK, Json(summary.into())))
}

/// Generate a summary with the external LLM and store it
pub async fn generate_summary(
    State(state): State<AppState>,
    ctx: ClientContext,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SummaryResponse>)> {
    let id = TenderId::parse(&id)?;
    let summary = state.tenders.generate_summary(&id).await?;

    tracing::info!(
        client_id = %ctx.client_id,
        tender_id = %id,
        "Summary generated"
    );
    Ok((StatusCode::CREATED, Json(summary.into())))
}
