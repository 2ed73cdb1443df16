//! Saved-tender handlers
//!
//! Saving is a toggle: the same endpoint saves an unsaved tender and
//! unsaves a saved one, reporting the resulting state. Unsaving never
//! removes the row; the link is reactivated on a later save.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use tenderhub_common::{
    auth::ClientContext,
    errors::{AppError, Result},
    graph::TenderId,
    tenders::{SavedTender, ToggleOutcome},
};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ToggleRequest {
    /// Client-facing pipeline state to record with the link
    #[validate(length(min = 1, max = 64))]
    pub situation: Option<String>,
}

#[derive(Serialize)]
pub struct SavedListResponse {
    pub items: Vec<SavedTender>,
    pub total: usize,
}

/// One raw link row
#[derive(Serialize)]
pub struct LinkResponse {
    pub id: Uuid,
    pub tender_id: String,
    pub situation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct LinkListResponse {
    pub items: Vec<LinkResponse>,
    pub total: usize,
}

/// List the client's saved tenders with graph previews, newest first
pub async fn list_saved(
    State(state): State<AppState>,
    ctx: ClientContext,
) -> Result<Json<SavedListResponse>> {
    let items = state.tenders.list_saved(ctx.client_id).await?;
    Ok(Json(SavedListResponse {
        total: items.len(),
        items,
    }))
}

/// List the client's raw link rows without graph hydration
pub async fn list_links(
    State(state): State<AppState>,
    ctx: ClientContext,
) -> Result<Json<LinkListResponse>> {
    let links = state.tenders.saved_links(ctx.client_id).await?;
    let items: Vec<LinkResponse> = links
        .into_iter()
        .map(|link| LinkResponse {
            id: link.id,
            tender_id: link.tender_id,
            situation: link.situation,
            created_at: link.created_at.with_timezone(&Utc),
            updated_at: link.updated_at.with_timezone(&Utc),
        })
        .collect();
    Ok(Json(LinkListResponse {
        total: items.len(),
        items,
    }))
}

/// Toggle the saved state of a tender for the client
pub async fn toggle_save(
    State(state): State<AppState>,
    ctx: ClientContext,
    Path(id): Path<String>,
    body: Option<Json<ToggleRequest>>,
) -> Result<Json<ToggleOutcome>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("situation".to_string()),
    })?;

    let id = TenderId::parse(&id)?;
    let outcome = state
        .tenders
        .toggle_save(ctx.client_id, &id, request.situation)
        .await?;

    Ok(Json(outcome))
}
