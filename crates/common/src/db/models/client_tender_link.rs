//! Client↔tender link entity
//!
//! One row per (client, tender) pair. Saving a tender creates or reactivates
//! the row; unsaving flips `active` to false (logical delete).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "client_tender_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub client_id: Uuid,

    /// Tender hash identifier as known to the graph store
    #[sea_orm(column_type = "Text")]
    pub tender_id: String,

    pub active: bool,

    /// Client-facing pipeline state ("analyzing", "bidding", ...)
    #[sea_orm(column_type = "Text", nullable)]
    pub situation: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
