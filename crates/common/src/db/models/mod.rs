//! SeaORM entity models
//!
//! Relational entities for Tenderhub: the client↔tender link table and the
//! AI summary table. Tender records themselves live in the graph store.

mod client_tender_link;
mod tender_summary;

pub use client_tender_link::{
    ActiveModel as ClientTenderLinkActiveModel,
    Column as ClientTenderLinkColumn,
    Entity as ClientTenderLinkEntity,
    Model as ClientTenderLink,
};

pub use tender_summary::{
    ActiveModel as TenderSummaryActiveModel,
    Column as TenderSummaryColumn,
    Entity as TenderSummaryEntity,
    Model as TenderSummary,
};
