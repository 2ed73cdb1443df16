//! Tenderhub Common Library
//!
//! Shared code for the Tenderhub services including:
//! - Relational store entities and repository
//! - Graph store (SPARQL) client and tender types
//! - Tender aggregation and summary services
//! - Summarizer client abstraction
//! - Search index client
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod graph;
pub mod metrics;
pub mod search;
pub mod summarizer;
pub mod tenders;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};
pub use graph::{TenderId, TenderReader};
pub use summarizer::Summarizer;
pub use tenders::TenderService;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default summarization model
pub const DEFAULT_SUMMARY_MODEL: &str = "gemini-1.5-flash";

/// Name of the search index holding tender previews
pub const TENDER_INDEX: &str = "tenders";
