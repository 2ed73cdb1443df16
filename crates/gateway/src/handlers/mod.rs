//! Request handlers for the Tenderhub gateway

pub mod health;
pub mod saved;
pub mod summaries;
pub mod tenders;
