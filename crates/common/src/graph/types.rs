//! Tender types materialized from the graph store
//!
//! Tenders live as EU procurement ontology (ePO) resources in the graph.
//! These types are the flattened shapes the rest of the system works with.

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tender identifier: the hash segment of the procedure URI.
///
/// Accepts either a bare hash (`a1b2c3...`) or a full procedure URI
/// (`http://.../procedure/a1b2c3...`), normalizing to the hash form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenderId(String);

impl TenderId {
    /// Parse an identifier, accepting a bare hash or a full procedure URI
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let hash = if input.starts_with("http://") || input.starts_with("https://") {
            input.rsplit('/').next().unwrap_or("")
        } else {
            input
        };

        if hash.is_empty() || hash.len() > 128 {
            return Err(AppError::InvalidTenderId { id: input.to_string() });
        }

        // Hashes are URI path segments; reject anything that could break
        // out of the BIND(<...>) position in a query.
        if !hash.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(AppError::InvalidTenderId { id: input.to_string() });
        }

        Ok(Self(hash.to_string()))
    }

    /// The bare hash form
    pub fn as_hash(&self) -> &str {
        &self.0
    }

    /// The full procedure URI under the given prefix
    pub fn uri(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.0)
    }
}

impl fmt::Display for TenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenderId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A monetary amount with its currency code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonetaryValue {
    pub amount: f64,
    pub currency: String,
}

/// Flattened tender preview row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenderPreview {
    /// Hash segment of the procedure URI
    pub tender_hash: String,

    /// Official file number (expediente)
    pub tender_id: Option<String>,

    pub title: String,

    pub description: Option<String>,

    /// Submission deadline
    pub submission_date: Option<DateTime<Utc>>,

    /// Number of lots the procurement is divided into
    pub n_lots: u32,

    /// Legal name of the buying organization
    pub pub_org_name: Option<String>,

    /// Estimated overall contract amount
    pub budget: Option<MonetaryValue>,

    /// Geographic name of the place of performance
    pub location: Option<String>,

    /// Contract nature type (last segment of the type URI)
    pub contract_type: Option<String>,

    /// CPV classification codes
    pub cpv_categories: Vec<String>,
}

/// Named monetary values attached to a procedure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenderValues {
    pub estimated_value: Option<MonetaryValue>,
    pub net_value: Option<MonetaryValue>,
    pub gross_value: Option<MonetaryValue>,
}

/// Buying organization details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Buyer {
    pub legal_name: Option<String>,
    pub buyer_profile: Option<String>,
    pub tax_identifier: Option<String>,
}

/// A single lot within a procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    /// Hash segment of the lot URI
    pub lot_hash: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Full tender record assembled from several graph queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenderDetail {
    pub tender_hash: String,
    pub tender_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub additional_information: Option<String>,
    pub submission_date: Option<DateTime<Utc>>,
    pub buyer: Option<Buyer>,
    pub values: TenderValues,
    pub location: Option<String>,
    pub contract_type: Option<String>,
    pub cpv_categories: Vec<String>,
    pub lots: Vec<Lot>,

    /// AI summary overlaid from the relational store, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Reference to the generated document folder, from the same overlay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ref: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tender_id_from_hash() {
        let id = TenderId::parse("a1b2c3d4").unwrap();
        assert_eq!(id.as_hash(), "a1b2c3d4");
        assert_eq!(
            id.uri("http://tenderhub.dev/procedure/"),
            "http://tenderhub.dev/procedure/a1b2c3d4"
        );
    }

    #[test]
    fn test_tender_id_from_uri() {
        let id = TenderId::parse("http://tenderhub.dev/procedure/deadbeef").unwrap();
        assert_eq!(id.as_hash(), "deadbeef");
    }

    #[test]
    fn test_tender_id_rejects_injection() {
        assert!(TenderId::parse("abc> . ?s ?p ?o").is_err());
        assert!(TenderId::parse("").is_err());
        assert!(TenderId::parse("http://tenderhub.dev/procedure/").is_err());
    }
}
