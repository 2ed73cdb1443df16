//! Search index client for tender listings
//!
//! The tender listing endpoint is served from a Meilisearch index rather
//! than the graph store. Documents are flattened previews keyed by the
//! tender hash; filterable attributes are declared at startup.

use crate::config::SearchConfig;
use crate::errors::{AppError, Result};
use crate::TENDER_INDEX;
use meilisearch_sdk::client::Client;
use meilisearch_sdk::settings::Settings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info};

/// Attributes the index accepts in filter expressions
pub const FILTERABLE_ATTRIBUTES: &[&str] = &[
    "id",
    "budget_amount",
    "cpvs",
    "location",
    "updated",
    "submission_date",
    "contract_type",
];

/// Attributes the index accepts in sort expressions
pub const SORTABLE_ATTRIBUTES: &[&str] = &["submission_date", "updated", "budget_amount"];

/// Flattened tender document as stored in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenderDoc {
    /// Tender hash, the index primary key
    pub id: String,

    /// Official file number
    #[serde(default)]
    pub tender_id: Option<String>,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Submission deadline as a unix timestamp
    #[serde(default)]
    pub submission_date: Option<i64>,

    /// Last index update as a unix timestamp
    #[serde(default)]
    pub updated: Option<i64>,

    #[serde(default)]
    pub n_lots: u32,

    #[serde(default)]
    pub contracting_body: Option<String>,

    #[serde(default)]
    pub budget_amount: Option<f64>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub contract_type: Option<String>,

    #[serde(default)]
    pub cpvs: Vec<String>,
}

/// One filter clause from the request body
#[derive(Debug, Clone, Deserialize)]
pub struct SearchFilter {
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub operator: Option<String>,
}

/// Parameters for a tender listing query
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub matching: Option<String>,
    pub offset: usize,
    pub limit: usize,
    pub sort_field: Option<String>,
    pub sort_direction: Option<String>,
    pub filters: Vec<SearchFilter>,

    /// When set, restrict results to these tender hashes. An empty list
    /// short-circuits to an empty page.
    pub restrict_to_ids: Option<Vec<String>>,
}

/// One page of listing results
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub items: Vec<TenderDoc>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Meilisearch-backed tender index
#[derive(Clone)]
pub struct SearchIndex {
    client: Client,
}

impl SearchIndex {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = Client::new(&config.url, config.api_key.as_deref())
            .map_err(|e| AppError::Search {
                message: format!("Failed to create search client: {}", e),
            })?;
        Ok(Self { client })
    }

    /// Declare filterable and sortable attributes on the index
    pub async fn ensure_settings(&self) -> Result<()> {
        let settings = Settings::new()
            .with_filterable_attributes(FILTERABLE_ATTRIBUTES.iter().copied())
            .with_sortable_attributes(SORTABLE_ATTRIBUTES.iter().copied());

        self.client
            .index(TENDER_INDEX)
            .set_settings(&settings)
            .await
            .map_err(|e| AppError::Search {
                message: format!("Failed to update index settings: {}", e),
            })?;

        info!(index = TENDER_INDEX, "Search index settings applied");
        Ok(())
    }

    /// Run a listing query against the tender index
    pub async fn search_tenders(&self, query: &SearchQuery) -> Result<SearchPage> {
        // An explicit empty restriction means the caller already knows
        // there is nothing to match.
        if matches!(query.restrict_to_ids.as_deref(), Some([])) {
            return Ok(SearchPage {
                items: Vec::new(),
                total: 0,
                offset: query.offset,
                limit: query.limit,
            });
        }

        let filter = build_filter_expression(query)?;
        let sort = build_sort_expression(query)?;
        let started = Instant::now();

        let index = self.client.index(TENDER_INDEX);
        let mut search = index.search();
        search.with_offset(query.offset).with_limit(query.limit);

        if let Some(ref matching) = query.matching {
            search.with_query(matching);
        }
        if let Some(ref filter) = filter {
            search.with_filter(filter);
        }
        let sort_refs: Vec<&str>;
        if let Some(ref sort) = sort {
            sort_refs = vec![sort.as_str()];
            search.with_sort(&sort_refs);
        }

        let results = search
            .execute::<TenderDoc>()
            .await
            .map_err(|e| AppError::Search {
                message: format!("Search query failed: {}", e),
            })?;

        let total = results
            .estimated_total_hits
            .unwrap_or_else(|| results.hits.len());

        debug!(
            total,
            offset = query.offset,
            limit = query.limit,
            "Search query complete"
        );
        crate::metrics::record_search_query(started.elapsed());

        Ok(SearchPage {
            items: results.hits.into_iter().map(|hit| hit.result).collect(),
            total,
            offset: query.offset,
            limit: query.limit,
        })
    }
}

/// Build the Meilisearch filter string from body filters and the optional
/// saved-id restriction. Attribute names are checked against the
/// filterable allowlist; `budget_min` and `budget_max` map onto range
/// comparisons over `budget_amount`.
pub fn build_filter_expression(query: &SearchQuery) -> Result<Option<String>> {
    let mut clauses = Vec::new();

    for filter in &query.filters {
        let (name, operator) = match filter.name.as_str() {
            "budget_min" => ("budget_amount", ">=".to_string()),
            "budget_max" => ("budget_amount", "<=".to_string()),
            other => (other, filter.operator.clone().unwrap_or_else(|| "=".to_string())),
        };

        if !FILTERABLE_ATTRIBUTES.contains(&name) {
            return Err(AppError::Validation {
                message: format!("Attribute {} is not filterable", filter.name),
                field: Some("filters".to_string()),
            });
        }

        if !matches!(operator.as_str(), "=" | "!=" | ">" | ">=" | "<" | "<=") {
            return Err(AppError::Validation {
                message: format!("Unsupported filter operator {}", operator),
                field: Some("filters".to_string()),
            });
        }

        let value = render_filter_value(&filter.value)?;
        clauses.push(format!("{} {} {}", name, operator, value));
    }

    if let Some(ref ids) = query.restrict_to_ids {
        let quoted: Vec<String> = ids.iter().map(|id| quote_string(id)).collect();
        clauses.push(format!("id IN [{}]", quoted.join(", ")));
    }

    if clauses.is_empty() {
        Ok(None)
    } else {
        Ok(Some(clauses.join(" AND ")))
    }
}

fn build_sort_expression(query: &SearchQuery) -> Result<Option<String>> {
    let Some(ref field) = query.sort_field else {
        return Ok(None);
    };

    if !SORTABLE_ATTRIBUTES.contains(&field.as_str()) {
        return Err(AppError::Validation {
            message: format!("Attribute {} is not sortable", field),
            field: Some("sort_field".to_string()),
        });
    }

    let direction = match query.sort_direction.as_deref() {
        None | Some("asc") => "asc",
        Some("desc") => "desc",
        Some(other) => {
            return Err(AppError::Validation {
                message: format!("Invalid sort direction {}", other),
                field: Some("sort_direction".to_string()),
            })
        }
    };

    Ok(Some(format!("{}:{}", field, direction)))
}

fn render_filter_value(value: &Value) -> Result<String> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::String(s) => Ok(quote_string(s)),
        other => Err(AppError::Validation {
            message: format!("Unsupported filter value: {}", other),
            field: Some("filters".to_string()),
        }),
    }
}

fn quote_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filter(name: &str, value: Value, operator: Option<&str>) -> SearchFilter {
        SearchFilter {
            name: name.to_string(),
            value,
            operator: operator.map(str::to_string),
        }
    }

    #[test]
    fn test_budget_bounds_map_to_budget_amount() {
        let query = SearchQuery {
            filters: vec![
                filter("budget_min", json!(1000), None),
                filter("budget_max", json!(50000.5), None),
            ],
            ..Default::default()
        };
        let expr = build_filter_expression(&query).unwrap().unwrap();
        assert_eq!(expr, "budget_amount >= 1000 AND budget_amount <= 50000.5");
    }

    #[test]
    fn test_saved_restriction_builds_in_clause() {
        let query = SearchQuery {
            restrict_to_ids: Some(vec!["abc".to_string(), "def".to_string()]),
            ..Default::default()
        };
        let expr = build_filter_expression(&query).unwrap().unwrap();
        assert_eq!(expr, "id IN [\"abc\", \"def\"]");
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let query = SearchQuery {
            filters: vec![filter("password", json!("x"), None)],
            ..Default::default()
        };
        assert!(build_filter_expression(&query).is_err());
    }

    #[test]
    fn test_string_values_are_escaped() {
        let query = SearchQuery {
            filters: vec![filter("location", json!("Madrid \"centro\""), None)],
            ..Default::default()
        };
        let expr = build_filter_expression(&query).unwrap().unwrap();
        assert_eq!(expr, "location = \"Madrid \\\"centro\\\"\"");
    }

    #[test]
    fn test_sort_requires_sortable_attribute() {
        let query = SearchQuery {
            sort_field: Some("title".to_string()),
            ..Default::default()
        };
        assert!(build_sort_expression(&query).is_err());
    }

    #[test]
    fn test_sort_expression() {
        let query = SearchQuery {
            sort_field: Some("submission_date".to_string()),
            sort_direction: Some("desc".to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_sort_expression(&query).unwrap().as_deref(),
            Some("submission_date:desc")
        );
    }
}
