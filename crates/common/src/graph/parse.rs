//! Parsing of `application/sparql-results+json` responses
//!
//! The graph store answers SELECT queries with a bindings table and ASK
//! queries with a boolean. Bindings are flattened into the tender types
//! here; absent optional variables simply produce `None`.

use super::types::{Buyer, Lot, MonetaryValue, TenderDetail, TenderPreview, TenderValues};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

/// One RDF term in a result binding
#[derive(Debug, Clone, Deserialize)]
pub struct SparqlTerm {
    #[serde(rename = "type")]
    pub term_type: String,
    pub value: String,
}

/// A single result row: variable name to term
pub type Binding = HashMap<String, SparqlTerm>;

#[derive(Debug, Deserialize, Default)]
pub struct SparqlBindings {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// Top-level SPARQL JSON results document (SELECT or ASK)
#[derive(Debug, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub results: Option<SparqlBindings>,

    /// Present for ASK queries
    #[serde(default)]
    pub boolean: Option<bool>,
}

impl SparqlResults {
    /// Rows of a SELECT result, empty when the document carried none
    pub fn rows(&self) -> &[Binding] {
        self.results.as_ref().map(|r| r.bindings.as_slice()).unwrap_or(&[])
    }

    /// First row of a SELECT result
    pub fn first_row(&self) -> Option<&Binding> {
        self.rows().first()
    }
}

/// Get a variable's string value from a binding
pub fn get_str(binding: &Binding, var: &str) -> Option<String> {
    binding
        .get(var)
        .map(|term| term.value.clone())
        .filter(|v| !v.is_empty())
}

/// Get a variable as the last segment of its URI value
pub fn get_uri_tail(binding: &Binding, var: &str) -> Option<String> {
    get_str(binding, var)
        .and_then(|uri| uri.rsplit('/').next().map(str::to_string))
        .filter(|v| !v.is_empty())
}

/// Get a variable parsed as an RFC 3339 timestamp
pub fn get_datetime(binding: &Binding, var: &str) -> Option<DateTime<Utc>> {
    let raw = get_str(binding, var)?;
    match DateTime::parse_from_rfc3339(&raw.replace('Z', "+00:00")) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            warn!(value = %raw, error = %e, "Unparseable date in graph result");
            None
        }
    }
}

/// Get a variable parsed as an integer, defaulting to 0
pub fn get_count(binding: &Binding, var: &str) -> u32 {
    get_str(binding, var)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Parse one preview binding row into a `TenderPreview`
pub fn preview_from_binding(binding: &Binding) -> TenderPreview {
    let tender_hash = get_uri_tail(binding, "procedure").unwrap_or_default();

    let budget = match (
        get_str(binding, "baseBudgetAmount").and_then(|v| v.parse::<f64>().ok()),
        get_str(binding, "baseBudgetCurrency"),
    ) {
        (Some(amount), Some(currency)) => Some(MonetaryValue { amount, currency }),
        _ => None,
    };

    // GROUP_CONCAT joins classification URIs with ", "; each becomes a CPV code
    let cpv_categories = get_str(binding, "classifications")
        .map(|raw| {
            raw.split(", ")
                .filter(|s| !s.is_empty())
                .map(|uri| uri.rsplit('/').next().unwrap_or(uri).to_string())
                .collect()
        })
        .unwrap_or_default();

    TenderPreview {
        tender_hash,
        tender_id: get_str(binding, "id"),
        title: get_str(binding, "title").unwrap_or_else(|| "Untitled Tender".to_string()),
        description: get_str(binding, "description"),
        submission_date: get_datetime(binding, "submissionDate"),
        n_lots: get_count(binding, "lotCount"),
        pub_org_name: get_str(binding, "orgName"),
        budget,
        location: get_str(binding, "locationName"),
        contract_type: get_uri_tail(binding, "contractType"),
        cpv_categories,
    }
}

/// Assemble a `TenderDetail` from the named per-aspect query results
pub fn detail_from_results(
    tender_hash: &str,
    core: &SparqlResults,
    buyer: &SparqlResults,
    values: &SparqlResults,
    terms: &SparqlResults,
    cpvs: &SparqlResults,
    lots: &SparqlResults,
) -> Option<TenderDetail> {
    // A procedure with no core row does not exist in the graph
    let core_row = core.first_row()?;

    let buyer = buyer.first_row().map(|row| Buyer {
        legal_name: get_str(row, "orgName"),
        buyer_profile: get_str(row, "buyerProfile"),
        tax_identifier: get_str(row, "taxId"),
    });

    // The value kind is encoded in the tail of the monetary value node URI
    let mut tender_values = TenderValues::default();
    for row in values.rows() {
        let kind = get_str(row, "monetaryValue").unwrap_or_default();
        let value = match (
            get_str(row, "amount").and_then(|v| v.parse::<f64>().ok()),
            get_str(row, "currency"),
        ) {
            (Some(amount), Some(currency)) => MonetaryValue { amount, currency },
            _ => continue,
        };

        if kind.ends_with("estimated-overall-contract-amount") {
            tender_values.estimated_value = Some(value);
        } else if kind.contains("net-value") {
            tender_values.net_value = Some(value);
        } else if kind.contains("gross-value") {
            tender_values.gross_value = Some(value);
        }
    }

    let terms_row = terms.first_row();

    let cpv_categories = cpvs
        .rows()
        .iter()
        .filter_map(|row| get_uri_tail(row, "classification"))
        .collect();

    let lots = lots
        .rows()
        .iter()
        .filter_map(|row| {
            Some(Lot {
                lot_hash: get_uri_tail(row, "lot")?,
                title: get_str(row, "lotTitle"),
                description: get_str(row, "lotDescription"),
            })
        })
        .collect();

    Some(TenderDetail {
        tender_hash: tender_hash.to_string(),
        tender_id: get_str(core_row, "id"),
        title: get_str(core_row, "title"),
        description: get_str(core_row, "description"),
        additional_information: get_str(core_row, "additionalInfo"),
        submission_date: get_datetime(core_row, "submissionDate"),
        buyer,
        values: tender_values,
        location: terms_row.and_then(|row| get_str(row, "locationName")),
        contract_type: terms_row.and_then(|row| get_uri_tail(row, "contractType")),
        cpv_categories,
        lots,
        summary: None,
        document_ref: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(value: &str) -> SparqlTerm {
        SparqlTerm {
            term_type: "literal".to_string(),
            value: value.to_string(),
        }
    }

    fn uri_term(value: &str) -> SparqlTerm {
        SparqlTerm {
            term_type: "uri".to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_preview_binding_full() {
        let mut binding = Binding::new();
        binding.insert(
            "procedure".into(),
            uri_term("http://tenderhub.dev/procedure/abc123"),
        );
        binding.insert("id".into(), term("EXP-2024-001"));
        binding.insert("title".into(), term("Road maintenance"));
        binding.insert("submissionDate".into(), term("2024-06-01T12:00:00Z"));
        binding.insert("lotCount".into(), term("3"));
        binding.insert("orgName".into(), term("City Council"));
        binding.insert("baseBudgetAmount".into(), term("150000.50"));
        binding.insert("baseBudgetCurrency".into(), term("EUR"));
        binding.insert(
            "contractType".into(),
            uri_term("http://publications.europa.eu/resource/authority/contract-nature/works"),
        );
        binding.insert(
            "classifications".into(),
            term("http://example.org/cpv/45000000, http://example.org/cpv/45230000"),
        );

        let preview = preview_from_binding(&binding);
        assert_eq!(preview.tender_hash, "abc123");
        assert_eq!(preview.tender_id.as_deref(), Some("EXP-2024-001"));
        assert_eq!(preview.title, "Road maintenance");
        assert_eq!(preview.n_lots, 3);
        assert_eq!(preview.budget.as_ref().unwrap().currency, "EUR");
        assert_eq!(preview.contract_type.as_deref(), Some("works"));
        assert_eq!(preview.cpv_categories, vec!["45000000", "45230000"]);
    }

    #[test]
    fn test_preview_binding_minimal() {
        let mut binding = Binding::new();
        binding.insert(
            "procedure".into(),
            uri_term("http://tenderhub.dev/procedure/xyz"),
        );

        let preview = preview_from_binding(&binding);
        assert_eq!(preview.tender_hash, "xyz");
        assert_eq!(preview.title, "Untitled Tender");
        assert!(preview.budget.is_none());
        assert!(preview.cpv_categories.is_empty());
    }

    #[test]
    fn test_ask_result_parses() {
        let doc: SparqlResults =
            serde_json::from_str(r#"{"head": {}, "boolean": true}"#).unwrap();
        assert_eq!(doc.boolean, Some(true));
    }

    #[test]
    fn test_select_result_parses() {
        let doc: SparqlResults = serde_json::from_str(
            r#"{"head": {"vars": ["title"]},
                "results": {"bindings": [{"title": {"type": "literal", "value": "T1"}}]}}"#,
        )
        .unwrap();
        assert_eq!(doc.rows().len(), 1);
        assert_eq!(get_str(doc.first_row().unwrap(), "title").as_deref(), Some("T1"));
    }

    #[test]
    fn test_budget_requires_both_amount_and_currency() {
        let mut binding = Binding::new();
        binding.insert(
            "procedure".into(),
            uri_term("http://tenderhub.dev/procedure/p1"),
        );
        binding.insert("baseBudgetAmount".into(), term("1000"));

        let preview = preview_from_binding(&binding);
        assert!(preview.budget.is_none());
    }
}
