//! SPARQL query builders for the tender graph
//!
//! All queries target the EU procurement ontology (ePO). Tender identifiers
//! are validated by `TenderId` before being interpolated, so the URI placed
//! in BIND positions is always a plain path.

/// Common prefixes shared by the preview and detail queries
pub const PREFIXES: &str = r#"PREFIX dcterms: <http://purl.org/dc/terms/>
PREFIX epo: <http://data.europa.eu/a4g/ontology#>
PREFIX locn: <http://www.w3.org/ns/locn#>
PREFIX authority: <http://publications.europa.eu/ontology/authority/>
PREFIX adms: <http://www.w3.org/ns/adms#>
PREFIX m8g: <http://data.europa.eu/m8g/>
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX skos: <http://www.w3.org/2004/02/skos/core#>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
"#;

/// ASK whether a procedure resource exists
pub fn exists(tender_uri: &str) -> String {
    format!(
        "{PREFIXES}
ASK {{ <{tender_uri}> a epo:Procedure . }}"
    )
}

/// Single-row preview of one procedure: title, deadline, lot count, buyer,
/// budget, location, contract type, and aggregated CPV classifications.
pub fn preview(tender_uri: &str) -> String {
    format!(
        "{PREFIXES}
SELECT ?procedure ?id ?title ?description ?submissionDate (COUNT(DISTINCT ?lot) AS ?lotCount)
    ?orgName ?baseBudgetAmount ?baseBudgetCurrency ?locationName ?contractType
    (GROUP_CONCAT(DISTINCT ?classification; separator=\", \") AS ?classifications)
WHERE {{
  BIND(<{tender_uri}> as ?procedure)
  ?procedure a epo:Procedure .

  OPTIONAL {{
    ?procedure adms:identifier ?identifier .
    ?identifier skos:notation ?id .
  }}

  OPTIONAL {{ ?procedure dcterms:title ?title . }}
  OPTIONAL {{ ?procedure dcterms:description ?description . }}

  OPTIONAL {{
    ?procedure epo:isSubjectToProcedureSpecificTerm ?submissionTerm .
    ?submissionTerm a epo:SubmissionTerm ;
                    epo:hasReceiptDeadline ?submissionDate .
  }}

  OPTIONAL {{
    ?procedure epo:hasProcurementScopeDividedIntoLot ?lot .
  }}

  OPTIONAL {{
    ?procedure epo:involvesBuyer ?buyer .
    ?buyer a m8g:PublicOrganisation ;
           epo:hasLegalName ?orgName .
  }}

  OPTIONAL {{
    ?procedure epo:hasEstimatedValue ?monetaryValue .
    FILTER(STRENDS(STR(?monetaryValue), \"estimated-overall-contract-amount\"))
    ?monetaryValue epo:hasAmountValue ?baseBudgetAmount ;
                   authority:currency ?baseBudgetCurrency .
  }}

  OPTIONAL {{
    ?procedure epo:foreseesContractSpecificTerm ?contractTerm .
    ?contractTerm epo:definesSpecificPlaceOfPerformance ?location ;
                  epo:hasContractNatureType ?contractType .
    ?location a dcterms:Location ;
              locn:geographicName ?locationName .
  }}

  OPTIONAL {{
    ?procedure epo:hasPurpose ?purpose .
    ?purpose epo:hasMainClassification ?classification .
  }}
}}
GROUP BY ?procedure ?id ?title ?description ?submissionDate ?orgName ?baseBudgetAmount ?baseBudgetCurrency ?locationName ?contractType"
    )
}

/// Core literals of a procedure
pub fn detail_core(tender_uri: &str) -> String {
    format!(
        "{PREFIXES}
SELECT ?title ?description ?additionalInfo ?id ?submissionDate
WHERE {{
  BIND(<{tender_uri}> as ?procedure)
  ?procedure a epo:Procedure .
  OPTIONAL {{ ?procedure dcterms:title ?title . }}
  OPTIONAL {{ ?procedure dcterms:description ?description . }}
  OPTIONAL {{ ?procedure epo:hasAdditionalInformation ?additionalInfo . }}
  OPTIONAL {{
    ?procedure adms:identifier ?identifier .
    ?identifier skos:notation ?id .
  }}
  OPTIONAL {{
    ?procedure epo:isSubjectToProcedureSpecificTerm ?submissionTerm .
    ?submissionTerm a epo:SubmissionTerm ;
                    epo:hasReceiptDeadline ?submissionDate .
  }}
}}
LIMIT 1"
    )
}

/// Buying organization of a procedure
pub fn detail_buyer(tender_uri: &str) -> String {
    format!(
        "{PREFIXES}
SELECT ?orgName ?buyerProfile ?taxId
WHERE {{
  <{tender_uri}> epo:involvesBuyer ?buyer .
  OPTIONAL {{ ?buyer epo:hasLegalName ?orgName . }}
  OPTIONAL {{ ?buyer epo:hasBuyerProfile ?buyerProfile . }}
  OPTIONAL {{
    ?buyer epo:hasTaxIdentifier ?taxIdentifier .
    ?taxIdentifier skos:notation ?taxId .
  }}
}}
LIMIT 1"
    )
}

/// All monetary values attached to a procedure. The value kind (estimated,
/// net, gross) is encoded in the tail of the value node URI.
pub fn detail_values(tender_uri: &str) -> String {
    format!(
        "{PREFIXES}
SELECT ?monetaryValue ?amount ?currency
WHERE {{
  <{tender_uri}> epo:hasEstimatedValue ?monetaryValue .
  ?monetaryValue epo:hasAmountValue ?amount ;
                 authority:currency ?currency .
}}"
    )
}

/// Contract terms: place of performance and contract nature type
pub fn detail_terms(tender_uri: &str) -> String {
    format!(
        "{PREFIXES}
SELECT ?locationName ?contractType
WHERE {{
  <{tender_uri}> epo:foreseesContractSpecificTerm ?contractTerm .
  ?contractTerm epo:definesSpecificPlaceOfPerformance ?location ;
                epo:hasContractNatureType ?contractType .
  ?location a dcterms:Location ;
            locn:geographicName ?locationName .
}}
LIMIT 1"
    )
}

/// CPV classifications of a procedure
pub fn detail_cpvs(tender_uri: &str) -> String {
    format!(
        "{PREFIXES}
SELECT DISTINCT ?classification
WHERE {{
  <{tender_uri}> epo:hasPurpose ?purpose .
  ?purpose epo:hasMainClassification ?classification .
}}"
    )
}

/// Lots of a procedure with their titles and descriptions
pub fn detail_lots(tender_uri: &str) -> String {
    format!(
        "{PREFIXES}
SELECT ?lot ?lotTitle ?lotDescription
WHERE {{
  <{tender_uri}> epo:hasProcurementScopeDividedIntoLot ?lot .
  OPTIONAL {{ ?lot dcterms:title ?lotTitle . }}
  OPTIONAL {{ ?lot dcterms:description ?lotDescription . }}
}}
ORDER BY ?lot"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exists_query_contains_uri() {
        let q = exists("http://tenderhub.dev/procedure/abc");
        assert!(q.contains("ASK"));
        assert!(q.contains("<http://tenderhub.dev/procedure/abc>"));
    }

    #[test]
    fn test_preview_query_selects_expected_fields() {
        let q = preview("http://tenderhub.dev/procedure/abc");
        for var in [
            "?title",
            "?submissionDate",
            "?lotCount",
            "?orgName",
            "?baseBudgetAmount",
            "?locationName",
            "?contractType",
            "?classifications",
        ] {
            assert!(q.contains(var), "missing {var}");
        }
    }
}
