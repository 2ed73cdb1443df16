//! Graph store (SPARQL) client and tender reader
//!
//! Tenders are RDF resources in an Amazon Neptune cluster queried over the
//! HTTPS SPARQL endpoint. Requests are signed with SigV4 (service name
//! `neptune-db`); signing can be disabled for local SPARQL stores.

pub mod parse;
pub mod queries;
pub mod types;

pub use types::{Buyer, Lot, MonetaryValue, TenderDetail, TenderId, TenderPreview, TenderValues};

use crate::config::GraphConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use parse::SparqlResults;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";
const SPARQL_QUERY: &str = "application/sparql-query";
const SIGNING_SERVICE: &str = "neptune-db";

/// Read access to tender records in the graph store
#[async_trait]
pub trait TenderReader: Send + Sync {
    /// Check connectivity to the store
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    /// Whether a procedure with this identifier exists
    async fn exists(&self, id: &TenderId) -> Result<bool>;

    /// Preview of one tender; None when the graph has no such procedure
    async fn fetch_preview(&self, id: &TenderId) -> Result<Option<TenderPreview>>;

    /// Previews for many tenders, queried concurrently. The output is
    /// positionally aligned with the input; missing tenders yield None.
    async fn fetch_previews(&self, ids: &[TenderId]) -> Result<Vec<Option<TenderPreview>>>;

    /// Full detail of one tender; None when the graph has no such procedure
    async fn fetch_detail(&self, id: &TenderId) -> Result<Option<TenderDetail>>;
}

/// Low-level SPARQL-over-HTTPS client
#[derive(Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    sparql_url: String,
    region: String,
    credentials: Option<SharedCredentialsProvider>,
}

impl GraphClient {
    /// Build a client from configuration, resolving AWS credentials from
    /// the default provider chain when request signing is enabled.
    pub async fn new(config: &GraphConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(true)
            .build()?;

        let credentials = if config.sign_requests {
            let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
            let provider = aws_config.credentials_provider().ok_or_else(|| {
                AppError::Configuration {
                    message: "Graph request signing enabled but no AWS credentials found".into(),
                }
            })?;
            Some(provider)
        } else {
            None
        };

        info!(
            endpoint = %config.endpoint,
            port = config.port,
            signed = credentials.is_some(),
            "Graph store client initialized"
        );

        Ok(Self {
            http,
            sparql_url: format!("https://{}:{}/sparql", config.endpoint, config.port),
            region: config.region.clone(),
            credentials,
        })
    }

    /// Execute a SPARQL query, returning the parsed JSON results document.
    /// The name labels the query in logs and metrics.
    pub async fn execute(&self, name: &'static str, query: &str) -> Result<SparqlResults> {
        let started = Instant::now();

        let mut request = http::Request::builder()
            .method(http::Method::POST)
            .uri(&self.sparql_url)
            .header(http::header::CONTENT_TYPE, SPARQL_QUERY)
            .header(http::header::ACCEPT, SPARQL_RESULTS_JSON)
            .body(query.to_string())
            .map_err(|e| AppError::Internal {
                message: format!("Failed to build graph request: {}", e),
            })?;

        if let Some(ref provider) = self.credentials {
            self.sign_request(&mut request, provider).await?;
        }

        let request = reqwest::Request::try_from(request).map_err(|e| AppError::Internal {
            message: format!("Failed to convert graph request: {}", e),
        })?;

        let response = self.http.execute(request).await.map_err(|e| {
            AppError::GraphUnavailable {
                message: format!("SPARQL request failed: {}", e),
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AppError::GraphUnavailable {
            message: format!("Failed to read SPARQL response: {}", e),
        })?;

        if !status.is_success() {
            warn!(
                query = name,
                status = status.as_u16(),
                body = %body.chars().take(200).collect::<String>(),
                "Graph store returned an error"
            );
            return Err(AppError::GraphQuery {
                message: format!("SPARQL query {} failed with status {}", name, status),
            });
        }

        let results: SparqlResults =
            serde_json::from_str(&body).map_err(|e| AppError::GraphQuery {
                message: format!("Unparseable SPARQL response for {}: {}", name, e),
            })?;

        let elapsed = started.elapsed();
        debug!(query = name, elapsed_ms = elapsed.as_millis() as u64, "SPARQL query complete");
        crate::metrics::record_graph_query(name, elapsed);

        Ok(results)
    }

    /// Execute an ASK query
    pub async fn ask(&self, name: &'static str, query: &str) -> Result<bool> {
        let results = self.execute(name, query).await?;
        results.boolean.ok_or_else(|| AppError::GraphQuery {
            message: format!("ASK query {} returned no boolean", name),
        })
    }

    async fn sign_request(
        &self,
        request: &mut http::Request<String>,
        provider: &SharedCredentialsProvider,
    ) -> Result<()> {
        let credentials = provider.provide_credentials().await.map_err(|e| {
            AppError::Configuration {
                message: format!("Failed to resolve AWS credentials: {}", e),
            }
        })?;
        let identity = credentials.into();

        let signing_params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(SIGNING_SERVICE)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to build signing params: {}", e),
            })?;

        let signable = SignableRequest::new(
            request.method().as_str(),
            request.uri().to_string(),
            request
                .headers()
                .iter()
                .map(|(k, v)| (k.as_str(), v.to_str().unwrap_or_default())),
            SignableBody::Bytes(request.body().as_bytes()),
        )
        .map_err(|e| AppError::Internal {
            message: format!("Failed to build signable request: {}", e),
        })?;

        let (instructions, _signature) = sign(signable, &signing_params.into())
            .map_err(|e| AppError::Internal {
                message: format!("SigV4 signing failed: {}", e),
            })?
            .into_parts();

        instructions.apply_to_request_http1x(request);
        Ok(())
    }
}

/// `TenderReader` backed by the SPARQL graph store
#[derive(Clone)]
pub struct SparqlTenderReader {
    client: GraphClient,
    uri_prefix: String,
}

impl SparqlTenderReader {
    pub fn new(client: GraphClient, uri_prefix: String) -> Self {
        Self { client, uri_prefix }
    }

    fn uri(&self, id: &TenderId) -> String {
        id.uri(&self.uri_prefix)
    }
}

#[async_trait]
impl TenderReader for SparqlTenderReader {
    async fn ping(&self) -> Result<()> {
        self.client.ask("ping", "ASK { }").await.map(|_| ())
    }

    async fn exists(&self, id: &TenderId) -> Result<bool> {
        let uri = self.uri(id);
        self.client.ask("exists", &queries::exists(&uri)).await
    }

    async fn fetch_preview(&self, id: &TenderId) -> Result<Option<TenderPreview>> {
        let uri = self.uri(id);
        let results = self.client.execute("preview", &queries::preview(&uri)).await?;

        // The grouped preview query returns one all-NULL row for a missing
        // procedure; treat a row without the procedure variable as absent.
        Ok(results
            .first_row()
            .filter(|row| row.contains_key("procedure"))
            .map(parse::preview_from_binding))
    }

    async fn fetch_previews(&self, ids: &[TenderId]) -> Result<Vec<Option<TenderPreview>>> {
        let futures = ids.iter().map(|id| self.fetch_preview(id));
        futures::future::try_join_all(futures).await
    }

    async fn fetch_detail(&self, id: &TenderId) -> Result<Option<TenderDetail>> {
        let uri = self.uri(id);

        // The detail is assembled from independent per-aspect queries run
        // concurrently, mirroring how the record is laid out in the graph.
        // The query strings must outlive the joined futures.
        let core_query = queries::detail_core(&uri);
        let buyer_query = queries::detail_buyer(&uri);
        let values_query = queries::detail_values(&uri);
        let terms_query = queries::detail_terms(&uri);
        let cpvs_query = queries::detail_cpvs(&uri);
        let lots_query = queries::detail_lots(&uri);

        let (core, buyer, values, terms, cpvs, lots) = tokio::try_join!(
            self.client.execute("detail_core", &core_query),
            self.client.execute("detail_buyer", &buyer_query),
            self.client.execute("detail_values", &values_query),
            self.client.execute("detail_terms", &terms_query),
            self.client.execute("detail_cpvs", &cpvs_query),
            self.client.execute("detail_lots", &lots_query),
        )?;

        Ok(parse::detail_from_results(
            id.as_hash(),
            &core,
            &buyer,
            &values,
            &terms,
            &cpvs,
            &lots,
        ))
    }
}

/// In-memory `TenderReader` for tests and local development
#[derive(Default)]
pub struct MockTenderReader {
    previews: std::sync::RwLock<std::collections::HashMap<String, TenderPreview>>,
    details: std::sync::RwLock<std::collections::HashMap<String, TenderDetail>>,
}

impl MockTenderReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_preview(&self, preview: TenderPreview) {
        self.previews
            .write()
            .unwrap()
            .insert(preview.tender_hash.clone(), preview);
    }

    pub fn insert_detail(&self, detail: TenderDetail) {
        self.details
            .write()
            .unwrap()
            .insert(detail.tender_hash.clone(), detail);
    }
}

#[async_trait]
impl TenderReader for MockTenderReader {
    async fn exists(&self, id: &TenderId) -> Result<bool> {
        let previews = self.previews.read().unwrap();
        let details = self.details.read().unwrap();
        Ok(previews.contains_key(id.as_hash()) || details.contains_key(id.as_hash()))
    }

    async fn fetch_preview(&self, id: &TenderId) -> Result<Option<TenderPreview>> {
        Ok(self.previews.read().unwrap().get(id.as_hash()).cloned())
    }

    async fn fetch_previews(&self, ids: &[TenderId]) -> Result<Vec<Option<TenderPreview>>> {
        let previews = self.previews.read().unwrap();
        Ok(ids.iter().map(|id| previews.get(id.as_hash()).cloned()).collect())
    }

    async fn fetch_detail(&self, id: &TenderId) -> Result<Option<TenderDetail>> {
        Ok(self.details.read().unwrap().get(id.as_hash()).cloned())
    }
}
