//! Tender aggregation services
//!
//! `TenderService` joins the two stores: client↔tender links and AI
//! summaries live in the relational store, tender content lives in the
//! graph store. The saved listing is ordered by the relational side and
//! hydrated from the graph side.

use crate::config::MissingTenderPolicy;
use crate::db::models::{ClientTenderLink, TenderSummary};
use crate::db::{LinkStore, SummaryStore};
use crate::errors::{AppError, Result};
use crate::graph::{TenderDetail, TenderId, TenderPreview, TenderReader};
use crate::summarizer::Summarizer;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Upper bound on stored summary text
pub const MAX_SUMMARY_CHARS: usize = 100_000;

/// One entry of the saved-tenders listing
#[derive(Debug, Clone, Serialize)]
pub struct SavedTender {
    /// Tender hash
    pub tender_id: String,

    /// Client-facing pipeline state
    pub situation: Option<String>,

    /// When the tender was saved
    pub saved_at: DateTime<Utc>,

    /// Graph preview; absent when the tender is missing from the graph
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<TenderPreview>,

    /// Set when the graph no longer has this tender and the policy keeps
    /// the entry in the listing
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub missing: bool,
}

/// Result of a save toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    /// Whether the tender is saved after the toggle
    pub saved: bool,
}

/// Aggregation service over the graph reader and the relational stores
pub struct TenderService {
    reader: Arc<dyn TenderReader>,
    links: Arc<dyn LinkStore>,
    summaries: Arc<dyn SummaryStore>,
    summarizer: Arc<dyn Summarizer>,
    missing_policy: MissingTenderPolicy,
}

impl TenderService {
    pub fn new(
        reader: Arc<dyn TenderReader>,
        links: Arc<dyn LinkStore>,
        summaries: Arc<dyn SummaryStore>,
        summarizer: Arc<dyn Summarizer>,
        missing_policy: MissingTenderPolicy,
    ) -> Self {
        Self {
            reader,
            links,
            summaries,
            summarizer,
            missing_policy,
        }
    }

    /// Saved tenders for a client, newest first, hydrated with graph
    /// previews. Ordering comes from the relational store and is preserved
    /// across the hydration step.
    pub async fn list_saved(&self, client_id: Uuid) -> Result<Vec<SavedTender>> {
        let links = self.links.active_links(client_id).await?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        // A malformed stored identifier cannot be looked up; it counts as
        // missing from the graph, subject to the same policy.
        let mut parsed: Vec<Option<TenderId>> = Vec::with_capacity(links.len());
        for link in &links {
            match TenderId::parse(&link.tender_id) {
                Ok(id) => parsed.push(Some(id)),
                Err(_) => {
                    warn!(
                        tender_id = %link.tender_id,
                        client_id = %client_id,
                        "Saved link has a malformed tender identifier"
                    );
                    parsed.push(None);
                }
            }
        }

        let ids: Vec<TenderId> = parsed.iter().flatten().cloned().collect();
        let previews = self.reader.fetch_previews(&ids).await?;
        let mut previews = previews.into_iter();

        let mut saved = Vec::with_capacity(links.len());
        for (link, id) in links.iter().zip(&parsed) {
            let preview = match id {
                Some(_) => previews.next().flatten(),
                None => None,
            };
            let missing = preview.is_none();
            if missing {
                debug!(
                    tender_id = %link.tender_id,
                    "Saved tender has no graph record"
                );
                if self.missing_policy == MissingTenderPolicy::Omit {
                    continue;
                }
            }
            saved.push(SavedTender {
                tender_id: link.tender_id.clone(),
                situation: link.situation.clone(),
                saved_at: link.created_at.with_timezone(&Utc),
                preview,
                missing,
            });
        }

        Ok(saved)
    }

    /// Check connectivity to the graph store
    pub async fn ping_graph(&self) -> Result<()> {
        self.reader.ping().await
    }

    /// Raw active link rows for a client, newest first
    pub async fn saved_links(&self, client_id: Uuid) -> Result<Vec<ClientTenderLink>> {
        self.links.active_links(client_id).await
    }

    /// Tender hashes of a client's active saved links
    pub async fn saved_ids(&self, client_id: Uuid) -> Result<Vec<String>> {
        let links = self.links.active_links(client_id).await?;
        Ok(links.into_iter().map(|l| l.tender_id).collect())
    }

    /// Toggle the saved state of a tender for a client.
    ///
    /// Unsaving is a logical delete: the link row stays, flagged inactive.
    /// Saving reuses an inactive row when one exists; the graph is only
    /// consulted when the toggle would create or reactivate a link.
    pub async fn toggle_save(
        &self,
        client_id: Uuid,
        id: &TenderId,
        situation: Option<String>,
    ) -> Result<ToggleOutcome> {
        let existing = self.links.find_link(client_id, id.as_hash()).await?;

        if let Some(link) = existing {
            if link.active {
                let deactivated = self.links.deactivate_link(client_id, id.as_hash()).await?;
                if !deactivated {
                    // Lost a race with a concurrent unsave; the link is
                    // already inactive, which is the state we wanted.
                    debug!(tender_id = %id, "Link already inactive");
                }
                info!(client_id = %client_id, tender_id = %id, "Tender unsaved");
                crate::metrics::record_link_toggled(false);
                return Ok(ToggleOutcome { saved: false });
            }
        }

        if !self.reader.exists(id).await? {
            return Err(AppError::TenderNotFound {
                id: id.as_hash().to_string(),
            });
        }

        self.links
            .activate_link(client_id, id.as_hash(), situation)
            .await?;
        info!(client_id = %client_id, tender_id = %id, "Tender saved");
        crate::metrics::record_link_toggled(true);
        Ok(ToggleOutcome { saved: true })
    }

    /// Preview of one tender from the graph
    pub async fn get_preview(&self, id: &TenderId) -> Result<TenderPreview> {
        self.reader
            .fetch_preview(id)
            .await?
            .ok_or_else(|| AppError::TenderNotFound {
                id: id.as_hash().to_string(),
            })
    }

    /// Full tender detail with the stored AI summary overlaid
    pub async fn get_detail(&self, id: &TenderId) -> Result<TenderDetail> {
        let mut detail =
            self.reader
                .fetch_detail(id)
                .await?
                .ok_or_else(|| AppError::TenderNotFound {
                    id: id.as_hash().to_string(),
                })?;

        match self.summaries.find_summary(id.as_hash()).await {
            Ok(Some(summary)) => {
                detail.summary = Some(summary.summary);
                detail.document_ref = summary.document_ref;
            }
            Ok(None) => {}
            Err(e) => {
                // The graph record is still useful without the overlay
                warn!(tender_id = %id, error = %e, "Failed to load summary overlay");
            }
        }

        Ok(detail)
    }

    /// Stored AI summary for a tender
    pub async fn get_summary(&self, id: &TenderId) -> Result<TenderSummary> {
        self.summaries
            .find_summary(id.as_hash())
            .await?
            .ok_or_else(|| AppError::SummaryNotFound {
                id: id.as_hash().to_string(),
            })
    }

    /// Create or overwrite the AI summary for a tender.
    ///
    /// The tender must exist in the graph; nothing is written otherwise.
    /// Text is stored exactly as supplied, whitespace included.
    pub async fn update_summary(
        &self,
        id: &TenderId,
        text: &str,
        document_ref: Option<&str>,
    ) -> Result<TenderSummary> {
        if text.trim().is_empty() {
            return Err(AppError::Validation {
                message: "Summary text must not be empty".to_string(),
                field: Some("summary".to_string()),
            });
        }
        if text.chars().count() > MAX_SUMMARY_CHARS {
            return Err(AppError::Validation {
                message: format!("Summary text exceeds {} characters", MAX_SUMMARY_CHARS),
                field: Some("summary".to_string()),
            });
        }

        if !self.reader.exists(id).await? {
            return Err(AppError::TenderNotFound {
                id: id.as_hash().to_string(),
            });
        }

        let summary = self
            .summaries
            .upsert_summary(id.as_hash(), text, document_ref)
            .await?;
        info!(tender_id = %id, "Summary stored");
        crate::metrics::record_summary_written();
        Ok(summary)
    }

    /// Generate a summary for a tender with the external LLM and store it
    pub async fn generate_summary(&self, id: &TenderId) -> Result<TenderSummary> {
        let detail =
            self.reader
                .fetch_detail(id)
                .await?
                .ok_or_else(|| AppError::TenderNotFound {
                    id: id.as_hash().to_string(),
                })?;

        let prompt = build_summary_prompt(&detail);
        let text = self.summarizer.summarize(&prompt).await?;

        let summary = self.summaries.upsert_summary(id.as_hash(), &text, None).await?;
        info!(tender_id = %id, model = self.summarizer.model(), "Summary generated");
        crate::metrics::record_summary_generated(self.summarizer.model());
        crate::metrics::record_summary_written();
        Ok(summary)
    }
}

/// Build the summarization prompt from a tender's graph record
fn build_summary_prompt(detail: &TenderDetail) -> String {
    let mut prompt = String::from(
        "Summarize the following public procurement tender for a bidder. \
         Cover the subject, the buyer, the budget, the deadline, and the lots. \
         Answer in markdown.\n\n",
    );

    if let Some(ref title) = detail.title {
        prompt.push_str(&format!("Title: {}\n", title));
    }
    if let Some(ref id) = detail.tender_id {
        prompt.push_str(&format!("File number: {}\n", id));
    }
    if let Some(ref buyer) = detail.buyer {
        if let Some(ref name) = buyer.legal_name {
            prompt.push_str(&format!("Buyer: {}\n", name));
        }
    }
    if let Some(ref value) = detail.values.estimated_value {
        prompt.push_str(&format!(
            "Estimated value: {} {}\n",
            value.amount, value.currency
        ));
    }
    if let Some(date) = detail.submission_date {
        prompt.push_str(&format!("Submission deadline: {}\n", date.to_rfc3339()));
    }
    if let Some(ref location) = detail.location {
        prompt.push_str(&format!("Location: {}\n", location));
    }
    if let Some(ref description) = detail.description {
        prompt.push_str(&format!("\nDescription:\n{}\n", description));
    }
    for lot in &detail.lots {
        prompt.push_str(&format!(
            "\nLot {}: {}\n",
            lot.lot_hash,
            lot.title.as_deref().unwrap_or("(untitled)")
        ));
        if let Some(ref lot_description) = lot.description {
            prompt.push_str(&format!("{}\n", lot_description));
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MockTenderReader, TenderValues};
    use crate::summarizer::MockSummarizer;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryLinkStore {
        rows: Mutex<Vec<ClientTenderLink>>,
    }

    impl MemoryLinkStore {
        fn link(client_id: Uuid, tender_id: &str, active: bool, age_secs: i64) -> ClientTenderLink {
            let at = (Utc::now() - chrono::Duration::seconds(age_secs)).fixed_offset();
            ClientTenderLink {
                id: Uuid::new_v4(),
                client_id,
                tender_id: tender_id.to_string(),
                active,
                situation: None,
                created_at: at,
                updated_at: at,
            }
        }

        fn seed(&self, rows: Vec<ClientTenderLink>) {
            *self.rows.lock().unwrap() = rows;
        }
    }

    #[async_trait]
    impl LinkStore for MemoryLinkStore {
        async fn active_links(&self, client_id: Uuid) -> Result<Vec<ClientTenderLink>> {
            let mut rows: Vec<_> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.client_id == client_id && r.active)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }

        async fn find_link(
            &self,
            client_id: Uuid,
            tender_id: &str,
        ) -> Result<Option<ClientTenderLink>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.client_id == client_id && r.tender_id == tender_id)
                .cloned())
        }

        async fn activate_link(
            &self,
            client_id: Uuid,
            tender_id: &str,
            situation: Option<String>,
        ) -> Result<ClientTenderLink> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows
                .iter_mut()
                .find(|r| r.client_id == client_id && r.tender_id == tender_id)
            {
                row.active = true;
                if situation.is_some() {
                    row.situation = situation;
                }
                row.updated_at = Utc::now().fixed_offset();
                return Ok(row.clone());
            }
            let row = ClientTenderLink {
                id: Uuid::new_v4(),
                client_id,
                tender_id: tender_id.to_string(),
                active: true,
                situation,
                created_at: Utc::now().fixed_offset(),
                updated_at: Utc::now().fixed_offset(),
            };
            rows.push(row.clone());
            Ok(row)
        }

        async fn deactivate_link(&self, client_id: Uuid, tender_id: &str) -> Result<bool> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows
                .iter_mut()
                .find(|r| r.client_id == client_id && r.tender_id == tender_id && r.active)
            {
                row.active = false;
                row.updated_at = Utc::now().fixed_offset();
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }

    #[derive(Default)]
    struct MemorySummaryStore {
        rows: Mutex<HashMap<String, TenderSummary>>,
    }

    #[async_trait]
    impl SummaryStore for MemorySummaryStore {
        async fn find_summary(&self, tender_id: &str) -> Result<Option<TenderSummary>> {
            Ok(self.rows.lock().unwrap().get(tender_id).cloned())
        }

        async fn upsert_summary(
            &self,
            tender_id: &str,
            summary: &str,
            document_ref: Option<&str>,
        ) -> Result<TenderSummary> {
            let mut rows = self.rows.lock().unwrap();
            let now = Utc::now().fixed_offset();
            let row = rows
                .entry(tender_id.to_string())
                .and_modify(|r| {
                    r.summary = summary.to_string();
                    if let Some(doc) = document_ref {
                        r.document_ref = Some(doc.to_string());
                    }
                    r.updated_at = now;
                })
                .or_insert_with(|| TenderSummary {
                    id: Uuid::new_v4(),
                    tender_id: tender_id.to_string(),
                    summary: summary.to_string(),
                    document_ref: document_ref.map(str::to_string),
                    created_at: now,
                    updated_at: now,
                });
            Ok(row.clone())
        }
    }

    fn preview(hash: &str) -> TenderPreview {
        TenderPreview {
            tender_hash: hash.to_string(),
            tender_id: Some(format!("EXP-{}", hash)),
            title: format!("Tender {}", hash),
            description: None,
            submission_date: None,
            n_lots: 1,
            pub_org_name: None,
            budget: None,
            location: None,
            contract_type: None,
            cpv_categories: Vec::new(),
        }
    }

    fn detail(hash: &str) -> TenderDetail {
        TenderDetail {
            tender_hash: hash.to_string(),
            tender_id: Some(format!("EXP-{}", hash)),
            title: Some(format!("Tender {}", hash)),
            description: Some("Road works".to_string()),
            additional_information: None,
            submission_date: None,
            buyer: None,
            values: TenderValues::default(),
            location: None,
            contract_type: None,
            cpv_categories: Vec::new(),
            lots: Vec::new(),
            summary: None,
            document_ref: None,
        }
    }

    struct Fixture {
        reader: Arc<MockTenderReader>,
        links: Arc<MemoryLinkStore>,
        summaries: Arc<MemorySummaryStore>,
        service: TenderService,
    }

    fn fixture(policy: MissingTenderPolicy) -> Fixture {
        let reader = Arc::new(MockTenderReader::new());
        let links = Arc::new(MemoryLinkStore::default());
        let summaries = Arc::new(MemorySummaryStore::default());
        let service = TenderService::new(
            reader.clone(),
            links.clone(),
            summaries.clone(),
            Arc::new(MockSummarizer::new()),
            policy,
        );
        Fixture {
            reader,
            links,
            summaries,
            service,
        }
    }

    #[tokio::test]
    async fn test_list_saved_empty_without_links() {
        let f = fixture(MissingTenderPolicy::Omit);
        let saved = f.service.list_saved(Uuid::new_v4()).await.unwrap();
        assert!(saved.is_empty());
    }

    #[tokio::test]
    async fn test_list_saved_preserves_recency_order() {
        let f = fixture(MissingTenderPolicy::Omit);
        let client = Uuid::new_v4();

        f.reader.insert_preview(preview("old"));
        f.reader.insert_preview(preview("mid"));
        f.reader.insert_preview(preview("new"));
        f.links.seed(vec![
            MemoryLinkStore::link(client, "old", true, 300),
            MemoryLinkStore::link(client, "new", true, 10),
            MemoryLinkStore::link(client, "mid", true, 100),
        ]);

        let saved = f.service.list_saved(client).await.unwrap();
        let order: Vec<_> = saved.iter().map(|s| s.tender_id.as_str()).collect();
        assert_eq!(order, vec!["new", "mid", "old"]);
        assert!(saved.iter().all(|s| s.preview.is_some()));
    }

    #[tokio::test]
    async fn test_list_saved_omits_missing_tenders_by_default() {
        let f = fixture(MissingTenderPolicy::Omit);
        let client = Uuid::new_v4();

        f.reader.insert_preview(preview("present"));
        f.links.seed(vec![
            MemoryLinkStore::link(client, "present", true, 10),
            MemoryLinkStore::link(client, "vanished", true, 20),
        ]);

        let saved = f.service.list_saved(client).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].tender_id, "present");
    }

    #[tokio::test]
    async fn test_list_saved_annotates_missing_when_configured() {
        let f = fixture(MissingTenderPolicy::Annotate);
        let client = Uuid::new_v4();

        f.reader.insert_preview(preview("present"));
        f.links.seed(vec![
            MemoryLinkStore::link(client, "present", true, 10),
            MemoryLinkStore::link(client, "vanished", true, 20),
        ]);

        let saved = f.service.list_saved(client).await.unwrap();
        assert_eq!(saved.len(), 2);
        let vanished = saved.iter().find(|s| s.tender_id == "vanished").unwrap();
        assert!(vanished.missing);
        assert!(vanished.preview.is_none());
    }

    #[tokio::test]
    async fn test_list_saved_annotates_malformed_identifiers() {
        let f = fixture(MissingTenderPolicy::Annotate);
        let client = Uuid::new_v4();

        f.reader.insert_preview(preview("good"));
        f.links.seed(vec![
            MemoryLinkStore::link(client, "good", true, 10),
            MemoryLinkStore::link(client, "not a hash!", true, 20),
        ]);

        let saved = f.service.list_saved(client).await.unwrap();
        assert_eq!(saved.len(), 2);
        let malformed = saved.iter().find(|s| s.tender_id == "not a hash!").unwrap();
        assert!(malformed.missing);
        assert!(malformed.preview.is_none());

        // Under omit the malformed link is dropped like any missing tender
        let f = fixture(MissingTenderPolicy::Omit);
        f.reader.insert_preview(preview("good"));
        f.links.seed(vec![
            MemoryLinkStore::link(client, "good", true, 10),
            MemoryLinkStore::link(client, "not a hash!", true, 20),
        ]);
        let saved = f.service.list_saved(client).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].tender_id, "good");
    }

    #[tokio::test]
    async fn test_list_saved_excludes_inactive_links() {
        let f = fixture(MissingTenderPolicy::Omit);
        let client = Uuid::new_v4();

        f.reader.insert_preview(preview("kept"));
        f.reader.insert_preview(preview("unsaved"));
        f.links.seed(vec![
            MemoryLinkStore::link(client, "kept", true, 10),
            MemoryLinkStore::link(client, "unsaved", false, 20),
        ]);

        let saved = f.service.list_saved(client).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].tender_id, "kept");
    }

    #[tokio::test]
    async fn test_toggle_cycles_through_logical_delete() {
        let f = fixture(MissingTenderPolicy::Omit);
        let client = Uuid::new_v4();
        let id = TenderId::parse("abc123").unwrap();
        f.reader.insert_preview(preview("abc123"));

        let first = f.service.toggle_save(client, &id, None).await.unwrap();
        assert!(first.saved);

        let second = f.service.toggle_save(client, &id, None).await.unwrap();
        assert!(!second.saved);

        // The row survives the unsave and is reactivated, not duplicated
        let third = f.service.toggle_save(client, &id, None).await.unwrap();
        assert!(third.saved);
        assert_eq!(f.links.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_save_unknown_tender_rejected() {
        let f = fixture(MissingTenderPolicy::Omit);
        let client = Uuid::new_v4();
        let id = TenderId::parse("ghost").unwrap();

        let result = f.service.toggle_save(client, &id, None).await;
        assert!(matches!(result, Err(AppError::TenderNotFound { .. })));
        assert!(f.links.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsave_skips_graph_existence_check() {
        let f = fixture(MissingTenderPolicy::Omit);
        let client = Uuid::new_v4();
        let id = TenderId::parse("vanished").unwrap();

        // Saved earlier, since removed from the graph; unsaving still works
        f.links
            .seed(vec![MemoryLinkStore::link(client, "vanished", true, 10)]);

        let outcome = f.service.toggle_save(client, &id, None).await.unwrap();
        assert!(!outcome.saved);
    }

    #[tokio::test]
    async fn test_update_summary_requires_graph_record() {
        let f = fixture(MissingTenderPolicy::Omit);
        let id = TenderId::parse("ghost").unwrap();

        let result = f.service.update_summary(&id, "A summary", None).await;
        assert!(matches!(result, Err(AppError::TenderNotFound { .. })));
        assert!(f.summaries.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_summary_upserts() {
        let f = fixture(MissingTenderPolicy::Omit);
        let id = TenderId::parse("abc123").unwrap();
        f.reader.insert_preview(preview("abc123"));

        let created = f.service.update_summary(&id, "First version", None).await.unwrap();
        let updated = f.service.update_summary(&id, "Second version", None).await.unwrap();

        assert_eq!(created.id, updated.id);
        assert_eq!(updated.summary, "Second version");
        assert_eq!(f.summaries.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_summary_stores_text_verbatim() {
        let f = fixture(MissingTenderPolicy::Omit);
        let id = TenderId::parse("abc123").unwrap();
        f.reader.insert_preview(preview("abc123"));

        let text = "  leading and trailing kept  ";
        f.service.update_summary(&id, text, None).await.unwrap();

        let stored = f.service.get_summary(&id).await.unwrap();
        assert_eq!(stored.summary, text);
    }

    #[tokio::test]
    async fn test_update_summary_overwrites_document_ref() {
        let f = fixture(MissingTenderPolicy::Omit);
        let id = TenderId::parse("abc123").unwrap();
        f.reader.insert_preview(preview("abc123"));

        f.service
            .update_summary(&id, "v1", Some("folder-1"))
            .await
            .unwrap();
        let updated = f.service.update_summary(&id, "v2", Some("folder-2")).await.unwrap();
        assert_eq!(updated.document_ref.as_deref(), Some("folder-2"));

        // Omitting the reference keeps the stored one
        let kept = f.service.update_summary(&id, "v3", None).await.unwrap();
        assert_eq!(kept.document_ref.as_deref(), Some("folder-2"));
    }

    #[tokio::test]
    async fn test_update_summary_rejects_blank_text() {
        let f = fixture(MissingTenderPolicy::Omit);
        let id = TenderId::parse("abc123").unwrap();
        f.reader.insert_preview(preview("abc123"));

        let result = f.service.update_summary(&id, "   \n", None).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_detail_overlays_stored_summary() {
        let f = fixture(MissingTenderPolicy::Omit);
        let id = TenderId::parse("abc123").unwrap();
        f.reader.insert_preview(preview("abc123"));
        f.reader.insert_detail(detail("abc123"));
        f.service.update_summary(&id, "Stored summary", None).await.unwrap();

        let detail = f.service.get_detail(&id).await.unwrap();
        assert_eq!(detail.summary.as_deref(), Some("Stored summary"));
    }

    #[tokio::test]
    async fn test_generate_summary_stores_llm_output() {
        let f = fixture(MissingTenderPolicy::Omit);
        let id = TenderId::parse("abc123").unwrap();
        f.reader.insert_detail(detail("abc123"));

        let summary = f.service.generate_summary(&id).await.unwrap();
        assert!(summary.summary.starts_with("Summary of:"));

        let stored = f.service.get_summary(&id).await.unwrap();
        assert_eq!(stored.summary, summary.summary);
    }

    #[tokio::test]
    async fn test_get_summary_missing() {
        let f = fixture(MissingTenderPolicy::Omit);
        let id = TenderId::parse("abc123").unwrap();

        let result = f.service.get_summary(&id).await;
        assert!(matches!(result, Err(AppError::SummaryNotFound { .. })));
    }

    #[test]
    fn test_prompt_includes_core_fields() {
        let mut d = detail("abc123");
        d.lots.push(crate::graph::Lot {
            lot_hash: "lot1".to_string(),
            title: Some("Paving".to_string()),
            description: None,
        });
        let prompt = build_summary_prompt(&d);
        assert!(prompt.contains("Tender abc123"));
        assert!(prompt.contains("Road works"));
        assert!(prompt.contains("Lot lot1: Paving"));
    }
}
