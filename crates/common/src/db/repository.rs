//! Repository pattern for relational store operations
//!
//! Provides the data access layer for saved-tender links and AI summaries.
//! The `LinkStore` and `SummaryStore` traits are the seams the tender
//! services depend on, so the relational store can be swapped or mocked.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;
use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, Statement,
};
use uuid::Uuid;

/// Store of client↔tender links
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Active links for a client, newest first
    async fn active_links(&self, client_id: Uuid) -> Result<Vec<ClientTenderLink>>;

    /// Find the link row for a (client, tender) pair, active or not
    async fn find_link(&self, client_id: Uuid, tender_id: &str) -> Result<Option<ClientTenderLink>>;

    /// Create or reactivate the link for a (client, tender) pair
    async fn activate_link(
        &self,
        client_id: Uuid,
        tender_id: &str,
        situation: Option<String>,
    ) -> Result<ClientTenderLink>;

    /// Mark the link inactive; returns false when no active link existed
    async fn deactivate_link(&self, client_id: Uuid, tender_id: &str) -> Result<bool>;
}

/// Store of AI-generated tender summaries
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Find the summary row for a tender
    async fn find_summary(&self, tender_id: &str) -> Result<Option<TenderSummary>>;

    /// Create or overwrite the summary row for a tender
    async fn upsert_summary(
        &self,
        tender_id: &str,
        summary: &str,
        document_ref: Option<&str>,
    ) -> Result<TenderSummary>;
}

/// Repository for relational data access
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

#[async_trait]
impl LinkStore for Repository {
    async fn active_links(&self, client_id: Uuid) -> Result<Vec<ClientTenderLink>> {
        ClientTenderLinkEntity::find()
            .filter(ClientTenderLinkColumn::ClientId.eq(client_id))
            .filter(ClientTenderLinkColumn::Active.eq(true))
            .order_by_desc(ClientTenderLinkColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn find_link(
        &self,
        client_id: Uuid,
        tender_id: &str,
    ) -> Result<Option<ClientTenderLink>> {
        ClientTenderLinkEntity::find()
            .filter(ClientTenderLinkColumn::ClientId.eq(client_id))
            .filter(ClientTenderLinkColumn::TenderId.eq(tender_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn activate_link(
        &self,
        client_id: Uuid,
        tender_id: &str,
        situation: Option<String>,
    ) -> Result<ClientTenderLink> {
        let link_id = Uuid::new_v4();
        let now = chrono::Utc::now();

        // Single-statement upsert so concurrent toggles for the same pair
        // resolve last-writer-wins on the (client_id, tender_id) unique key.
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO client_tender_links
                (id, client_id, tender_id, active, situation, created_at, updated_at)
            VALUES ($1, $2, $3, TRUE, $4, $5, $5)
            ON CONFLICT (client_id, tender_id) DO UPDATE SET
                active = TRUE,
                situation = COALESCE(EXCLUDED.situation, client_tender_links.situation),
                updated_at = EXCLUDED.updated_at
            "#,
            vec![
                link_id.into(),
                client_id.into(),
                tender_id.into(),
                situation.into(),
                now.into(),
            ],
        );

        self.write_conn().execute(stmt).await?;

        // Read back through the primary so the row reflects this write
        ClientTenderLinkEntity::find()
            .filter(ClientTenderLinkColumn::ClientId.eq(client_id))
            .filter(ClientTenderLinkColumn::TenderId.eq(tender_id))
            .one(self.write_conn())
            .await?
            .ok_or_else(|| crate::errors::AppError::Internal {
                message: format!("Link upsert for tender {} did not persist", tender_id),
            })
    }

    async fn deactivate_link(&self, client_id: Uuid, tender_id: &str) -> Result<bool> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE client_tender_links
            SET active = FALSE, updated_at = $1
            WHERE client_id = $2 AND tender_id = $3 AND active = TRUE
            "#,
            vec![chrono::Utc::now().into(), client_id.into(), tender_id.into()],
        );

        let result = self.write_conn().execute(stmt).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SummaryStore for Repository {
    async fn find_summary(&self, tender_id: &str) -> Result<Option<TenderSummary>> {
        TenderSummaryEntity::find()
            .filter(TenderSummaryColumn::TenderId.eq(tender_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn upsert_summary(
        &self,
        tender_id: &str,
        summary: &str,
        document_ref: Option<&str>,
    ) -> Result<TenderSummary> {
        let summary_id = Uuid::new_v4();
        let now = chrono::Utc::now();

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO tender_summaries
                (id, tender_id, summary, document_ref, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (tender_id) DO UPDATE SET
                summary = EXCLUDED.summary,
                document_ref = COALESCE(EXCLUDED.document_ref, tender_summaries.document_ref),
                updated_at = EXCLUDED.updated_at
            "#,
            vec![
                summary_id.into(),
                tender_id.into(),
                summary.into(),
                document_ref.into(),
                now.into(),
            ],
        );

        self.write_conn().execute(stmt).await?;

        TenderSummaryEntity::find()
            .filter(TenderSummaryColumn::TenderId.eq(tender_id))
            .one(self.write_conn())
            .await?
            .ok_or_else(|| crate::errors::AppError::Internal {
                message: format!("Summary upsert for tender {} did not persist", tender_id),
            })
    }
}
