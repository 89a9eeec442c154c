//! Postgres-backed document store.
//!
//! ## Error mapping
//!
//! | SQLx error | Postgres code | `StoreError` |
//! |---|---|---|
//! | unique violation | `23505` | `Conflict` (concurrent insert of the same document) |
//! | version guard matched no row | n/a | `Conflict` |
//! | anything else | any | `Backend` |
//!
//! Every statement filters on `tenant_id`, so one tenant can never read or
//! write another tenant's documents.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use livebase_core::{BaseId, ExpectedVersion, TenantId};

use super::{DocumentStore, StoreError, StoredDocument, WriteBatch, WriteOp};

const SCHEMA: &str = include_str!("../../migrations/0001_documents.sql");

#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: Arc<PgPool>,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if missing. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        info!("document store schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn get(
        &self,
        tenant_id: TenantId,
        kind: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT kind, id, base_id, version, body, updated_at
            FROM documents
            WHERE tenant_id = $1 AND kind = $2 AND id = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(kind)
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        row.as_ref().map(document_from_row).transpose()
    }

    #[instrument(skip(self, bases), fields(tenant_id = %tenant_id), err)]
    async fn list(
        &self,
        tenant_id: TenantId,
        kind: &str,
        bases: Option<&[BaseId]>,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let bases: Option<Vec<Uuid>> = bases.map(|b| b.iter().map(|id| *id.as_uuid()).collect());
        let rows = sqlx::query(
            r#"
            SELECT kind, id, base_id, version, body, updated_at
            FROM documents
            WHERE tenant_id = $1
                AND kind = $2
                AND ($3::uuid[] IS NULL OR base_id IS NULL OR base_id = ANY($3))
            ORDER BY id ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(kind)
        .bind(bases)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter().map(document_from_row).collect()
    }

    #[instrument(skip(self, batch), fields(tenant_id = %tenant_id, writes = batch.len()), err)]
    async fn commit(&self, tenant_id: TenantId, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for op in batch.into_ops() {
            // Dropping `tx` on error rolls the transaction back.
            apply(&mut tx, tenant_id, op).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn next_sequence(&self, tenant_id: TenantId, key: &str) -> Result<u64, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO sequences (tenant_id, key, value)
            VALUES ($1, $2, 1)
            ON CONFLICT (tenant_id, key) DO UPDATE SET value = sequences.value + 1
            RETURNING value
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(key)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("next_sequence", e))?;

        let value: i64 = row
            .try_get("value")
            .map_err(|e| map_sqlx_error("next_sequence", e))?;
        Ok(value as u64)
    }

    async fn tenants(&self) -> Result<Vec<TenantId>, StoreError> {
        let rows = sqlx::query("SELECT DISTINCT tenant_id FROM documents")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("tenants", e))?;
        rows.iter()
            .map(|row| {
                row.try_get::<Uuid, _>("tenant_id")
                    .map(TenantId::from_uuid)
                    .map_err(|e| map_sqlx_error("tenants", e))
            })
            .collect()
    }
}

async fn apply(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    op: WriteOp,
) -> Result<(), StoreError> {
    let conflict = StoreError::Conflict(format!(
        "{} '{}' was modified concurrently",
        op.kind(),
        op.id()
    ));
    let affected = match op {
        WriteOp::Put {
            kind,
            id,
            base_id,
            expected: ExpectedVersion::New,
            version,
            body,
        } => sqlx::query(
            r#"
            INSERT INTO documents (tenant_id, kind, id, base_id, version, body, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(kind)
        .bind(&id)
        .bind(base_id.map(|b| *b.as_uuid()))
        .bind(version as i64)
        .bind(&body)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                conflict.clone()
            } else {
                map_sqlx_error("insert_document", e)
            }
        })?
        .rows_affected(),

        WriteOp::Put {
            kind,
            id,
            base_id,
            expected,
            version,
            body,
        } => {
            let guard = match expected {
                ExpectedVersion::Exact(v) => Some(v as i64),
                _ => None,
            };
            sqlx::query(
                r#"
                UPDATE documents
                SET base_id = $4, version = $5, body = $6, updated_at = NOW()
                WHERE tenant_id = $1 AND kind = $2 AND id = $3
                    AND ($7::bigint IS NULL OR version = $7)
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(kind)
            .bind(&id)
            .bind(base_id.map(|b| *b.as_uuid()))
            .bind(version as i64)
            .bind(&body)
            .bind(guard)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("update_document", e))?
            .rows_affected()
        }

        WriteOp::Delete { kind, id, expected } => {
            let guard = match expected {
                ExpectedVersion::Exact(v) => Some(v as i64),
                _ => None,
            };
            sqlx::query(
                r#"
                DELETE FROM documents
                WHERE tenant_id = $1 AND kind = $2 AND id = $3
                    AND ($4::bigint IS NULL OR version = $4)
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(kind)
            .bind(&id)
            .bind(guard)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("delete_document", e))?
            .rows_affected()
        }
    };

    if affected == 0 {
        return Err(conflict);
    }
    Ok(())
}

fn document_from_row(row: &PgRow) -> Result<StoredDocument, StoreError> {
    let read = |e: sqlx::Error| StoreError::Backend(format!("failed to read document row: {e}"));
    let base_id: Option<Uuid> = row.try_get("base_id").map_err(read)?;
    let version: i64 = row.try_get("version").map_err(read)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(read)?;
    Ok(StoredDocument {
        kind: row.try_get("kind").map_err(read)?,
        id: row.try_get("id").map_err(read)?,
        base_id: base_id.map(|u| BaseId::from_entity(u.into())),
        version: version as u64,
        body: row.try_get("body").map_err(read)?,
        updated_at,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505");
    }
    false
}
