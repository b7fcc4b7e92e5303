use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;

use super::store::{DocumentStore, StoredDocument};

/// Documents live in the JSONB `data` column of the `inventory` table.
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Keys that are not UUIDs cannot exist in the table.
    fn parse_key(id: &str) -> Option<Uuid> {
        Uuid::parse_str(id).ok()
    }
}

#[tonic::async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, document: Value) -> AppResult<String> {
        let (id,): (String,) =
            sqlx::query_as("INSERT INTO inventory (data) VALUES ($1) RETURNING id::text")
                .bind(Json(document))
                .fetch_one(&self.pool)
                .await?;

        tracing::debug!("PG insert: table=inventory, id={}", id);
        Ok(id)
    }

    async fn fetch_all(&self) -> AppResult<Vec<StoredDocument>> {
        let rows: Vec<(String, Json<Value>)> =
            sqlx::query_as("SELECT id::text, data FROM inventory")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, Json(data))| StoredDocument { id, data })
            .collect())
    }

    async fn merge(&self, id: &str, patch: Map<String, Value>) -> AppResult<bool> {
        let Some(key) = Self::parse_key(id) else {
            return Ok(false);
        };

        let rows_affected = sqlx::query("UPDATE inventory SET data = data || $1 WHERE id = $2")
            .bind(Json(Value::Object(patch)))
            .bind(key)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn remove(&self, id: &str) -> AppResult<Option<Value>> {
        let Some(key) = Self::parse_key(id) else {
            return Ok(None);
        };

        let row: Option<(Json<Value>,)> =
            sqlx::query_as("DELETE FROM inventory WHERE id = $1 RETURNING data")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(Json(data),)| data))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
