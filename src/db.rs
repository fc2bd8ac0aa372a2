use std::collections::HashSet;

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::warn;

use crate::config::DatabaseConfig;
use crate::models::ProductRecord;

pub const MERCADO_LIVRE_TABLE: &str = "mercadolivre";
pub const AMERICANAS_TABLE: &str = "americanas";

/// PostgreSQL persistence for the scraped tables.
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&config.url())
            .await?;
        Ok(Self { pool })
    }

    /// Create both destination tables if they do not exist yet.
    pub async fn ensure_tables(&self) -> Result<(), sqlx::Error> {
        for table in [MERCADO_LIVRE_TABLE, AMERICANAS_TABLE] {
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                     codigo TEXT NOT NULL,
                     nome TEXT NOT NULL,
                     marca TEXT,
                     valor DOUBLE PRECISION NOT NULL,
                     link TEXT NOT NULL,
                     capturado_em TIMESTAMPTZ NOT NULL
                 )"
            ))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn insert_mercado_livre(&self, records: &[ProductRecord]) -> usize {
        self.insert_into(MERCADO_LIVRE_TABLE, records).await
    }

    pub async fn insert_americanas(&self, records: &[ProductRecord]) -> usize {
        self.insert_into(AMERICANAS_TABLE, records).await
    }

    /// Row-by-row insertion; a failing row is logged and skipped without
    /// aborting the batch. String fields are lowercased on the way in.
    /// Returns the number of rows that landed.
    async fn insert_into(&self, table: &str, records: &[ProductRecord]) -> usize {
        let captured_at = Utc::now();
        let statement = format!(
            "INSERT INTO {table} (codigo, nome, marca, valor, link, capturado_em)
             VALUES ($1, $2, $3, $4, $5, $6)"
        );

        let mut inserted = 0;
        for record in records {
            let result = sqlx::query(&statement)
                .bind(record.code.to_lowercase())
                .bind(record.title.to_lowercase())
                .bind(record.brand.as_deref().map(str::to_lowercase))
                .bind(record.price)
                .bind(record.link.to_lowercase())
                .bind(captured_at)
                .execute(&self.pool)
                .await;

            match result {
                Ok(_) => inserted += 1,
                Err(e) => {
                    warn!(table, code = %record.code, error = %e, "row insert failed");
                }
            }
        }
        inserted
    }

    /// All homologation codes already persisted for Mercado Livre; the
    /// reference set for cross-catalog matching in the Americanas run.
    pub async fn mercado_livre_codes(&self) -> Result<HashSet<String>, sqlx::Error> {
        let codes: Vec<String> =
            sqlx::query_scalar(&format!("SELECT codigo FROM {MERCADO_LIVRE_TABLE}"))
                .fetch_all(&self.pool)
                .await?;
        Ok(codes.into_iter().collect())
    }

    pub async fn row_count(&self, table: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
    }
}
