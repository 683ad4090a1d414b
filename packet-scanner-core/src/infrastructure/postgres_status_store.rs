use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{info, warn};

use crate::{
    domain::{PacketId, PacketStatus, PacketStatusRecord},
    error::{PacketError, Result},
    ports::StatusStore,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const RECORD_COLUMNS: &str = "id, status, retry_count, status_comment, \
     is_active, created_by, created_at, updated_by, updated_at";

/// Status store backed by the `packet_status` table in Postgres.
#[derive(Debug, Clone)]
pub struct PostgresStatusStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct PacketStatusRow {
    id: String,
    status: String,
    retry_count: Option<i32>,
    status_comment: Option<String>,
    is_active: bool,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<PacketStatusRow> for PacketStatusRecord {
    type Error = PacketError;

    fn try_from(row: PacketStatusRow) -> Result<Self> {
        let retry_count = row
            .retry_count
            .map(|count| {
                u32::try_from(count).map_err(|_| {
                    PacketError::InvalidRecord(format!(
                        "negative retry count {count} for packet {}",
                        row.id
                    ))
                })
            })
            .transpose()?;

        Ok(PacketStatusRecord {
            id: PacketId::new(row.id)?,
            status: row.status.parse()?,
            retry_count,
            status_comment: row.status_comment,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        })
    }
}

fn retry_count_column(record: &PacketStatusRecord) -> Result<Option<i32>> {
    record
        .retry_count
        .map(|count| {
            i32::try_from(count).map_err(|_| {
                PacketError::InvalidRecord(format!(
                    "retry count {count} out of range for packet {}",
                    record.id
                ))
            })
        })
        .transpose()
}

impl PostgresStatusStore {
    /// Store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.map_err(|e| {
            PacketError::StoreUnavailable(format!("migration failed: {e}"))
        })?;
        info!(target: "scan::store", "packet_status migrations applied");
        Ok(())
    }

    /// Cheap round trip to confirm the database answers.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                PacketError::StoreUnavailable(format!(
                    "status store failed Postgres health check: {e}"
                ))
            })?;
        Ok(())
    }

    /// Insert a record unless one already exists for its identifier.
    /// Returns whether a row was written.
    pub async fn register(&self, record: &PacketStatusRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO packet_status
                (id, status, retry_count, status_comment, is_active,
                 created_by, created_at, updated_by, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(record.id.as_str())
        .bind(record.status.code())
        .bind(retry_count_column(record)?)
        .bind(record.status_comment.as_deref())
        .bind(record.is_active)
        .bind(&record.created_by)
        .bind(record.created_at)
        .bind(record.updated_by.as_deref())
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl StatusStore for PostgresStatusStore {
    async fn list_by_status(
        &self,
        status: PacketStatus,
    ) -> Result<Vec<PacketStatusRecord>> {
        let rows = sqlx::query_as::<_, PacketStatusRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM packet_status \
             WHERE status = $1 AND is_active \
             ORDER BY created_at"
        ))
        .bind(status.code())
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match PacketStatusRecord::try_from(row) {
                Ok(record) => records.push(record),
                Err(err) => {
                    // One malformed row must not hide the rest of the batch.
                    warn!(
                        target: "scan::store",
                        packet_id = %id,
                        error = %err,
                        "skipping malformed status record"
                    );
                }
            }
        }
        Ok(records)
    }

    async fn update(&self, record: &PacketStatusRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE packet_status
            SET status = $2,
                retry_count = $3,
                status_comment = $4,
                updated_by = $5,
                updated_at = COALESCE($6, NOW())
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(record.id.as_str())
        .bind(record.status.code())
        .bind(retry_count_column(record)?)
        .bind(record.status_comment.as_deref())
        .bind(record.updated_by.as_deref())
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PacketError::StoreUnavailable(format!(
                "no active status record for packet {}",
                record.id
            )));
        }
        Ok(())
    }

    async fn find(&self, id: &PacketId) -> Result<Option<PacketStatusRecord>> {
        let row = sqlx::query_as::<_, PacketStatusRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM packet_status WHERE id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(PacketStatusRecord::try_from).transpose()
    }
}
