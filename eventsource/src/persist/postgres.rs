//! Postgres 事件存储
//!
//! 每个 `(aggregate_id, version)` 一行，由唯一索引保证同一聚合不会出现重复版本；
//! 全局自增的 `offset` 列记录写入顺序。
//!
use crate::{
    epoch::EpochMillis,
    error::{DomainError, DomainResult as Result},
    persist::{EventRecord, EventStore, Payload},
};
use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool, types::Json};
use tracing::debug;

#[derive(Debug, Clone, bon::Builder)]
pub struct PgEventStore {
    pool: PgPool,
    #[builder(into, default = String::from("events"))]
    table: String,
}

fn to_column(aggregate_id: &str, version: usize) -> Result<i32> {
    i32::try_from(version).map_err(|_| DomainError::EventStore {
        reason: format!("version {version} of aggregate '{aggregate_id}' exceeds column range"),
    })
}

fn from_column(version: i32) -> Result<usize> {
    usize::try_from(version).map_err(|_| DomainError::EventStore {
        reason: format!("negative version {version} in store"),
    })
}

impl PgEventStore {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// 带引号的表名，允许任意合法标识符
    fn quoted_table(&self) -> String {
        format!("\"{}\"", self.table.replace('"', "\"\""))
    }

    /// 创建事件表与 `(aggregate_id, version)` 唯一索引（已存在时跳过）
    pub async fn create_table(&self) -> Result<()> {
        let table = self.quoted_table();
        let index = format!("\"uq_{}_version\"", self.table.replace('"', "\"\""));

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!(
            r#"CREATE TABLE IF NOT EXISTS {table} (
                "offset"     BIGSERIAL PRIMARY KEY NOT NULL,
                aggregate_id VARCHAR(255) NOT NULL,
                version      INTEGER NOT NULL,
                payload      JSONB NOT NULL,
                at           BIGINT NOT NULL
            )"#
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {index} ON {table} (aggregate_id, version)"
        ))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(())
    }

    async fn head<'e, E>(&self, executor: E, aggregate_id: &str) -> Result<Option<usize>>
    where
        E: PgExecutor<'e>,
    {
        let head: Option<i32> = sqlx::query_scalar(&format!(
            "SELECT MAX(version) FROM {} WHERE aggregate_id = $1",
            self.quoted_table()
        ))
        .bind(aggregate_id)
        .fetch_one(executor)
        .await?;

        head.map(from_column).transpose()
    }

    /// 读取 `(since_version, until_version]` 区间内的记录，按版本升序；
    /// 两端为 `None` 时分别表示从头开始与不设上限
    pub async fn load_range(
        &self,
        aggregate_id: &str,
        since_version: Option<usize>,
        until_version: Option<usize>,
    ) -> Result<Vec<EventRecord>> {
        let since = match since_version {
            Some(v) => to_column(aggregate_id, v)?,
            None => -1,
        };
        let until = until_version
            .map(|v| to_column(aggregate_id, v))
            .transpose()?;

        let rows: Vec<(i32, Json<Payload>, i64)> = sqlx::query_as(&format!(
            "SELECT version, payload, at FROM {} \
             WHERE aggregate_id = $1 AND version > $2 AND ($3::INTEGER IS NULL OR version <= $3) \
             ORDER BY version ASC",
            self.quoted_table()
        ))
        .bind(aggregate_id)
        .bind(since)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(version, Json(payload), at)| {
                Ok(EventRecord {
                    version: from_column(version)?,
                    timestamp: EpochMillis::from_millis(at),
                    payload,
                })
            })
            .collect()
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    #[tracing::instrument(skip_all, fields(aggregate_id = %aggregate_id), err)]
    async fn append(
        &self,
        aggregate_id: &str,
        records: Vec<EventRecord>,
        base_version: Option<usize>,
    ) -> Result<Vec<EventRecord>> {
        if records.is_empty() {
            return Ok(records);
        }

        let conflict = |actual: Option<usize>| DomainError::VersionConflict {
            aggregate_id: aggregate_id.to_string(),
            expected: base_version,
            actual,
        };

        let mut tx = self.pool.begin().await?;

        let head = self.head(&mut *tx, aggregate_id).await?;
        if head != base_version {
            return Err(conflict(head));
        }

        let insert = format!(
            "INSERT INTO {} (aggregate_id, version, payload, at) VALUES ($1, $2, $3, $4)",
            self.quoted_table()
        );
        let first = base_version.map_or(0, |v| v + 1);
        let mut stored = Vec::with_capacity(records.len());

        for (offset, record) in records.into_iter().enumerate() {
            let record = EventRecord {
                version: first + offset,
                ..record
            };

            let inserted = sqlx::query(&insert)
                .bind(aggregate_id)
                .bind(to_column(aggregate_id, record.version)?)
                .bind(Json(&record.payload))
                .bind(record.timestamp.as_i64())
                .execute(&mut *tx)
                .await;

            match inserted {
                Ok(_) => stored.push(record),
                // 并发写入者抢先占用了同一版本
                Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                    return Err(conflict(Some(record.version)));
                }
                Err(err) => return Err(err.into()),
            }
        }

        tx.commit().await?;
        debug!(count = stored.len(), "events appended");

        Ok(stored)
    }

    async fn load_from(
        &self,
        aggregate_id: &str,
        since_version: Option<usize>,
    ) -> Result<Vec<EventRecord>> {
        self.load_range(aggregate_id, since_version, None).await
    }

    async fn last_version(&self, aggregate_id: &str) -> Result<Option<usize>> {
        self.head(&self.pool, aggregate_id).await
    }
}
