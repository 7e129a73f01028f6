//! 事件存储协议（EventStore）
//!
//! 每个聚合一条只追加的日志，按版本严格递增且无空洞。
//!
use crate::{error::DomainResult as Result, persist::EventRecord};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait EventStore: Send + Sync {
    /// 原子地追加一批记录：版本从 `base_version + 1` 起顺序分配（`None` 表示空流，从 0 开始）。
    ///
    /// `base_version` 必须等于当前流的最后版本，否则返回 `VersionConflict` 且不写入任何记录；
    /// 重试一次已成功的追加因此会被拒绝，而不是写入重复事件。
    async fn append(
        &self,
        aggregate_id: &str,
        records: Vec<EventRecord>,
        base_version: Option<usize>,
    ) -> Result<Vec<EventRecord>>;

    /// 按版本升序返回 `since_version` 之后的记录；`None` 返回完整历史。
    /// 没有任何事件的聚合返回空列表。
    async fn load_from(
        &self,
        aggregate_id: &str,
        since_version: Option<usize>,
    ) -> Result<Vec<EventRecord>>;

    /// 当前流的最后版本；没有任何事件时为 `None`。
    /// 默认读取完整历史，后端可以提供更便宜的实现。
    async fn last_version(&self, aggregate_id: &str) -> Result<Option<usize>> {
        Ok(self
            .load_from(aggregate_id, None)
            .await?
            .last()
            .map(|record| record.version))
    }
}

#[async_trait]
impl<T> EventStore for Arc<T>
where
    T: EventStore + ?Sized,
{
    async fn append(
        &self,
        aggregate_id: &str,
        records: Vec<EventRecord>,
        base_version: Option<usize>,
    ) -> Result<Vec<EventRecord>> {
        (**self).append(aggregate_id, records, base_version).await
    }

    async fn load_from(
        &self,
        aggregate_id: &str,
        since_version: Option<usize>,
    ) -> Result<Vec<EventRecord>> {
        (**self).load_from(aggregate_id, since_version).await
    }

    async fn last_version(&self, aggregate_id: &str) -> Result<Option<usize>> {
        (**self).last_version(aggregate_id).await
    }
}
