//! 快照存储协议与策略
//!
//! 定义快照读写接口与按流长度间隔落盘的策略。
//!
use crate::{error::DomainResult as Result, persist::SnapshotRecord};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// 保存一份新快照，不要求覆盖旧快照
    async fn put(&self, record: SnapshotRecord) -> Result<()>;

    /// 返回版本不超过 `version_ceiling` 的最新快照（`None` 表示不设上限）；
    /// 不存在时返回 `SnapshotNotFound`
    async fn get(&self, aggregate_id: &str, version_ceiling: Option<usize>)
    -> Result<SnapshotRecord>;
}

#[async_trait]
impl<T> SnapshotStore for Arc<T>
where
    T: SnapshotStore + ?Sized,
{
    async fn put(&self, record: SnapshotRecord) -> Result<()> {
        (**self).put(record).await
    }

    async fn get(
        &self,
        aggregate_id: &str,
        version_ceiling: Option<usize>,
    ) -> Result<SnapshotRecord> {
        (**self).get(aggregate_id, version_ceiling).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPolicy {
    Never,
    Every(usize),
}

impl SnapshotPolicy {
    /// 间隔为 0 时关闭快照
    pub fn from_interval(interval: usize) -> Self {
        match interval {
            0 => SnapshotPolicy::Never,
            n => SnapshotPolicy::Every(n),
        }
    }

    pub fn should_snapshot(&self, stream_size: usize) -> bool {
        match self {
            SnapshotPolicy::Never => false,
            SnapshotPolicy::Every(interval) => {
                *interval > 0 && stream_size > 0 && stream_size.is_multiple_of(*interval)
            }
        }
    }
}
