//! 聚合生命周期状态（AggregateRoot）
//!
//! 每个聚合内嵌一份 `AggregateRoot`，由它维护：
//! - `version`：创建之后应用的事件数（构造事件不计入）；
//! - `stream_size`：应用过的全部事件数（含构造事件与重放历史）；
//! - 未提交事件缓冲：仅包含自上次提交以来以 `Origin::New` 应用的事件。
//!
//! 状态迁移本身由聚合的 `Aggregate::on` 完成，这里只负责计数与缓冲。
//!
use crate::domain_event::{DomainEvent, EventEnvelope, EventKind, Metadata};
use crate::error::{DomainError, DomainResult};

/// 事件来源：决定是否进入未提交缓冲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// 命令处理中新产生的事件
    New,
    /// 从存储重放的历史事件
    Replayed,
}

#[derive(Debug, Clone)]
pub struct AggregateRoot<E> {
    id: String,
    version: usize,
    stream_size: usize,
    uncommitted: Vec<EventEnvelope<E>>,
}

impl<E> Default for AggregateRoot<E> {
    fn default() -> Self {
        Self {
            id: String::new(),
            version: 0,
            stream_size: 0,
            uncommitted: Vec::new(),
        }
    }
}

impl<E> AggregateRoot<E>
where
    E: DomainEvent,
{
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> usize {
        self.version
    }

    pub fn stream_size(&self) -> usize {
        self.stream_size
    }

    /// 是否已应用过构造事件
    pub fn is_created(&self) -> bool {
        self.stream_size > 0
    }

    pub fn uncommitted_events(&self) -> &[EventEnvelope<E>] {
        &self.uncommitted
    }

    /// 清空未提交缓冲，只能在事件已持久化之后调用
    pub fn commit_events(&mut self) {
        self.uncommitted.clear();
    }

    /// 已持久化部分的最后一个版本；尚无持久化事件时为 `None`
    pub fn base_version(&self) -> Option<usize> {
        (self.stream_size - self.uncommitted.len()).checked_sub(1)
    }

    /// 为新事件盖上聚合标识、流位置与发生时间
    pub fn stamp(&self, payload: E) -> EventEnvelope<E> {
        let metadata = Metadata::builder()
            .aggregate_id(self.id.clone())
            .version(self.stream_size)
            .build();

        EventEnvelope::new(metadata, payload)
    }

    /// 在状态迁移之前校验事件能否落在当前流上，失败时计数保持不变
    pub(crate) fn check(&self, envelope: &EventEnvelope<E>, origin: Origin) -> DomainResult<()> {
        if envelope.aggregate_id() != self.id {
            return Err(DomainError::InvalidState {
                reason: format!(
                    "event for aggregate '{}' applied to '{}'",
                    envelope.aggregate_id(),
                    self.id
                ),
            });
        }

        match (envelope.kind(), self.is_created()) {
            (EventKind::Constructing, true) => {
                return Err(DomainError::InvalidState {
                    reason: format!(
                        "aggregate '{}' already created, got {}",
                        self.id,
                        envelope.payload.event_type()
                    ),
                });
            }
            (EventKind::Regular, false) => {
                return Err(DomainError::InvalidState {
                    reason: format!(
                        "aggregate '{}' not created yet, got {}",
                        self.id,
                        envelope.payload.event_type()
                    ),
                });
            }
            _ => {}
        }

        if origin == Origin::Replayed && envelope.version() != self.stream_size {
            return Err(DomainError::OutOfOrder {
                aggregate_id: self.id.clone(),
                expected: self.stream_size,
                found: envelope.version(),
            });
        }

        Ok(())
    }

    /// 记录一条已完成状态迁移的事件
    pub(crate) fn record(&mut self, envelope: EventEnvelope<E>, origin: Origin) {
        self.stream_size += 1;

        if origin == Origin::New {
            if envelope.kind().counts_toward_version() {
                self.version += 1;
            }
            self.uncommitted.push(envelope);
        }
    }

    /// 重放结束后按累计流长度重新计算版本
    pub(crate) fn recompute_version(&mut self) {
        self.version = self.stream_size.saturating_sub(1);
    }

    /// 以快照版本作为起点，快照之前的事件视为已应用
    pub(crate) fn restore(&mut self, version: usize) -> DomainResult<()> {
        let stream_size = version
            .checked_add(1)
            .ok_or_else(|| DomainError::InvalidState {
                reason: format!("snapshot version {version} of '{}' is out of range", self.id),
            })?;

        self.version = version;
        self.stream_size = stream_size;
        self.uncommitted.clear();
        Ok(())
    }
}
