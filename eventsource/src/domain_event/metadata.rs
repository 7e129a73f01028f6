use crate::epoch::EpochMillis;
use bon::Builder;
use serde::{Deserialize, Serialize};

/// 元数据
#[derive(Builder, Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[builder(into)]
    aggregate_id: String,
    version: usize,
    #[builder(default = EpochMillis::now())]
    occurred_at: EpochMillis,
}

impl Metadata {
    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    /// 事件在聚合流中的位置（构造事件为 0）
    pub fn version(&self) -> usize {
        self.version
    }

    pub fn occurred_at(&self) -> EpochMillis {
        self.occurred_at
    }
}
