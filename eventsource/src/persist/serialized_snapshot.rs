use crate::persist::Payload;
use serde::{Deserialize, Serialize};

/// 快照的线上形态：`{aggregateId, version, payload: {typeName, data}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub aggregate_id: String,
    pub version: usize,
    pub payload: Payload,
}

/// 某一版本上聚合状态的完整捕获
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<S> {
    pub aggregate_id: String,
    pub version: usize,
    pub state: S,
}
