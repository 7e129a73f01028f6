//! 事件持久化模型（EventRecord）
//!
//! 线上形态：`{version, timestamp, payload: {typeName, data}}`。
//! 记录本身不携带聚合标识，聚合标识由存储的键决定。
//!
use crate::epoch::EpochMillis;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 带类型标签的编码载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub type_name: String,
    pub data: Value,
}

impl Payload {
    pub fn new(type_name: impl Into<String>, data: Value) -> Self {
        Self {
            type_name: type_name.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// 聚合流中的位置，由事件存储在追加时分配
    pub version: usize,
    pub timestamp: EpochMillis,
    pub payload: Payload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_uses_camel_case_tags() {
        let record = EventRecord {
            version: 2,
            timestamp: EpochMillis::from_millis(1_000),
            payload: Payload::new("ItemAdjusted", serde_json::json!({ "quantity": 3 })),
        };

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({
                "version": 2,
                "timestamp": 1000,
                "payload": { "typeName": "ItemAdjusted", "data": { "quantity": 3 } }
            })
        );
    }
}
