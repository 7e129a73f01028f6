use crate::registry::TypeBinding;
use serde_json::Value;
use std::fmt;

/// 事件分类：构造事件创建聚合且不计入版本，常规事件每条使版本加一
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Constructing,
    Regular,
}

impl EventKind {
    pub fn counts_toward_version(&self) -> bool {
        matches!(self, EventKind::Regular)
    }
}

/// 聚合的封闭事件集合需要满足的能力边界
///
/// 通常由 `#[domain_event]` 宏为“每个变体包裹一个事件结构体”的枚举生成实现。
pub trait DomainEvent: Clone + fmt::Debug + Send + Sync + 'static {
    /// 稳定的类型名，用于持久化时的标签
    fn event_type(&self) -> &'static str;

    /// 事件分类
    fn kind(&self) -> EventKind;

    /// 编码当前变体的数据部分（不含类型名）
    fn encode(&self) -> serde_json::Result<Value>;

    /// 静态注册表：每个变体一条绑定
    fn bindings() -> Vec<TypeBinding<Self>>;
}
