//! 事件溯源聚合持久化基础库（eventsource）
//!
//! 以聚合为一致性边界，提供：
//! - 聚合生命周期（`aggregate_root`/`aggregate`）：版本、流长度与未提交事件缓冲；
//! - 领域事件（`domain_event`）及其显式分类（构造事件/常规事件）；
//! - 类型注册表（`registry`）：启动时一次性绑定类型名与解码函数；
//! - 持久化（`persist`）：事件/快照记录、编解码器、存储协议、内存与 Postgres 实现、聚合仓储。
//!
//! 典型用法：
//! 1. 使用 `#[domain_event]` 定义事件集合，使用 `#[entity(event = ..)]` 定义聚合；
//! 2. 为聚合实现 `Aggregate::on`（以及可选的 `Snapshotting`）；
//! 3. 构造存储实例并注入 `EventSourcedRepository`/`SnapshottingRepository`；
//! 4. 调用方执行命令产生事件后调用 `save`，通过 `load` 重建聚合。
//!
pub mod aggregate;
pub mod aggregate_root;
pub mod domain_event;
pub mod entity;
pub mod epoch;
pub mod error;
pub mod persist;
pub mod registry;

// 允许在本 crate 内部通过 ::eventsource 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::eventsource 路径。
extern crate self as eventsource;

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
