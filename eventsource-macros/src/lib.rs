use proc_macro::TokenStream;

mod derive_utils;
mod domain_event;
mod entity;

/// 聚合实体宏
/// - 在字段最前注入 `root: ::eventsource::aggregate_root::AggregateRoot<Event>`
/// - 自动实现 `::eventsource::entity::Entity`（new/root/root_mut）
/// - 参数：`#[entity(event = EventType, debug = true|false)]`，`event` 必填
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity::expand(attr, item)
}

/// 领域事件集合宏
/// - 仅支持单字段元组变体：`Variant(EventStruct)`
/// - 生成 `::eventsource::domain_event::DomainEvent` 实现与静态类型注册表
/// - 变体参数：`#[event(constructing, name = "...")]`
#[proc_macro_attribute]
pub fn domain_event(attr: TokenStream, item: TokenStream) -> TokenStream {
    domain_event::expand(attr, item)
}
