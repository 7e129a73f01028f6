//! 类型注册表（Type Registry）
//!
//! 在启动时一次性地把稳定的类型名绑定到解码函数，读取路径按标签分发，
//! 不依赖运行期反射：
//! - 同名且同类型的重复绑定是幂等的；
//! - 同名但不同类型的绑定属于配置错误，在绑定时即被拒绝；
//! - 同一类型可以绑定多个名字（例如历史名称），首个名字作为编码时使用的主名。
//!
use crate::error::{DomainError, DomainResult};
use serde_json::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

/// 解码函数：把数据部分还原为目标类型
pub type DecodeFn<T> = fn(Value) -> serde_json::Result<T>;

/// 单条绑定：类型名 -> 具体类型 + 解码函数
pub struct TypeBinding<T> {
    name: &'static str,
    type_id: TypeId,
    decode: DecodeFn<T>,
}

impl<T> TypeBinding<T> {
    /// 以具体类型 `V` 的身份创建绑定，`decode` 的产物为 `T`（事件枚举或快照状态）
    pub fn new<V: 'static>(name: &'static str, decode: DecodeFn<T>) -> Self {
        Self {
            name,
            type_id: TypeId::of::<V>(),
            decode,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

impl<T> TypeBinding<T>
where
    T: serde::de::DeserializeOwned + 'static,
{
    /// 直接以 `T` 自身作为绑定类型（快照状态的常见用法）
    pub fn of(name: &'static str) -> Self {
        Self::new::<T>(name, serde_json::from_value::<T>)
    }
}

impl<T> Clone for TypeBinding<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypeBinding<T> {}

impl<T> fmt::Debug for TypeBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeBinding")
            .field("name", &self.name)
            .field("type_id", &self.type_id)
            .finish()
    }
}

pub struct TypeRegistry<T> {
    by_name: HashMap<&'static str, TypeBinding<T>>,
    primary_names: HashMap<TypeId, &'static str>,
}

impl<T> Default for TypeRegistry<T> {
    fn default() -> Self {
        Self {
            by_name: HashMap::new(),
            primary_names: HashMap::new(),
        }
    }
}

impl<T> fmt::Debug for TypeRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("names", &names).finish()
    }
}

impl<T> TypeRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 绑定一批类型；先整体校验再写入，冲突时注册表保持不变
    pub fn bind<I>(&mut self, bindings: I) -> DomainResult<()>
    where
        I: IntoIterator<Item = TypeBinding<T>>,
    {
        let bindings: Vec<TypeBinding<T>> = bindings.into_iter().collect();

        let mut staged: HashMap<&'static str, TypeId> = HashMap::new();
        for binding in &bindings {
            let existing = self
                .by_name
                .get(binding.name)
                .map(|b| b.type_id)
                .or_else(|| staged.get(binding.name).copied());

            match existing {
                Some(type_id) if type_id != binding.type_id => {
                    return Err(DomainError::DuplicateBinding {
                        type_name: binding.name.to_string(),
                    });
                }
                _ => {
                    staged.insert(binding.name, binding.type_id);
                }
            }
        }

        for binding in bindings {
            self.primary_names
                .entry(binding.type_id)
                .or_insert(binding.name);
            self.by_name.entry(binding.name).or_insert(binding);
        }

        Ok(())
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// 类型的主名（首个绑定的名字）
    pub fn name_of(&self, type_id: TypeId) -> Option<&'static str> {
        self.primary_names.get(&type_id).copied()
    }

    pub fn decode(&self, name: &str, data: Value) -> DomainResult<T> {
        let binding = self
            .by_name
            .get(name)
            .ok_or_else(|| DomainError::UnregisteredType {
                type_name: name.to_string(),
            })?;

        Ok((binding.decode)(data)?)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Opened {
        owner: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Closed {
        reason: String,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum AccountEvent {
        Opened(Opened),
        Closed(Closed),
    }

    fn opened() -> TypeBinding<AccountEvent> {
        TypeBinding::new::<Opened>("Opened", |data| {
            serde_json::from_value::<Opened>(data).map(AccountEvent::Opened)
        })
    }

    fn closed_as(name: &'static str) -> TypeBinding<AccountEvent> {
        TypeBinding::new::<Closed>(name, |data| {
            serde_json::from_value::<Closed>(data).map(AccountEvent::Closed)
        })
    }

    #[test]
    fn decode_dispatches_by_name() {
        let mut registry = TypeRegistry::new();
        registry.bind([opened(), closed_as("Closed")]).unwrap();
        assert_eq!(registry.len(), 2);

        let event = registry
            .decode("Closed", serde_json::json!({ "reason": "done" }))
            .unwrap();
        assert_eq!(
            event,
            AccountEvent::Closed(Closed {
                reason: "done".into()
            })
        );
    }

    #[test]
    fn unknown_name_is_serialization_error() {
        let mut registry = TypeRegistry::new();
        registry.bind([opened()]).unwrap();

        let err = registry
            .decode("Frozen", serde_json::json!({}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
        match err {
            DomainError::UnregisteredType { type_name } => assert_eq!(type_name, "Frozen"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rebinding_same_type_is_idempotent() {
        let mut registry = TypeRegistry::new();
        registry.bind([opened()]).unwrap();
        registry.bind([opened()]).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn same_name_for_distinct_types_is_rejected() {
        let mut registry = TypeRegistry::new();
        registry.bind([opened()]).unwrap();

        // 冲突批次中的其它绑定也不应被写入
        let err = registry
            .bind([closed_as("Closed"), closed_as("Opened")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!registry.is_bound("Closed"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn conflict_inside_one_batch_is_rejected() {
        let mut registry = TypeRegistry::<AccountEvent>::new();
        let err = registry
            .bind([opened(), closed_as("Opened")])
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateBinding { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn first_name_is_primary() {
        let mut registry = TypeRegistry::new();
        registry
            .bind([closed_as("Closed"), closed_as("AccountClosed")])
            .unwrap();
        assert_eq!(registry.name_of(TypeId::of::<Closed>()), Some("Closed"));
        assert!(registry.is_bound("AccountClosed"));
        assert_eq!(registry.name_of(TypeId::of::<Opened>()), None);
    }

    #[test]
    fn state_binding_decodes_itself() {
        let mut registry = TypeRegistry::<Opened>::new();
        registry.bind([TypeBinding::of("OwnerState")]).unwrap();
        let state = registry
            .decode("OwnerState", serde_json::json!({ "owner": "ann" }))
            .unwrap();
        assert_eq!(state.owner, "ann");
    }
}
