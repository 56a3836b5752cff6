// 类型注册表和工厂函数

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::type_options::TypeOptions;

// Trait-based 构造函数类型
// 返回 Box<dyn Any>，实际包含的是 Box<dyn Trait>
type TraitConstructor =
    Arc<dyn Fn(JsonValue) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>;

// Trait 注册表：为每个 Trait 类型维护一个独立的注册表
// 外层 HashMap 的 key 是 Trait 的 TypeId，内层 HashMap 的 key 是类型名称
static TRAIT_REGISTRY: Lazy<RwLock<HashMap<TypeId, HashMap<String, TraitConstructor>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// 为实现特定 Trait 的类型注册构造函数
///
/// 这个方法允许你注册多个实现同一 Trait 的不同类型，并在运行时根据配置创建 trait object。
/// 构造过程使用 `TryFrom<Config>`，构造失败（例如 Logger 创建失败）会以错误返回，
/// 只实现了 `From<Config>` 的类型同样可以注册。
///
/// # 类型参数
/// - `T`: 具体实现类型
/// - `Trait`: 目标 trait（使用 `dyn Trait` 形式）
/// - `Config`: 配置类型
///
/// # 示例
/// ```ignore
/// register_trait::<LoggingAdvice, dyn Advice, LoggingAdviceConfig>("LoggingAdvice")?;
///
/// let advice: Box<dyn Advice> = create_trait_from_type_options(&type_options)?;
/// ```
pub fn register_trait<T, Trait, Config>(type_name: &str) -> Result<()>
where
    T: TryFrom<Config> + Send + Sync + 'static,
    <T as TryFrom<Config>>::Error: Into<anyhow::Error>,
    Trait: ?Sized + Send + Sync + 'static,
    Config: DeserializeOwned + Send + Sync + 'static,
    Box<T>: Into<Box<Trait>>,
{
    let type_name = type_name.to_string();
    let trait_id = TypeId::of::<Trait>();

    let constructor: TraitConstructor = Arc::new(move |value| {
        let config: Config = serde_json::from_value(value)?;
        let instance = T::try_from(config).map_err(Into::into)?;
        let trait_object: Box<Trait> = Box::new(instance).into();
        // 将 Box<dyn Trait> 包装成 Box<dyn Any>
        Ok(Box::new(trait_object) as Box<dyn Any + Send + Sync>)
    });

    let mut registry = TRAIT_REGISTRY
        .write()
        .map_err(|_| anyhow!("Failed to acquire write lock"))?;
    registry
        .entry(trait_id)
        .or_default()
        .insert(type_name, constructor);

    Ok(())
}

/// 根据 TypeOptions 创建 trait object
///
/// # 示例
/// ```ignore
/// let type_options = TypeOptions::from_json(r#"{"type": "SpanAdvice", "options": {}}"#)?;
/// let advice: Box<dyn Advice> = create_trait_from_type_options(&type_options)?;
/// ```
pub fn create_trait_from_type_options<Trait>(type_options: &TypeOptions) -> Result<Box<Trait>>
where
    Trait: ?Sized + Send + Sync + 'static,
{
    let trait_id = TypeId::of::<Trait>();
    // 构造函数可能递归创建其他组件（如 ChannelAppender 的下游），调用前释放锁
    let constructor = {
        let registry = TRAIT_REGISTRY
            .read()
            .map_err(|_| anyhow!("Failed to acquire read lock"))?;

        let trait_registry = registry
            .get(&trait_id)
            .ok_or_else(|| anyhow!("No implementations registered for trait"))?;

        let constructor = trait_registry.get(&type_options.type_name).ok_or_else(|| {
            anyhow!(
                "Type '{}' not registered for this trait",
                type_options.type_name
            )
        })?;
        Arc::clone(constructor)
    };

    let any_box = constructor(type_options.options.clone())?;

    // 从 Box<dyn Any> 中提取 Box<dyn Trait>
    any_box
        .downcast::<Box<Trait>>()
        .map(|boxed| *boxed)
        .map_err(|_| anyhow!("Failed to downcast to target trait type"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    #[derive(Debug, Clone, Deserialize)]
    struct HelloConfig {
        name: String,
    }

    struct Hello {
        name: String,
    }

    impl From<HelloConfig> for Hello {
        fn from(config: HelloConfig) -> Self {
            Self { name: config.name }
        }
    }

    impl Greeter for Hello {
        fn greet(&self) -> String {
            format!("hello {}", self.name)
        }
    }

    #[derive(Debug, Clone, Deserialize)]
    struct StrictConfig {
        times: usize,
    }

    struct Strict {
        times: usize,
    }

    impl TryFrom<StrictConfig> for Strict {
        type Error = anyhow::Error;

        fn try_from(config: StrictConfig) -> Result<Self> {
            if config.times == 0 {
                return Err(anyhow!("times must be positive"));
            }
            Ok(Self {
                times: config.times,
            })
        }
    }

    impl Greeter for Strict {
        fn greet(&self) -> String {
            "hi ".repeat(self.times).trim_end().to_string()
        }
    }

    crate::impl_box_from!(Hello => dyn Greeter);
    crate::impl_box_from!(Strict => dyn Greeter);

    fn register_greeters() -> Result<()> {
        register_trait::<Hello, dyn Greeter, HelloConfig>("Hello")?;
        register_trait::<Strict, dyn Greeter, StrictConfig>("Strict")?;
        Ok(())
    }

    #[test]
    fn test_create_from_infallible_constructor() -> Result<()> {
        register_greeters()?;

        let opts = TypeOptions::from_json(r#"{ type: "Hello", options: { name: "aop" } }"#)?;
        let greeter: Box<dyn Greeter> = create_trait_from_type_options(&opts)?;
        assert_eq!(greeter.greet(), "hello aop");
        Ok(())
    }

    #[test]
    fn test_create_from_fallible_constructor() -> Result<()> {
        register_greeters()?;

        let opts = TypeOptions::from_json(r#"{ type: "Strict", options: { times: 2 } }"#)?;
        let greeter: Box<dyn Greeter> = create_trait_from_type_options(&opts)?;
        assert_eq!(greeter.greet(), "hi hi");

        let opts = TypeOptions::from_json(r#"{ type: "Strict", options: { times: 0 } }"#)?;
        let err = create_trait_from_type_options::<dyn Greeter>(&opts)
            .err()
            .unwrap();
        assert!(err.to_string().contains("times must be positive"));
        Ok(())
    }

    #[test]
    fn test_unregistered_type_error() -> Result<()> {
        register_greeters()?;

        let opts = TypeOptions::of("Unknown");
        let err = create_trait_from_type_options::<dyn Greeter>(&opts)
            .err()
            .unwrap();
        assert!(err.to_string().contains("not registered"));
        assert!(err.to_string().contains("Unknown"));
        Ok(())
    }

    #[test]
    fn test_invalid_config_error() -> Result<()> {
        register_greeters()?;

        let opts = TypeOptions::new("Hello", serde_json::json!({ "wrong_field": 1 }));
        assert!(create_trait_from_type_options::<dyn Greeter>(&opts).is_err());
        Ok(())
    }

    #[test]
    fn test_no_implementation_for_trait() {
        trait Unused: Send + Sync {}

        let opts = TypeOptions::of("Anything");
        let err = create_trait_from_type_options::<dyn Unused>(&opts)
            .err()
            .unwrap();
        assert!(err.to_string().contains("No implementations registered"));
    }
}
