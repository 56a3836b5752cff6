//! cfg 模块 - 配置管理
//!
//! 提供基于 `TypeOptions` 的多态组件创建能力：Advice、Formatter、Appender
//! 都通过类型名注册到 trait 注册表，再由配置文档实例化

pub mod macros;
pub mod registry;
pub mod type_options;

// 重新导出公共 API
pub use registry::{create_trait_from_type_options, register_trait};
pub use type_options::TypeOptions;
