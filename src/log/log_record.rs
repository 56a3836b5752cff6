use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// 最详细的日志
    Trace = 0,
    /// 调试信息
    Debug = 1,
    /// 一般信息
    Info = 2,
    /// 警告信息
    Warn = 3,
    /// 错误信息
    Error = 4,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("invalid log level: {}", s)),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => f.pad("TRACE"),
            LogLevel::Debug => f.pad("DEBUG"),
            LogLevel::Info => f.pad("INFO"),
            LogLevel::Warn => f.pad("WARN"),
            LogLevel::Error => f.pad("ERROR"),
        }
    }
}

// 配置中使用小写字符串："debug"、"info"
impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string().to_lowercase())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 元数据值，支持多种类型
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Null,
    /// 任意 JSON 兼容的数据
    Json(Value),
}

impl Serialize for MetadataValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            MetadataValue::String(s) => serializer.serialize_str(s),
            MetadataValue::I64(n) => serializer.serialize_i64(*n),
            MetadataValue::U64(n) => serializer.serialize_u64(*n),
            MetadataValue::F64(n) => serializer.serialize_f64(*n),
            MetadataValue::Bool(b) => serializer.serialize_bool(*b),
            MetadataValue::Null => serializer.serialize_none(),
            MetadataValue::Json(v) => v.serialize(serializer),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{}", s),
            MetadataValue::I64(n) => write!(f, "{}", n),
            MetadataValue::U64(n) => write!(f, "{}", n),
            MetadataValue::F64(n) => write!(f, "{}", n),
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Null => write!(f, "null"),
            MetadataValue::Json(v) => write!(f, "'{}'", v),
        }
    }
}

impl MetadataValue {
    /// 从任意实现了 Serialize 的值创建，序列化失败时为 Null
    pub fn from_serialize<T: Serialize>(value: T) -> Self {
        serde_json::to_value(value)
            .map(MetadataValue::Json)
            .unwrap_or(MetadataValue::Null)
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        MetadataValue::I64(n)
    }
}

impl From<i32> for MetadataValue {
    fn from(n: i32) -> Self {
        MetadataValue::I64(n as i64)
    }
}

impl From<u64> for MetadataValue {
    fn from(n: u64) -> Self {
        MetadataValue::U64(n)
    }
}

impl From<u32> for MetadataValue {
    fn from(n: u32) -> Self {
        MetadataValue::U64(n as u64)
    }
}

impl From<f64> for MetadataValue {
    fn from(n: f64) -> Self {
        MetadataValue::F64(n)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

impl From<Value> for MetadataValue {
    fn from(v: Value) -> Self {
        MetadataValue::Json(v)
    }
}

/// 日志记录
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    /// 产生日志的被织入方法
    pub method: Option<String>,
    pub module: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub timestamp: DateTime<Utc>,
    pub thread_id: String,
    /// 自定义元数据，保持插入顺序
    pub metadata: Vec<(String, MetadataValue)>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            method: None,
            module: None,
            file: None,
            line: None,
            timestamp: Utc::now(),
            thread_id: format!("{:?}", std::thread::current().id()),
            metadata: Vec::new(),
        }
    }

    /// 添加元数据
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// 设置位置信息（文件和行号）
    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// RFC 3339 格式的时间戳，精确到毫秒
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// 查找元数据，同名时返回最后一个
    pub fn metadata_value(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

// 元数据平铺在顶层，与保留字段同名时保留字段优先
impl Serialize for LogRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;

        const RESERVED: [&str; 8] = [
            "timestamp", "level", "method", "message", "module", "file", "line", "thread_id",
        ];

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("timestamp", &self.timestamp_rfc3339())?;
        map.serialize_entry("level", &self.level.to_string())?;
        if let Some(method) = &self.method {
            map.serialize_entry("method", method)?;
        }
        map.serialize_entry("message", &self.message)?;
        if let Some(module) = &self.module {
            map.serialize_entry("module", module)?;
        }
        if let (Some(file), Some(line)) = (&self.file, self.line) {
            map.serialize_entry("file", file)?;
            map.serialize_entry("line", &line)?;
        }
        map.serialize_entry("thread_id", &self.thread_id)?;

        let mut seen = std::collections::HashSet::new();
        for (key, value) in self.metadata.iter().rev() {
            if RESERVED.contains(&key.as_str()) || !seen.insert(key.as_str()) {
                continue;
            }
            map.serialize_entry(key, value)?;
        }

        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("Info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);
        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_level_serde() {
        let level: LogLevel = serde_json::from_str(r#""WARN""#).unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert_eq!(serde_json::to_string(&LogLevel::Debug).unwrap(), r#""debug""#);
        assert!(serde_json::from_str::<LogLevel>(r#""loud""#).is_err());
    }

    #[test]
    fn test_log_level_display_padding() {
        assert_eq!(format!("{:<5}|", LogLevel::Info), "INFO |");
        assert_eq!(format!("{:<5}|", LogLevel::Error), "ERROR|");
        assert_eq!(format!("{:>5}", LogLevel::Warn), " WARN");
        assert_eq!(LogLevel::Debug.to_string(), "DEBUG");
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Error > LogLevel::Warn);
        assert!(LogLevel::Warn > LogLevel::Info);
        assert!(LogLevel::Info > LogLevel::Debug);
        assert!(LogLevel::Debug > LogLevel::Trace);
    }

    #[test]
    fn test_log_record_builder() {
        let record = LogRecord::new(LogLevel::Info, "starting")
            .with_method("app::Sample::Method1")
            .with_module("app")
            .with_location("src/lib.rs", 10)
            .with_metadata("user_id", 12345)
            .with_metadata("success", true);

        assert_eq!(record.method.as_deref(), Some("app::Sample::Method1"));
        assert_eq!(record.file.as_deref(), Some("src/lib.rs"));
        assert_eq!(record.line, Some(10));
        assert_eq!(record.metadata_value("user_id"), Some(&MetadataValue::I64(12345)));
        assert!(record.metadata_value("missing").is_none());
        assert!(!record.thread_id.is_empty());
    }

    #[test]
    fn test_metadata_value_display() {
        assert_eq!(MetadataValue::from("hello").to_string(), "hello");
        assert_eq!(MetadataValue::I64(42).to_string(), "42");
        assert_eq!(MetadataValue::F64(3.5).to_string(), "3.5");
        assert_eq!(MetadataValue::Null.to_string(), "null");
        assert_eq!(MetadataValue::Json(serde_json::json!([1])).to_string(), "'[1]'");
    }

    #[test]
    fn test_metadata_value_from_serialize() {
        #[derive(Serialize)]
        struct User {
            id: i64,
            name: String,
        }

        let value = MetadataValue::from_serialize(User {
            id: 7,
            name: "alice".to_string(),
        });
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["name"], "alice");
    }

    #[test]
    fn test_log_record_serialize_flattens_metadata() {
        let record = LogRecord::new(LogLevel::Debug, "completed")
            .with_method("app::Sample::Method1")
            .with_metadata("request_id", "r-1")
            .with_metadata("request_id", "r-2")
            .with_metadata("level", "ignored");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["level"], "DEBUG");
        assert_eq!(value["method"], "app::Sample::Method1");
        assert_eq!(value["message"], "completed");
        assert_eq!(value["request_id"], "r-2");
        assert!(value.get("file").is_none());
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}
