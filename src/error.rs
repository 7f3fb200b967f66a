//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Heartbeat Monitor 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum MonitorError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 持久化相关错误
    #[error("持久化错误: {0}")]
    Persistence(#[from] PersistenceError),

    /// 目标注册相关错误
    #[error("目标注册错误: {0}")]
    Registry(#[from] RegistryError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 单次探测失败的原因
///
/// 探测失败只在目标自身的处理步骤内被消化，统一映射为 `down`，
/// 原因仅用于日志和诊断。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// URL 无法解析或不是 http(s)
    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    /// 超过探测超时时间
    #[error("请求超时 ({0}ms)")]
    Timeout(u64),

    /// 连接被拒绝或无法建立
    #[error("连接失败: {0}")]
    Connect(String),

    /// DNS 解析失败
    #[error("DNS解析失败: {0}")]
    Dns(String),

    /// 收到响应但状态码不是 2xx
    #[error("HTTP {0}")]
    HttpStatus(u16),

    /// 其他请求错误
    #[error("请求失败: {0}")]
    Request(String),

    /// 探测任务 panic 或被取消
    #[error("探测任务中止: {0}")]
    Aborted(String),
}

/// 持久化错误类型
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// 数据文件读取失败
    #[error("读取数据文件失败 {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 数据文件写入失败
    #[error("写入数据文件失败 {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 数据序列化或解析失败
    #[error("数据文件格式错误: {0}")]
    Format(#[from] serde_json::Error),
}

/// 目标注册错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// 缺少必填字段
    #[error("URL and Name required")]
    MissingField,

    /// URL 格式无效
    #[error("URL格式无效: {0}")]
    InvalidUrl(String),

    /// 目标不存在
    #[error("目标不存在: {0}")]
    NotFound(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, MonitorError>;
