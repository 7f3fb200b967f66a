//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 监控引擎配置
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Web API 配置
    #[serde(default)]
    pub web: WebConfig,
    /// 告警配置
    #[serde(default)]
    pub alerts: AlertConfig,
}

/// 监控引擎配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    /// 巡检间隔（毫秒）
    #[serde(default = "default_check_interval")]
    pub check_interval_ms: u64,
    /// 单次探测超时时间（毫秒）
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,
    /// 历史记录保留上限
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// 面板历史记录分页大小
    #[serde(default = "default_history_page_size")]
    pub history_page_size: usize,
    /// 数据文件路径
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 启动后是否立即执行一次巡检
    #[serde(default)]
    pub run_on_start: bool,
}

impl MonitorConfig {
    /// 巡检间隔
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// 探测超时时间
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: default_check_interval(),
            request_timeout_ms: default_timeout(),
            history_limit: default_history_limit(),
            history_page_size: default_history_page_size(),
            data_file: default_data_file(),
            log_level: default_log_level(),
            run_on_start: false,
        }
    }
}

/// Web 服务器配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebConfig {
    /// 是否启用 Web API
    #[serde(default = "default_web_enabled")]
    pub enabled: bool,
    /// 绑定地址
    #[serde(default = "default_web_bind_address")]
    pub bind_address: String,
    /// 监听端口
    #[serde(default = "default_web_port")]
    pub port: u16,
}

impl WebConfig {
    /// 解析监听地址
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| format!("无效的监听地址 {}:{}: {}", self.bind_address, self.port, e))
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: default_web_enabled(),
            bind_address: default_web_bind_address(),
            port: default_web_port(),
        }
    }
}

/// 告警配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertConfig {
    /// 告警 webhook URL，不配置时只写日志
    pub webhook_url: Option<String>,
    /// 告警消息模板（handlebars）
    pub message_template: Option<String>,
    /// webhook 请求超时时间（毫秒）
    #[serde(default = "default_webhook_timeout")]
    pub webhook_timeout_ms: u64,
}

impl AlertConfig {
    /// webhook 请求超时时间，也是退出前等待告警送出的上限
    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_millis(self.webhook_timeout_ms)
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            message_template: None,
            webhook_timeout_ms: default_webhook_timeout(),
        }
    }
}

// 默认值函数
fn default_check_interval() -> u64 {
    60_000
}
fn default_timeout() -> u64 {
    5_000
}
fn default_history_limit() -> usize {
    5_000
}
fn default_history_page_size() -> usize {
    100
}
fn default_data_file() -> PathBuf {
    PathBuf::from("db.json")
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_web_enabled() -> bool {
    true
}
fn default_web_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_web_port() -> u16 {
    50001
}
fn default_webhook_timeout() -> u64 {
    10_000
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    let monitor = &config.monitor;

    if monitor.check_interval_ms == 0 {
        return Err("巡检间隔不能为0".to_string());
    }

    if monitor.request_timeout_ms == 0 {
        return Err("请求超时时间不能为0".to_string());
    }

    if monitor.history_limit == 0 {
        return Err("历史记录保留上限不能为0".to_string());
    }

    if monitor.history_page_size == 0 {
        return Err("历史记录分页大小不能为0".to_string());
    }

    if monitor.history_page_size > monitor.history_limit {
        return Err(format!(
            "历史记录分页大小 {} 不能超过保留上限 {}",
            monitor.history_page_size, monitor.history_limit
        ));
    }

    if monitor.data_file.as_os_str().is_empty() {
        return Err("数据文件路径不能为空".to_string());
    }

    // 验证日志级别
    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&monitor.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            monitor.log_level, valid_log_levels
        ));
    }

    // 验证Web配置（如果启用）
    if config.web.enabled {
        if config.web.port == 0 {
            return Err("无效的Web服务器端口: 0，端口不能为0".to_string());
        }

        if config.web.bind_address.is_empty() {
            return Err("Web服务器绑定地址不能为空".to_string());
        }

        config.web.socket_addr()?;
    }

    // 验证告警配置
    if let Some(ref url) = config.alerts.webhook_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("告警webhook URL格式无效: {url}"));
        }
    }

    if config.alerts.webhook_timeout_ms == 0 {
        return Err("webhook超时时间不能为0".to_string());
    }

    if let Some(ref template) = config.alerts.message_template {
        handlebars::Handlebars::new()
            .register_template_string("validate", template)
            .map_err(|e| format!("告警消息模板语法错误: {e}"))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();

        assert_eq!(config.monitor.check_interval_ms, 60_000);
        assert_eq!(config.monitor.request_timeout_ms, 5_000);
        assert_eq!(config.monitor.history_limit, 5_000);
        assert_eq!(config.monitor.history_page_size, 100);
        assert_eq!(config.monitor.data_file, PathBuf::from("db.json"));
        assert!(config.web.enabled);
        assert_eq!(config.web.port, 50001);
        assert!(config.alerts.webhook_url.is_none());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").expect("解析空配置失败");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.monitor.check_interval_ms = 30_000;
        config.alerts.webhook_url = Some("https://hooks.example.com/alert".to_string());

        let serialized = toml::to_string(&config).expect("序列化失败");
        let deserialized: Config = toml::from_str(&serialized).expect("反序列化失败");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_config_validation_zero_interval() {
        let mut config = Config::default();
        config.monitor.check_interval_ms = 0;

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("巡检间隔"));
    }

    #[test]
    fn test_config_validation_page_size_exceeds_limit() {
        let mut config = Config::default();
        config.monitor.history_limit = 50;
        config.monitor.history_page_size = 100;

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("分页大小"));
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = Config::default();
        config.monitor.log_level = "verbose".to_string();

        assert!(validate_config(&config).unwrap_err().contains("日志级别"));
    }

    #[test]
    fn test_config_validation_invalid_webhook() {
        let mut config = Config::default();
        config.alerts.webhook_url = Some("ftp://example.com".to_string());

        assert!(validate_config(&config).unwrap_err().contains("webhook"));
    }

    #[test]
    fn test_config_validation_bad_template() {
        let mut config = Config::default();
        config.alerts.message_template = Some("{{#if}}".to_string());

        assert!(validate_config(&config).unwrap_err().contains("模板"));
    }

    #[test]
    fn test_web_config_disabled_skips_port_check() {
        let mut config = Config::default();
        config.web.enabled = false;
        config.web.port = 0;

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_web_config_socket_addr() {
        let web = WebConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            ..Default::default()
        };

        assert_eq!(web.socket_addr().unwrap().to_string(), "127.0.0.1:3000");
    }
}
