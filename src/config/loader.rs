//! 配置文件读取
//!
//! TOML 解析前先展开 `${VAR}` 形式的环境变量，解析后统一走 `validate_config`

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "heartbeat.toml";

const ENV_VAR_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// 配置来源
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 读取并校验磁盘上的配置文件，文件缺失视为错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    async fn load_from_string(&self, content: &str) -> Result<Config>;

    fn validate(&self, config: &Config) -> Result<()>;
}

/// 基于 toml crate 的加载器
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    expand_env: bool,
}

impl TomlConfigLoader {
    /// `expand_env` 为 false 时 `${VAR}` 原样保留
    pub fn new(expand_env: bool) -> Self {
        Self { expand_env }
    }

    /// 与 `load_from_file` 相同，但文件不存在时退回默认配置
    pub async fn load_or_default<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("未找到配置文件 {}，使用内置默认值", path.display());
            let defaults = Config::default();
            self.validate(&defaults)?;
            return Ok(defaults);
        }
        self.load_from_file(path).await
    }

    fn expand_env_vars(&self, raw: &str) -> Result<String> {
        if !self.expand_env {
            return Ok(raw.to_owned());
        }

        let pattern = Regex::new(ENV_VAR_PATTERN)
            .map_err(|e| ConfigError::ParseError(format!("环境变量匹配规则无效: {e}")))?;

        let mut missing = None;
        let expanded = pattern.replace_all(raw, |caps: &Captures| {
            let name = &caps[1];
            std::env::var(name).unwrap_or_else(|_| {
                missing.get_or_insert_with(|| name.to_owned());
                String::new()
            })
        });

        match missing {
            Some(var) => Err(ConfigError::EnvVarError { var }.into()),
            None => Ok(expanded.into_owned()),
        }
    }

    fn parse(&self, raw: &str) -> Result<Config> {
        let expanded = self.expand_env_vars(raw)?;
        let config = toml::from_str::<Config>(&expanded)
            .map_err(|e| ConfigError::ParseError(format!("TOML 格式错误: {e}")))?;
        self.validate(&config)?;
        Ok(config)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            Err(e) => {
                return Err(ConfigError::ParseError(format!(
                    "无法读取 {}: {e}",
                    path.display()
                ))
                .into());
            }
        };

        let config = self.parse(&raw)?;
        log::info!("已加载配置文件 {}", path.display());
        log::debug!("{config:?}");
        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<Config> {
        self.parse(content)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// 获取默认配置文件路径
///
/// 优先使用当前目录下的 `heartbeat.toml`，否则使用用户配置目录
pub fn get_default_config_path() -> PathBuf {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join("heartbeat-monitor").join(DEFAULT_CONFIG_FILE))
        .unwrap_or(local)
}

/// 默认配置模板
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Heartbeat Monitor 配置文件

[monitor]
# 巡检间隔（毫秒）
check_interval_ms = 60000
# 单次探测超时（毫秒）
request_timeout_ms = 5000
# 历史记录保留上限
history_limit = 5000
# 面板历史记录分页大小
history_page_size = 100
# 目标与历史数据文件
data_file = "db.json"
log_level = "info"
run_on_start = false

[web]
enabled = true
bind_address = "0.0.0.0"
port = 50001

[alerts]
# webhook_url = "https://hooks.example.com/heartbeat"
# message_template = "{{icon}} {{target_name}} ({{target_url}}) {{kind_text}}"
webhook_timeout_ms = 10000
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const TEST_CONFIG_TOML: &str = r#"
[monitor]
check_interval_ms = 30000
request_timeout_ms = 2000
history_limit = 1000
history_page_size = 50
data_file = "data/monitor.json"

[web]
enabled = false
"#;

    const TEST_CONFIG_WITH_ENV_VARS: &str = r#"
[alerts]
webhook_url = "${HEARTBEAT_TEST_WEBHOOK}"
"#;

    #[tokio::test]
    async fn test_toml_parsing() {
        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_string(TEST_CONFIG_TOML).await.unwrap();

        assert_eq!(config.monitor.check_interval_ms, 30_000);
        assert_eq!(config.monitor.request_timeout_ms, 2_000);
        assert_eq!(config.monitor.history_limit, 1_000);
        assert_eq!(config.monitor.history_page_size, 50);
        assert_eq!(config.monitor.data_file, PathBuf::from("data/monitor.json"));
        assert!(!config.web.enabled);
        assert_eq!(config.monitor.log_level, "info");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution() {
        env::set_var("HEARTBEAT_TEST_WEBHOOK", "https://hooks.example.com/abc");

        let loader = TomlConfigLoader::new(true);
        let config = loader
            .load_from_string(TEST_CONFIG_WITH_ENV_VARS)
            .await
            .unwrap();

        assert_eq!(
            config.alerts.webhook_url,
            Some("https://hooks.example.com/abc".to_string())
        );

        env::remove_var("HEARTBEAT_TEST_WEBHOOK");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution_missing_var() {
        env::remove_var("HEARTBEAT_TEST_WEBHOOK");

        let loader = TomlConfigLoader::new(true);
        let result = loader.load_from_string(TEST_CONFIG_WITH_ENV_VARS).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("HEARTBEAT_TEST_WEBHOOK"));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let loader = TomlConfigLoader::new(false);
        let result = loader
            .load_from_string("[monitor]\nrequest_timeout_ms = 0\n")
            .await;

        assert!(result.unwrap_err().to_string().contains("超时"));
    }

    #[tokio::test]
    async fn test_load_from_file_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        tokio::fs::write(&path, TEST_CONFIG_TOML).await.unwrap();

        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_file(&path).await.unwrap();
        assert_eq!(config.monitor.history_page_size, 50);

        let missing = dir.path().join("missing.toml");
        assert!(loader.load_from_file(&missing).await.is_err());
        assert_eq!(
            loader.load_or_default(&missing).await.unwrap(),
            Config::default()
        );
    }

    #[tokio::test]
    async fn test_default_template_is_valid() {
        let loader = TomlConfigLoader::new(false);
        let config = loader
            .load_from_string(DEFAULT_CONFIG_TEMPLATE)
            .await
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_env_expansion_disabled() {
        let loader = TomlConfigLoader::new(false);
        let content = "test ${VAR} content";
        assert_eq!(loader.expand_env_vars(content).unwrap(), content);
    }

    #[test]
    fn test_get_default_config_path() {
        let path = get_default_config_path();
        assert!(path.to_string_lossy().contains(DEFAULT_CONFIG_FILE));
    }
}
