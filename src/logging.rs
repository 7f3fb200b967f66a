//! 日志初始化
//!
//! 全局 tracing subscriber 只安装一次，`log` 宏的记录经 LogTracer 转发。
//! 日志写到 stderr 或文件，stdout 留给命令输出。

use clap::ValueEnum;
use log::LevelFilter;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevel};
use tracing_subscriber::fmt::{self, time::ChronoUtc, writer::BoxMakeWriter};
use tracing_subscriber::{prelude::*, registry, EnvFilter, Layer};

/// 已安装的日志配置，未安装时为 None
static INSTALLED: Mutex<Option<LogConfig>> = Mutex::new(None);

/// 日志输出格式
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// 可读文本
    #[default]
    Text,
    /// 每行一个 JSON 对象
    Json,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// 默认级别，可被 RUST_LOG 覆盖
    pub level: LevelFilter,
    /// 输出格式
    pub format: LogFormat,
    /// 追加写入的日志文件，为空时写 stderr
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new(LevelFilter::Info)
    }
}

impl LogConfig {
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level,
            format: LogFormat::Text,
            file: None,
        }
    }

    /// 从配置文件中的级别字符串构建，无法识别时使用 info
    pub fn from_level_str(level: &str) -> Self {
        Self::new(level.parse().unwrap_or(LevelFilter::Info))
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file(mut self, file: Option<PathBuf>) -> Self {
        self.file = file;
        self
    }
}

/// 日志系统句柄
#[derive(Debug)]
pub struct LoggingSystem {
    config: LogConfig,
}

impl LoggingSystem {
    /// 安装全局 subscriber
    ///
    /// 已经安装过时不再重复安装，返回的句柄携带本次传入的配置
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        let mut installed = INSTALLED
            .lock()
            .map_err(|_| anyhow::anyhow!("日志状态锁已损坏"))?;

        if installed.is_none() {
            install(&config)?;
            *installed = Some(config.clone());
        }

        Ok(Self { config })
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// 全局 subscriber 是否已安装
    pub fn is_initialized() -> bool {
        Self::current_config().is_some()
    }

    /// 实际生效的（首次安装时的）配置
    pub fn current_config() -> Option<LogConfig> {
        INSTALLED.lock().ok().and_then(|installed| installed.clone())
    }
}

fn install(config: &LogConfig) -> anyhow::Result<()> {
    // 已有全局 logger 时保留原 logger
    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::builder()
        .with_default_directive(level_directive(config.level))
        .from_env_lossy();

    let writer = match config.file {
        Some(ref path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("打开日志文件失败 {}: {}", path.display(), e))?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(config.file.is_none())
        .with_target(true);
    let layer = match config.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Text => layer.boxed(),
    };

    if registry().with(filter).with(layer).try_init().is_err() {
        tracing::debug!("全局 subscriber 已存在，沿用现有配置");
    }
    Ok(())
}

fn level_directive(level: LevelFilter) -> Directive {
    let level = match level {
        LevelFilter::Off => TracingLevel::OFF,
        LevelFilter::Error => TracingLevel::ERROR,
        LevelFilter::Warn => TracingLevel::WARN,
        LevelFilter::Info => TracingLevel::INFO,
        LevelFilter::Debug => TracingLevel::DEBUG,
        LevelFilter::Trace => TracingLevel::TRACE,
    };
    level.into()
}
