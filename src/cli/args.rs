//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::logging::LogFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Heartbeat Monitor - HTTP(S) 可用性监控工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "heartbeat-monitor",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "HEARTBEAT_CONFIG",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// 日志级别，不指定时使用配置文件中的级别
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别",
        env = "HEARTBEAT_LOG_LEVEL",
        global = true
    )]
    pub log_level: Option<LogLevel>,

    /// 日志格式
    #[arg(
        long,
        value_enum,
        default_value = "text",
        help = "日志格式",
        env = "HEARTBEAT_LOG_FORMAT",
        global = true
    )]
    pub log_format: LogFormat,

    /// 日志文件，不指定时写 stderr
    #[arg(
        long,
        value_name = "FILE",
        help = "日志文件",
        env = "HEARTBEAT_LOG_FILE",
        global = true
    )]
    pub log_file: Option<PathBuf>,

    /// 数据文件路径，覆盖配置文件
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "目标与历史数据文件",
        env = "HEARTBEAT_DATA_FILE",
        global = true
    )]
    pub data_file: Option<PathBuf>,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    /// 跟踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 启动监控服务（巡检调度器和 Web API）
    Start {
        /// 巡检间隔（毫秒）
        #[arg(
            short,
            long,
            value_name = "MILLIS",
            help = "巡检间隔（毫秒）",
            env = "HEARTBEAT_INTERVAL_MS"
        )]
        interval_ms: Option<u64>,

        /// Web API 端口
        #[arg(
            short,
            long,
            value_name = "PORT",
            help = "Web API 端口",
            env = "HEARTBEAT_PORT"
        )]
        port: Option<u16>,

        /// 不启动 Web API
        #[arg(long, help = "只运行巡检，不启动 Web API")]
        no_web: bool,
    },

    /// 立即执行一轮巡检并输出结果
    Check {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 注册监控目标
    Add {
        /// 目标名称
        #[arg(value_name = "NAME")]
        name: String,

        /// 目标 URL
        #[arg(value_name = "URL")]
        url: String,
    },

    /// 删除监控目标
    Remove {
        /// 目标ID
        #[arg(value_name = "ID")]
        id: String,
    },

    /// 列出监控目标
    List {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 查看最近的探测历史
    History {
        /// 条数，默认使用配置中的分页大小
        #[arg(short = 'n', long, value_name = "COUNT", help = "显示条数")]
        limit: Option<usize>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 初始化配置文件
    Init {
        /// 配置文件路径
        #[arg(
            value_name = "FILE",
            help = "配置文件路径",
            default_value = crate::config::loader::DEFAULT_CONFIG_FILE
        )]
        config_path: PathBuf,

        /// 是否覆盖现有文件
        #[arg(long, help = "覆盖现有文件")]
        force: bool,
    },

    /// 验证配置文件
    Validate {
        /// 配置文件路径
        #[arg(value_name = "FILE", help = "配置文件路径")]
        config_path: Option<PathBuf>,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

impl Args {
    /// 解析命令行参数
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::loader::get_default_config_path)
    }
}
