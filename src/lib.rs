//! Heartbeat Monitor - HTTP(S) 可用性监控工具
//!
//! 周期性探测已注册的 HTTP(S) 目标，支持：
//! - 带超时的单次 GET 探测
//! - pending / up / down 目标状态机
//! - 状态转移告警（DOWN / RECOVERY），日志与 webhook 接收端
//! - 有界探测历史与 JSON 文件持久化
//! - 目标管理与历史查询的 HTTP API

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod store;
pub mod web;

// 重新导出主要类型
pub use config::Config;
pub use error::{MonitorError, Result};
pub use monitor::{AlertEvent, AlertKind, HttpProber, Prober, SweepReport, SweepScheduler};
pub use store::{JsonFileStore, MonitorStore, Target};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
