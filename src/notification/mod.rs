//! 通知模块
//!
//! 提供告警接收端和消息模板功能

pub mod sink;
pub mod template;
pub mod webhook;

// 重新导出主要类型
pub use sink::{AlertSink, LogAlertSink, SharedSinks};
pub use template::{AlertTemplate, TemplateContext, DEFAULT_ALERT_TEMPLATE};
pub use webhook::{WebhookAlertSink, WebhookPayload};

use crate::config::AlertConfig;
use anyhow::Result;
use std::sync::Arc;

/// 按配置构建告警接收端：总是包含日志接收端，配置了 webhook 时追加 webhook 接收端
pub fn build_sinks(config: &AlertConfig) -> Result<SharedSinks> {
    let mut sinks: SharedSinks = vec![Arc::new(LogAlertSink)];
    if let Some(webhook) = WebhookAlertSink::from_config(config)? {
        sinks.push(Arc::new(webhook));
    }
    Ok(sinks)
}
