//! 消息模板模块
//!
//! 使用 handlebars 渲染告警消息

use crate::monitor::alert::{AlertEvent, AlertKind};
use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;

const TEMPLATE_NAME: &str = "alert";

/// 默认的告警消息模板
pub const DEFAULT_ALERT_TEMPLATE: &str =
    "{{icon}} [{{kind}}] {{target_name}} ({{target_url}}) {{kind_text}}，时间: {{timestamp}}";

/// 模板上下文数据
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    /// 目标ID
    pub target_id: String,
    /// 目标名称
    pub target_name: String,
    /// 目标URL
    pub target_url: String,
    /// 告警类型（DOWN / RECOVERY）
    pub kind: String,
    /// 告警类型说明
    pub kind_text: String,
    /// 图标
    pub icon: String,
    /// 触发时间
    pub timestamp: String,
}

impl From<&AlertEvent> for TemplateContext {
    fn from(event: &AlertEvent) -> Self {
        let (icon, kind_text) = match event.kind {
            AlertKind::Down => ("🚨", "服务不可达"),
            AlertKind::Recovery => ("✅", "服务已恢复"),
        };

        Self {
            target_id: event.target_id.clone(),
            target_name: event.target_name.clone(),
            target_url: event.target_url.clone(),
            kind: event.kind.to_string(),
            kind_text: kind_text.to_string(),
            icon: icon.to_string(),
            timestamp: event.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

/// Handlebars 告警模板
#[derive(Debug)]
pub struct AlertTemplate {
    registry: Handlebars<'static>,
}

impl AlertTemplate {
    /// 编译模板
    ///
    /// # 参数
    /// * `template` - handlebars 模板字符串
    pub fn new(template: &str) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        // 告警消息是纯文本，不做 HTML 转义
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(TEMPLATE_NAME, template)
            .context("告警模板语法错误")?;

        Ok(Self { registry })
    }

    /// 渲染告警事件
    pub fn render(&self, event: &AlertEvent) -> Result<String> {
        let context = TemplateContext::from(event);
        self.registry
            .render(TEMPLATE_NAME, &context)
            .context("渲染告警模板失败")
    }
}
