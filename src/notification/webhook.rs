//! Webhook 告警发送器
//!
//! 每条告警在独立任务中 POST 一次 JSON，失败只记录日志，不重试。
//! 发送任务登记在 JoinSet 中，退出前用 `flush` 等它们完成。

use crate::config::AlertConfig;
use crate::monitor::alert::{AlertEvent, AlertKind};
use crate::notification::sink::AlertSink;
use crate::notification::template::{AlertTemplate, DEFAULT_ALERT_TEMPLATE};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// webhook 请求体
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub target_id: String,
    pub target_name: String,
    pub target_url: String,
    pub kind: AlertKind,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Webhook 告警发送器
pub struct WebhookAlertSink {
    /// HTTP客户端
    client: Client,
    /// webhook URL
    webhook_url: String,
    /// 消息模板
    template: AlertTemplate,
    /// 尚未完成的发送任务
    in_flight: Mutex<JoinSet<()>>,
}

impl WebhookAlertSink {
    /// 创建新的 webhook 发送器
    ///
    /// # 参数
    /// * `webhook_url` - 接收告警的 URL
    /// * `template` - 消息模板，为空时使用默认模板
    /// * `timeout` - 单次请求超时时间
    pub fn new(webhook_url: String, template: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("创建HTTP客户端失败")?;
        let template = AlertTemplate::new(template.unwrap_or(DEFAULT_ALERT_TEMPLATE))?;

        Ok(Self {
            client,
            webhook_url,
            template,
            in_flight: Mutex::new(JoinSet::new()),
        })
    }

    /// 按告警配置创建，未配置 webhook URL 时返回 None
    pub fn from_config(config: &AlertConfig) -> Result<Option<Self>> {
        match config.webhook_url {
            Some(ref url) => Self::new(
                url.clone(),
                config.message_template.as_deref(),
                Duration::from_millis(config.webhook_timeout_ms),
            )
            .map(Some),
            None => Ok(None),
        }
    }

    /// 构建请求体
    pub fn build_payload(&self, event: &AlertEvent) -> WebhookPayload {
        let message = self.template.render(event).unwrap_or_else(|e| {
            error!("渲染告警消息失败: {:#}", e);
            format!("{} ({}) {}", event.target_name, event.target_url, event.kind)
        });

        WebhookPayload {
            target_id: event.target_id.clone(),
            target_name: event.target_name.clone(),
            target_url: event.target_url.clone(),
            kind: event.kind,
            timestamp: event.timestamp,
            message,
        }
    }

    /// 发送一次告警
    pub async fn send(&self, payload: &WebhookPayload) -> Result<()> {
        post_payload(&self.client, &self.webhook_url, payload).await
    }

    /// 尚未完成的发送任务数
    pub fn pending(&self) -> usize {
        self.in_flight.lock().map(|set| set.len()).unwrap_or(0)
    }
}

async fn post_payload(client: &Client, webhook_url: &str, payload: &WebhookPayload) -> Result<()> {
    debug!("发送告警到webhook: {}", webhook_url);

    let response = client
        .post(webhook_url)
        .json(payload)
        .send()
        .await
        .context("发送webhook告警失败")?;

    let status = response.status();
    if status.is_success() {
        info!("webhook告警发送成功: {} {}", payload.target_name, payload.kind);
        Ok(())
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(anyhow::anyhow!("webhook返回错误状态: {} - {}", status, text))
    }
}

impl std::fmt::Debug for WebhookAlertSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookAlertSink")
            .field("webhook_url", &self.webhook_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    fn on_alert(&self, event: &AlertEvent) {
        let payload = self.build_payload(event);
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                error!("没有可用的异步运行时，丢弃webhook告警: {}", payload.target_name);
                return;
            }
        };
        let Ok(mut in_flight) = self.in_flight.lock() else {
            error!("发送任务列表锁已损坏，丢弃webhook告警: {}", payload.target_name);
            return;
        };

        // 回收已完成的任务
        while in_flight.try_join_next().is_some() {}

        let client = self.client.clone();
        let webhook_url = self.webhook_url.clone();
        in_flight.spawn_on(
            async move {
                if let Err(e) = post_payload(&client, &webhook_url, &payload).await {
                    error!("webhook告警发送失败: {} - {:#}", payload.target_name, e);
                }
            },
            &handle,
        );
    }

    async fn flush(&self, timeout: Duration) {
        let mut pending = match self.in_flight.lock() {
            Ok(mut in_flight) => std::mem::replace(&mut *in_flight, JoinSet::new()),
            Err(_) => return,
        };
        if pending.is_empty() {
            return;
        }

        debug!("等待 {} 个webhook告警发送完成", pending.len());
        let drained = tokio::time::timeout(timeout, async {
            while pending.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            // JoinSet 随 pending 一起丢弃，剩余任务被取消
            warn!("等待webhook告警超时，放弃 {} 个未完成的发送", pending.len());
        }
    }
}
