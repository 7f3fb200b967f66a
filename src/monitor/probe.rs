//! HTTP 探测执行器
//!
//! 对目标 URL 发起一次带超时的 GET 请求，判定可达性并测量延迟。
//! 单次探测不做重试，重试由下一轮巡检自然完成。

use crate::error::{MonitorError, ProbeFailure, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::error::Error as _;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// 单次探测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// 是否可达（2xx 且未超时）
    pub reachable: bool,
    /// 响应时间（毫秒），未收到响应时为 0
    pub response_time_ms: u64,
    /// HTTP状态码（如果收到响应）
    pub status_code: Option<u16>,
    /// 失败原因，仅用于日志
    pub failure: Option<ProbeFailure>,
}

impl ProbeResult {
    /// 收到 2xx 响应
    pub fn reachable(response_time: Duration, status_code: u16) -> Self {
        Self {
            reachable: true,
            response_time_ms: response_time.as_millis() as u64,
            status_code: Some(status_code),
            failure: None,
        }
    }

    /// 收到响应但状态码不是 2xx，响应时间照常记录
    pub fn http_error(response_time: Duration, status_code: u16) -> Self {
        Self {
            reachable: false,
            response_time_ms: response_time.as_millis() as u64,
            status_code: Some(status_code),
            failure: Some(ProbeFailure::HttpStatus(status_code)),
        }
    }

    /// 没有收到任何响应
    pub fn unreachable(failure: ProbeFailure) -> Self {
        Self {
            reachable: false,
            response_time_ms: 0,
            status_code: None,
            failure: Some(failure),
        }
    }
}

/// 探测器trait，巡检调度器通过它访问网络
#[async_trait]
pub trait Prober: Send + Sync {
    /// 对 URL 执行一次探测，任何失败都以不可达结果返回
    async fn probe(&self, url: &str) -> ProbeResult;
}

/// HTTP探测器实现
#[derive(Debug, Clone)]
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
    /// 单次探测超时时间
    timeout: Duration,
}

impl HttpProber {
    /// 创建新的HTTP探测器
    ///
    /// # 参数
    /// * `timeout` - 单次探测的超时时间，覆盖连接、发送和等待响应头
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("heartbeat-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MonitorError::Other(anyhow::anyhow!("创建HTTP客户端失败: {e}")))?;

        Ok(Self { client, timeout })
    }

    /// 解析并校验 URL，只接受 http 和 https
    fn parse_url(url: &str) -> std::result::Result<Url, ProbeFailure> {
        let parsed = Url::parse(url).map_err(|e| ProbeFailure::InvalidUrl(format!("{url}: {e}")))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            scheme => Err(ProbeFailure::InvalidUrl(format!(
                "{url}: 不支持的协议 {scheme}"
            ))),
        }
    }

    /// 将 reqwest 错误归类为探测失败原因
    fn classify_error(&self, error: &reqwest::Error) -> ProbeFailure {
        let detail = Self::error_chain(error);

        if error.is_timeout() {
            ProbeFailure::Timeout(self.timeout.as_millis() as u64)
        } else if error.is_builder() {
            ProbeFailure::InvalidUrl(detail)
        } else if error.is_connect() {
            let lower = detail.to_lowercase();
            if lower.contains("dns") || lower.contains("resolve") || lower.contains("lookup") {
                ProbeFailure::Dns(detail)
            } else {
                ProbeFailure::Connect(detail)
            }
        } else {
            ProbeFailure::Request(detail)
        }
    }

    /// 拼接错误链，reqwest 的顶层消息通常不包含根因
    fn error_chain(error: &reqwest::Error) -> String {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeResult {
        let parsed = match Self::parse_url(url) {
            Ok(parsed) => parsed,
            Err(failure) => return ProbeResult::unreachable(failure),
        };

        let start_time = Instant::now();
        let response_result = timeout(self.timeout, self.client.get(parsed).send()).await;

        match response_result {
            Ok(Ok(response)) => {
                let response_time = start_time.elapsed();
                let status = response.status();
                if status.is_success() {
                    ProbeResult::reachable(response_time, status.as_u16())
                } else {
                    ProbeResult::http_error(response_time, status.as_u16())
                }
            }
            Ok(Err(e)) => ProbeResult::unreachable(self.classify_error(&e)),
            Err(_) => ProbeResult::unreachable(ProbeFailure::Timeout(
                self.timeout.as_millis() as u64,
            )),
        }
    }
}
