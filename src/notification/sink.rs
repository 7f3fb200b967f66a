//! 告警接收端
//!
//! 巡检调度器在状态转移时同步调用接收端，接收端不得阻塞巡检

use crate::monitor::alert::{AlertEvent, AlertKind};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 告警接收端trait
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// 处理一条告警，发送失败只记录日志
    fn on_alert(&self, event: &AlertEvent);

    /// 等待已发出但尚未完成的告警，最多等待 `timeout`
    ///
    /// 进程退出前调用，同步接收端无需实现
    async fn flush(&self, _timeout: Duration) {}
}

/// 共享的接收端列表
pub type SharedSinks = Vec<Arc<dyn AlertSink>>;

/// 将告警写入日志
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn on_alert(&self, event: &AlertEvent) {
        match event.kind {
            AlertKind::Down => warn!(
                target_id = %event.target_id,
                "ALERT: {} ({}) is DOWN!",
                event.target_name,
                event.target_url
            ),
            AlertKind::Recovery => info!(
                target_id = %event.target_id,
                "RECOVERY: {} ({}) is back UP.",
                event.target_name,
                event.target_url
            ),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_sinks_accept_events() {
        let event = AlertEvent {
            target_id: "t1".to_string(),
            target_name: "Good".to_string(),
            target_url: "http://good.test".to_string(),
            kind: AlertKind::Down,
            timestamp: Utc::now(),
        };

        let recorder = Arc::new(RecordingSink::default());
        let sinks: SharedSinks = vec![Arc::new(LogAlertSink), recorder.clone()];
        for sink in &sinks {
            sink.on_alert(&event);
            sink.flush(Duration::from_millis(10)).await;
        }

        assert_eq!(recorder.events(), vec![event]);
    }
}
