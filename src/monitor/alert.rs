//! 告警判定
//!
//! 告警只由 (旧状态, 新状态) 决定，没有去抖或连续失败阈值：
//! `up` 之后的一次失败探测就会触发 DOWN 告警。需要降噪的部署应在告警接收端叠加自己的策略。

use crate::monitor::state::{ProbeStatus, TargetStatus};
use crate::store::Target;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 告警类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertKind {
    /// 服务由正常变为不可达
    Down,
    /// 服务由不可达恢复正常
    Recovery,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Down => write!(f, "DOWN"),
            AlertKind::Recovery => write!(f, "RECOVERY"),
        }
    }
}

/// 告警事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    /// 目标ID
    pub target_id: String,
    /// 目标名称
    pub target_name: String,
    /// 目标URL
    pub target_url: String,
    /// 告警类型
    pub kind: AlertKind,
    /// 触发时间
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    /// 为目标创建告警事件
    pub fn for_target(target: &Target, kind: AlertKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            target_id: target.id.clone(),
            target_name: target.name.clone(),
            target_url: target.url.clone(),
            kind,
            timestamp,
        }
    }
}

/// 判定状态转移是否需要告警
pub fn evaluate(previous: TargetStatus, next: ProbeStatus) -> Option<AlertKind> {
    match (previous, next) {
        (TargetStatus::Up, ProbeStatus::Down) => Some(AlertKind::Down),
        (TargetStatus::Down, ProbeStatus::Up) => Some(AlertKind::Recovery),
        _ => None,
    }
}
