//! 目标状态机
//!
//! 状态集合为 {pending, up, down}，pending 只存在于首次探测完成之前

use crate::monitor::probe::ProbeResult;
use serde::{Deserialize, Serialize};

/// 目标当前状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    /// 尚未完成任何探测
    #[default]
    Pending,
    /// 服务正常
    Up,
    /// 服务不可达
    Down,
}

/// 单次探测得出的状态，历史记录中只会出现这两种
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// 服务正常
    Up,
    /// 服务不可达
    Down,
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetStatus::Pending => write!(f, "pending"),
            TargetStatus::Up => write!(f, "up"),
            TargetStatus::Down => write!(f, "down"),
        }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        TargetStatus::from(*self).fmt(f)
    }
}

impl From<ProbeStatus> for TargetStatus {
    fn from(status: ProbeStatus) -> Self {
        match status {
            ProbeStatus::Up => TargetStatus::Up,
            ProbeStatus::Down => TargetStatus::Down,
        }
    }
}

/// 根据探测结果计算新状态
///
/// 转移只取决于探测结果，与之前的状态无关
pub fn next_status(_previous: TargetStatus, result: &ProbeResult) -> ProbeStatus {
    if result.reachable {
        ProbeStatus::Up
    } else {
        ProbeStatus::Down
    }
}
