//! 历史记录
//!
//! 按探测完成顺序追加，只在整轮巡检结束后按保留上限淘汰最旧的记录

use crate::monitor::state::ProbeStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// 一次探测结果的不可变记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// 目标ID，目标删除后记录仍然保留
    pub target_id: String,
    /// 探测状态
    pub status: ProbeStatus,
    /// 响应时间（毫秒）
    pub response_time: u64,
    /// 探测完成时间
    pub timestamp: DateTime<Utc>,
}

/// 有界历史日志
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
}

impl HistoryLog {
    /// 创建空日志
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条记录，不做淘汰
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
    }

    /// 淘汰最旧的记录直到不超过 `max_size` 条，返回淘汰数量
    pub fn trim(&mut self, max_size: usize) -> usize {
        let excess = self.entries.len().saturating_sub(max_size);
        self.entries.drain(..excess);
        excess
    }

    /// 最近 `limit` 条记录，保持记录顺序
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// 当前记录数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按顺序遍历记录
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}

impl FromIterator<HistoryEntry> for HistoryLog {
    fn from_iter<I: IntoIterator<Item = HistoryEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
