//! 目标注册表与历史数据模型

use crate::error::RegistryError;
use crate::monitor::history::{HistoryEntry, HistoryLog};
use crate::monitor::state::{ProbeStatus, TargetStatus};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 被监控的目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// 唯一ID，创建后不变
    pub id: String,
    /// 显示名称
    pub name: String,
    /// 探测地址
    pub url: String,
    /// 当前状态
    #[serde(default)]
    pub status: TargetStatus,
    /// 最近一次探测完成时间
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
    /// 创建时间
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Target {
    /// 校验并创建新目标，初始状态为 pending
    pub fn new(name: &str, url: &str) -> Result<Self, RegistryError> {
        let name = name.trim();
        let url = url.trim();
        if name.is_empty() || url.is_empty() {
            return Err(RegistryError::MissingField);
        }

        let parsed = Url::parse(url).map_err(|e| RegistryError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidUrl(format!(
                "{url}: 只支持 http 和 https"
            )));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            url: url.to_string(),
            status: TargetStatus::Pending,
            last_checked: None,
            created_at: Utc::now(),
        })
    }
}

/// 单个目标在一轮巡检中的状态更新
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// 目标ID
    pub target_id: String,
    /// 新状态
    pub status: ProbeStatus,
    /// 探测完成时间
    pub last_checked: DateTime<Utc>,
}

/// 一轮巡检累积的全部写入，按探测顺序排列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepBatch {
    /// 状态更新
    pub updates: Vec<StatusUpdate>,
    /// 新增历史记录
    pub entries: Vec<HistoryEntry>,
}

impl SweepBatch {
    /// 记录一个目标的处理结果
    pub fn record(&mut self, update: StatusUpdate, entry: HistoryEntry) {
        self.updates.push(update);
        self.entries.push(entry);
    }
}

/// 应用一轮巡检后的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedSweep {
    /// 成功更新状态的目标数
    pub updated: usize,
    /// 巡检期间已被删除、跳过更新的目标数
    pub skipped: usize,
    /// 被淘汰的历史记录数
    pub evicted: usize,
    /// 应用后的历史记录总数
    pub history_len: usize,
}

/// 持久化的数据库内容，布局为 `{ "targets": [...], "history": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    /// 目标列表，保持注册顺序
    #[serde(default)]
    pub targets: Vec<Target>,
    /// 历史记录
    #[serde(default)]
    pub history: HistoryLog,
}

impl Database {
    /// 当前目标快照
    pub fn list_targets(&self) -> Vec<Target> {
        self.targets.clone()
    }

    /// 更新目标状态，目标不存在时返回 false
    pub fn update_status(
        &mut self,
        target_id: &str,
        status: ProbeStatus,
        last_checked: DateTime<Utc>,
    ) -> bool {
        match self.targets.iter_mut().find(|t| t.id == target_id) {
            Some(target) => {
                target.status = status.into();
                target.last_checked = Some(last_checked);
                true
            }
            None => false,
        }
    }

    /// 追加历史记录
    pub fn append_history(&mut self, entry: HistoryEntry) {
        self.history.append(entry);
    }

    /// 按保留上限淘汰最旧的历史记录
    pub fn trim_history(&mut self, max_size: usize) -> usize {
        self.history.trim(max_size)
    }

    /// 应用一整轮巡检：逐个更新状态、追加历史，最后统一淘汰
    pub fn apply(&mut self, batch: SweepBatch, history_limit: usize) -> AppliedSweep {
        let mut applied = AppliedSweep::default();

        for update in &batch.updates {
            if self.update_status(&update.target_id, update.status, update.last_checked) {
                applied.updated += 1;
            } else {
                applied.skipped += 1;
            }
        }

        for entry in batch.entries {
            self.append_history(entry);
        }

        applied.evicted = self.trim_history(history_limit);
        applied.history_len = self.history.len();
        applied
    }

    /// 注册目标
    pub fn add_target(&mut self, target: Target) {
        self.targets.push(target);
    }

    /// 删除目标，返回是否确实删除
    pub fn remove_target(&mut self, target_id: &str) -> bool {
        let before = self.targets.len();
        self.targets.retain(|t| t.id != target_id);
        self.targets.len() != before
    }

    /// 以另一份目标列表（数据文件中的）为准合并注册表
    ///
    /// 目标集合和顺序取 `registry`；两边都有的目标保留最近一次探测的状态。
    /// 返回 (新增数, 删除数)。
    pub fn merge_registry(&mut self, registry: Vec<Target>) -> (usize, usize) {
        let mut known: HashMap<String, Target> = self
            .targets
            .drain(..)
            .map(|t| (t.id.clone(), t))
            .collect();
        let mut added = 0;

        for incoming in registry {
            let merged = match known.remove(&incoming.id) {
                Some(mine) if mine.last_checked >= incoming.last_checked => mine,
                Some(_) => incoming,
                None => {
                    added += 1;
                    incoming
                }
            };
            self.targets.push(merged);
        }

        (added, known.len())
    }
}
