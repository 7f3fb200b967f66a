//! 目标注册表与历史存储
//!
//! 巡检调度器是状态与历史的唯一写入者，API 和命令行只读取快照或增删目标。
//! 目标的增删以持久化存储为准，状态和历史以调度器所在进程为准。

pub mod json;
pub mod model;

use crate::error::Result;
use crate::monitor::history::HistoryEntry;
use async_trait::async_trait;

// 重新导出主要类型
pub use json::JsonFileStore;
pub use model::{AppliedSweep, Database, StatusUpdate, SweepBatch, Target};

/// 监控数据存储trait
#[async_trait]
pub trait MonitorStore: Send + Sync {
    /// 巡检开始时的目标快照，保持注册顺序
    async fn list_targets(&self) -> Vec<Target>;

    /// 最近 `limit` 条历史记录
    async fn recent_history(&self, limit: usize) -> Vec<HistoryEntry>;

    /// 当前保留的历史记录数
    async fn history_len(&self) -> usize;

    /// 注册新目标并持久化
    async fn add_target(&self, name: &str, url: &str) -> Result<Target>;

    /// 删除目标并持久化，返回目标是否存在
    async fn remove_target(&self, target_id: &str) -> Result<bool>;

    /// 从持久化存储重新读取目标列表，接收其他进程的增删
    async fn sync_registry(&self) -> Result<()>;

    /// 一次性应用整轮巡检的写入，读者只会看到应用前或应用后的状态
    async fn apply_sweep(&self, batch: SweepBatch, history_limit: usize) -> AppliedSweep;

    /// 将当前内存状态写入持久化存储
    async fn persist(&self) -> Result<()>;
}
