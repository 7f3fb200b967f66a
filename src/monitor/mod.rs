//! 监控核心模块
//!
//! 包含探测执行器、目标状态机、告警判定、历史记录和巡检调度器

pub mod alert;
pub mod history;
pub mod probe;
pub mod scheduler;
pub mod state;

// 重新导出主要类型
pub use alert::{evaluate, AlertEvent, AlertKind};
pub use history::{HistoryEntry, HistoryLog};
pub use probe::{HttpProber, ProbeResult, Prober};
pub use scheduler::{SweepReport, SweepScheduler};
pub use state::{next_status, ProbeStatus, TargetStatus};
