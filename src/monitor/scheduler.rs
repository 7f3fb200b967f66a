//! 巡检调度器模块
//!
//! 按固定间隔对所有目标执行一轮巡检：逐个探测、更新状态、判定告警、追加历史，
//! 整轮结束后一次性提交并持久化。巡检之间由互斥锁串行化，不会重叠。

use crate::config::MonitorConfig;
use crate::error::ProbeFailure;
use crate::monitor::alert::{self, AlertEvent};
use crate::monitor::history::HistoryEntry;
use crate::monitor::probe::{ProbeResult, Prober};
use crate::monitor::state::{self, ProbeStatus};
use crate::notification::SharedSinks;
use crate::store::{MonitorStore, StatusUpdate, SweepBatch, Target};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// 一轮巡检的结果汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 结束时间（含持久化）
    pub finished_at: DateTime<Utc>,
    /// 探测的目标数
    pub probed: usize,
    /// 探测结果为 up 的目标数
    pub up: usize,
    /// 探测结果为 down 的目标数
    pub down: usize,
    /// 发出的告警数
    pub alerts: usize,
    /// 巡检期间被删除、跳过状态更新的目标数
    pub skipped: usize,
    /// 淘汰的历史记录数
    pub evicted: usize,
    /// 提交后的历史记录总数
    pub history_len: usize,
    /// 是否成功持久化
    pub persisted: bool,
}

/// 巡检调度器
pub struct SweepScheduler {
    /// 探测器
    prober: Arc<dyn Prober>,
    /// 目标与历史存储
    store: Arc<dyn MonitorStore>,
    /// 告警接收端
    sinks: SharedSinks,
    /// 巡检间隔
    interval: Duration,
    /// 历史保留上限
    history_limit: usize,
    /// 串行化巡检
    sweep_lock: Mutex<()>,
}

impl SweepScheduler {
    /// 创建新的巡检调度器
    ///
    /// # 参数
    /// * `prober` - 探测器
    /// * `store` - 目标与历史存储
    /// * `sinks` - 告警接收端
    /// * `config` - 监控配置
    pub fn new(
        prober: Arc<dyn Prober>,
        store: Arc<dyn MonitorStore>,
        sinks: SharedSinks,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            prober,
            store,
            sinks,
            interval: config.check_interval(),
            history_limit: config.history_limit,
            sweep_lock: Mutex::new(()),
        }
    }

    /// 底层存储
    pub fn store(&self) -> &Arc<dyn MonitorStore> {
        &self.store
    }

    /// 执行一轮巡检
    ///
    /// 单个目标的任何失败都只会让该目标记为 down，不会中断整轮巡检；
    /// 持久化失败只记录日志，下一轮巡检会重新写入。
    pub async fn run_sweep(&self) -> SweepReport {
        let _guard = self.sweep_lock.lock().await;
        let started_at = Utc::now();

        if let Err(e) = self.store.sync_registry().await {
            warn!("重新读取目标列表失败，沿用内存中的目标: {}", e);
        }
        let targets = self.store.list_targets().await;
        debug!("开始巡检，目标数量: {}", targets.len());

        let mut batch = SweepBatch::default();
        let mut up = 0;
        let mut alerts = 0;

        for target in &targets {
            let result = self.probe_isolated(target).await;
            let checked_at = Utc::now();
            let next = state::next_status(target.status, &result);

            match next {
                ProbeStatus::Up => {
                    up += 1;
                    debug!(
                        "目标正常: {} ({}) {}ms",
                        target.name, target.url, result.response_time_ms
                    );
                }
                ProbeStatus::Down => {
                    let reason = result
                        .failure
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "N/A".to_string());
                    warn!("目标不可达: {} ({}) - {}", target.name, target.url, reason);
                }
            }

            if let Some(kind) = alert::evaluate(target.status, next) {
                let event = AlertEvent::for_target(target, kind, checked_at);
                self.emit(&event);
                alerts += 1;
            }

            batch.record(
                StatusUpdate {
                    target_id: target.id.clone(),
                    status: next,
                    last_checked: checked_at,
                },
                HistoryEntry {
                    target_id: target.id.clone(),
                    status: next,
                    response_time: result.response_time_ms,
                    timestamp: checked_at,
                },
            );
        }

        let applied = self.store.apply_sweep(batch, self.history_limit).await;
        if applied.skipped > 0 {
            info!("{} 个目标在巡检期间被删除，跳过状态更新", applied.skipped);
        }

        let persisted = match self.store.persist().await {
            Ok(()) => true,
            Err(e) => {
                error!("巡检结果持久化失败，将在下一轮重试: {}", e);
                false
            }
        };

        let report = SweepReport {
            started_at,
            finished_at: Utc::now(),
            probed: targets.len(),
            up,
            down: targets.len() - up,
            alerts,
            skipped: applied.skipped,
            evicted: applied.evicted,
            history_len: applied.history_len,
            persisted,
        };

        info!(
            "巡检完成: 目标 {}，正常 {}，异常 {}，告警 {}，历史 {}",
            report.probed, report.up, report.down, report.alerts, report.history_len
        );
        report
    }

    /// 在独立任务中探测目标，任务 panic 或被取消时按不可达处理
    async fn probe_isolated(&self, target: &Target) -> ProbeResult {
        let prober = Arc::clone(&self.prober);
        let url = target.url.clone();

        match tokio::spawn(async move { prober.probe(&url).await }).await {
            Ok(result) => result,
            Err(e) => {
                error!("探测任务异常终止: {} - {}", target.name, e);
                ProbeResult::unreachable(ProbeFailure::Aborted(e.to_string()))
            }
        }
    }

    /// 向所有接收端发出告警
    fn emit(&self, event: &AlertEvent) {
        for sink in &self.sinks {
            sink.on_alert(event);
        }
    }

    /// 等待所有接收端送出已发出的告警，进程退出前调用
    pub async fn flush_alerts(&self, timeout: Duration) {
        for sink in &self.sinks {
            sink.flush(timeout).await;
        }
    }

    /// 按固定间隔循环巡检，直到收到停止信号
    ///
    /// # 参数
    /// * `shutdown` - 停止信号接收器
    /// * `run_on_start` - 是否在启动时立即执行一轮
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>, run_on_start: bool) {
        let start = if run_on_start {
            Instant::now()
        } else {
            Instant::now() + self.interval
        };
        let mut ticker = interval_at(start, self.interval);
        // 巡检超过间隔时顺延下一次，而不是补跑
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("启动巡检调度器，间隔: {:?}", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_sweep().await;
                }
                _ = shutdown.recv() => {
                    info!("收到停止信号，巡检调度器退出");
                    break;
                }
            }
        }
    }
}
