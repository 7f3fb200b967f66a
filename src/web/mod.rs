//! Web API 模块
//!
//! 提供目标管理、历史查询和手动巡检的 HTTP API

pub mod handlers;

use crate::monitor::SweepScheduler;
use crate::store::MonitorStore;
use anyhow::{Context, Result};
use axum::{
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Web服务器共享状态
#[derive(Clone)]
pub struct AppState {
    /// 目标与历史存储
    pub store: Arc<dyn MonitorStore>,
    /// 巡检调度器，用于手动巡检
    pub scheduler: Arc<SweepScheduler>,
    /// 历史查询的默认和最大条数
    pub page_size: usize,
    /// 启动时间
    pub start_time: DateTime<Utc>,
}

impl AppState {
    /// 创建新的Web服务器状态
    pub fn new(scheduler: Arc<SweepScheduler>, page_size: usize) -> Self {
        Self {
            store: Arc::clone(scheduler.store()),
            scheduler,
            page_size,
            start_time: Utc::now(),
        }
    }
}

/// 构建路由
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/api/targets",
            get(handlers::list_targets).post(handlers::create_target),
        )
        .route("/api/targets/{id}", delete(handlers::delete_target))
        .route("/api/history", get(handlers::recent_history))
        .route("/api/sweep", post(handlers::run_sweep))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// 启动HTTP服务器，收到停止信号后优雅退出
///
/// # 参数
/// * `state` - 共享状态
/// * `addr` - 监听地址
/// * `shutdown` - 停止信号接收器
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("绑定监听地址失败: {addr}"))?;
    info!("Web API 已启动: http://{}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            info!("Web API 正在关闭");
        })
        .await
        .context("Web服务器运行失败")?;

    Ok(())
}
