//! Web 路由处理函数

use super::AppState;
use crate::error::{MonitorError, RegistryError};
use crate::monitor::{HistoryEntry, SweepReport};
use crate::store::Target;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

/// API错误类型，响应体为 `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => {
                error!("API内部错误: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::Registry(e @ RegistryError::NotFound(_)) => {
                ApiError::NotFound(e.to_string())
            }
            MonitorError::Registry(e) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// 健康检查响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: i64,
    pub targets: usize,
    pub history_len: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
        targets: state.store.list_targets().await.len(),
        history_len: state.store.history_len().await,
    })
}

pub async fn list_targets(State(state): State<AppState>) -> Json<Vec<Target>> {
    Json(state.store.list_targets().await)
}

/// 新建目标请求，字段缺失与空值同样按缺少必填字段处理
#[derive(Debug, Default, Deserialize)]
pub struct CreateTargetRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

pub async fn create_target(
    State(state): State<AppState>,
    payload: Result<Json<CreateTargetRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Target>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let name = request.name.unwrap_or_default();
    let url = request.url.unwrap_or_default();
    let target = state.store.add_target(&name, &url).await?;

    Ok((StatusCode::CREATED, Json(target)))
}

/// 删除目标，目标不存在时同样返回成功
pub async fn delete_target(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.remove_target(&id).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// 最近的历史记录，条数不超过分页大小
pub async fn recent_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<HistoryEntry>> {
    let limit = query
        .limit
        .unwrap_or(state.page_size)
        .min(state.page_size);
    Json(state.store.recent_history(limit).await)
}

/// 立即执行一轮巡检，与定时巡检串行
pub async fn run_sweep(State(state): State<AppState>) -> Json<SweepReport> {
    Json(state.scheduler.run_sweep().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::monitor::{HttpProber, SweepScheduler};
    use crate::notification::SharedSinks;
    use crate::store::{Database, JsonFileStore, MonitorStore};
    use crate::web::build_router;
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn create_test_app(page_size: usize) -> (Router, Arc<JsonFileStore>) {
        let store = Arc::new(JsonFileStore::in_memory(Database::default()));
        let prober = Arc::new(HttpProber::new(Duration::from_millis(500)).unwrap());
        let sinks: SharedSinks = Vec::new();
        let scheduler = Arc::new(SweepScheduler::new(
            prober,
            store.clone(),
            sinks,
            &MonitorConfig::default(),
        ));
        let app = build_router(crate::web::AppState::new(scheduler, page_size));
        (app, store)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = create_test_app(100);
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["targets"], 0);
    }

    #[tokio::test]
    async fn test_create_and_list_targets() {
        let (app, _) = create_test_app(100);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/targets",
                r#"{"name":"Good","url":"http://good.test"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["status"], "pending");
        assert!(created["lastChecked"].is_null());

        let response = app
            .oneshot(Request::get("/api/targets").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let list = body_json(response).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["id"], created["id"]);
    }

    #[tokio::test]
    async fn test_create_target_missing_fields() {
        let (app, store) = create_test_app(100);

        let response = app
            .clone()
            .oneshot(post_json("/api/targets", r#"{"name":"Good"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "URL and Name required");

        let response = app
            .oneshot(post_json("/api/targets", "not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.list_targets().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_target_invalid_url() {
        let (app, _) = create_test_app(100);
        let response = app
            .oneshot(post_json(
                "/api/targets",
                r#"{"name":"x","url":"ftp://x.test"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_target_is_idempotent() {
        let (app, store) = create_test_app(100);
        let target = store.add_target("A", "http://a.test").await.unwrap();

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(
                    Request::delete(format!("/api/targets/{}", target.id))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_json(response).await["success"], true);
        }
        assert!(store.list_targets().await.is_empty());
    }

    #[tokio::test]
    async fn test_history_limit_capped_by_page_size() {
        let (app, store) = create_test_app(2);
        store.add_target("A", "http://127.0.0.1:1/").await.unwrap();

        // 没有目标在监听，三轮巡检都记为 down
        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(Request::post("/api/sweep").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let report = body_json(response).await;
            assert_eq!(report["down"], 1);
        }

        let response = app
            .clone()
            .oneshot(Request::get("/api/history?limit=50").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let history = body_json(response).await;
        assert_eq!(history.as_array().unwrap().len(), 2);
        assert_eq!(history[0]["status"], "down");
        assert_eq!(history[0]["responseTime"], 0);

        let response = app
            .oneshot(Request::get("/api/history?limit=1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
    }
}
