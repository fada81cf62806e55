use std::{sync::Arc, time::Instant};

use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    api::{
        middleware::trace_id_middleware,
        response::{success_response, ApiResponse},
    },
    app_state::AppState,
    error::AppError,
};

pub mod address_api; // 地址提交与查询
pub mod admin_api; // 黑名单维护
pub mod middleware;
pub mod response; // 统一响应格式
pub mod role_api; // 角色选择

#[derive(Debug, Serialize)]
pub struct Healthz {
    pub status: String,
    pub version: String,
    pub data_dir: String,
}

pub async fn healthz(
    axum::extract::State(st): axum::extract::State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Healthz>>, AppError> {
    let data_dir = st.config.storage.data_dir.clone();
    let status = if tokio::fs::metadata(&data_dir).await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    success_response(Healthz {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data_dir,
    })
}

pub fn routes(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route(
            "/api/v1/sessions/:session_id/addresses",
            post(address_api::submit_address).get(address_api::get_session_addresses),
        )
        .route(
            "/api/v1/sessions/:session_id/roles",
            post(role_api::select_role).get(role_api::get_session_roles),
        )
        .route(
            "/api/v1/admin/blacklist",
            post(admin_api::add_to_blacklist).delete(admin_api::remove_from_blacklist),
        )
        .route("/healthz", get(healthz))
        .route(
            "/metrics",
            get(|| async { crate::metrics::render_prometheus().into_response() }),
        );

    api_routes
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(from_fn(trace_id_middleware))
                .layer(from_fn(add_response_time_header))
                .layer(from_fn(count_requests)),
        )
        .with_state(state)
}

async fn add_response_time_header(req: Request, next: axum::middleware::Next) -> Response {
    let start = Instant::now();
    let mut resp = next.run(req).await;
    let elapsed_ms = start.elapsed().as_millis().to_string();
    resp.headers_mut().insert(
        "x-response-time",
        HeaderValue::from_str(&format!("{}ms", elapsed_ms))
            .unwrap_or(HeaderValue::from_static("0ms")),
    );
    resp
}

/// 按路由模板统计请求数与错误数
async fn count_requests(req: Request, next: axum::middleware::Next) -> Response {
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| format!("{} {}", req.method(), p.as_str()))
        .unwrap_or_else(|| "unmatched".to_string());

    let resp = next.run(req).await;
    if resp.status().is_client_error() || resp.status().is_server_error() {
        crate::metrics::count_err(&endpoint);
    } else {
        crate::metrics::count_ok(&endpoint);
    }
    resp
}
