// 管理员 API - 黑名单维护

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::{
    api::{
        middleware::TraceId,
        response::{success_response, ApiResult},
    },
    app_state::AppState,
    error::AppError,
};

#[derive(Debug, Deserialize)]
pub struct BlacklistReq {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BlacklistResp {
    pub changed: bool,
}

fn validate(req: &BlacklistReq, trace_id: &str) -> Result<(), AppError> {
    let has_username = req
        .username
        .as_deref()
        .map(|u| !u.trim().trim_start_matches('@').is_empty())
        .unwrap_or(false);
    if req.user_id.is_none() && !has_username {
        return Err(AppError::bad_request("user_id or username is required")
            .with_trace_id(trace_id.to_string()));
    }
    Ok(())
}

/// POST /api/v1/admin/blacklist
pub async fn add_to_blacklist(
    State(st): State<Arc<AppState>>,
    Extension(TraceId(trace_id)): Extension<TraceId>,
    Json(req): Json<BlacklistReq>,
) -> ApiResult<BlacklistResp> {
    validate(&req, &trace_id)?;

    let changed = st
        .blacklist
        .add(
            req.user_id,
            req.username.as_deref(),
            req.reason.as_deref().unwrap_or(""),
        )
        .await
        .map_err(|e| AppError::from(e).with_trace_id(trace_id))?;

    success_response(BlacklistResp { changed })
}

/// DELETE /api/v1/admin/blacklist
pub async fn remove_from_blacklist(
    State(st): State<Arc<AppState>>,
    Extension(TraceId(trace_id)): Extension<TraceId>,
    Json(req): Json<BlacklistReq>,
) -> ApiResult<BlacklistResp> {
    validate(&req, &trace_id)?;

    let changed = st
        .blacklist
        .remove(req.user_id, req.username.as_deref())
        .await
        .map_err(|e| AppError::from(e).with_trace_id(trace_id))?;

    success_response(BlacklistResp { changed })
}
