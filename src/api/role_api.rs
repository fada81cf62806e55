// 角色选择 API

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::{
        middleware::TraceId,
        response::{success_response, ApiResult},
    },
    app_state::AppState,
    domain::{EscrowRole, RoleAssignment},
    error::AppError,
};

#[derive(Debug, Deserialize)]
pub struct SelectRoleReq {
    pub user_id: i64,
    pub role: EscrowRole,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionRolesResp {
    pub session_id: String,
    pub buyer: Option<RoleAssignment>,
    pub seller: Option<RoleAssignment>,
}

/// POST /api/v1/sessions/:session_id/roles
pub async fn select_role(
    State(st): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Extension(TraceId(trace_id)): Extension<TraceId>,
    Json(req): Json<SelectRoleReq>,
) -> ApiResult<RoleAssignment> {
    let assignment = st
        .role_registry
        .select_role(&session_id, req.user_id, req.role, req.display_name)
        .await
        .map_err(|e| AppError::from(e).with_trace_id(trace_id))?;

    success_response(assignment)
}

/// GET /api/v1/sessions/:session_id/roles
pub async fn get_session_roles(
    State(st): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Extension(TraceId(trace_id)): Extension<TraceId>,
) -> ApiResult<SessionRolesResp> {
    let assignments = st
        .role_registry
        .assignments(&session_id)
        .await
        .map_err(|e| AppError::from(e).with_trace_id(trace_id))?;

    let pick = |role: EscrowRole| assignments.iter().find(|a| a.role == role).cloned();

    success_response(SessionRolesResp {
        buyer: pick(EscrowRole::Buyer),
        seller: pick(EscrowRole::Seller),
        session_id,
    })
}
