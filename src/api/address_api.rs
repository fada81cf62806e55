// 地址提交与查询 API

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    api::{
        middleware::TraceId,
        response::{success_response, success_response_with_message, ApiResult},
    },
    app_state::AppState,
    domain::{AddressSubmission, EscrowRole, SubmissionReceipt},
    error::AppError,
    service::SessionAddressView,
    utils::string_utils::is_blank,
};

#[derive(Debug, Deserialize)]
pub struct SubmitAddressReq {
    pub user_id: i64,
    pub role: EscrowRole,
    pub address: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// POST /api/v1/sessions/:session_id/addresses
pub async fn submit_address(
    State(st): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Extension(TraceId(trace_id)): Extension<TraceId>,
    Json(req): Json<SubmitAddressReq>,
) -> ApiResult<SubmissionReceipt> {
    if is_blank(&session_id) {
        return Err(AppError::bad_request("session_id is required").with_trace_id(trace_id));
    }

    let submission = AddressSubmission {
        session_id,
        user_id: req.user_id,
        role: req.role,
        raw_address: req.address,
        display_name: req.display_name,
        username: req.username,
    };

    let receipt = st
        .address_service
        .submit_address(submission)
        .await
        .map_err(|e| AppError::from(e).with_trace_id(trace_id))?;

    match receipt.chain_match.as_ref().map(|m| m.notice.clone()) {
        Some(notice) => success_response_with_message(receipt, notice),
        None => success_response(receipt),
    }
}

/// GET /api/v1/sessions/:session_id/addresses
pub async fn get_session_addresses(
    State(st): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Extension(TraceId(trace_id)): Extension<TraceId>,
) -> ApiResult<SessionAddressView> {
    let view = st
        .address_service
        .session_addresses(&session_id)
        .await
        .map_err(|e| AppError::from(e).with_trace_id(trace_id))?;

    success_response(view)
}
