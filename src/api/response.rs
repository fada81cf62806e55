//! 统一 API 响应格式
//!
//! 成功响应：{ code: 0, message, data }
//! 错误响应由 AppError 输出：{ code: "error_code", message, trace_id }

use axum::Json;
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            code: 0,
            message,
            data,
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

pub fn success_response<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// 带提示信息（例如链不匹配通知）的成功响应
pub fn success_response_with_message<T: Serialize>(data: T, message: String) -> ApiResult<T> {
    Ok(Json(ApiResponse::success_with_message(data, message)))
}
