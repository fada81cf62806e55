//! Trace ID 中间件
//! 为每个请求生成或透传 trace_id，写入请求扩展、日志 span 与响应头

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// 请求扩展中的 trace_id
#[derive(Debug, Clone)]
pub struct TraceId(pub String);

/// Trace ID 生成器
pub struct TraceIdGenerator;

impl TraceIdGenerator {
    pub fn generate() -> String {
        Uuid::new_v4().to_string()
    }

    /// 优先使用上游传入的 trace_id（聊天层转发），否则新生成
    pub fn from_headers(headers: &HeaderMap) -> String {
        headers
            .get(TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= 128)
            .map(str::to_string)
            .unwrap_or_else(Self::generate)
    }
}

pub async fn trace_id_middleware(mut req: Request, next: Next) -> Response {
    let trace_id = TraceIdGenerator::from_headers(req.headers());
    req.extensions_mut().insert(TraceId(trace_id.clone()));

    // 请求内的所有日志都带上 trace_id
    let span = tracing::info_span!("request", trace_id = %trace_id);
    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }

    response
}
