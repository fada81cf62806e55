//! OneEscrow - 担保机器人地址校验与链解析引擎
//!
//! 地址格式识别 → 多链并发探测 → 决策策略 → 担保地址账本

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod metrics;
pub mod repository;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::{AppError, AppErrorCode};

pub mod prelude {
    pub use crate::{
        app_state::AppState,
        config::Config,
        domain::{AddressSubmission, ChainFamily, ChainId, EscrowRole, SubmissionReceipt},
        error::{AppError, AppErrorCode},
        service::{AddressService, ChainResolver, SubmissionError},
    };
}
