//! Xode Gateway - Xode 区块链查询与钱包创建网关
//!
//! 非托管模式：助记词只返回一次，服务端不保存

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod metrics;
pub mod service;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::{AppError, AppErrorCode};

pub mod prelude {
    pub use crate::{
        app_state::AppState,
        domain::{GatewayError, GatewayResult},
        error::{AppError, AppErrorCode},
        service::{gateway_service::GatewayService, wallet_service::WalletService},
    };
}
