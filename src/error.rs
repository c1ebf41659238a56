use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{GatewayError, WalletFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorCode {
    // HTTP 基础错误码
    NotFound,

    // 业务错误码
    InvalidAddress,
    InvalidHash,
    InvalidParameter,
    ValidationFailed,
    NodeUnavailable,
    RpcError,
    IndexerError,
    DecodeError,
    WalletCreationFailed,
}

impl AppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppErrorCode::NotFound => "not_found",
            AppErrorCode::InvalidAddress => "invalid_address",
            AppErrorCode::InvalidHash => "invalid_hash",
            AppErrorCode::InvalidParameter => "invalid_parameter",
            AppErrorCode::ValidationFailed => "validation_failed",
            AppErrorCode::NodeUnavailable => "node_unavailable",
            AppErrorCode::RpcError => "rpc_error",
            AppErrorCode::IndexerError => "indexer_error",
            AppErrorCode::DecodeError => "decode_error",
            AppErrorCode::WalletCreationFailed => "wallet_creation_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub code: AppErrorCode,
    pub message: String,
    pub status: StatusCode,
    pub trace_id: Option<String>,
}

/// 错误响应体
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "invalid_address")]
    pub code: String,
    #[schema(example = "Failed to fetch address balance: Invalid address")]
    pub message: String,
    pub trace_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code.as_str().to_string(),
            message: self.message,
            trace_id: self.trace_id,
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    fn new(code: AppErrorCode, status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            status,
            trace_id: None,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::NotFound, StatusCode::NOT_FOUND, msg)
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::InvalidAddress, StatusCode::BAD_REQUEST, msg)
    }

    pub fn invalid_hash(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::InvalidHash, StatusCode::BAD_REQUEST, msg)
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::InvalidParameter, StatusCode::BAD_REQUEST, msg)
    }

    pub fn validation_failed(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::ValidationFailed, StatusCode::BAD_REQUEST, msg)
    }

    pub fn node_unavailable(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::NodeUnavailable, StatusCode::BAD_GATEWAY, msg)
    }

    pub fn rpc_error(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::RpcError, StatusCode::BAD_GATEWAY, msg)
    }

    pub fn indexer_error(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::IndexerError, StatusCode::BAD_GATEWAY, msg)
    }

    pub fn decode_error(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::DecodeError, StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn wallet_creation_failed(msg: impl Into<String>) -> Self {
        Self::new(
            AppErrorCode::WalletCreationFailed,
            StatusCode::INTERNAL_SERVER_ERROR,
            msg,
        )
    }

    /// 设置追踪ID
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        let message = err.to_string();
        match err {
            GatewayError::Connection(_) => Self::node_unavailable(message),
            GatewayError::NotFound(_) => Self::not_found(message),
            GatewayError::InvalidAddress(_) => Self::invalid_address(message),
            GatewayError::InvalidHash(_) => Self::invalid_hash(message),
            GatewayError::Indexer { .. } => Self::indexer_error(message),
            GatewayError::Rpc(_) => Self::rpc_error(message),
            GatewayError::Decode(_) => Self::decode_error(message),
            GatewayError::WalletCreation {
                kind: WalletFailure::InvalidName,
                ..
            } => Self::validation_failed(message),
            GatewayError::WalletCreation { .. } => Self::wallet_creation_failed(message),
        }
    }
}
