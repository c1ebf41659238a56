//! 网关领域错误
//!
//! 所有链查询、索引器查询与钱包创建失败都归入 `GatewayError`，
//! HTTP 层再统一映射到 `AppError`。

use thiserror::Error;

/// 钱包创建失败的细分原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletFailure {
    /// 钱包名称为空或仅包含空白
    InvalidName,
    /// 系统熵源不可用
    Entropy,
    /// 助记词或密钥派生失败
    Derivation,
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// 节点不可达或会话不可用
    #[error("{0}")]
    Connection(String),

    /// 请求的区块高度或记录不存在
    #[error("{0}")]
    NotFound(String),

    /// 地址不是合法的 SS58 字符串
    #[error("{0}")]
    InvalidAddress(String),

    /// 交易哈希不是 0x 前缀的 32 字节十六进制
    #[error("{0}")]
    InvalidHash(String),

    /// 索引器返回非 2xx 状态或 GraphQL 错误
    #[error("{message}")]
    Indexer { status: u16, message: String },

    #[error("{message}")]
    WalletCreation { kind: WalletFailure, message: String },

    /// 节点 RPC 调用失败
    #[error("{0}")]
    Rpc(String),

    /// 链上数据无法按运行时元数据解码
    #[error("{0}")]
    Decode(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// 在消息前加上操作阶段前缀，保留错误类别
    ///
    /// `Decode("bad bytes").stage("Failed to fetch block events")`
    /// 的消息为 `Failed to fetch block events: bad bytes`。
    pub fn stage(self, stage: &str) -> Self {
        let prefix = |message: String| format!("{}: {}", stage, message);
        match self {
            Self::Connection(m) => Self::Connection(prefix(m)),
            Self::NotFound(m) => Self::NotFound(prefix(m)),
            Self::InvalidAddress(m) => Self::InvalidAddress(prefix(m)),
            Self::InvalidHash(m) => Self::InvalidHash(prefix(m)),
            Self::Indexer { status, message } => Self::Indexer {
                status,
                message: prefix(message),
            },
            Self::WalletCreation { kind, message } => Self::WalletCreation {
                kind,
                message: prefix(message),
            },
            Self::Rpc(m) => Self::Rpc(prefix(m)),
            Self::Decode(m) => Self::Decode(prefix(m)),
        }
    }

    /// 指标与日志使用的错误类别标签
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::NotFound(_) => "not_found",
            Self::InvalidAddress(_) => "invalid_address",
            Self::InvalidHash(_) => "invalid_hash",
            Self::Indexer { .. } => "indexer",
            Self::WalletCreation { .. } => "wallet_creation",
            Self::Rpc(_) => "rpc",
            Self::Decode(_) => "decode",
        }
    }

    pub fn wallet(kind: WalletFailure, message: impl Into<String>) -> Self {
        Self::WalletCreation {
            kind,
            message: message.into(),
        }
    }
}
