//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::address::XODE_SS58_PREFIX;

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// 允许跨域的来源；为空时允许任意来源
    #[serde(default)]
    pub cors_allow_origins: Vec<String>,
}

/// 链节点配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// WebSocket 端点
    pub url: String,
    #[serde(default = "default_ss58_prefix")]
    pub ss58_prefix: u16,
    /// 单次 RPC 请求超时；不设置时使用传输层默认值
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// 索引器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// GraphQL 端点
    pub url: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    #[serde(default)]
    pub enable_file_logging: bool,
    #[serde(default)]
    pub log_file_path: Option<String>,
}

fn default_ss58_prefix() -> u16 {
    XODE_SS58_PREFIX
}

impl Default for ServerConfig {
    fn default() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(3000);
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| format!("0.0.0.0:{}", port)),
            cors_allow_origins: std::env::var("CORS_ALLOW_ORIGINS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("NODE_URL").unwrap_or_else(|_| "ws://127.0.0.1:9944".into()),
            ss58_prefix: std::env::var("SS58_PREFIX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(XODE_SS58_PREFIX),
            request_timeout_secs: std::env::var("NODE_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("INDEXER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:4350/graphql".into()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            enable_file_logging: std::env::var("LOG_FILE_ENABLED")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig::default(),
            node: NodeConfig::default(),
            indexer: IndexerConfig::default(),
            logging: LoggingConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（文件中出现的段覆盖环境变量）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) if path.as_ref().exists() => Self::from_file(path),
            _ => Self::from_env(),
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if !self.node.url.starts_with("ws://") && !self.node.url.starts_with("wss://") {
            anyhow::bail!("NODE_URL must start with ws:// or wss://");
        }

        if !self.indexer.url.starts_with("http://") && !self.indexer.url.starts_with("https://") {
            anyhow::bail!("INDEXER_URL must start with http:// or https://");
        }

        // SS58 前缀为 14 位
        if self.node.ss58_prefix > 0x3FFF {
            anyhow::bail!("SS58_PREFIX must be at most 16383");
        }

        if self.node.request_timeout_secs == Some(0) {
            anyhow::bail!("NODE_REQUEST_TIMEOUT_SECS must be greater than zero");
        }

        self.server
            .bind_addr
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("Invalid BIND_ADDR: {}", self.server.bind_addr))?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }
}
