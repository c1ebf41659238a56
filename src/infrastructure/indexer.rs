//! 索引器客户端
//!
//! 通过 GraphQL（HTTP POST）按交易哈希查询转账与资产转账记录。
//! 不做重试，也不设置客户端超时。

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::domain::records::TransferLookup;
use crate::domain::{GatewayError, GatewayResult};

pub const OPERATION_NAME: &str = "TransfersByHash";

pub const TRANSFERS_BY_HASH_QUERY: &str = r#"query TransfersByHash($hash: String!) {
  transfers(where: { extrinsicHash_eq: $hash }) {
    extrinsicHash
    blockNumber
    timestamp
    amount
    fee
    from { id }
    to { id }
  }
  assetTransfers(where: { extrinsicHash_eq: $hash }) {
    extrinsicHash
    blockNumber
    timestamp
    amount
    fee
    from { id }
    to { id }
    asset { id name symbol }
  }
}"#;

// 错误消息中保留的响应体长度
const BODY_SNIPPET_LEN: usize = 256;

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: HashVariables<'a>,
    #[serde(rename = "operationName")]
    operation_name: &'a str,
}

#[derive(Serialize)]
struct HashVariables<'a> {
    hash: &'a str,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<TransferLookup>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

const USER_AGENT: &str = concat!("xode-gateway/", env!("CARGO_PKG_VERSION"));

// 构建失败时退回默认客户端（没有 User-Agent）
fn http_client(user_agent: &str) -> reqwest::Client {
    match reqwest::Client::builder().user_agent(user_agent).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, user_agent, "⚠️ indexer HTTP client build failed, using defaults");
            reqwest::Client::new()
        }
    }
}

#[derive(Clone)]
pub struct IndexerClient {
    endpoint: String,
    http: reqwest::Client,
}

impl IndexerClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: http_client(USER_AGENT),
        }
    }

    /// 按交易哈希查询；哈希格式由调用方校验
    pub async fn transfers_by_hash(&self, hash: &str) -> GatewayResult<TransferLookup> {
        let body = GraphQlRequest {
            query: TRANSFERS_BY_HASH_QUERY,
            variables: HashVariables { hash },
            operation_name: OPERATION_NAME,
        };

        let start = Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                crate::metrics::observe_upstream_latency_ms("indexer", start.elapsed().as_millis(), false);
                GatewayError::Connection(format!("Indexer unreachable at {}: {}", self.endpoint, e))
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            GatewayError::Connection(format!("Failed to read indexer response: {}", e))
        })?;
        crate::metrics::observe_upstream_latency_ms(
            "indexer",
            start.elapsed().as_millis(),
            status.is_success(),
        );

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), endpoint = %self.endpoint, "indexer returned error status");
            let snippet: String = text.chars().take(BODY_SNIPPET_LEN).collect();
            return Err(GatewayError::Indexer {
                status: status.as_u16(),
                message: format!("Indexer responded with HTTP {}: {}", status.as_u16(), snippet),
            });
        }

        let parsed: GraphQlResponse = serde_json::from_str(&text)
            .map_err(|e| GatewayError::Decode(format!("Invalid indexer response: {}", e)))?;

        if !parsed.errors.is_empty() {
            let messages: Vec<_> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(GatewayError::Indexer {
                status: status.as_u16(),
                message: format!("Indexer query failed: {}", messages.join("; ")),
            });
        }

        let lookup = parsed.data.unwrap_or_default();
        tracing::debug!(
            hash,
            transfers = lookup.transfers.len(),
            asset_transfers = lookup.asset_transfers.len(),
            "indexer lookup complete"
        );
        Ok(lookup)
    }
}
