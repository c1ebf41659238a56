//! 节点会话
//!
//! 每个网关操作打开一条到节点的 WebSocket JSON-RPC 连接，操作结束后关闭。
//! 会话之间不共享任何状态。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonrpsee::core::client::{ClientT, Subscription, SubscriptionClientT};
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use serde::Deserialize;

use crate::domain::chain_value::BlockHash;
use crate::domain::{GatewayError, GatewayResult};
use crate::infrastructure::metadata::ChainMetadata;

/// 一条打开的节点会话
#[async_trait]
pub trait NodeSession: Send + Sync {
    fn endpoint(&self) -> &str;

    /// 订阅新区块头，取第一条通知的高度后退订
    async fn first_new_head(&self) -> GatewayResult<u64>;

    /// 高度 → 区块哈希；高度超出链头时为 `None`
    async fn block_hash(&self, height: u64) -> GatewayResult<Option<BlockHash>>;

    /// 区块体中的外部交易原始字节；区块不存在时为 `None`
    async fn block_extrinsics(&self, hash: &BlockHash) -> GatewayResult<Option<Vec<Vec<u8>>>>;

    /// 读取存储项原始字节；`at` 为空表示最新状态
    async fn storage(&self, key: &[u8], at: Option<&BlockHash>) -> GatewayResult<Option<Vec<u8>>>;

    /// 指定区块（或最新）的运行时元数据
    async fn metadata(&self, at: Option<&BlockHash>) -> GatewayResult<ChainMetadata>;

    /// 释放连接；可重复调用
    fn close(&mut self);
}

/// 会话工厂
#[async_trait]
pub trait NodeConnector: Send + Sync {
    async fn open(&self) -> GatewayResult<Box<dyn NodeSession>>;
}

/// 基于 jsonrpsee 的 WebSocket 连接器
#[derive(Debug, Clone)]
pub struct WsNodeConnector {
    url: String,
    request_timeout: Option<Duration>,
}

impl WsNodeConnector {
    pub fn new(url: impl Into<String>, request_timeout: Option<Duration>) -> Self {
        Self {
            url: url.into(),
            request_timeout,
        }
    }
}

#[async_trait]
impl NodeConnector for WsNodeConnector {
    async fn open(&self) -> GatewayResult<Box<dyn NodeSession>> {
        let mut builder = WsClientBuilder::default();
        if let Some(timeout) = self.request_timeout {
            builder = builder.request_timeout(timeout);
        }

        let start = Instant::now();
        let client = builder.build(&self.url).await.map_err(|e| {
            crate::metrics::observe_upstream_latency_ms("node", start.elapsed().as_millis(), false);
            tracing::warn!(endpoint = %self.url, error = %e, "node connection failed");
            GatewayError::Connection(format!("Unable to connect to node at {}: {}", self.url, e))
        })?;

        crate::metrics::inc_node_session_opened();
        tracing::debug!(endpoint = %self.url, "node session opened");
        Ok(Box::new(WsNodeSession {
            url: self.url.clone(),
            client: Some(client),
        }))
    }
}

pub struct WsNodeSession {
    url: String,
    client: Option<WsClient>,
}

#[derive(Deserialize)]
struct RpcHeader {
    number: String,
}

#[derive(Deserialize)]
struct RpcSignedBlock {
    block: RpcBlock,
}

#[derive(Deserialize)]
struct RpcBlock {
    extrinsics: Vec<String>,
}

fn rpc_error(method: &str, err: impl std::fmt::Display) -> GatewayError {
    GatewayError::Rpc(format!("{} failed: {}", method, err))
}

fn decode_hex(method: &str, s: &str) -> GatewayResult<Vec<u8>> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .map_err(|e| GatewayError::Decode(format!("{} returned invalid hex: {}", method, e)))
}

/// 区块头中的高度是十六进制字符串，例如 `"0x1e240"`
pub fn parse_block_number(number: &str) -> GatewayResult<u64> {
    u64::from_str_radix(number.trim_start_matches("0x"), 16)
        .map_err(|e| GatewayError::Decode(format!("Invalid block number {:?}: {}", number, e)))
}

impl WsNodeSession {
    fn client(&self) -> GatewayResult<&WsClient> {
        self.client
            .as_ref()
            .ok_or_else(|| GatewayError::Connection("Node session already closed".into()))
    }

    async fn call<R>(&self, method: &str, params: jsonrpsee::core::params::ArrayParams) -> GatewayResult<R>
    where
        R: serde::de::DeserializeOwned,
    {
        let start = Instant::now();
        let result = self.client()?.request::<R, _>(method, params).await;
        crate::metrics::observe_upstream_latency_ms("node", start.elapsed().as_millis(), result.is_ok());
        result.map_err(|e| rpc_error(method, e))
    }

    fn release(&mut self) {
        if self.client.take().is_some() {
            crate::metrics::inc_node_session_closed();
            tracing::debug!(endpoint = %self.url, "node session closed");
        }
    }
}

#[async_trait]
impl NodeSession for WsNodeSession {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn first_new_head(&self) -> GatewayResult<u64> {
        let mut subscription: Subscription<RpcHeader> = self
            .client()?
            .subscribe(
                "chain_subscribeNewHeads",
                rpc_params![],
                "chain_unsubscribeNewHeads",
            )
            .await
            .map_err(|e| rpc_error("chain_subscribeNewHeads", e))?;

        let first = subscription.next().await;
        if let Err(e) = subscription.unsubscribe().await {
            tracing::debug!(error = %e, "chain_unsubscribeNewHeads failed");
        }

        match first {
            Some(Ok(header)) => parse_block_number(&header.number),
            Some(Err(e)) => Err(GatewayError::Decode(format!("Invalid block header: {}", e))),
            None => Err(GatewayError::Connection(
                "Header subscription closed before the first notification".into(),
            )),
        }
    }

    async fn block_hash(&self, height: u64) -> GatewayResult<Option<BlockHash>> {
        let hash: Option<String> = self.call("chain_getBlockHash", rpc_params![height]).await?;
        match hash {
            Some(hex) => BlockHash::from_hex(&hex).map(Some).ok_or_else(|| {
                GatewayError::Decode(format!("chain_getBlockHash returned invalid hash {}", hex))
            }),
            None => Ok(None),
        }
    }

    async fn block_extrinsics(&self, hash: &BlockHash) -> GatewayResult<Option<Vec<Vec<u8>>>> {
        let block: Option<RpcSignedBlock> = self
            .call("chain_getBlock", rpc_params![hash.to_hex()])
            .await?;
        block
            .map(|b| {
                b.block
                    .extrinsics
                    .iter()
                    .map(|x| decode_hex("chain_getBlock", x))
                    .collect::<GatewayResult<Vec<_>>>()
            })
            .transpose()
    }

    async fn storage(&self, key: &[u8], at: Option<&BlockHash>) -> GatewayResult<Option<Vec<u8>>> {
        let key_hex = format!("0x{}", hex::encode(key));
        let value: Option<String> = self
            .call("state_getStorage", rpc_params![key_hex, at.map(|h| h.to_hex())])
            .await?;
        value.map(|v| decode_hex("state_getStorage", &v)).transpose()
    }

    async fn metadata(&self, at: Option<&BlockHash>) -> GatewayResult<ChainMetadata> {
        let raw: String = self
            .call("state_getMetadata", rpc_params![at.map(|h| h.to_hex())])
            .await?;
        let bytes = decode_hex("state_getMetadata", &raw)?;
        ChainMetadata::decode(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    fn close(&mut self) {
        self.release();
    }
}

impl Drop for WsNodeSession {
    fn drop(&mut self) {
        self.release();
    }
}
