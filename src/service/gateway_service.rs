//! 网关服务
//!
//! 每个链上操作都独占一条新会话：打开、查询、关闭。
//! 无论查询成功或失败，会话都会在返回前关闭。

use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;

use crate::domain::address::ss58_decode;
use crate::domain::records::{AccountBalance, EventRecord, ExtrinsicRecord, LatestBlock, TransferLookup};
use crate::domain::{GatewayError, GatewayResult};
use crate::infrastructure::indexer::IndexerClient;
use crate::infrastructure::node_session::NodeConnector;
use crate::service::chain_query::ChainQuery;

const STAGE_LATEST_BLOCK: &str = "Failed to fetch latest block";
const STAGE_BLOCK_EVENTS: &str = "Failed to fetch block events";
const STAGE_TRANSACTIONS: &str = "Failed to fetch transaction details";
const STAGE_BALANCE: &str = "Failed to fetch address balance";
const STAGE_HASH_LOOKUP: &str = "Failed to resolve transaction hash";

pub struct GatewayService {
    connector: Arc<dyn NodeConnector>,
    indexer: IndexerClient,
    ss58_prefix: u16,
}

impl GatewayService {
    pub fn new(connector: Arc<dyn NodeConnector>, indexer: IndexerClient, ss58_prefix: u16) -> Self {
        Self {
            connector,
            indexer,
            ss58_prefix,
        }
    }

    /// 打开会话执行一次查询，随后关闭会话
    async fn with_session<T, F>(&self, stage: &'static str, op: F) -> GatewayResult<T>
    where
        T: Send,
        F: for<'a> FnOnce(ChainQuery<'a>) -> BoxFuture<'a, GatewayResult<T>> + Send,
    {
        let mut session = self.connector.open().await.map_err(|e| e.stage(stage))?;

        let start = Instant::now();
        let result = op(ChainQuery::new(session.as_ref(), self.ss58_prefix)).await;
        session.close();

        match &result {
            Ok(_) => tracing::debug!(
                endpoint = session.endpoint(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "{} succeeded",
                stage.trim_start_matches("Failed to ")
            ),
            Err(e) => tracing::warn!(
                endpoint = session.endpoint(),
                kind = e.kind(),
                error = %e,
                "{}",
                stage
            ),
        }
        result.map_err(|e| e.stage(stage))
    }

    /// 最新区块高度
    pub async fn get_latest_block(&self) -> GatewayResult<LatestBlock> {
        let height = self
            .with_session(STAGE_LATEST_BLOCK, |query| {
                Box::pin(async move { query.latest_block_number().await })
            })
            .await?;
        Ok(LatestBlock {
            block: height.to_string(),
        })
    }

    /// 指定高度区块的事件
    pub async fn get_block_events(&self, height: u64) -> GatewayResult<Vec<EventRecord>> {
        self.with_session(STAGE_BLOCK_EVENTS, move |query| {
            Box::pin(async move {
                let hash = query.block_hash(height).await?;
                query.events_at(&hash).await
            })
        })
        .await
    }

    /// 指定高度区块的外部交易
    pub async fn get_transaction_details(&self, height: u64) -> GatewayResult<Vec<ExtrinsicRecord>> {
        self.with_session(STAGE_TRANSACTIONS, move |query| {
            Box::pin(async move {
                let hash = query.block_hash(height).await?;
                query.block_body(&hash).await
            })
        })
        .await
    }

    /// 地址的账户余额（最新状态）
    pub async fn get_address_balance(&self, address: &str) -> GatewayResult<AccountBalance> {
        // 地址格式错误不必连接节点
        ss58_decode(address).map_err(|e| {
            GatewayError::InvalidAddress(format!("Invalid address {}: {}", address, e)).stage(STAGE_BALANCE)
        })?;

        let address = address.to_string();
        self.with_session(STAGE_BALANCE, move |query| {
            Box::pin(async move { query.account_state(&address).await })
        })
        .await
    }

    /// 按交易哈希查询索引器，不使用节点会话
    pub async fn get_transaction_hash_details(&self, hash: &str) -> GatewayResult<TransferLookup> {
        validate_tx_hash(hash).map_err(|e| e.stage(STAGE_HASH_LOOKUP))?;
        self.indexer
            .transfers_by_hash(hash)
            .await
            .map_err(|e| e.stage(STAGE_HASH_LOOKUP))
    }
}

/// 交易哈希：0x 前缀 + 64 位十六进制
pub fn validate_tx_hash(hash: &str) -> GatewayResult<()> {
    let valid = hash
        .strip_prefix("0x")
        .map(|hex| hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(GatewayError::InvalidHash(format!(
            "Invalid transaction hash {}: expected 0x followed by 64 hex characters",
            hash
        )))
    }
}
