use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    domain::mnemonic::OsEntropy,
    infrastructure::{
        indexer::IndexerClient,
        node_session::{NodeConnector, WsNodeConnector},
    },
    service::{gateway_service::GatewayService, wallet_service::WalletService},
};

/// 应用状态
/// 只持有无状态的服务与配置；节点连接按操作建立
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<GatewayService>,
    pub wallets: Arc<WalletService>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// 按配置装配生产组件
    pub fn new(config: Arc<Config>) -> Self {
        let connector: Arc<dyn NodeConnector> = Arc::new(WsNodeConnector::new(
            config.node.url.clone(),
            config.node.request_timeout_secs.map(Duration::from_secs),
        ));
        let indexer = IndexerClient::new(config.indexer.url.clone());
        let gateway = GatewayService::new(connector, indexer, config.node.ss58_prefix);
        let wallets = WalletService::new(Arc::new(OsEntropy), config.node.ss58_prefix);

        tracing::info!(
            node = %config.node.url,
            indexer = %config.indexer.url,
            ss58_prefix = config.node.ss58_prefix,
            "✅ gateway services initialized"
        );
        Self::with_services(config, gateway, wallets)
    }

    /// 使用外部提供的服务（测试中注入固定节点与熵源）
    pub fn with_services(config: Arc<Config>, gateway: GatewayService, wallets: WalletService) -> Self {
        Self {
            config,
            gateway: Arc::new(gateway),
            wallets: Arc::new(wallets),
            started_at: chrono::Utc::now(),
        }
    }
}
