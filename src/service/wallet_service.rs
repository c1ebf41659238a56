//! 钱包服务
//!
//! 生成新的 12 词助记词并派生 sr25519 账户的 SS58 地址。
//! 服务端不保存任何钱包数据，名称只用于日志。

use std::sync::Arc;

use crate::domain::address::{derive_account, XODE_SS58_PREFIX};
use crate::domain::mnemonic::{EntropySource, MnemonicGenerator, OsEntropy};
use crate::domain::records::WalletCreated;
use crate::domain::{GatewayError, GatewayResult, WalletFailure};

#[derive(Clone)]
pub struct WalletService {
    generator: MnemonicGenerator,
    ss58_prefix: u16,
}

impl WalletService {
    pub fn new(entropy: Arc<dyn EntropySource>, ss58_prefix: u16) -> Self {
        Self {
            generator: MnemonicGenerator::new(entropy),
            ss58_prefix,
        }
    }

    /// 创建钱包
    ///
    /// # 流程
    /// 1. 校验名称非空（先于取熵）
    /// 2. 取 128 位新熵生成助记词
    /// 3. 派生 sr25519 公钥并编码为 SS58 地址
    pub fn create_wallet(&self, name: &str) -> GatewayResult<WalletCreated> {
        let label = name.trim();
        if label.is_empty() {
            return Err(GatewayError::wallet(
                WalletFailure::InvalidName,
                "Wallet name must not be empty",
            ));
        }

        let phrase = self.generator.generate().map_err(|e| {
            tracing::error!(wallet = label, error = %e, "entropy source failed");
            GatewayError::wallet(WalletFailure::Entropy, format!("Mnemonic generation failed: {}", e))
        })?;

        let account = derive_account(&phrase, self.ss58_prefix).map_err(|e| {
            GatewayError::wallet(WalletFailure::Derivation, format!("Key derivation failed: {}", e))
        })?;

        tracing::info!(wallet = label, address = %account.address, "✅ wallet created");
        crate::metrics::inc_wallets_created();

        Ok(WalletCreated {
            address: account.address,
            mnemonic: phrase.to_string(),
        })
    }

    /// 由助记词重新派生地址
    pub fn derive_address(&self, phrase: &str) -> GatewayResult<String> {
        derive_account(phrase, self.ss58_prefix)
            .map(|account| account.address)
            .map_err(|e| GatewayError::wallet(WalletFailure::Derivation, e.to_string()))
    }
}

impl Default for WalletService {
    fn default() -> Self {
        Self::new(Arc::new(OsEntropy), XODE_SS58_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::address::ss58_decode;

    #[test]
    fn test_create_wallet_address_matches_mnemonic() {
        let service = WalletService::default();
        let wallet = service.create_wallet("savings").unwrap();
        assert_eq!(wallet.mnemonic.split_whitespace().count(), 12);
        assert_eq!(service.derive_address(&wallet.mnemonic).unwrap(), wallet.address);
        assert_eq!(ss58_decode(&wallet.address).unwrap().0, XODE_SS58_PREFIX);
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = WalletService::default().create_wallet("   ").unwrap_err();
        assert!(matches!(
            err,
            GatewayError::WalletCreation {
                kind: WalletFailure::InvalidName,
                ..
            }
        ));
    }
}
