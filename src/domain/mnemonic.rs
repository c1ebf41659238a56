//! 助记词生成
//!
//! 每次生成都从熵源取 128 位新熵，得到 12 个英文单词。

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bip39::{Language, Mnemonic};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

/// 12 个单词对应 128 位熵
pub const ENTROPY_BYTES: usize = 16;
pub const MNEMONIC_WORDS: usize = 12;

/// 熵源
pub trait EntropySource: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<()>;
}

/// 操作系统 CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| anyhow!("OS entropy unavailable: {}", e))
    }
}

#[derive(Clone)]
pub struct MnemonicGenerator {
    source: Arc<dyn EntropySource>,
}

impl MnemonicGenerator {
    pub fn new(source: Arc<dyn EntropySource>) -> Self {
        Self { source }
    }

    /// 生成一条新的 12 词助记词
    pub fn generate(&self) -> Result<Zeroizing<String>> {
        let mut entropy = Zeroizing::new([0u8; ENTROPY_BYTES]);
        self.source.fill(&mut entropy[..])?;

        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy[..])
            .context("Failed to encode entropy as mnemonic")?;
        Ok(Zeroizing::new(mnemonic.to_string()))
    }
}

impl Default for MnemonicGenerator {
    fn default() -> Self {
        Self::new(Arc::new(OsEntropy))
    }
}
