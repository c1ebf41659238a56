//! SS58 地址编解码与 sr25519 账户派生
//!
//! 地址格式：`base58(prefix ++ public_key ++ checksum)`，
//! 校验和取 `blake2b-512("SS58PRE" ++ prefix ++ public_key)` 的前 2 字节。

use bip39::{Language, Mnemonic};
use blake2::{Blake2b512, Digest};
use pbkdf2::pbkdf2_hmac;
use schnorrkel::{ExpansionMode, MiniSecretKey};
use sha2::Sha512;
use thiserror::Error;
use zeroize::Zeroizing;

/// Xode 网络的 SS58 前缀
pub const XODE_SS58_PREFIX: u16 = 280;

/// 通用 Substrate 前缀
pub const GENERIC_SS58_PREFIX: u16 = 42;

const SS58_PRE: &[u8] = b"SS58PRE";
const CHECKSUM_LEN: usize = 2;
const PUBLIC_KEY_LEN: usize = 32;
const MAX_PREFIX: u16 = 0x3FFF;

// substrate-bip39：以熵（而非助记词文本）为 PBKDF2 口令
const SEED_ROUNDS: u32 = 2048;
const SEED_SALT: &[u8] = b"mnemonic";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Invalid base58 string: {0}")]
    Base58(String),
    #[error("Invalid address length: {0} bytes")]
    Length(usize),
    #[error("Invalid address prefix byte: {0:#04x}")]
    Prefix(u8),
    #[error("SS58 prefix {0} is out of range")]
    PrefixRange(u16),
    #[error("Invalid address checksum")]
    Checksum,
    #[error("Invalid mnemonic: {0}")]
    Mnemonic(String),
    #[error("Invalid sr25519 seed: {0}")]
    Derivation(String),
}

/// 派生结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAccount {
    pub public_key: [u8; PUBLIC_KEY_LEN],
    pub address: String,
}

/// 编码 SS58 前缀（1 或 2 字节）
fn prefix_bytes(prefix: u16) -> Vec<u8> {
    match prefix {
        0..=63 => vec![prefix as u8],
        _ => {
            let first = (((prefix & 0b0000_0000_1111_1100) as u8) >> 2) | 0b0100_0000;
            let second = ((prefix >> 8) as u8) | (((prefix & 0b0000_0000_0000_0011) as u8) << 6);
            vec![first, second]
        }
    }
}

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_PRE);
    hasher.update(payload);
    let digest = hasher.finalize();
    [digest[0], digest[1]]
}

/// 公钥 → SS58 地址
pub fn ss58_encode(public_key: &[u8; PUBLIC_KEY_LEN], prefix: u16) -> Result<String, AddressError> {
    if prefix > MAX_PREFIX {
        return Err(AddressError::PrefixRange(prefix));
    }
    let mut payload = prefix_bytes(prefix);
    payload.extend_from_slice(public_key);
    let sum = checksum(&payload);
    payload.extend_from_slice(&sum);
    Ok(bs58::encode(payload).into_string())
}

/// SS58 地址 → (前缀, 公钥)
///
/// 任意合法前缀都接受，只要校验和正确。
pub fn ss58_decode(address: &str) -> Result<(u16, [u8; PUBLIC_KEY_LEN]), AddressError> {
    let data = bs58::decode(address)
        .into_vec()
        .map_err(|e| AddressError::Base58(e.to_string()))?;
    if data.len() < 2 {
        return Err(AddressError::Length(data.len()));
    }

    let (prefix, prefix_len) = match data[0] {
        0..=63 => (data[0] as u16, 1),
        64..=127 => {
            let lower = (data[0] << 2) | (data[1] >> 6);
            let upper = data[1] & 0b0011_1111;
            ((lower as u16) | ((upper as u16) << 8), 2)
        }
        other => return Err(AddressError::Prefix(other)),
    };

    if data.len() != prefix_len + PUBLIC_KEY_LEN + CHECKSUM_LEN {
        return Err(AddressError::Length(data.len()));
    }

    let body_len = prefix_len + PUBLIC_KEY_LEN;
    if checksum(&data[..body_len]) != data[body_len..] {
        return Err(AddressError::Checksum);
    }

    let mut public_key = [0u8; PUBLIC_KEY_LEN];
    public_key.copy_from_slice(&data[prefix_len..body_len]);
    Ok((prefix, public_key))
}

/// 熵 → sr25519 公钥
pub fn sr25519_public_from_entropy(entropy: &[u8]) -> Result<[u8; PUBLIC_KEY_LEN], AddressError> {
    let mut seed = Zeroizing::new([0u8; 64]);
    pbkdf2_hmac::<Sha512>(entropy, SEED_SALT, SEED_ROUNDS, &mut seed[..]);

    let mini = MiniSecretKey::from_bytes(&seed[..32])
        .map_err(|e| AddressError::Derivation(e.to_string()))?;
    let keypair = mini.expand_to_keypair(ExpansionMode::Ed25519);
    Ok(keypair.public.to_bytes())
}

/// 助记词 → 账户（无派生路径、无口令）
pub fn derive_account(phrase: &str, prefix: u16) -> Result<DerivedAccount, AddressError> {
    let mnemonic = Mnemonic::parse_in(Language::English, phrase)
        .map_err(|e| AddressError::Mnemonic(e.to_string()))?;
    let entropy = Zeroizing::new(mnemonic.to_entropy());

    let public_key = sr25519_public_from_entropy(&entropy)?;
    let address = ss58_encode(&public_key, prefix)?;
    Ok(DerivedAccount {
        public_key,
        address,
    })
}

/// 地址格式校验
pub fn is_valid_address(address: &str) -> bool {
    ss58_decode(address).is_ok()
}
