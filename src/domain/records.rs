//! 对外返回的 JSON 记录

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;
use utoipa::ToSchema;

/// 最新区块高度（十进制字符串）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LatestBlock {
    #[schema(example = "123456")]
    pub block: String,
}

/// 事件载荷中的一个字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EventData {
    /// 声明类型名，例如 `AccountId`、`Balance`
    #[serde(rename = "type")]
    #[schema(example = "AccountId")]
    pub type_name: String,
    #[schema(example = "5Grw...")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EventRecord {
    #[schema(example = "balances")]
    pub section: String,
    #[schema(example = "Transfer")]
    pub method: String,
    #[schema(example = "ApplyExtrinsic")]
    pub phase: String,
    pub data: Vec<EventData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CallRecord {
    #[schema(value_type = Object)]
    pub args: serde_json::Map<String, Value>,
    #[schema(example = "transferKeepAlive")]
    pub method: String,
    #[schema(example = "balances")]
    pub section: String,
}

/// 区块体中的一笔外部交易
///
/// 未签名交易的 signer / signature / nonce / tip / era 均为 null。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtrinsicRecord {
    pub is_signed: bool,
    pub method: CallRecord,
    #[schema(value_type = Option<Object>)]
    pub asset_id: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub era: Option<Value>,
    pub metadata_hash: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub mode: Option<Value>,
    pub nonce: Option<String>,
    pub signature: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub signer: Option<Value>,
    pub tip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccountData {
    pub free: String,
    pub reserved: String,
    pub frozen: String,
    pub flags: String,
}

/// `System.Account` 存储项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccountState {
    pub nonce: String,
    pub consumers: String,
    pub providers: String,
    pub sufficients: String,
    pub data: AccountData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccountBalance {
    pub balance: AccountState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccountRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AssetRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// 索引器中的原生币转账
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub extrinsic_hash: String,
    #[serde(deserialize_with = "integer_or_string")]
    pub block_number: u64,
    #[serde(deserialize_with = "string_or_number")]
    pub timestamp: String,
    #[serde(deserialize_with = "string_or_number")]
    pub amount: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub fee: Option<String>,
    pub from: AccountRef,
    pub to: AccountRef,
}

/// 索引器中的资产转账
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetTransferRecord {
    pub extrinsic_hash: String,
    #[serde(deserialize_with = "integer_or_string")]
    pub block_number: u64,
    #[serde(deserialize_with = "string_or_number")]
    pub timestamp: String,
    #[serde(deserialize_with = "string_or_number")]
    pub amount: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub fee: Option<String>,
    pub from: AccountRef,
    pub to: AccountRef,
    pub asset: AssetRef,
}

/// 按交易哈希查询索引器的结果，两个列表都可能为空
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferLookup {
    #[serde(default)]
    pub transfers: Vec<TransferRecord>,
    #[serde(default)]
    pub asset_transfers: Vec<AssetTransferRecord>,
}

impl TransferLookup {
    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty() && self.asset_transfers.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateWalletRequest {
    #[schema(example = "savings")]
    pub name: String,
}

/// 新建钱包：地址与助记词，只返回一次，服务端不保存
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletCreated {
    #[schema(example = "X2m...")]
    pub address: String,
    pub mnemonic: String,
}

// 索引器对大数与时间戳可能返回字符串，也可能返回数字。
// 数字按原始文本保留，不经过 f64，超过 2^53 的值也不丢位。
fn numeric_text(raw: &RawValue) -> Result<Option<String>, String> {
    let text = raw.get().trim();
    match text.as_bytes().first() {
        Some(b'"') => serde_json::from_str::<String>(text)
            .map(Some)
            .map_err(|e| e.to_string()),
        Some(b'-' | b'0'..=b'9') => Ok(Some(text.to_string())),
        _ if text == "null" => Ok(None),
        _ => Err(format!("expected string or number, got {}", text)),
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Box::<RawValue>::deserialize(deserializer)?;
    match numeric_text(&raw).map_err(serde::de::Error::custom)? {
        Some(text) => Ok(text),
        None => Err(serde::de::Error::custom("expected string or number, got null")),
    }
}

// 区块高度保持整数
fn integer_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid block number {}", n))),
        Value::String(s) => s
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid block number {:?}", s))),
        other => Err(serde::de::Error::custom(format!(
            "expected integer block number, got {}",
            other
        ))),
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Box::<RawValue>::deserialize(deserializer)?;
    numeric_text(&raw).map_err(serde::de::Error::custom)
}
