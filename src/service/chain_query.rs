//! 链查询适配器
//!
//! 在一条已打开的节点会话上完成单次查询：解析区块高度、
//! 读取事件/区块体/账户存储并按运行时元数据解码，再交给格式化器。

use blake2::digest::consts::U16;
use blake2::{Blake2b, Digest};
use parity_scale_codec::{Compact, Decode};

use crate::domain::address::ss58_decode;
use crate::domain::chain_value::{BlockHash, ChainValue, RawEvent, RawExtrinsic, RawSignature};
use crate::domain::records::{AccountBalance, EventRecord, ExtrinsicRecord};
use crate::domain::{GatewayError, GatewayResult};
use crate::infrastructure::metadata::ChainMetadata;
use crate::infrastructure::node_session::NodeSession;
use crate::infrastructure::scale_decoder::{DecodeError, ScaleDecoder};
use crate::service::formatter::ResultFormatter;

/// twox128("System") ++ twox128("Events")
const SYSTEM_EVENTS_KEY: [u8; 32] = [
    0x26, 0xaa, 0x39, 0x4e, 0xea, 0x56, 0x30, 0xe0, 0x7c, 0x48, 0xae, 0x0c, 0x95, 0x58, 0xce, 0xf7,
    0x80, 0xd4, 0x1e, 0x5e, 0x16, 0x05, 0x67, 0x65, 0xbc, 0x84, 0x61, 0x85, 0x10, 0x72, 0xc9, 0xd7,
];

/// twox128("System") ++ twox128("Account")
const SYSTEM_ACCOUNT_PREFIX: [u8; 32] = [
    0x26, 0xaa, 0x39, 0x4e, 0xea, 0x56, 0x30, 0xe0, 0x7c, 0x48, 0xae, 0x0c, 0x95, 0x58, 0xce, 0xf7,
    0xb9, 0x9d, 0x88, 0x0e, 0xc6, 0x81, 0x79, 0x9c, 0x0c, 0xf3, 0x0e, 0x88, 0x86, 0x37, 0x1d, 0xa9,
];

const EXTRINSIC_FORMAT_VERSION: u8 = 4;
const SIGNED_BIT: u8 = 0b1000_0000;

pub fn system_events_key() -> Vec<u8> {
    SYSTEM_EVENTS_KEY.to_vec()
}

/// `System.Account` 的存储键：前缀 ++ blake2_128(账户) ++ 账户
pub fn system_account_key(account: &[u8; 32]) -> Vec<u8> {
    let hash = Blake2b::<U16>::digest(account);
    let mut key = Vec::with_capacity(SYSTEM_ACCOUNT_PREFIX.len() + hash.len() + account.len());
    key.extend_from_slice(&SYSTEM_ACCOUNT_PREFIX);
    key.extend_from_slice(&hash);
    key.extend_from_slice(account);
    key
}

fn decode_err(err: DecodeError) -> GatewayError {
    GatewayError::Decode(err.to_string())
}

pub struct ChainQuery<'s> {
    session: &'s dyn NodeSession,
    formatter: ResultFormatter,
}

impl<'s> ChainQuery<'s> {
    pub fn new(session: &'s dyn NodeSession, ss58_prefix: u16) -> Self {
        Self {
            session,
            formatter: ResultFormatter::new(ss58_prefix),
        }
    }

    /// 最新区块高度（订阅到的第一条新区块头）
    pub async fn latest_block_number(&self) -> GatewayResult<u64> {
        self.session.first_new_head().await
    }

    /// 高度 → 哈希，高度不存在时返回 NotFound
    pub async fn block_hash(&self, height: u64) -> GatewayResult<BlockHash> {
        self.session
            .block_hash(height)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("Block {} not found", height)))
    }

    /// 指定区块的全部事件，按发出顺序
    pub async fn events_at(&self, hash: &BlockHash) -> GatewayResult<Vec<EventRecord>> {
        let metadata = self.session.metadata(Some(hash)).await?;
        let raw = self
            .session
            .storage(&SYSTEM_EVENTS_KEY, Some(hash))
            .await?
            .unwrap_or_else(|| metadata.events.default.clone());

        let events = decode_events(&metadata, &raw)?;
        Ok(events.iter().map(|e| self.formatter.event(e)).collect())
    }

    /// 指定区块体中的外部交易，按区块内顺序
    pub async fn block_body(&self, hash: &BlockHash) -> GatewayResult<Vec<ExtrinsicRecord>> {
        let extrinsics = self
            .session
            .block_extrinsics(hash)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("Block {} not found", hash)))?;
        let metadata = self.session.metadata(Some(hash)).await?;

        extrinsics
            .iter()
            .enumerate()
            .map(|(i, bytes)| {
                decode_extrinsic(&metadata, bytes)
                    .map(|x| self.formatter.extrinsic(&x))
                    .map_err(|e| {
                        GatewayError::Decode(format!("Block {} extrinsic {}: {}", hash, i, e))
                    })
            })
            .collect()
    }

    /// 最新状态下的账户信息；从未入金的账户返回全零
    pub async fn account_state(&self, address: &str) -> GatewayResult<AccountBalance> {
        let (_, account) = ss58_decode(address)
            .map_err(|e| GatewayError::InvalidAddress(format!("Invalid address {}: {}", address, e)))?;

        let metadata = self.session.metadata(None).await?;
        let raw = self
            .session
            .storage(&system_account_key(&account), None)
            .await?
            .unwrap_or_else(|| metadata.account.default.clone());

        let value = ScaleDecoder::new(&metadata.types)
            .decode_all(metadata.account.ty, &raw)
            .map_err(decode_err)?;
        Ok(self.formatter.account(&value))
    }
}

/// `Vec<EventRecord>` → 事件列表
pub fn decode_events(metadata: &ChainMetadata, raw: &[u8]) -> GatewayResult<Vec<RawEvent>> {
    let decoded = ScaleDecoder::new(&metadata.types)
        .decode_all(metadata.events.ty, raw)
        .map_err(decode_err)?;
    let records = match decoded {
        ChainValue::Sequence(records) => records,
        other => {
            return Err(GatewayError::Decode(format!(
                "System.Events is not a sequence: {}",
                other.describe()
            )))
        }
    };

    records.into_iter().map(split_event_record).collect()
}

fn split_event_record(record: ChainValue) -> GatewayResult<RawEvent> {
    let phase = match record.field("phase") {
        Some(ChainValue::Variant { name, .. }) => name.clone(),
        _ => return Err(GatewayError::Decode("Event record has no phase".into())),
    };

    // RuntimeEvent::Pallet(pallet::Event::Variant { .. })
    let (pallet, inner) = match record.field("event") {
        Some(ChainValue::Variant { name, fields, .. }) if fields.len() == 1 => {
            (name.clone(), &fields[0].value)
        }
        _ => return Err(GatewayError::Decode("Event record has no event".into())),
    };
    match inner {
        ChainValue::Variant { name, fields, .. } => Ok(RawEvent {
            pallet,
            variant: name.clone(),
            phase,
            fields: fields.clone(),
        }),
        other => Err(GatewayError::Decode(format!(
            "Event of {} is not an enum: {}",
            pallet,
            other.describe()
        ))),
    }
}

/// 单笔外部交易（v4 格式）
pub fn decode_extrinsic(metadata: &ChainMetadata, bytes: &[u8]) -> GatewayResult<RawExtrinsic> {
    let decoder = ScaleDecoder::new(&metadata.types);
    let layout = &metadata.extrinsic;
    let mut input = bytes;

    let declared = Compact::<u32>::decode(&mut input)
        .map_err(|e| GatewayError::Decode(format!("Invalid extrinsic length prefix: {}", e)))?
        .0 as usize;
    if declared != input.len() {
        return Err(GatewayError::Decode(format!(
            "Extrinsic length prefix {} does not match body length {}",
            declared,
            input.len()
        )));
    }

    if layout.version != EXTRINSIC_FORMAT_VERSION {
        return Err(GatewayError::Decode(format!(
            "Unsupported runtime extrinsic version {}",
            layout.version
        )));
    }
    let version = u8::decode(&mut input)
        .map_err(|e| GatewayError::Decode(format!("Missing extrinsic version: {}", e)))?;
    if version & !SIGNED_BIT != layout.version {
        return Err(GatewayError::Decode(format!(
            "Extrinsic format version {} does not match runtime version {}",
            version & !SIGNED_BIT,
            layout.version
        )));
    }

    let signature = if version & SIGNED_BIT != 0 {
        let address = decoder.decode(layout.address_ty, &mut input).map_err(decode_err)?;
        let signature = decoder
            .decode(layout.signature_ty, &mut input)
            .map_err(decode_err)?;
        let extensions = layout
            .extensions
            .iter()
            .map(|ext| {
                decoder
                    .decode(ext.ty, &mut input)
                    .map(|value| (ext.identifier.clone(), value))
                    .map_err(decode_err)
            })
            .collect::<GatewayResult<Vec<_>>>()?;
        Some(RawSignature {
            address,
            signature,
            extensions,
        })
    } else {
        None
    };

    // RuntimeCall::Pallet(pallet::Call::call { .. })
    let call = decoder.decode(layout.call_ty, &mut input).map_err(decode_err)?;
    if !input.is_empty() {
        return Err(decode_err(DecodeError::TrailingBytes(input.len())));
    }
    let (pallet, inner) = match call {
        ChainValue::Variant {
            name, mut fields, ..
        } if fields.len() == 1 => (name, fields.remove(0).value),
        other => {
            return Err(GatewayError::Decode(format!(
                "Call is not a pallet call: {}",
                other.describe()
            )))
        }
    };
    match inner {
        ChainValue::Variant { name, fields, .. } => Ok(RawExtrinsic {
            signature,
            pallet,
            call: name,
            args: fields,
        }),
        other => Err(GatewayError::Decode(format!(
            "Call of {} is not an enum: {}",
            pallet,
            other.describe()
        ))),
    }
}
