//! 结果格式化
//!
//! 把解码后的链上值转换为对外 JSON：数字输出为十进制字符串，
//! 账户公钥输出为 SS58 地址，字节输出为 0x 十六进制，
//! pallet / 调用名 / 参数名转为小驼峰。

use serde_json::{Map, Value};

use crate::domain::address::ss58_encode;
use crate::domain::chain_value::{ChainField, ChainValue, RawEvent, RawExtrinsic};
use crate::domain::records::{
    AccountBalance, AccountData, AccountState, CallRecord, EventData, EventRecord, ExtrinsicRecord,
};

#[derive(Debug, Clone, Copy)]
pub struct ResultFormatter {
    ss58_prefix: u16,
}

impl ResultFormatter {
    pub fn new(ss58_prefix: u16) -> Self {
        Self { ss58_prefix }
    }

    pub fn event(&self, event: &RawEvent) -> EventRecord {
        EventRecord {
            section: lower_camel(&event.pallet),
            method: event.variant.clone(),
            phase: event.phase.clone(),
            data: event.fields.iter().map(|f| self.event_data(f)).collect(),
        }
    }

    fn event_data(&self, field: &ChainField) -> EventData {
        let type_name = field
            .type_name
            .as_deref()
            .map(short_type_name)
            .unwrap_or_else(|| field.value.describe());
        let value = match self.human(&field.value) {
            Value::String(s) => s,
            other => other.to_string(),
        };
        EventData { type_name, value }
    }

    pub fn extrinsic(&self, extrinsic: &RawExtrinsic) -> ExtrinsicRecord {
        let args = extrinsic
            .args
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let key = f
                    .name
                    .as_deref()
                    .map(lower_camel)
                    .unwrap_or_else(|| i.to_string());
                (key, self.human(&f.value))
            })
            .collect::<Map<_, _>>();

        let mut record = ExtrinsicRecord {
            is_signed: extrinsic.is_signed(),
            method: CallRecord {
                args,
                method: lower_camel(&extrinsic.call),
                section: lower_camel(&extrinsic.pallet),
            },
            asset_id: None,
            era: None,
            metadata_hash: None,
            mode: None,
            nonce: None,
            signature: None,
            signer: None,
            tip: None,
        };

        let Some(signed) = &extrinsic.signature else {
            return record;
        };
        record.signer = Some(self.human(&signed.address));
        record.signature = Some(self.signature(&signed.signature));

        for (identifier, value) in &signed.extensions {
            match identifier.as_str() {
                "CheckMortality" | "CheckEra" => record.era = Some(self.human(value)),
                "CheckNonce" => record.nonce = Some(self.number(value)),
                "ChargeTransactionPayment" => record.tip = Some(self.number(value)),
                "ChargeAssetTxPayment" => {
                    record.tip = value.field("tip").map(|tip| self.number(tip));
                    record.asset_id = value.field("asset_id").map(|id| self.human(id));
                }
                "CheckMetadataHash" => {
                    record.mode = value
                        .field("mode")
                        .or_else(|| value.fields().first().map(|f| &f.value))
                        .map(|mode| self.human(mode));
                }
                _ => {}
            }
        }
        record
    }

    /// `AccountInfo` → 余额记录；旧运行时的 `misc_frozen` 作为 `frozen`
    pub fn account(&self, info: &ChainValue) -> AccountBalance {
        let number_of = |parent: Option<&ChainValue>, names: &[&str]| {
            parent
                .and_then(|p| names.iter().find_map(|name| p.field(name)))
                .map(|v| self.number(v))
                .unwrap_or_else(|| "0".to_string())
        };
        let data = info.field("data");

        AccountBalance {
            balance: AccountState {
                nonce: number_of(Some(info), &["nonce"]),
                consumers: number_of(Some(info), &["consumers"]),
                providers: number_of(Some(info), &["providers"]),
                sufficients: number_of(Some(info), &["sufficients"]),
                data: AccountData {
                    free: number_of(data, &["free"]),
                    reserved: number_of(data, &["reserved"]),
                    frozen: number_of(data, &["frozen", "misc_frozen"]),
                    flags: number_of(data, &["flags"]),
                },
            },
        }
    }

    /// 数值字段的十进制字符串
    pub fn number(&self, value: &ChainValue) -> String {
        match value.unwrap_newtype() {
            ChainValue::U(n) => n.to_string(),
            ChainValue::I(n) => n.to_string(),
            ChainValue::BigUint(s) | ChainValue::BigInt(s) => s.clone(),
            other => match self.human(other) {
                Value::String(s) => s,
                json => json.to_string(),
            },
        }
    }

    fn signature(&self, value: &ChainValue) -> String {
        match value {
            // MultiSignature::Sr25519([u8; 64]) 等
            ChainValue::Variant { fields, .. } if fields.len() == 1 => self.signature(&fields[0].value),
            ChainValue::Bytes(bytes) => hex_0x(bytes),
            other => match self.human(other.unwrap_newtype()) {
                Value::String(s) => s,
                json => json.to_string(),
            },
        }
    }

    /// 链上值 → 可读 JSON
    pub fn human(&self, value: &ChainValue) -> Value {
        match value {
            ChainValue::Bool(b) => Value::Bool(*b),
            ChainValue::Char(c) => Value::String(c.to_string()),
            ChainValue::Str(s) => Value::String(s.clone()),
            ChainValue::U(n) => Value::String(n.to_string()),
            ChainValue::I(n) => Value::String(n.to_string()),
            ChainValue::BigUint(s) | ChainValue::BigInt(s) => Value::String(s.clone()),
            ChainValue::Bytes(bytes) => Value::String(hex_0x(bytes)),
            ChainValue::Bits(bits) => Value::String(
                std::iter::once("0b".to_string())
                    .chain(bits.iter().map(|b| if *b { "1" } else { "0" }.to_string()))
                    .collect(),
            ),
            ChainValue::Sequence(items) => Value::Array(items.iter().map(|v| self.human(v)).collect()),
            ChainValue::Composite { type_name, fields } => {
                if let Some(address) = self.account_id(type_name.as_deref(), fields) {
                    return Value::String(address);
                }
                self.fields_to_human(fields)
            }
            ChainValue::Variant {
                type_name,
                name,
                index,
                fields,
            } => match type_name.as_deref() {
                Some("Era") => era_to_human(*index, fields),
                Some("Option") => match fields.first() {
                    Some(inner) if name == "Some" => self.human(&inner.value),
                    _ => Value::Null,
                },
                _ if fields.is_empty() => Value::String(name.clone()),
                _ => {
                    let mut object = Map::new();
                    object.insert(name.clone(), self.fields_to_human(fields));
                    Value::Object(object)
                }
            },
        }
    }

    fn fields_to_human(&self, fields: &[ChainField]) -> Value {
        match fields {
            [] => Value::Null,
            [single] if single.name.is_none() => self.human(&single.value),
            _ if fields.iter().all(|f| f.name.is_some()) => Value::Object(
                fields
                    .iter()
                    .map(|f| {
                        let key = f.name.as_deref().map(lower_camel).unwrap_or_default();
                        (key, self.human(&f.value))
                    })
                    .collect(),
            ),
            _ => Value::Array(fields.iter().map(|f| self.human(&f.value)).collect()),
        }
    }

    fn account_id(&self, type_name: Option<&str>, fields: &[ChainField]) -> Option<String> {
        if type_name != Some("AccountId32") {
            return None;
        }
        match fields {
            [field] => match &field.value {
                ChainValue::Bytes(bytes) => {
                    let key: [u8; 32] = bytes.as_slice().try_into().ok()?;
                    ss58_encode(&key, self.ss58_prefix).ok()
                }
                _ => None,
            },
            _ => None,
        }
    }
}

fn hex_0x(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Era 的可读形式
///
/// 变体序号即编码首字节：0 为 Immortal，
/// 其余为 `MortalN(b)`，两字节小端组合后低 4 位决定周期，高 12 位决定相位。
fn era_to_human(index: u8, fields: &[ChainField]) -> Value {
    if index == 0 {
        return serde_json::json!({ "ImmortalEra": "0x00" });
    }
    let second = match fields.first().map(|f| &f.value) {
        Some(ChainValue::U(b)) => *b as u16,
        _ => 0,
    };
    let encoded = index as u16 | (second << 8);
    let period = 2u64 << (encoded % (1 << 4));
    let quantize_factor = (period >> 12).max(1);
    let phase = (encoded >> 4) as u64 * quantize_factor;

    serde_json::json!({
        "MortalEra": {
            "period": period.to_string(),
            "phase": phase.to_string(),
        }
    })
}

/// 小驼峰：`transfer_keep_alive` → `transferKeepAlive`，
/// `Balances` → `balances`，`XCMPQueue` → `xcmpQueue`
pub fn lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, segment) in name.split('_').filter(|s| !s.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(&lower_leading(segment));
        } else {
            let mut chars = segment.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

// 首段连续大写转小写；后面紧跟小写字母时保留最后一个大写作为下一个词的开头
fn lower_leading(segment: &str) -> String {
    let chars: Vec<char> = segment.chars().collect();
    let upper_run = chars.iter().take_while(|c| c.is_uppercase()).count();
    let lowered = match upper_run {
        0 => 0,
        n if n == chars.len() => n,
        1 => 1,
        n => n - 1,
    };
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| if i < lowered { c.to_ascii_lowercase() } else { *c })
        .collect()
}

/// `T::AccountId` → `AccountId`；泛型参数保留
pub fn short_type_name(type_name: &str) -> String {
    let compact: String = type_name.chars().filter(|c| !c.is_whitespace()).collect();
    let (head, generics) = match compact.find('<') {
        Some(pos) => compact.split_at(pos),
        None => (compact.as_str(), ""),
    };
    let last = head.rsplit("::").next().unwrap_or(head);
    format!("{}{}", last, generics)
}
