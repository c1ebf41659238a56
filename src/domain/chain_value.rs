//! 链上原生值
//!
//! SCALE 解码器的输出：按运行时类型注册表还原出的带类型名的值树，
//! 以及从中拆出的事件与外部交易结构。格式化器只消费这里的类型。

use std::fmt;

/// 动态解码得到的值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainValue {
    Bool(bool),
    Char(char),
    Str(String),
    /// 所有不超过 128 位的无符号整数（含 Compact）
    U(u128),
    I(i128),
    /// 256 位整数的十进制表示
    BigUint(String),
    BigInt(String),
    /// `Vec<u8>` 与 `[u8; N]`
    Bytes(Vec<u8>),
    Bits(Vec<bool>),
    Sequence(Vec<ChainValue>),
    Composite {
        type_name: Option<String>,
        fields: Vec<ChainField>,
    },
    Variant {
        type_name: Option<String>,
        name: String,
        index: u8,
        fields: Vec<ChainField>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainField {
    pub name: Option<String>,
    /// 元数据中声明的字段类型名，例如 `T::AccountId`
    pub type_name: Option<String>,
    pub value: ChainValue,
}

impl ChainValue {
    /// 按字段名查找组合值或枚举值的字段
    pub fn field(&self, name: &str) -> Option<&ChainValue> {
        self.fields()
            .iter()
            .find(|f| f.name.as_deref() == Some(name))
            .map(|f| &f.value)
    }

    pub fn fields(&self) -> &[ChainField] {
        match self {
            Self::Composite { fields, .. } | Self::Variant { fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Composite { type_name, .. } | Self::Variant { type_name, .. } => {
                type_name.as_deref()
            }
            _ => None,
        }
    }

    /// 剥掉单字段元组结构体的外壳，例如 `ExtraFlags(u128)`
    pub fn unwrap_newtype(&self) -> &ChainValue {
        match self {
            Self::Composite { fields, .. } if fields.len() == 1 && fields[0].name.is_none() => {
                fields[0].value.unwrap_newtype()
            }
            other => other,
        }
    }

    /// 值的简短类型描述，用于缺少声明类型名的字段
    pub fn describe(&self) -> String {
        match self {
            Self::Bool(_) => "bool".into(),
            Self::Char(_) => "char".into(),
            Self::Str(_) => "Text".into(),
            Self::U(_) | Self::BigUint(_) => "u128".into(),
            Self::I(_) | Self::BigInt(_) => "i128".into(),
            Self::Bytes(_) => "Bytes".into(),
            Self::Bits(_) => "BitVec".into(),
            Self::Sequence(_) => "Vec".into(),
            Self::Composite { type_name, .. } | Self::Variant { type_name, .. } => {
                type_name.clone().unwrap_or_else(|| "Struct".into())
            }
        }
    }
}

/// 32 字节区块哈希
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    pub fn from_hex(s: &str) -> Option<Self> {
        let raw = hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok()?;
        let bytes: [u8; 32] = raw.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// `System.Events` 中的一条事件记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// 发出事件的 pallet 名，例如 `Balances`
    pub pallet: String,
    /// 事件变体名，例如 `Transfer`
    pub variant: String,
    /// 阶段变体名：`ApplyExtrinsic` / `Finalization` / `Initialization`
    pub phase: String,
    pub fields: Vec<ChainField>,
}

/// 签名外部交易的签名部分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSignature {
    pub address: ChainValue,
    pub signature: ChainValue,
    /// 按元数据声明顺序排列的 (扩展标识, 解码值)
    pub extensions: Vec<(String, ChainValue)>,
}

/// 解码后的外部交易
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExtrinsic {
    pub signature: Option<RawSignature>,
    pub pallet: String,
    pub call: String,
    pub args: Vec<ChainField>,
}

impl RawExtrinsic {
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}
