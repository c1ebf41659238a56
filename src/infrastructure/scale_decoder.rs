//! 基于类型注册表的 SCALE 动态解码
//!
//! 按 `PortableRegistry` 中的类型定义把字节还原为 [`ChainValue`]，
//! 不依赖编译期的运行时类型。

use parity_scale_codec::{Compact, Decode};
use scale_info::{
    form::PortableForm, Field, PortableRegistry, TypeDef, TypeDefBitSequence, TypeDefPrimitive,
};
use thiserror::Error;

use crate::domain::chain_value::{ChainField, ChainValue};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Type {0} not found in registry")]
    UnknownType(u32),
    #[error("Variant index {index} not found in type {ty}")]
    UnknownVariant { ty: u32, index: u8 },
    #[error("Invalid char code point {0}")]
    InvalidChar(u32),
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    #[error("Unexpected end of input: need {need} bytes, have {have}")]
    Eof { need: usize, have: usize },
    #[error("Unsupported type: {0}")]
    Unsupported(String),
    #[error("SCALE codec error: {0}")]
    Codec(String),
}

impl From<parity_scale_codec::Error> for DecodeError {
    fn from(err: parity_scale_codec::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

type DecodeResult<T> = Result<T, DecodeError>;

pub struct ScaleDecoder<'a> {
    types: &'a PortableRegistry,
}

impl<'a> ScaleDecoder<'a> {
    pub fn new(types: &'a PortableRegistry) -> Self {
        Self { types }
    }

    /// 解码完整字节串，剩余字节视为错误
    pub fn decode_all(&self, ty: u32, bytes: &[u8]) -> DecodeResult<ChainValue> {
        let mut input = bytes;
        let value = self.decode(ty, &mut input)?;
        if !input.is_empty() {
            return Err(DecodeError::TrailingBytes(input.len()));
        }
        Ok(value)
    }

    /// 从输入头部解码一个值并前移游标
    pub fn decode(&self, ty_id: u32, input: &mut &[u8]) -> DecodeResult<ChainValue> {
        let ty = self
            .types
            .resolve(ty_id)
            .ok_or(DecodeError::UnknownType(ty_id))?;
        let type_name = ty.path.segments.last().cloned();

        match &ty.type_def {
            TypeDef::Composite(composite) => Ok(ChainValue::Composite {
                type_name,
                fields: self.decode_fields(&composite.fields, input)?,
            }),
            TypeDef::Variant(def) => {
                let index = u8::decode(input)?;
                let variant = def
                    .variants
                    .iter()
                    .find(|v| v.index == index)
                    .ok_or(DecodeError::UnknownVariant { ty: ty_id, index })?;
                Ok(ChainValue::Variant {
                    type_name,
                    name: variant.name.clone(),
                    index,
                    fields: self.decode_fields(&variant.fields, input)?,
                })
            }
            TypeDef::Sequence(seq) => {
                let len = Compact::<u32>::decode(input)?.0 as usize;
                self.decode_items(seq.type_param.id, len, input)
            }
            TypeDef::Array(array) => self.decode_items(array.type_param.id, array.len as usize, input),
            TypeDef::Tuple(tuple) => {
                let items = tuple
                    .fields
                    .iter()
                    .map(|f| self.decode(f.id, input))
                    .collect::<DecodeResult<Vec<_>>>()?;
                Ok(ChainValue::Sequence(items))
            }
            TypeDef::Primitive(primitive) => decode_primitive(primitive, input),
            TypeDef::Compact(compact) => self.decode_compact(compact.type_param.id, input),
            TypeDef::BitSequence(bits) => self.decode_bits(bits, input),
        }
    }

    fn decode_fields(
        &self,
        fields: &[Field<PortableForm>],
        input: &mut &[u8],
    ) -> DecodeResult<Vec<ChainField>> {
        fields
            .iter()
            .map(|f| -> DecodeResult<ChainField> {
                Ok(ChainField {
                    name: f.name.clone(),
                    type_name: f.type_name.clone(),
                    value: self.decode(f.ty.id, input)?,
                })
            })
            .collect()
    }

    fn decode_items(&self, item_ty: u32, len: usize, input: &mut &[u8]) -> DecodeResult<ChainValue> {
        if self.is_u8(item_ty) {
            let bytes = take(input, len)?;
            return Ok(ChainValue::Bytes(bytes.to_vec()));
        }
        // 预分配以剩余输入长度为上限
        let mut items = Vec::with_capacity(len.min(input.len()));
        for _ in 0..len {
            items.push(self.decode(item_ty, input)?);
        }
        Ok(ChainValue::Sequence(items))
    }

    fn decode_compact(&self, inner_ty: u32, input: &mut &[u8]) -> DecodeResult<ChainValue> {
        let ty = self
            .types
            .resolve(inner_ty)
            .ok_or(DecodeError::UnknownType(inner_ty))?;
        let type_name = ty.path.segments.last().cloned();

        match &ty.type_def {
            TypeDef::Primitive(_) => Ok(ChainValue::U(Compact::<u128>::decode(input)?.0)),
            TypeDef::Composite(composite) if composite.fields.is_empty() => Ok(ChainValue::Composite {
                type_name,
                fields: Vec::new(),
            }),
            TypeDef::Composite(composite) if composite.fields.len() == 1 => {
                let field = &composite.fields[0];
                let value = self.decode_compact(field.ty.id, input)?;
                Ok(ChainValue::Composite {
                    type_name,
                    fields: vec![ChainField {
                        name: field.name.clone(),
                        type_name: field.type_name.clone(),
                        value,
                    }],
                })
            }
            TypeDef::Compact(inner) => self.decode_compact(inner.type_param.id, input),
            _ => Err(DecodeError::Unsupported(format!(
                "Compact<{}>",
                type_name.unwrap_or_else(|| inner_ty.to_string())
            ))),
        }
    }

    fn decode_bits(
        &self,
        bits: &TypeDefBitSequence<PortableForm>,
        input: &mut &[u8],
    ) -> DecodeResult<ChainValue> {
        let store = self
            .types
            .resolve(bits.bit_store_type.id)
            .ok_or(DecodeError::UnknownType(bits.bit_store_type.id))?;
        let store_bytes = match &store.type_def {
            TypeDef::Primitive(TypeDefPrimitive::U8) => 1,
            TypeDef::Primitive(TypeDefPrimitive::U16) => 2,
            TypeDef::Primitive(TypeDefPrimitive::U32) => 4,
            TypeDef::Primitive(TypeDefPrimitive::U64) => 8,
            _ => return Err(DecodeError::Unsupported("bit store".into())),
        };
        let msb_first = self
            .types
            .resolve(bits.bit_order_type.id)
            .and_then(|order| order.path.segments.last())
            .map(|name| name == "Msb0")
            .unwrap_or(false);

        let count = Compact::<u32>::decode(input)?.0 as usize;
        let word_bits = store_bytes * 8;
        let raw = take(input, count.div_ceil(word_bits) * store_bytes)?;

        let out = (0..count)
            .map(|i| {
                let word = &raw[(i / word_bits) * store_bytes..][..store_bytes];
                let value = word
                    .iter()
                    .rev()
                    .fold(0u64, |acc, b| (acc << 8) | *b as u64);
                let offset = i % word_bits;
                let shift = if msb_first { word_bits - 1 - offset } else { offset };
                (value >> shift) & 1 == 1
            })
            .collect();
        Ok(ChainValue::Bits(out))
    }

    fn is_u8(&self, ty: u32) -> bool {
        matches!(
            self.types.resolve(ty).map(|t| &t.type_def),
            Some(TypeDef::Primitive(TypeDefPrimitive::U8))
        )
    }
}

fn take<'b>(input: &mut &'b [u8], len: usize) -> DecodeResult<&'b [u8]> {
    if input.len() < len {
        return Err(DecodeError::Eof {
            need: len,
            have: input.len(),
        });
    }
    let (head, rest) = input.split_at(len);
    *input = rest;
    Ok(head)
}

fn decode_primitive(primitive: &TypeDefPrimitive, input: &mut &[u8]) -> DecodeResult<ChainValue> {
    let value = match primitive {
        TypeDefPrimitive::Bool => ChainValue::Bool(bool::decode(input)?),
        TypeDefPrimitive::Char => {
            let code = u32::decode(input)?;
            ChainValue::Char(char::from_u32(code).ok_or(DecodeError::InvalidChar(code))?)
        }
        TypeDefPrimitive::Str => ChainValue::Str(String::decode(input)?),
        TypeDefPrimitive::U8 => ChainValue::U(u8::decode(input)? as u128),
        TypeDefPrimitive::U16 => ChainValue::U(u16::decode(input)? as u128),
        TypeDefPrimitive::U32 => ChainValue::U(u32::decode(input)? as u128),
        TypeDefPrimitive::U64 => ChainValue::U(u64::decode(input)? as u128),
        TypeDefPrimitive::U128 => ChainValue::U(u128::decode(input)?),
        TypeDefPrimitive::U256 => ChainValue::BigUint(le_to_decimal(take(input, 32)?)),
        TypeDefPrimitive::I8 => ChainValue::I(i8::decode(input)? as i128),
        TypeDefPrimitive::I16 => ChainValue::I(i16::decode(input)? as i128),
        TypeDefPrimitive::I32 => ChainValue::I(i32::decode(input)? as i128),
        TypeDefPrimitive::I64 => ChainValue::I(i64::decode(input)? as i128),
        TypeDefPrimitive::I128 => ChainValue::I(i128::decode(input)?),
        TypeDefPrimitive::I256 => {
            let raw = take(input, 32)?;
            if raw[31] & 0x80 == 0 {
                ChainValue::BigInt(le_to_decimal(raw))
            } else {
                // 二进制补码取反加一
                let mut magnitude = [0u8; 32];
                let mut carry = 1u16;
                for (dst, src) in magnitude.iter_mut().zip(raw) {
                    let sum = (!src) as u16 + carry;
                    *dst = sum as u8;
                    carry = sum >> 8;
                }
                ChainValue::BigInt(format!("-{}", le_to_decimal(&magnitude)))
            }
        }
    };
    Ok(value)
}

/// 小端字节 → 十进制字符串
pub fn le_to_decimal(le: &[u8]) -> String {
    let mut digits: Vec<u8> = le.iter().rev().copied().collect();
    let mut out = Vec::new();
    while digits.iter().any(|&b| b != 0) {
        let mut rem = 0u16;
        for d in digits.iter_mut() {
            let acc = (rem << 8) | *d as u16;
            *d = (acc / 10) as u8;
            rem = acc % 10;
        }
        out.push(char::from(b'0' + rem as u8));
    }
    if out.is_empty() {
        return "0".to_string();
    }
    out.iter().rev().collect()
}
