//! 运行时元数据
//!
//! 从 `state_getMetadata` 返回的字节中提取解码所需的最小信息：
//! 类型注册表、`System.Events` / `System.Account` 的值类型，
//! 以及外部交易的地址/调用/签名/签名扩展类型。

use anyhow::{anyhow, bail, Context, Result};
use frame_metadata::{RuntimeMetadata, RuntimeMetadataPrefixed};
use parity_scale_codec::Decode;
use scale_info::PortableRegistry;

/// 存储项的值类型与缺省值（存储为空时使用）
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub ty: u32,
    pub default: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SignedExtension {
    pub identifier: String,
    pub ty: u32,
}

#[derive(Debug, Clone)]
pub struct ExtrinsicLayout {
    pub version: u8,
    pub address_ty: u32,
    pub call_ty: u32,
    pub signature_ty: u32,
    pub extensions: Vec<SignedExtension>,
}

#[derive(Debug, Clone)]
pub struct ChainMetadata {
    pub types: PortableRegistry,
    pub events: StorageLayout,
    pub account: StorageLayout,
    pub extrinsic: ExtrinsicLayout,
}

// v14 与 v15 的 System 存储结构相同，只是类型路径不同
macro_rules! system_storage {
    ($pallets:expr, $($entry_type:ident)::+) => {{
        let system = $pallets
            .iter()
            .find(|p| p.name == "System")
            .context("System pallet missing from metadata")?;
        let storage = system
            .storage
            .as_ref()
            .context("System pallet has no storage")?;

        let lookup = |name: &str| {
            storage
                .entries
                .iter()
                .find(|e| e.name == name)
                .with_context(|| format!("System.{} missing from metadata", name))
        };

        let events = lookup("Events")?;
        let events_ty = match &events.ty {
            $($entry_type)::+::Plain(ty) => ty.id,
            $($entry_type)::+::Map { value, .. } => value.id,
        };
        let account = lookup("Account")?;
        let account_ty = match &account.ty {
            $($entry_type)::+::Map { value, .. } => value.id,
            $($entry_type)::+::Plain(ty) => ty.id,
        };

        (
            StorageLayout {
                ty: events_ty,
                default: events.default.clone(),
            },
            StorageLayout {
                ty: account_ty,
                default: account.default.clone(),
            },
        )
    }};
}

impl ChainMetadata {
    /// 解码 `RuntimeMetadataPrefixed` 字节（支持 v14 / v15）
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let prefixed = RuntimeMetadataPrefixed::decode(&mut &bytes[..])
            .map_err(|e| anyhow!("Invalid runtime metadata: {}", e))?;

        match prefixed.1 {
            RuntimeMetadata::V14(m) => {
                let (events, account) =
                    system_storage!(m.pallets, frame_metadata::v14::StorageEntryType);

                let ext_ty = m
                    .types
                    .resolve(m.extrinsic.ty.id)
                    .context("UncheckedExtrinsic type missing from registry")?;
                let param = |name: &str| -> Result<u32> {
                    ext_ty
                        .type_params
                        .iter()
                        .find(|p| p.name == name)
                        .and_then(|p| p.ty.as_ref())
                        .map(|ty| ty.id)
                        .with_context(|| format!("UncheckedExtrinsic has no {} parameter", name))
                };
                let extrinsic = ExtrinsicLayout {
                    version: m.extrinsic.version,
                    address_ty: param("Address")?,
                    call_ty: param("Call")?,
                    signature_ty: param("Signature")?,
                    extensions: m
                        .extrinsic
                        .signed_extensions
                        .iter()
                        .map(|e| SignedExtension {
                            identifier: e.identifier.clone(),
                            ty: e.ty.id,
                        })
                        .collect(),
                };

                Ok(Self {
                    types: m.types,
                    events,
                    account,
                    extrinsic,
                })
            }
            RuntimeMetadata::V15(m) => {
                let (events, account) =
                    system_storage!(m.pallets, frame_metadata::v15::StorageEntryType);

                let extrinsic = ExtrinsicLayout {
                    version: m.extrinsic.version,
                    address_ty: m.extrinsic.address_ty.id,
                    call_ty: m.extrinsic.call_ty.id,
                    signature_ty: m.extrinsic.signature_ty.id,
                    extensions: m
                        .extrinsic
                        .signed_extensions
                        .iter()
                        .map(|e| SignedExtension {
                            identifier: e.identifier.clone(),
                            ty: e.ty.id,
                        })
                        .collect(),
                };

                Ok(Self {
                    types: m.types,
                    events,
                    account,
                    extrinsic,
                })
            }
            other => bail!("Unsupported runtime metadata version V{}", other.version()),
        }
    }
}
