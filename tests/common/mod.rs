//! 集成测试共用的固定节点
//!
//! 运行时类型由 `scale-info` 派生，元数据直接由注册表构造，
//! 也可以编码成节点返回的 v14 / v15 元数据字节。
//! 会话只在内存中回放预置的区块、事件与账户存储。

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parity_scale_codec::{Compact, Encode};
use frame_metadata::v14::{
    PalletStorageMetadata, StorageEntryMetadata, StorageEntryModifier, StorageEntryType,
    StorageHasher,
};
use frame_metadata::{v14, v15, RuntimeMetadata, RuntimeMetadataPrefixed, META_RESERVED};
use scale_info::{meta_type, MetaType, PortableRegistry, Registry};

use xode_gateway::domain::chain_value::BlockHash;
use xode_gateway::domain::{GatewayError, GatewayResult};
use xode_gateway::infrastructure::metadata::{
    ChainMetadata, ExtrinsicLayout, SignedExtension, StorageLayout,
};
use xode_gateway::infrastructure::node_session::{NodeConnector, NodeSession};
use xode_gateway::service::chain_query::{system_account_key, system_events_key};

pub const ALICE: [u8; 32] = hex_literal(
    "d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d",
);
pub const BOB: [u8; 32] = hex_literal(
    "8eaf04151687736326c9fea17e25fc5287613693c912909cb226aa4794f26a48",
);

const fn hex_literal(s: &str) -> [u8; 32] {
    const fn nibble(c: u8) -> u8 {
        match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            _ => panic!("bad hex"),
        }
    }
    let bytes = s.as_bytes();
    let mut out = [0u8; 32];
    let mut i = 0;
    while i < 32 {
        out[i] = (nibble(bytes[2 * i]) << 4) | nibble(bytes[2 * i + 1]);
        i += 1;
    }
    out
}

/// 固定运行时的类型定义
pub mod runtime {
    use parity_scale_codec::Encode;
    use scale_info::TypeInfo;

    #[derive(Debug, Clone, Copy, Encode, TypeInfo)]
    pub struct AccountId32(pub [u8; 32]);

    pub type AccountId = AccountId32;
    pub type Balance = u128;

    #[derive(Encode, TypeInfo)]
    pub enum SystemEvent {
        #[codec(index = 0)]
        ExtrinsicSuccess { weight: u64 },
        #[codec(index = 3)]
        NewAccount { account: AccountId },
    }

    #[derive(Encode, TypeInfo)]
    pub enum BalancesEvent {
        #[codec(index = 0)]
        Endowed { account: AccountId, free_balance: Balance },
        #[codec(index = 2)]
        Transfer {
            from: AccountId,
            to: AccountId,
            amount: Balance,
        },
    }

    #[derive(Encode, TypeInfo)]
    pub enum RuntimeEvent {
        #[codec(index = 0)]
        System(SystemEvent),
        #[codec(index = 10)]
        Balances(BalancesEvent),
    }

    #[derive(Encode, TypeInfo)]
    pub enum Phase {
        #[codec(index = 0)]
        ApplyExtrinsic(u32),
        #[codec(index = 1)]
        Finalization,
        #[codec(index = 2)]
        Initialization,
    }

    #[derive(Encode, TypeInfo)]
    pub struct EventRecord {
        pub phase: Phase,
        pub event: RuntimeEvent,
        pub topics: Vec<[u8; 32]>,
    }

    #[derive(Debug, Default, Encode, TypeInfo)]
    pub struct ExtraFlags(pub u128);

    #[derive(Debug, Default, Encode, TypeInfo)]
    pub struct AccountData {
        pub free: Balance,
        pub reserved: Balance,
        pub frozen: Balance,
        pub flags: ExtraFlags,
    }

    #[derive(Debug, Default, Encode, TypeInfo)]
    pub struct AccountInfo {
        pub nonce: u32,
        pub consumers: u32,
        pub providers: u32,
        pub sufficients: u32,
        pub data: AccountData,
    }

    #[derive(Encode, TypeInfo)]
    pub enum MultiAddress {
        #[codec(index = 0)]
        Id(AccountId32),
        #[codec(index = 1)]
        Index(#[codec(compact)] u32),
    }

    #[derive(Encode, TypeInfo)]
    pub enum MultiSignature {
        #[codec(index = 0)]
        Ed25519([u8; 64]),
        #[codec(index = 1)]
        Sr25519([u8; 64]),
    }

    /// 只列出测试用到的两种编码：永久与首字节 148 的有期限 Era
    #[derive(Encode, TypeInfo)]
    pub enum Era {
        #[codec(index = 0)]
        Immortal,
        #[codec(index = 148)]
        Mortal148(u8),
    }

    #[derive(Encode, TypeInfo)]
    pub struct CheckSpecVersion;

    #[derive(Encode, TypeInfo)]
    pub struct CheckMortality(pub Era);

    #[derive(Encode, TypeInfo)]
    pub struct CheckNonce(#[codec(compact)] pub u32);

    #[derive(Encode, TypeInfo)]
    pub struct ChargeTransactionPayment(#[codec(compact)] pub Balance);

    #[derive(Encode, TypeInfo)]
    pub enum Mode {
        #[codec(index = 0)]
        Disabled,
        #[codec(index = 1)]
        Enabled,
    }

    #[derive(Encode, TypeInfo)]
    pub struct CheckMetadataHash {
        pub mode: Mode,
    }

    #[allow(non_camel_case_types)]
    #[derive(Encode, TypeInfo)]
    pub enum TimestampCall {
        #[codec(index = 0)]
        set {
            #[codec(compact)]
            now: u64,
        },
    }

    #[allow(non_camel_case_types)]
    #[derive(Encode, TypeInfo)]
    pub enum BalancesCall {
        #[codec(index = 3)]
        transfer_keep_alive {
            dest: MultiAddress,
            #[codec(compact)]
            value: Balance,
        },
    }

    #[derive(Encode, TypeInfo)]
    pub enum RuntimeCall {
        #[codec(index = 3)]
        Timestamp(TimestampCall),
        #[codec(index = 10)]
        Balances(BalancesCall),
    }

    /// 外部交易外层类型，只用于在 v14 元数据中声明类型参数
    #[derive(TypeInfo)]
    pub struct UncheckedExtrinsic<Address, Call, Signature, Extra>(
        core::marker::PhantomData<(Address, Call, Signature, Extra)>,
    );

    pub type SignedExtra = (
        CheckSpecVersion,
        CheckMortality,
        CheckNonce,
        ChargeTransactionPayment,
        CheckMetadataHash,
    );

    pub type Extrinsic = UncheckedExtrinsic<MultiAddress, RuntimeCall, MultiSignature, SignedExtra>;
}

use runtime::*;

/// 由派生类型构造的运行时元数据
pub fn fixture_metadata() -> ChainMetadata {
    let mut registry = Registry::new();
    let events_ty = registry.register_type(&meta_type::<Vec<EventRecord>>()).id;
    let account_ty = registry.register_type(&meta_type::<AccountInfo>()).id;
    let address_ty = registry.register_type(&meta_type::<MultiAddress>()).id;
    let call_ty = registry.register_type(&meta_type::<RuntimeCall>()).id;
    let signature_ty = registry.register_type(&meta_type::<MultiSignature>()).id;

    let mut extension = |identifier: &str, ty: scale_info::MetaType| SignedExtension {
        identifier: identifier.to_string(),
        ty: registry.register_type(&ty).id,
    };
    let extensions = vec![
        extension("CheckSpecVersion", meta_type::<CheckSpecVersion>()),
        extension("CheckMortality", meta_type::<CheckMortality>()),
        extension("CheckNonce", meta_type::<CheckNonce>()),
        extension("ChargeTransactionPayment", meta_type::<ChargeTransactionPayment>()),
        extension("CheckMetadataHash", meta_type::<CheckMetadataHash>()),
    ];

    ChainMetadata {
        types: PortableRegistry::from(registry),
        events: StorageLayout {
            ty: events_ty,
            default: Vec::<EventRecord>::new().encode(),
        },
        account: StorageLayout {
            ty: account_ty,
            default: AccountInfo::default().encode(),
        },
        extrinsic: ExtrinsicLayout {
            version: 4,
            address_ty,
            call_ty,
            signature_ty,
            extensions,
        },
    }
}

pub const EXTENSION_ORDER: [&str; 5] = [
    "CheckSpecVersion",
    "CheckMortality",
    "CheckNonce",
    "ChargeTransactionPayment",
    "CheckMetadataHash",
];

fn extension_types() -> Vec<(&'static str, MetaType)> {
    EXTENSION_ORDER
        .into_iter()
        .zip([
            meta_type::<CheckSpecVersion>(),
            meta_type::<CheckMortality>(),
            meta_type::<CheckNonce>(),
            meta_type::<ChargeTransactionPayment>(),
            meta_type::<CheckMetadataHash>(),
        ])
        .collect()
}

fn system_storage() -> PalletStorageMetadata {
    PalletStorageMetadata {
        prefix: "System",
        entries: vec![
            StorageEntryMetadata {
                name: "Account",
                modifier: StorageEntryModifier::Default,
                ty: StorageEntryType::Map {
                    hashers: vec![StorageHasher::Blake2_128Concat],
                    key: meta_type::<AccountId32>(),
                    value: meta_type::<AccountInfo>(),
                },
                default: AccountInfo::default().encode(),
                docs: vec![],
            },
            StorageEntryMetadata {
                name: "Events",
                modifier: StorageEntryModifier::Default,
                ty: StorageEntryType::Plain(meta_type::<Vec<EventRecord>>()),
                default: Vec::<EventRecord>::new().encode(),
                docs: vec![],
            },
        ],
    }
}

/// `state_getMetadata` 返回的 v14 元数据；`pallet` 为唯一的带存储 pallet 名
pub fn encoded_metadata_v14_with_pallet(pallet: &'static str) -> Vec<u8> {
    let metadata = v14::RuntimeMetadataV14::new(
        vec![v14::PalletMetadata {
            name: pallet,
            storage: Some(system_storage()),
            calls: None,
            event: None,
            constants: vec![],
            error: None,
            index: 0,
        }],
        v14::ExtrinsicMetadata {
            ty: meta_type::<Extrinsic>(),
            version: 4,
            signed_extensions: extension_types()
                .into_iter()
                .map(|(identifier, ty)| v14::SignedExtensionMetadata {
                    identifier,
                    ty,
                    additional_signed: meta_type::<()>(),
                })
                .collect(),
        },
        meta_type::<()>(),
    );
    RuntimeMetadataPrefixed(META_RESERVED, RuntimeMetadata::V14(metadata)).encode()
}

pub fn encoded_metadata_v14() -> Vec<u8> {
    encoded_metadata_v14_with_pallet("System")
}

pub fn encoded_metadata_v15() -> Vec<u8> {
    let metadata = v15::RuntimeMetadataV15::new(
        vec![v15::PalletMetadata {
            name: "System",
            storage: Some(system_storage()),
            calls: None,
            event: None,
            constants: vec![],
            error: None,
            index: 0,
            docs: vec![],
        }],
        v15::ExtrinsicMetadata {
            version: 4,
            address_ty: meta_type::<MultiAddress>(),
            call_ty: meta_type::<RuntimeCall>(),
            signature_ty: meta_type::<MultiSignature>(),
            extra_ty: meta_type::<SignedExtra>(),
            signed_extensions: extension_types()
                .into_iter()
                .map(|(identifier, ty)| v15::SignedExtensionMetadata {
                    identifier,
                    ty,
                    additional_signed: meta_type::<()>(),
                })
                .collect(),
        },
        meta_type::<()>(),
        vec![],
        v15::OuterEnums {
            call_enum_ty: meta_type::<RuntimeCall>(),
            event_enum_ty: meta_type::<RuntimeEvent>(),
            error_enum_ty: meta_type::<()>(),
        },
        v15::CustomMetadata {
            map: BTreeMap::new(),
        },
    );
    RuntimeMetadataPrefixed::from(metadata).encode()
}

fn with_length_prefix(body: Vec<u8>) -> Vec<u8> {
    let mut out = Compact(body.len() as u32).encode();
    out.extend(body);
    out
}

/// 未签名外部交易（timestamp.set）
pub fn unsigned_timestamp(now: u64) -> Vec<u8> {
    let mut body = vec![0x04];
    RuntimeCall::Timestamp(TimestampCall::set { now }).encode_to(&mut body);
    with_length_prefix(body)
}

/// 签名外部交易（balances.transferKeepAlive）
pub fn signed_transfer(from: [u8; 32], to: [u8; 32], value: u128, nonce: u32, tip: u128) -> Vec<u8> {
    let mut body = vec![0x84];
    MultiAddress::Id(AccountId32(from)).encode_to(&mut body);
    MultiSignature::Sr25519([0xab; 64]).encode_to(&mut body);
    CheckSpecVersion.encode_to(&mut body);
    CheckMortality(Era::Mortal148(0)).encode_to(&mut body);
    CheckNonce(nonce).encode_to(&mut body);
    ChargeTransactionPayment(tip).encode_to(&mut body);
    CheckMetadataHash { mode: Mode::Disabled }.encode_to(&mut body);
    RuntimeCall::Balances(BalancesCall::transfer_keep_alive {
        dest: MultiAddress::Id(AccountId32(to)),
        value,
    })
    .encode_to(&mut body);
    with_length_prefix(body)
}

pub fn transfer_event(from: [u8; 32], to: [u8; 32], amount: u128) -> EventRecord {
    EventRecord {
        phase: Phase::ApplyExtrinsic(1),
        event: RuntimeEvent::Balances(BalancesEvent::Transfer {
            from: AccountId32(from),
            to: AccountId32(to),
            amount,
        }),
        topics: vec![],
    }
}

pub fn hash_for(height: u64) -> BlockHash {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&height.to_be_bytes());
    BlockHash(bytes)
}

/// 内存中的固定链
#[derive(Clone)]
pub struct FixtureChain {
    pub head: u64,
    pub metadata: ChainMetadata,
    blocks: HashMap<u64, BlockHash>,
    extrinsics: HashMap<BlockHash, Vec<Vec<u8>>>,
    storage_at: HashMap<(BlockHash, Vec<u8>), Vec<u8>>,
    latest_storage: HashMap<Vec<u8>, Vec<u8>>,
}

impl FixtureChain {
    pub fn new(head: u64) -> Self {
        Self {
            head,
            metadata: fixture_metadata(),
            blocks: HashMap::new(),
            extrinsics: HashMap::new(),
            storage_at: HashMap::new(),
            latest_storage: HashMap::new(),
        }
    }

    /// 添加区块；`events` 为空时不写存储，走元数据缺省值
    pub fn with_block(mut self, height: u64, extrinsics: Vec<Vec<u8>>, events: Vec<EventRecord>) -> Self {
        let hash = hash_for(height);
        self.blocks.insert(height, hash);
        self.extrinsics.insert(hash, extrinsics);
        if !events.is_empty() {
            self.storage_at.insert((hash, system_events_key()), events.encode());
        }
        self
    }

    pub fn with_account(mut self, account: [u8; 32], info: AccountInfo) -> Self {
        self.latest_storage
            .insert(system_account_key(&account), info.encode());
        self
    }

    /// 替换元数据，例如换成由节点字节解码得到的版本
    pub fn with_metadata(mut self, metadata: ChainMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn block_hash(&self, height: u64) -> Option<BlockHash> {
        self.blocks.get(&height).copied()
    }

    pub fn extrinsics(&self, hash: &BlockHash) -> Option<Vec<Vec<u8>>> {
        self.extrinsics.get(hash).cloned()
    }

    pub fn storage(&self, key: &[u8], at: Option<&BlockHash>) -> Option<Vec<u8>> {
        match at {
            Some(hash) => self.storage_at.get(&(*hash, key.to_vec())).cloned(),
            None => self.latest_storage.get(key).cloned(),
        }
    }
}

#[derive(Default)]
pub struct SessionCounters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

impl SessionCounters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct FixtureConnector {
    pub chain: Arc<FixtureChain>,
    pub counters: Arc<SessionCounters>,
    /// 拒绝连接，模拟节点不可达
    pub refuse: bool,
    /// 元数据请求失败，模拟会话中途的 RPC 错误
    pub fail_metadata: bool,
}

impl FixtureConnector {
    pub fn new(chain: FixtureChain) -> Self {
        Self {
            chain: Arc::new(chain),
            counters: Arc::new(SessionCounters::default()),
            refuse: false,
            fail_metadata: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new(FixtureChain::new(0))
        }
    }

    pub fn failing_metadata(chain: FixtureChain) -> Self {
        Self {
            fail_metadata: true,
            ..Self::new(chain)
        }
    }
}

#[async_trait]
impl NodeConnector for FixtureConnector {
    async fn open(&self) -> GatewayResult<Box<dyn NodeSession>> {
        if self.refuse {
            return Err(GatewayError::Connection(
                "Unable to connect to node at ws://fixture: connection refused".into(),
            ));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixtureSession {
            chain: self.chain.clone(),
            counters: self.counters.clone(),
            fail_metadata: self.fail_metadata,
            closed: false,
        }))
    }
}

pub struct FixtureSession {
    chain: Arc<FixtureChain>,
    counters: Arc<SessionCounters>,
    fail_metadata: bool,
    closed: bool,
}

#[async_trait]
impl NodeSession for FixtureSession {
    fn endpoint(&self) -> &str {
        "ws://fixture"
    }

    async fn first_new_head(&self) -> GatewayResult<u64> {
        Ok(self.chain.head)
    }

    async fn block_hash(&self, height: u64) -> GatewayResult<Option<BlockHash>> {
        Ok(self.chain.block_hash(height))
    }

    async fn block_extrinsics(&self, hash: &BlockHash) -> GatewayResult<Option<Vec<Vec<u8>>>> {
        Ok(self.chain.extrinsics(hash))
    }

    async fn storage(&self, key: &[u8], at: Option<&BlockHash>) -> GatewayResult<Option<Vec<u8>>> {
        Ok(self.chain.storage(key, at))
    }

    async fn metadata(&self, _at: Option<&BlockHash>) -> GatewayResult<ChainMetadata> {
        if self.fail_metadata {
            return Err(GatewayError::Rpc("state_getMetadata failed: fixture error".into()));
        }
        Ok(self.chain.metadata.clone())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
