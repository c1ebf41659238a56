use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    api::middleware::TraceId,
    app_state::AppState,
    domain::{
        records::{
            AccountBalance, CreateWalletRequest, EventRecord, ExtrinsicRecord, LatestBlock,
            TransferLookup, WalletCreated,
        },
        GatewayError,
    },
    error::AppError,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct Healthz {
    pub status: String,
    pub version: String,
    pub uptime_secs: i64,
    /// 当前未关闭的节点会话数
    pub open_node_sessions: u64,
}

// 记录错误计数并附上追踪ID
fn fail(endpoint: &'static str, trace_id: &TraceId, err: GatewayError) -> AppError {
    crate::metrics::count_err(endpoint);
    AppError::from(err).with_trace_id(trace_id.as_str())
}

/// 区块高度必须是非负整数，不合法时不调用核心服务
pub fn parse_block_number(raw: &str) -> Result<u64, AppError> {
    raw.trim().parse::<u64>().map_err(|_| {
        AppError::invalid_parameter(format!(
            "Invalid block number '{}': expected a non-negative integer",
            raw
        ))
    })
}

#[utoipa::path(
    post,
    path = "/api/create-wallet",
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created", body = WalletCreated),
        (status = 400, description = "Invalid wallet name", body = crate::error::ErrorBody),
        (status = 500, description = "Entropy or derivation failure", body = crate::error::ErrorBody)
    )
)]
pub async fn create_wallet(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Json(req): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<WalletCreated>), AppError> {
    const ENDPOINT: &str = "POST /api/create-wallet";
    let wallet = st
        .wallets
        .create_wallet(&req.name)
        .map_err(|e| fail(ENDPOINT, &trace_id, e))?;
    crate::metrics::count_ok(ENDPOINT);
    Ok((StatusCode::CREATED, Json(wallet)))
}

#[utoipa::path(
    get,
    path = "/api/latest-block",
    responses(
        (status = 200, description = "Latest block height", body = LatestBlock),
        (status = 502, description = "Node unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn latest_block(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
) -> Result<Json<LatestBlock>, AppError> {
    const ENDPOINT: &str = "GET /api/latest-block";
    let block = st
        .gateway
        .get_latest_block()
        .await
        .map_err(|e| fail(ENDPOINT, &trace_id, e))?;
    crate::metrics::count_ok(ENDPOINT);
    Ok(Json(block))
}

#[utoipa::path(
    get,
    path = "/api/{block_number}",
    params(("block_number" = String, Path, description = "Block height")),
    responses(
        (status = 200, description = "Events of the block", body = Vec<EventRecord>),
        (status = 400, description = "Invalid block number", body = crate::error::ErrorBody),
        (status = 404, description = "Block not found", body = crate::error::ErrorBody),
        (status = 502, description = "Node unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn block_events(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Path(block_number): Path<String>,
) -> Result<Json<Vec<EventRecord>>, AppError> {
    const ENDPOINT: &str = "GET /api/:block_number";
    let height = parse_block_number(&block_number).map_err(|e| {
        crate::metrics::count_err(ENDPOINT);
        e.with_trace_id(trace_id.as_str())
    })?;
    let events = st
        .gateway
        .get_block_events(height)
        .await
        .map_err(|e| fail(ENDPOINT, &trace_id, e))?;
    crate::metrics::count_ok(ENDPOINT);
    Ok(Json(events))
}

#[utoipa::path(
    get,
    path = "/api/transaction/{block_number}",
    params(("block_number" = String, Path, description = "Block height")),
    responses(
        (status = 200, description = "Extrinsics of the block", body = Vec<ExtrinsicRecord>),
        (status = 400, description = "Invalid block number", body = crate::error::ErrorBody),
        (status = 404, description = "Block not found", body = crate::error::ErrorBody),
        (status = 502, description = "Node unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn block_transactions(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Path(block_number): Path<String>,
) -> Result<Json<Vec<ExtrinsicRecord>>, AppError> {
    const ENDPOINT: &str = "GET /api/transaction/:block_number";
    let height = parse_block_number(&block_number).map_err(|e| {
        crate::metrics::count_err(ENDPOINT);
        e.with_trace_id(trace_id.as_str())
    })?;
    let extrinsics = st
        .gateway
        .get_transaction_details(height)
        .await
        .map_err(|e| fail(ENDPOINT, &trace_id, e))?;
    crate::metrics::count_ok(ENDPOINT);
    Ok(Json(extrinsics))
}

#[utoipa::path(
    get,
    path = "/api/transaction-hash/{hash}",
    params(("hash" = String, Path, description = "0x-prefixed extrinsic hash")),
    responses(
        (status = 200, description = "Indexed transfers for the hash", body = TransferLookup),
        (status = 400, description = "Invalid hash", body = crate::error::ErrorBody),
        (status = 502, description = "Indexer failure", body = crate::error::ErrorBody)
    )
)]
pub async fn transaction_by_hash(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Path(hash): Path<String>,
) -> Result<Json<TransferLookup>, AppError> {
    const ENDPOINT: &str = "GET /api/transaction-hash/:hash";
    let lookup = st
        .gateway
        .get_transaction_hash_details(&hash)
        .await
        .map_err(|e| fail(ENDPOINT, &trace_id, e))?;
    crate::metrics::count_ok(ENDPOINT);
    Ok(Json(lookup))
}

#[utoipa::path(
    get,
    path = "/api/balance/{address}",
    params(("address" = String, Path, description = "SS58 address")),
    responses(
        (status = 200, description = "Account state", body = AccountBalance),
        (status = 400, description = "Invalid address", body = crate::error::ErrorBody),
        (status = 502, description = "Node unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn address_balance(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Path(address): Path<String>,
) -> Result<Json<AccountBalance>, AppError> {
    const ENDPOINT: &str = "GET /api/balance/:address";
    let balance = st
        .gateway
        .get_address_balance(&address)
        .await
        .map_err(|e| fail(ENDPOINT, &trace_id, e))?;
    crate::metrics::count_ok(ENDPOINT);
    Ok(Json(balance))
}

#[utoipa::path(
    get,
    path = "/healthz",
    responses((status = 200, description = "OK", body = Healthz))
)]
pub async fn healthz(State(st): State<Arc<AppState>>) -> Json<Healthz> {
    crate::metrics::count_ok("GET /healthz");
    let uptime = chrono::Utc::now() - st.started_at;
    Json(Healthz {
        status: "ok".into(),
        version: format!(
            "{}+{}",
            env!("CARGO_PKG_VERSION"),
            option_env!("GIT_HASH").unwrap_or("dev")
        ),
        uptime_secs: uptime.num_seconds(),
        open_node_sessions: crate::metrics::open_node_sessions(),
    })
}

#[utoipa::path(
    get,
    path = "/metrics",
    responses((status = 200, description = "Prometheus text exposition", body = String))
)]
pub async fn metrics() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::render_prometheus(),
    )
}
