use std::{sync::Arc, time::Instant};

use axum::{
    extract::Request,
    http::{HeaderValue, Method},
    middleware::from_fn,
    response::Response,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::Level;
use utoipa::OpenApi;

use crate::{
    api::{
        handlers::{
            address_balance, block_events, block_transactions, create_wallet, healthz,
            latest_block, metrics, transaction_by_hash,
        },
        middleware::{trace_id_middleware, TraceId},
    },
    app_state::AppState,
    config::ServerConfig,
    domain::records::{
        AccountBalance, AccountData, AccountRef, AccountState, AssetRef, AssetTransferRecord,
        CallRecord, CreateWalletRequest, EventData, EventRecord, ExtrinsicRecord, LatestBlock,
        TransferLookup, TransferRecord, WalletCreated,
    },
    error::ErrorBody,
};

pub mod handlers;
pub mod middleware;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_wallet,
        handlers::latest_block,
        handlers::block_events,
        handlers::block_transactions,
        handlers::transaction_by_hash,
        handlers::address_balance,
        handlers::healthz,
        handlers::metrics,
    ),
    components(schemas(
        LatestBlock,
        EventData,
        EventRecord,
        CallRecord,
        ExtrinsicRecord,
        AccountData,
        AccountState,
        AccountBalance,
        AccountRef,
        AssetRef,
        TransferRecord,
        AssetTransferRecord,
        TransferLookup,
        CreateWalletRequest,
        WalletCreated,
        ErrorBody,
        handlers::Healthz,
    )),
    tags((name = "xode", description = "Xode Blockchain API")),
    info(title = "Xode Blockchain API", description = "Chain queries and wallet creation for the Xode network")
)]
pub struct ApiDoc;

pub fn routes(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server);

    Router::new()
        .route("/api/create-wallet", post(create_wallet))
        .route("/api/latest-block", get(latest_block))
        .route("/api/transaction/:block_number", get(block_transactions))
        .route("/api/transaction-hash/:hash", get(transaction_by_hash))
        .route("/api/balance/:address", get(address_balance))
        // 静态路径优先于参数路径，/api/latest-block 不会落到这里
        .route("/api/:block_number", get(block_events))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .merge(utoipa_swagger_ui::SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(trace_id_middleware))
                .layer(cors)
                .layer(from_fn(add_response_time_header))
                .layer(from_fn(trace_log)),
        )
        .with_state(state)
}

/// 未配置来源时允许任意来源
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_allow_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.is_empty() || server.cors_allow_origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn add_response_time_header(req: Request, next: axum::middleware::Next) -> Response {
    let start = Instant::now();
    let mut resp = next.run(req).await;
    let elapsed_ms = start.elapsed().as_millis().to_string();
    resp.headers_mut().insert(
        "x-response-time",
        HeaderValue::from_str(&format!("{}ms", elapsed_ms))
            .unwrap_or(HeaderValue::from_static("0ms")),
    );
    resp
}

async fn trace_log(req: Request, next: axum::middleware::Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.as_str().to_string())
        .unwrap_or_else(|| "-".to_string());
    let resp = next.run(req).await;
    let status = resp.status();
    let elapsed = start.elapsed().as_millis();
    tracing::event!(Level::INFO, trace_id=%trace_id, method=%method, path=%path, status=%status.as_u16(), elapsed_ms=%elapsed, "http_request");
    resp
}
