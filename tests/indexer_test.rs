//! 索引器客户端集成测试：本地 axum 模拟 GraphQL 端点

use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use xode_gateway::domain::address::XODE_SS58_PREFIX;
use xode_gateway::domain::GatewayError;
use xode_gateway::infrastructure::indexer::{IndexerClient, OPERATION_NAME};
use xode_gateway::infrastructure::node_session::NodeConnector;
use xode_gateway::service::gateway_service::GatewayService;

mod common;

fn hash(last: u8) -> String {
    format!("0x{}{:02x}", "00".repeat(31), last)
}

async fn mock_graphql(Json(body): Json<Value>) -> impl IntoResponse {
    if body["operationName"] != OPERATION_NAME {
        return (StatusCode::BAD_REQUEST, "unexpected operation").into_response();
    }
    let requested = body["variables"]["hash"].as_str().unwrap_or_default().to_string();

    match requested.as_str() {
        h if h == hash(2) => Json(json!({
            "data": {
                "transfers": [{
                    "extrinsicHash": h,
                    "blockNumber": 123456,
                    "timestamp": "2024-05-01T10:00:00.000000Z",
                    "amount": "1000000000000",
                    "fee": 15000000,
                    "from": { "id": "XqFrom" },
                    "to": { "id": "XqTo" }
                }],
                "assetTransfers": [{
                    "extrinsicHash": h,
                    "blockNumber": "123456",
                    "timestamp": "2024-05-01T10:00:00.000000Z",
                    "amount": 42,
                    "fee": null,
                    "from": { "id": "XqFrom" },
                    "to": { "id": "XqTo" },
                    "asset": { "id": "1984", "name": "Tether USD", "symbol": "USDT" }
                }]
            }
        }))
        .into_response(),
        h if h == hash(3) => (StatusCode::INTERNAL_SERVER_ERROR, "indexer exploded").into_response(),
        h if h == hash(4) => Json(json!({
            "data": null,
            "errors": [{ "message": "Cannot query field \"transfers\"" }]
        }))
        .into_response(),
        // 原始文本：超过 2^53 的数字不能经过 serde_json::Value
        h if h == hash(5) => (
            [(header::CONTENT_TYPE, "application/json")],
            format!(
                r#"{{"data":{{"transfers":[{{"extrinsicHash":"{}","blockNumber":7,"timestamp":1714557600000,"amount":1000000000000000000001,"fee":123456789012345678901234,"from":{{"id":"XqFrom"}},"to":{{"id":"XqTo"}}}}],"assetTransfers":[]}}}}"#,
                h
            ),
        )
            .into_response(),
        _ => Json(json!({ "data": { "transfers": [], "assetTransfers": [] } })).into_response(),
    }
}

async fn spawn_indexer() -> String {
    let app = Router::new().route("/graphql", post(mock_graphql));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/graphql", addr)
}

#[tokio::test]
async fn test_no_match_returns_empty_sequences() {
    let client = IndexerClient::new(spawn_indexer().await);
    let lookup = client.transfers_by_hash(&hash(1)).await.unwrap();
    assert!(lookup.is_empty());

    let json = serde_json::to_value(&lookup).unwrap();
    assert_eq!(json, json!({ "transfers": [], "assetTransfers": [] }));
}

#[tokio::test]
async fn test_records_are_normalized() {
    let client = IndexerClient::new(spawn_indexer().await);
    let lookup = client.transfers_by_hash(&hash(2)).await.unwrap();

    assert_eq!(lookup.transfers.len(), 1);
    let transfer = &lookup.transfers[0];
    assert_eq!(transfer.block_number, 123456);
    assert_eq!(transfer.amount, "1000000000000");
    assert_eq!(transfer.fee.as_deref(), Some("15000000"));
    assert_eq!(transfer.from.id, "XqFrom");

    assert_eq!(lookup.asset_transfers.len(), 1);
    let asset = &lookup.asset_transfers[0];
    assert_eq!(asset.amount, "42");
    assert_eq!(asset.block_number, 123456);
    assert_eq!(asset.fee, None);
    assert_eq!(asset.asset.symbol.as_deref(), Some("USDT"));
}

#[tokio::test]
async fn test_large_numeric_amounts_keep_full_precision() {
    let client = IndexerClient::new(spawn_indexer().await);
    let lookup = client.transfers_by_hash(&hash(5)).await.unwrap();

    let transfer = &lookup.transfers[0];
    assert_eq!(transfer.amount, "1000000000000000000001");
    assert_eq!(transfer.fee.as_deref(), Some("123456789012345678901234"));
    assert_eq!(transfer.timestamp, "1714557600000");
    assert_eq!(transfer.block_number, 7);
}

#[tokio::test]
async fn test_non_2xx_carries_status() {
    let client = IndexerClient::new(spawn_indexer().await);
    match client.transfers_by_hash(&hash(3)).await {
        Err(GatewayError::Indexer { status, message }) => {
            assert_eq!(status, 500);
            assert!(message.contains("HTTP 500"));
            assert!(message.contains("indexer exploded"));
        }
        other => panic!("expected indexer error, got {:?}", other.map(|l| l.is_empty())),
    }
}

#[tokio::test]
async fn test_graphql_errors_are_reported() {
    let client = IndexerClient::new(spawn_indexer().await);
    match client.transfers_by_hash(&hash(4)).await {
        Err(GatewayError::Indexer { status, message }) => {
            assert_eq!(status, 200);
            assert!(message.starts_with("Indexer query failed: "));
        }
        other => panic!("expected indexer error, got {:?}", other.map(|l| l.is_empty())),
    }
}

#[tokio::test]
async fn test_gateway_hash_lookup_uses_indexer_only() {
    let connector = Arc::new(common::FixtureConnector::new(common::FixtureChain::new(1)));
    let service = GatewayService::new(
        connector.clone() as Arc<dyn NodeConnector>,
        IndexerClient::new(spawn_indexer().await),
        XODE_SS58_PREFIX,
    );

    let lookup = service.get_transaction_hash_details(&hash(2)).await.unwrap();
    assert_eq!(lookup.transfers.len(), 1);

    let err = service
        .get_transaction_hash_details(&hash(3))
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .starts_with("Failed to resolve transaction hash: Indexer responded with HTTP 500"));

    assert_eq!(connector.counters.opened(), 0);
}
