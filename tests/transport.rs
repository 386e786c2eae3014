//! HTTP RPC adapter tests against a local listener

use std::time::Duration;

use axum::{Json, Router, http::StatusCode, routing::post};
use dsm_control::{Endpoint, HttpRpcClient, OutcomeStatus, RpcClient, RpcError, RpcFault, RpcReply};
use serde_json::json;
use tokio::net::TcpListener;

const TIMEOUT: Duration = Duration::from_millis(200);

/// Serve `app` on an ephemeral local port
async fn serve(app: Router) -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Endpoint::new("127.0.0.1", port)
}

fn client() -> HttpRpcClient {
    HttpRpcClient::new("/RPC2", TIMEOUT).unwrap()
}

#[tokio::test]
async fn test_result_envelope_is_a_value() {
    let app = Router::new().route(
        "/RPC2",
        post(|Json(body): Json<serde_json::Value>| async move {
            Json(json!({"jsonrpc": "2.0", "id": body["id"], "result": {
                "method": body["method"],
                "params": body["params"],
            }}))
        }),
    );
    let endpoint = serve(app).await;

    let reply = client()
        .call(&endpoint, "Start", &json!({"device": "/dev/ncar_a2d0"}))
        .await
        .unwrap();

    assert_eq!(
        reply,
        RpcReply::Value(json!({"method": "Start", "params": {"device": "/dev/ncar_a2d0"}}))
    );
}

#[tokio::test]
async fn test_fault_envelope_is_a_fault() {
    let app = Router::new().route(
        "/RPC2",
        post(|| async {
            Json(json!({"jsonrpc": "2.0", "id": 1, "error": {"code": 4, "message": "no such sensor"}}))
        }),
    );
    let endpoint = serve(app).await;

    let result = client().call(&endpoint, "SensorAction", &json!({})).await;

    assert_eq!(
        result,
        Ok(RpcReply::Fault(RpcFault {
            code: 4,
            message: "no such sensor".to_string(),
        }))
    );
    assert_eq!(
        OutcomeStatus::classify(result),
        OutcomeStatus::Fault("no such sensor".to_string())
    );
}

#[tokio::test]
async fn test_slow_server_times_out_as_no_response() {
    let app = Router::new().route(
        "/RPC2",
        post(|| async {
            tokio::time::sleep(TIMEOUT * 10).await;
            Json(json!({"jsonrpc": "2.0", "id": 1, "result": "too late"}))
        }),
    );
    let endpoint = serve(app).await;

    let result = client().call(&endpoint, "Stop", &json!({})).await;

    assert_eq!(result, Err(RpcError::Timeout));
    assert_eq!(OutcomeStatus::classify(result), OutcomeStatus::NoResponse);
}

#[tokio::test]
async fn test_bad_gateway_is_unreachable() {
    let app = Router::new().route("/RPC2", post(|| async { StatusCode::BAD_GATEWAY }));
    let endpoint = serve(app).await;

    let result = client().call(&endpoint, "Restart", &json!({})).await;

    assert!(matches!(result, Err(RpcError::Unreachable(_))));
    assert_eq!(OutcomeStatus::classify(result), OutcomeStatus::NoResponse);
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let result = client()
        .call(&Endpoint::new("127.0.0.1", port), "Quit", &json!({}))
        .await;

    assert!(matches!(result, Err(RpcError::Unreachable(_))));
}

#[tokio::test]
async fn test_envelope_without_result_is_a_fault() {
    let app = Router::new().route(
        "/RPC2",
        post(|| async { Json(json!({"jsonrpc": "2.0", "id": 1})) }),
    );
    let endpoint = serve(app).await;

    let result = client().call(&endpoint, "Start", &json!({})).await;

    assert!(matches!(result, Err(RpcError::Malformed { .. })));
    assert!(matches!(
        OutcomeStatus::classify(result),
        OutcomeStatus::Fault(message) if message.starts_with("unknown response type")
    ));
}
