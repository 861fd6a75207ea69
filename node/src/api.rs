//! # HTTP + JSON-RPC API
//!
//! Builds the axum router that exposes the node's invocation surface. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path      | Description                                   |
//! |--------|-----------|-----------------------------------------------|
//! | GET    | `/health` | Liveness probe                                |
//! | GET    | `/status` | Version and record count per object type      |
//! | POST   | `/invoke` | `{ "function": .., "args": [..] }`            |
//! | POST   | `/rpc`    | JSON-RPC 2.0; `method` is the function name   |
//!
//! Invocations are serialized through one async mutex: each
//! read-validate-write unit commits before the next one reads.

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use estate_contracts::{ContractError, ErrorKind, Function, Handler, Invoked};
use estate_ledger::config::OBJECT_TYPES;
use estate_ledger::storage::key;
use estate_ledger::{SledStore, StateStore, StoreResult, TxContext};

use crate::metrics::{SharedMetrics, UNKNOWN_FUNCTION};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone; everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    pub handler: Arc<Handler<SledStore>>,
    /// Held for the whole of one invocation.
    pub invoke_lock: Arc<Mutex<()>>,
    pub metrics: SharedMetrics,
}

impl AppState {
    pub fn new(version: String, handler: Handler<SledStore>, metrics: SharedMetrics) -> Self {
        Self {
            version,
            handler: Arc::new(handler),
            invoke_lock: Arc::new(Mutex::new(())),
            metrics,
        }
    }

    /// Run one invocation under the lock, stamped with a fresh transaction
    /// id and the receive time.
    pub async fn execute(&self, function: &str, args: &[String]) -> Result<Invoked, ContractError> {
        let _guard = self.invoke_lock.lock().await;
        let started = Instant::now();
        let ctx = TxContext::new(uuid::Uuid::new_v4().to_string(), Utc::now());

        let result = self.handler.invoke(ctx, function, args);

        let label = function
            .parse::<Function>()
            .map(|f| f.name())
            .unwrap_or(UNKNOWN_FUNCTION);
        match &result {
            Ok(invoked) => self
                .metrics
                .observe(label, "ok", started.elapsed(), invoked.committed),
            Err(err) => self
                .metrics
                .observe(label, err.kind().as_str(), started.elapsed(), 0),
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/invoke", post(invoke_handler))
        .route("/rpc", post(rpc_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /invoke`.
#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Success body of `POST /invoke`.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub result: serde_json::Value,
}

/// Failure body of `POST /invoke`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub version: String,
    /// Record count per object type tag.
    pub records: BTreeMap<String, usize>,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The function to invoke.
    pub method: String,
    /// Positional string arguments.
    pub params: Option<serde_json::Value>,
    /// Request identifier. Echoed back in the response.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    /// The [`ErrorKind`] for contract failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

const RPC_INVALID_REQUEST: i32 = -32600;
const RPC_METHOD_NOT_FOUND: i32 = -32601;
const RPC_INVALID_PARAMS: i32 = -32602;
const RPC_INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC error code for a contract error kind.
pub fn rpc_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Validation => RPC_INVALID_PARAMS,
        ErrorKind::NotFound => -32001,
        ErrorKind::StateConflict => -32002,
        ErrorKind::Unauthorized => -32003,
        ErrorKind::InsufficientFunds => -32004,
        ErrorKind::Storage => RPC_INTERNAL_ERROR,
    }
}

/// HTTP status for a contract error kind.
pub fn http_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::StateConflict => StatusCode::CONFLICT,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::InsufficientFunds => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — version and the number of records of each object type.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.handler.store();
    let counts: StoreResult<BTreeMap<String, usize>> = OBJECT_TYPES
        .iter()
        .map(|tag| Ok((tag.to_string(), count_records(store, tag)?)))
        .collect();

    match counts {
        Ok(records) => Json(StatusResponse {
            version: state.version.clone(),
            records,
            timestamp: Utc::now().to_rfc3339(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!("failed to read world state: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: ErrorBody {
                        kind: ErrorKind::Storage,
                        message: e.to_string(),
                    },
                }),
            )
                .into_response()
        }
    }
}

/// `POST /invoke` — run one function with string arguments.
async fn invoke_handler(
    State(state): State<AppState>,
    Json(req): Json<InvokeRequest>,
) -> impl IntoResponse {
    match state.execute(&req.function, &req.args).await {
        Ok(invoked) => (
            StatusCode::OK,
            Json(InvokeResponse {
                result: invoked.result,
            }),
        )
            .into_response(),
        Err(err) => {
            let kind = err.kind();
            (
                http_status(kind),
                Json(ErrorResponse {
                    error: ErrorBody {
                        kind,
                        message: err.to_string(),
                    },
                }),
            )
                .into_response()
        }
    }
}

/// `POST /rpc` — JSON-RPC 2.0 gateway.
///
/// `method` names a contract function and `params` is its positional string
/// argument list. Unknown functions return -32601; contract failures carry
/// their [`ErrorKind`] in `error.data`.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let id = req.id.clone();
    let outcome = dispatch_rpc(&state, req).await;
    Json(match outcome {
        Ok(result) => JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        },
        Err(error) => JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        },
    })
}

async fn dispatch_rpc(
    state: &AppState,
    req: JsonRpcRequest,
) -> Result<serde_json::Value, JsonRpcError> {
    if req.jsonrpc != "2.0" {
        return Err(rpc_error(RPC_INVALID_REQUEST, "jsonrpc must be \"2.0\""));
    }
    if req.method.parse::<Function>().is_err() {
        return Err(rpc_error(
            RPC_METHOD_NOT_FOUND,
            format!("method not found: {}", req.method),
        ));
    }
    let args = rpc_params(req.params)?;

    match state.execute(&req.method, &args).await {
        Ok(invoked) => Ok(invoked.result),
        Err(err) => {
            let kind = err.kind();
            Err(JsonRpcError {
                code: rpc_code(kind),
                message: err.to_string(),
                data: Some(serde_json::json!({ "kind": kind })),
            })
        }
    }
}

/// `params` must be absent, null, or an array of strings.
fn rpc_params(params: Option<serde_json::Value>) -> Result<Vec<String>, JsonRpcError> {
    match params {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value).map_err(|e| {
            rpc_error(
                RPC_INVALID_PARAMS,
                format!("params must be an array of strings: {e}"),
            )
        }),
    }
}

fn rpc_error(code: i32, message: impl Into<String>) -> JsonRpcError {
    JsonRpcError {
        code,
        message: message.into(),
        data: None,
    }
}

fn count_records(store: &dyn StateStore, object_type: &str) -> StoreResult<usize> {
    let prefix = key::encode::<&str>(object_type, &[])?;
    Ok(store.scan_prefix(&prefix)?.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
