//! HTTP API feeding the panel's presentation layer
//!
//! Serves the fleet listing, dispatch reports, the selected node's status
//! and the clock board as JSON.

pub mod control;
pub mod fleet;
pub mod health;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::dispatch::Dispatcher;
use crate::nodes::NodeRegistry;
use crate::polling::DisplayBoard;
use crate::rpc::RpcClient;
use crate::session::Session;
use crate::{Error, Result};

/// Shared state for API handlers
pub struct ApiState {
    pub rpc: Arc<dyn RpcClient>,
    pub registry: NodeRegistry,
    pub dispatcher: Dispatcher,
    pub session: Session,
    pub board: DisplayBoard,
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
}

/// Error returned from handlers
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self.0 {
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid request"),
            Error::NotImplemented(_) => (StatusCode::NOT_IMPLEMENTED, "not implemented"),
            Error::Registry(_) => (StatusCode::SERVICE_UNAVAILABLE, "DSM server not responding"),
            Error::Rpc(_) => (StatusCode::BAD_GATEWAY, "node not responding"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        };

        if status.is_server_error() {
            tracing::warn!(error = %self.0, "request failed");
        }

        let body = ErrorBody {
            error: error.to_string(),
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Builds and runs the API server
pub struct ApiServerBuilder {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub const fn new(state: Arc<ApiState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to start
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

/// Assemble all routes over shared state
pub fn build_router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::router())
        .merge(fleet::router(Arc::clone(&state)))
        .merge(control::router(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
