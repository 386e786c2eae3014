//! Command dispatch, node selection and display endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState};
use crate::dispatch::{Action, CommandRequest, DispatchReport};

/// REST request for dispatching a command
#[derive(Debug, Deserialize)]
pub struct DispatchBody {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
}

/// REST request for selecting a node
#[derive(Debug, Deserialize)]
pub struct SelectBody {
    pub node_id: Option<String>,
}

/// Selected node and its detailed status
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub selected: Option<String>,
    pub status: Option<serde_json::Value>,
}

async fn dispatch(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<DispatchBody>,
) -> Result<Json<DispatchReport>, ApiError> {
    let action: Action = body.action.parse()?;
    let mut request = CommandRequest::new(action, body.targets);
    request.parameters = body.parameters;

    let report = state.dispatcher.dispatch(&request).await?;
    Ok(Json(report))
}

async fn select(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<SelectBody>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.session.select(body.node_id).await?;
    Ok(Json(StatusResponse {
        selected: state.session.selection().get().await,
        status,
    }))
}

async fn clocks(State(state): State<Arc<ApiState>>) -> Json<IndexMap<String, String>> {
    Json(state.board.clocks().await)
}

async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        selected: state.session.selection().get().await,
        status: state.board.status().await,
    })
}

/// Build control routes
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/dispatch", post(dispatch))
        .route("/api/select", post(select))
        .route("/api/clocks", get(clocks))
        .route("/api/status", get(status))
        .with_state(state)
}
