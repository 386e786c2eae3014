//! Fleet listing endpoint

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::{ApiError, ApiState};
use crate::nodes::Node;

/// One row of the node list
#[derive(Debug, Serialize)]
pub struct NodeEntry {
    #[serde(flatten)]
    pub node: Node,
    pub label: String,
}

/// Response for the fleet listing
#[derive(Debug, Serialize)]
pub struct FleetResponse {
    pub nodes: Vec<NodeEntry>,
}

/// Fetch the fleet afresh from the control host
async fn list_fleet(State(state): State<Arc<ApiState>>) -> Result<Json<FleetResponse>, ApiError> {
    let fleet = state
        .registry
        .list_fleet(state.rpc.as_ref())
        .await
        .map_err(crate::Error::from)?;

    let width = fleet.label_width();
    let nodes = fleet
        .iter()
        .map(|node| NodeEntry {
            label: node.label(width),
            node: node.clone(),
        })
        .collect();

    Ok(Json(FleetResponse { nodes }))
}

/// Build fleet routes
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/api/fleet", get(list_fleet)).with_state(state)
}
