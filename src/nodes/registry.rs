//! Node registry: connection parameters and fleet listing

use serde_json::json;

use super::types::{FleetSnapshot, Node, NodeKind};
use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::rpc::{Endpoint, RpcClient, RpcReply, describe_shape};

/// Method on the control host that lists the fleet
pub const LISTING_METHOD: &str = "GetDsmList";

/// Resolves node identities to endpoints and fetches the fleet
///
/// Nothing is cached: every `list_fleet` call is a fresh query.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    config: RegistryConfig,
}

impl NodeRegistry {
    /// Create a registry from its configuration
    #[must_use]
    pub const fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    /// Port a node's command server listens on
    ///
    /// The controller answers on the control port; everything else on the
    /// fleet port.
    #[must_use]
    pub fn resolve_port(&self, node: &Node) -> u16 {
        if node.kind == NodeKind::LocalController || node.address == self.config.control_host {
            self.config.control_port
        } else {
            self.config.fleet_port
        }
    }

    /// Endpoint for a node's command server
    #[must_use]
    pub fn endpoint(&self, node: &Node) -> Endpoint {
        Endpoint::new(node.address.clone(), self.resolve_port(node))
    }

    /// Endpoint answering the fleet listing query
    #[must_use]
    pub fn control_endpoint(&self) -> Endpoint {
        Endpoint::new(self.config.control_host.clone(), self.config.control_port)
    }

    /// Endpoint answering `GetClocks` and `GetStatus`
    #[must_use]
    pub fn status_endpoint(&self) -> Endpoint {
        Endpoint::new(self.config.control_host.clone(), self.config.status_port)
    }

    /// Fixed entries appended to every fleet listing
    #[must_use]
    pub fn well_known_nodes(&self) -> &[Node] {
        &self.config.well_known
    }

    /// Resolve a target identifier to a node
    ///
    /// Well-known entries match by id or address; anything else is taken as
    /// a fleet member whose id is its host name.
    #[must_use]
    pub fn resolve(&self, id: &str) -> Node {
        self.config
            .well_known
            .iter()
            .find(|n| n.id == id || n.address == id)
            .cloned()
            .unwrap_or_else(|| Node::fleet_member(id, id))
    }

    /// Query the control host for the current fleet
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unavailable` if the query fails or returns an
    /// empty or unusable listing; a partial snapshot is never returned
    pub async fn list_fleet(&self, rpc: &dyn RpcClient) -> Result<FleetSnapshot, RegistryError> {
        let endpoint = self.control_endpoint();
        let unavailable = |reason: String| RegistryError::Unavailable {
            host: endpoint.host.clone(),
            port: endpoint.port,
            reason,
        };

        let reply = rpc
            .call(&endpoint, LISTING_METHOD, &json!([]))
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let listing = match reply {
            RpcReply::Value(serde_json::Value::Object(map)) => map,
            RpcReply::Value(other) => {
                return Err(unavailable(format!(
                    "unexpected listing shape: {}",
                    describe_shape(&other)
                )));
            }
            RpcReply::Fault(fault) => return Err(unavailable(fault.message)),
            RpcReply::Empty => return Err(unavailable("empty listing".to_string())),
        };

        if listing.is_empty() {
            return Err(unavailable("empty listing".to_string()));
        }

        let mut nodes: Vec<Node> = listing
            .into_iter()
            .map(|(id, name)| {
                let display_name = match name {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                Node::fleet_member(id, display_name)
            })
            .collect();

        for node in &self.config.well_known {
            if nodes.iter().all(|n| n.id != node.id) {
                nodes.push(node.clone());
            }
        }

        tracing::debug!(%endpoint, count = nodes.len(), "fleet listing fetched");

        Ok(FleetSnapshot::new(nodes))
    }
}
