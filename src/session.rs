//! Operator session: node selection and the data the panel displays

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::nodes::NodeRegistry;
use crate::polling::{self, DisplaySink, Poller};
use crate::rpc::{Endpoint, RpcClient};
use crate::Result;

/// The node currently chosen for detailed status display
///
/// Cloning yields another handle to the same value. Last writer wins.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    selected: Arc<RwLock<Option<String>>>,
}

impl SelectionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected node id
    pub async fn get(&self) -> Option<String> {
        self.selected.read().await.clone()
    }

    /// Replace the selection, returning the previous one
    pub async fn set(&self, node_id: Option<String>) -> Option<String> {
        std::mem::replace(&mut *self.selected.write().await, node_id)
    }
}

/// One operator's view of the fleet
pub struct Session {
    rpc: Arc<dyn RpcClient>,
    registry: NodeRegistry,
    status_endpoint: Endpoint,
    selection: SelectionState,
    sink: Arc<dyn DisplaySink>,
    periodic: bool,
}

impl Session {
    /// Create a session
    ///
    /// `periodic` is false for static / low-bandwidth clients, which get no
    /// background refresh.
    #[must_use]
    pub fn new(
        rpc: Arc<dyn RpcClient>,
        registry: NodeRegistry,
        sink: Arc<dyn DisplaySink>,
        periodic: bool,
    ) -> Self {
        Self {
            rpc,
            status_endpoint: registry.status_endpoint(),
            registry,
            selection: SelectionState::new(),
            sink,
            periodic,
        }
    }

    #[must_use]
    pub const fn selection(&self) -> &SelectionState {
        &self.selection
    }

    #[must_use]
    pub const fn is_periodic(&self) -> bool {
        self.periodic
    }

    /// Select a node (or clear the selection) and refresh its status now
    ///
    /// Static sessions also refresh the clocks here, since no poller does.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rpc` if the status call fails at the transport level
    pub async fn select(&self, node_id: Option<String>) -> Result<Option<serde_json::Value>> {
        let node_id = node_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let previous = self.selection.set(node_id.clone()).await;
        tracing::debug!(selected = ?node_id, ?previous, "selection changed");

        if !self.periodic {
            match polling::fetch_clocks(self.rpc.as_ref(), &self.status_endpoint).await {
                Ok(clocks) => {
                    for (id, value) in clocks {
                        self.sink.update_clock(&id, value).await;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "clock refresh failed"),
            }
        }

        let Some(node_id) = node_id else {
            self.sink.clear_status().await;
            return Ok(None);
        };

        let reply =
            polling::fetch_status(self.rpc.as_ref(), &self.status_endpoint, &node_id).await?;
        Ok(polling::apply_status(self.sink.as_ref(), reply).await)
    }

    /// Build a poller sharing this session's selection and display
    #[must_use]
    pub fn poller(&self, detail_every: u32) -> Poller {
        Poller::new(
            Arc::clone(&self.rpc),
            &self.registry,
            self.selection.clone(),
            Arc::clone(&self.sink),
            detail_every,
        )
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("status_endpoint", &self.status_endpoint)
            .field("selection", &self.selection)
            .field("periodic", &self.periodic)
            .finish_non_exhaustive()
    }
}
