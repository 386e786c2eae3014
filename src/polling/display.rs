//! Display fields fed by the poller and the selection action

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::RwLock;

/// Receiver of refreshed display data
#[async_trait]
pub trait DisplaySink: Send + Sync {
    /// Replace the clock shown for one node
    async fn update_clock(&self, id: &str, value: String);

    /// Replace the detailed status display
    async fn set_status(&self, status: serde_json::Value);

    /// Blank the detailed status display
    async fn clear_status(&self);
}

/// Contents of the display board
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoardState {
    /// Latest clock per node, in first-seen order
    pub clocks: IndexMap<String, String>,
    pub status: Option<serde_json::Value>,
}

/// In-memory display board shared between the poller and readers
#[derive(Debug, Clone, Default)]
pub struct DisplayBoard {
    inner: Arc<RwLock<BoardState>>,
}

impl DisplayBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock values
    pub async fn clocks(&self) -> IndexMap<String, String> {
        self.inner.read().await.clocks.clone()
    }

    /// Current detailed status, if any
    pub async fn status(&self) -> Option<serde_json::Value> {
        self.inner.read().await.status.clone()
    }

    /// Copy of the whole board
    pub async fn snapshot(&self) -> BoardState {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl DisplaySink for DisplayBoard {
    async fn update_clock(&self, id: &str, value: String) {
        self.inner.write().await.clocks.insert(id.to_string(), value);
    }

    async fn set_status(&self, status: serde_json::Value) {
        self.inner.write().await.status = Some(status);
    }

    async fn clear_status(&self) {
        self.inner.write().await.status = None;
    }
}
