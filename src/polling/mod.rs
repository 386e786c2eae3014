//! Periodic refresh of fleet clocks and the selected node's status
//!
//! Every tick refreshes all clocks with one `GetClocks` call. Every
//! `detail_every`th tick also refreshes the detailed status of the selected
//! node, or clears it when nothing is selected. Ticks never overlap.

mod cycle;
mod display;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub use cycle::PollCycle;
pub use display::{BoardState, DisplayBoard, DisplaySink};

use crate::error::RpcError;
use crate::nodes::NodeRegistry;
use crate::rpc::{Endpoint, RpcClient, RpcReply, describe_shape};
use crate::session::SelectionState;

/// Method returning a mapping of node id to clock string
pub const CLOCKS_METHOD: &str = "GetClocks";

/// Method returning the display-ready status of one node
pub const STATUS_METHOD: &str = "GetStatus";

/// Shortest tick period `Poller::start` will schedule
pub const MIN_PERIOD: Duration = Duration::from_millis(10);

/// Fetch the fleet clock summary
///
/// # Errors
///
/// Returns `RpcError` if the transport fails
pub async fn fetch_clocks(
    rpc: &dyn RpcClient,
    endpoint: &Endpoint,
) -> Result<Vec<(String, String)>, RpcError> {
    let reply = rpc.call(endpoint, CLOCKS_METHOD, &json!([])).await?;

    let clocks = match reply {
        RpcReply::Value(serde_json::Value::Object(map)) => map
            .into_iter()
            .map(|(id, value)| {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (id, text)
            })
            .collect(),
        RpcReply::Value(other) => {
            tracing::warn!(shape = describe_shape(&other), "unexpected clock summary shape");
            Vec::new()
        }
        RpcReply::Fault(fault) => {
            tracing::warn!(message = %fault.message, "clock summary faulted");
            Vec::new()
        }
        RpcReply::Empty => Vec::new(),
    };

    Ok(clocks)
}

/// Fetch the detailed status of one node
///
/// # Errors
///
/// Returns `RpcError` if the transport fails
pub async fn fetch_status(
    rpc: &dyn RpcClient,
    endpoint: &Endpoint,
    node_id: &str,
) -> Result<RpcReply, RpcError> {
    rpc.call(endpoint, STATUS_METHOD, &json!([node_id])).await
}

/// Show a status reply, returning what is now displayed
pub async fn apply_status(sink: &dyn DisplaySink, reply: RpcReply) -> Option<serde_json::Value> {
    let shown = match reply {
        RpcReply::Value(value) => value,
        RpcReply::Fault(fault) => serde_json::Value::String(format!("fault: {}", fault.message)),
        RpcReply::Empty => {
            sink.clear_status().await;
            return None;
        }
    };
    sink.set_status(shown.clone()).await;
    Some(shown)
}

/// The polling scheduler
pub struct Poller {
    rpc: Arc<dyn RpcClient>,
    endpoint: Endpoint,
    selection: SelectionState,
    sink: Arc<dyn DisplaySink>,
    cycle: PollCycle,
    stopped: Arc<AtomicBool>,
}

impl Poller {
    /// Create a poller; clock and status calls go to the registry's status endpoint
    #[must_use]
    pub fn new(
        rpc: Arc<dyn RpcClient>,
        registry: &NodeRegistry,
        selection: SelectionState,
        sink: Arc<dyn DisplaySink>,
        detail_every: u32,
    ) -> Self {
        Self {
            rpc,
            endpoint: registry.status_endpoint(),
            selection,
            sink,
            cycle: PollCycle::new(detail_every),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current position in the cadence
    #[must_use]
    pub const fn cycle(&self) -> PollCycle {
        self.cycle
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Run one tick to completion
    ///
    /// Results that arrive after the poller was stopped are dropped.
    pub async fn tick(&mut self) {
        match fetch_clocks(self.rpc.as_ref(), &self.endpoint).await {
            Ok(clocks) if !self.is_stopped() => {
                for (id, value) in clocks {
                    self.sink.update_clock(&id, value).await;
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, endpoint = %self.endpoint, "clock refresh failed"),
        }

        if !self.cycle.advance() {
            return;
        }

        let Some(node_id) = self.selection.get().await else {
            if !self.is_stopped() {
                self.sink.clear_status().await;
            }
            return;
        };

        match fetch_status(self.rpc.as_ref(), &self.endpoint, &node_id).await {
            Ok(reply) if !self.is_stopped() => {
                apply_status(self.sink.as_ref(), reply).await;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, node = %node_id, "status refresh failed"),
        }
    }

    /// Start ticking every `period` in a background task
    ///
    /// With `enabled` false (static / low-bandwidth clients) nothing is
    /// spawned and no tick ever runs. The flag is only consulted here.
    #[must_use]
    pub fn start(mut self, period: Duration, enabled: bool) -> PollHandle {
        let stopped = Arc::clone(&self.stopped);

        if !enabled {
            tracing::info!("static mode: periodic refresh disabled");
            return PollHandle {
                stopped,
                shutdown_tx: None,
                task: None,
            };
        }

        let period = if period.is_zero() {
            tracing::warn!(
                fallback_ms = u64::try_from(MIN_PERIOD.as_millis()).unwrap_or(u64::MAX),
                "zero polling period, using the minimum"
            );
            MIN_PERIOD
        } else {
            period
        };

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tracing::info!(
            period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
            detail_every = self.cycle.detail_every(),
            "polling started"
        );

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Skip the first immediate tick
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => self.tick().await,
                    _ = shutdown_rx.recv() => break,
                }
                if self.is_stopped() {
                    break;
                }
            }

            tracing::info!("polling stopped");
        });

        PollHandle {
            stopped,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("endpoint", &self.endpoint)
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}

/// Control handle for a started poller
///
/// Dropping the handle stops the poller.
#[derive(Debug)]
pub struct PollHandle {
    stopped: Arc<AtomicBool>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Whether a tick loop is active
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Acquire)
            && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop scheduling ticks; an in-flight tick finishes but its results are dropped
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        if let Some(tx) = &self.shutdown_tx {
            match tx.try_send(()) {
                // Full: a stop is already pending. Closed: the loop has exited.
                Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
                Err(mpsc::error::TrySendError::Closed(())) => {
                    tracing::debug!("polling loop already exited");
                }
            }
        }
    }

    /// Wait for the tick loop to exit
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "polling task ended abnormally");
            }
        }
    }
}
