//! Command fan-out to DSM nodes
//!
//! One call per target, at most `max_in_flight` at a time. A target that
//! faults or stays silent only affects its own outcome; the report always
//! holds one outcome per target, in target order.

pub mod action;
pub mod report;
pub mod request;

use std::sync::Arc;

use chrono::Utc;
use futures::{StreamExt, stream};
use tracing::Instrument;
use uuid::Uuid;

pub use action::{Action, SENSOR_ACTION_METHOD};
pub use report::{DispatchOutcome, DispatchReport, OutcomeStatus};
pub use request::{CommandRequest, VOLTAGE_PARAM};

use crate::nodes::NodeRegistry;
use crate::rpc::RpcClient;
use crate::Result;

/// Sends control actions to nodes and collects their outcomes
#[derive(Clone)]
pub struct Dispatcher {
    rpc: Arc<dyn RpcClient>,
    registry: NodeRegistry,
    max_in_flight: usize,
}

impl Dispatcher {
    /// Create a dispatcher
    #[must_use]
    pub fn new(rpc: Arc<dyn RpcClient>, registry: NodeRegistry, max_in_flight: usize) -> Self {
        Self {
            rpc,
            registry,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Send `request` to every target and report each outcome
    ///
    /// No retries: each target gets exactly one attempt.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` or `NotImplemented` if the request fails
    /// validation; in that case no node is contacted
    pub async fn dispatch(&self, request: &CommandRequest) -> Result<DispatchReport> {
        request.validate()?;

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "dispatch",
            %request_id,
            action = %request.action,
            targets = request.targets.len()
        );

        async move {
            let args = request.args();
            let args = &args;
            let method = request.action.method();

            let outcomes: Vec<DispatchOutcome> = stream::iter(request.targets.iter().cloned())
                .map(move |target| async move { self.dispatch_one(&target, method, args).await })
                .buffered(self.max_in_flight)
                .collect()
                .await;

            let report = DispatchReport {
                request_id,
                action: request.action.to_string(),
                outcomes,
                completed_at: Utc::now(),
            };

            tracing::info!(
                ok = report.ok_count(),
                fault = report.fault_count(),
                no_response = report.no_response_count(),
                "dispatch complete"
            );

            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn dispatch_one(
        &self,
        target: &str,
        method: &str,
        args: &serde_json::Value,
    ) -> DispatchOutcome {
        let node = self.registry.resolve(target);
        let endpoint = self.registry.endpoint(&node);

        let status = OutcomeStatus::classify(self.rpc.call(&endpoint, method, args).await);

        match &status {
            OutcomeStatus::Ok(_) => {
                tracing::debug!(node = target, %endpoint, "command accepted");
            }
            OutcomeStatus::Fault(message) => {
                tracing::warn!(node = target, %endpoint, %message, "command faulted");
            }
            OutcomeStatus::NoResponse => {
                tracing::warn!(node = target, %endpoint, "node not responding");
            }
        }

        DispatchOutcome {
            node_id: target.to_string(),
            status,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("max_in_flight", &self.max_in_flight)
            .finish_non_exhaustive()
    }
}
