//! DSM Control - control plane for an aircraft's data system modules
//!
//! This library provides the two engineering pieces behind the fleet
//! control panel:
//! - Command fan-out to one or many DSM nodes with per-node outcomes
//! - Periodic refresh of fleet clocks and the selected node's status
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Panel / dsmctl / HTTP API               │
//! └───────────┬───────────────────────────┬─────────────┘
//!             │                           │
//! ┌───────────▼───────────┐   ┌───────────▼─────────────┐
//! │   Command Dispatcher  │   │ Session + Poller        │
//! │   (fan-out, report)   │   │ (selection, clocks)     │
//! └───────────┬───────────┘   └───────────┬─────────────┘
//!             │        Node Registry      │
//! ┌───────────▼───────────────────────────▼─────────────┐
//! │                    RPC Client                        │
//! │   dsm_server :30003  │  DSMs :30002  │  status :30006 │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod nodes;
pub mod polling;
pub mod rpc;
pub mod session;

pub use config::Config;
pub use dispatch::{
    Action, CommandRequest, DispatchOutcome, DispatchReport, Dispatcher, OutcomeStatus,
};
pub use error::{Error, RegistryError, Result, RpcError};
pub use nodes::{FleetSnapshot, Node, NodeKind, NodeRegistry};
pub use polling::{DisplayBoard, DisplaySink, PollCycle, PollHandle, Poller};
pub use rpc::{Endpoint, HttpRpcClient, RpcClient, RpcFault, RpcReply};
pub use session::{SelectionState, Session};
