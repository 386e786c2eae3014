//! Node registry for the DSM fleet
//!
//! Nodes are the data system modules plus a few fixed service hosts.
//! The registry decides where each one is reached and fetches the fleet
//! listing from the control host.

pub mod registry;
pub mod types;

pub use registry::{LISTING_METHOD, NodeRegistry};
pub use types::{FleetSnapshot, MIN_LABEL_WIDTH, Node, NodeKind};
