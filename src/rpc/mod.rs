//! Remote procedure call transport
//!
//! The control plane only consumes the three-way contract of a remote
//! call: a payload, a fault, or no answer. `HttpRpcClient` is the
//! production adapter; tests substitute their own `RpcClient`.

mod http;
mod types;

use async_trait::async_trait;

pub use http::HttpRpcClient;
pub use types::{Endpoint, RpcFault, RpcReply, describe_shape};

use crate::error::RpcError;

/// A single synchronous remote call
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Invoke `method` on the server at `endpoint`
    ///
    /// # Errors
    ///
    /// Returns `RpcError` when the transport fails; remote faults are
    /// returned as `Ok(RpcReply::Fault(..))`
    async fn call(
        &self,
        endpoint: &Endpoint,
        method: &str,
        args: &serde_json::Value,
    ) -> std::result::Result<RpcReply, RpcError>;
}
