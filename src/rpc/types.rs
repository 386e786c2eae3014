//! RPC transport types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Network location of an RPC server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Application-level error reported by the remote side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcFault {
    pub code: i64,
    pub message: String,
}

/// What a remote call produced when the transport itself succeeded
#[derive(Debug, Clone, PartialEq)]
pub enum RpcReply {
    /// A payload, opaque to the transport
    Value(serde_json::Value),
    /// The server answered with a fault
    Fault(RpcFault),
    /// The server answered with nothing
    Empty,
}

/// Name the JSON shape of a payload, for diagnostics
#[must_use]
pub const fn describe_shape(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn endpoint_displays_host_and_port() {
        assert_eq!(Endpoint::new("dsm319", 30002).to_string(), "dsm319:30002");
    }

    #[test]
    fn shapes_are_named() {
        assert_eq!(describe_shape(&json!(null)), "null");
        assert_eq!(describe_shape(&json!([1, 2])), "array");
        assert_eq!(describe_shape(&json!({"a": 1})), "object");
        assert_eq!(describe_shape(&json!("ok")), "string");
    }
}
