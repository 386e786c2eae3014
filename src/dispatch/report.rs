//! Per-target outcomes and the consolidated dispatch report

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::RpcError;
use crate::rpc::RpcReply;

/// How one target answered
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The node accepted the command and returned this payload
    Ok(serde_json::Value),
    /// The node reported an application error
    Fault(String),
    /// The node did not answer
    NoResponse,
}

impl OutcomeStatus {
    /// Classify the result of one remote call
    ///
    /// Every result maps to exactly one status; nothing is propagated.
    #[must_use]
    pub fn classify(result: Result<RpcReply, RpcError>) -> Self {
        match result {
            Ok(RpcReply::Empty | RpcReply::Value(serde_json::Value::Null)) => Self::NoResponse,
            Ok(RpcReply::Value(serde_json::Value::String(s))) if s.is_empty() => Self::NoResponse,
            Ok(RpcReply::Fault(fault)) => Self::Fault(fault.message),
            Ok(RpcReply::Value(value)) => match embedded_fault(&value) {
                Some(message) => Self::Fault(message),
                None => Self::Ok(value),
            },
            Err(RpcError::Malformed { shape }) => {
                Self::Fault(format!("unknown response type: {shape}"))
            }
            Err(RpcError::Timeout | RpcError::Unreachable(_)) => Self::NoResponse,
        }
    }

    /// Short label for logs and terminal output
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ok(_) => "ok",
            Self::Fault(_) => "fault",
            Self::NoResponse => "no response",
        }
    }
}

/// An XML-RPC fault struct passed through as a plain value by a bridge
fn embedded_fault(value: &serde_json::Value) -> Option<String> {
    let fault = value.get("faultString")?;
    Some(
        fault
            .as_str()
            .map_or_else(|| fault.to_string(), ToString::to_string),
    )
}

/// Outcome for a single target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub node_id: String,
    pub status: OutcomeStatus,
}

/// One outcome per requested target, in request order
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub request_id: Uuid,
    pub action: String,
    pub outcomes: Vec<DispatchOutcome>,
    pub completed_at: DateTime<Utc>,
}

impl DispatchReport {
    /// Number of outcomes
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the report has no outcomes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Iterate outcomes in request order
    pub fn iter(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.outcomes.iter()
    }

    /// Outcome for a given node
    #[must_use]
    pub fn outcome(&self, node_id: &str) -> Option<&DispatchOutcome> {
        self.outcomes.iter().find(|o| o.node_id == node_id)
    }

    #[must_use]
    pub fn ok_count(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Ok(_)))
    }

    #[must_use]
    pub fn fault_count(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Fault(_)))
    }

    #[must_use]
    pub fn no_response_count(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::NoResponse))
    }

    /// Whether every target accepted the command
    #[must_use]
    pub fn all_ok(&self) -> bool {
        self.ok_count() == self.len()
    }

    fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::rpc::RpcFault;

    #[test]
    fn payload_is_ok() {
        let status = OutcomeStatus::classify(Ok(RpcReply::Value(json!("started"))));
        assert_eq!(status, OutcomeStatus::Ok(json!("started")));
    }

    #[test]
    fn fault_keeps_only_the_message() {
        let status = OutcomeStatus::classify(Ok(RpcReply::Fault(RpcFault {
            code: 3,
            message: "dsm process not running".to_string(),
        })));
        assert_eq!(status, OutcomeStatus::Fault("dsm process not running".to_string()));
    }

    #[test]
    fn embedded_fault_struct_is_a_fault() {
        let status = OutcomeStatus::classify(Ok(RpcReply::Value(
            json!({"faultCode": 1, "faultString": "bad device"}),
        )));
        assert_eq!(status, OutcomeStatus::Fault("bad device".to_string()));
    }

    #[test]
    fn empty_answers_are_no_response() {
        assert_eq!(OutcomeStatus::classify(Ok(RpcReply::Empty)), OutcomeStatus::NoResponse);
        assert_eq!(
            OutcomeStatus::classify(Ok(RpcReply::Value(json!("")))),
            OutcomeStatus::NoResponse
        );
        assert_eq!(
            OutcomeStatus::classify(Err(RpcError::Timeout)),
            OutcomeStatus::NoResponse
        );
        assert_eq!(
            OutcomeStatus::classify(Err(RpcError::Unreachable("refused".to_string()))),
            OutcomeStatus::NoResponse
        );
    }

    #[test]
    fn malformed_reply_is_diagnosed() {
        let status = OutcomeStatus::classify(Err(RpcError::Malformed {
            shape: "array".to_string(),
        }));
        assert_eq!(
            status,
            OutcomeStatus::Fault("unknown response type: array".to_string())
        );
    }

    #[test]
    fn serializes_tagged() {
        let outcome = DispatchOutcome {
            node_id: "dsm301".to_string(),
            status: OutcomeStatus::NoResponse,
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"node_id": "dsm301", "status": {"kind": "no_response"}})
        );
    }
}
