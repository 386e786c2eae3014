//! Shared test utilities

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dsm_control::config::RegistryConfig;
use dsm_control::{Endpoint, NodeRegistry, RpcClient, RpcError, RpcFault, RpcReply};
use tokio::sync::Mutex;

type Scripted = Result<RpcReply, RpcError>;

/// A call the mock received
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: Endpoint,
    pub method: String,
    pub args: serde_json::Value,
}

/// Scriptable RPC client
///
/// Replies are queued per `(host, method)`. The last queued reply for a key
/// is repeated once the queue drains; unscripted calls get `RpcReply::Empty`.
#[derive(Default)]
pub struct MockRpc {
    replies: std::sync::Mutex<HashMap<(String, String), VecDeque<Scripted>>>,
    delays: std::sync::Mutex<HashMap<String, Duration>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockRpc {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a reply for `method` on `host`
    pub fn reply(&self, host: &str, method: &str, reply: Scripted) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry((host.to_string(), method.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn value(&self, host: &str, method: &str, value: serde_json::Value) -> &Self {
        self.reply(host, method, Ok(RpcReply::Value(value)))
    }

    pub fn fault(&self, host: &str, method: &str, message: &str) -> &Self {
        self.reply(
            host,
            method,
            Ok(RpcReply::Fault(RpcFault {
                code: 1,
                message: message.to_string(),
            })),
        )
    }

    /// Make every call to `host` take `delay` before answering
    pub fn delay(&self, host: &str, delay: Duration) -> &Self {
        self.delays.lock().unwrap().insert(host.to_string(), delay);
        self
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    fn next_reply(&self, host: &str, method: &str) -> Scripted {
        let mut replies = self.replies.lock().unwrap();
        let Some(queue) = replies.get_mut(&(host.to_string(), method.to_string())) else {
            return Ok(RpcReply::Empty);
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap_or(Ok(RpcReply::Empty))
        }
    }
}

#[async_trait]
impl RpcClient for MockRpc {
    async fn call(
        &self,
        endpoint: &Endpoint,
        method: &str,
        args: &serde_json::Value,
    ) -> Result<RpcReply, RpcError> {
        self.calls.lock().await.push(RecordedCall {
            endpoint: endpoint.clone(),
            method: method.to_string(),
            args: args.clone(),
        });

        let delay = self.delays.lock().unwrap().get(&endpoint.host).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.next_reply(&endpoint.host, method)
    }
}

/// Registry with the stock aircraft configuration
pub fn test_registry() -> NodeRegistry {
    NodeRegistry::new(RegistryConfig::default())
}
