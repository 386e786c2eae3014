//! Command requests and their caller-side validation

use indexmap::{IndexMap, IndexSet};
use serde_json::json;

use super::action::Action;
use crate::{Error, Result};

/// Parameter required by `TestVoltage`
pub const VOLTAGE_PARAM: &str = "voltage";

/// Argument naming the `SensorAction` operation
const SUB_ACTION_KEY: &str = "action";

/// A control action aimed at one or more nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub action: Action,
    /// Target node ids; iteration order is report order
    pub targets: IndexSet<String>,
    pub parameters: IndexMap<String, String>,
}

impl CommandRequest {
    /// Create a request with no parameters
    ///
    /// Duplicate targets collapse to their first occurrence.
    #[must_use]
    pub fn new<I, S>(action: Action, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            action,
            targets: targets.into_iter().map(Into::into).collect(),
            parameters: IndexMap::new(),
        }
    }

    /// Add a parameter
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Check the request before any node is contacted
    ///
    /// # Errors
    ///
    /// Returns `NotImplemented` for a guarded action, and `InvalidRequest`
    /// for an empty target set, a blank target id, or a `TestVoltage`
    /// without a finite `voltage` or carrying its own `action`
    pub fn validate(&self) -> Result<()> {
        if let Action::Other(name) = &self.action {
            if name.trim().is_empty() {
                return Err(Error::InvalidRequest("action is not set".to_string()));
            }
        }

        if self.action.is_guarded() {
            return Err(Error::NotImplemented(format!(
                "{} is disabled in this control plane",
                self.action
            )));
        }

        if self.targets.is_empty() {
            return Err(Error::InvalidRequest("no target nodes selected".to_string()));
        }
        if self.targets.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::InvalidRequest("blank target node id".to_string()));
        }

        if self.action == Action::TestVoltage {
            if self.parameters.contains_key(SUB_ACTION_KEY) {
                return Err(Error::InvalidRequest(format!(
                    "TestVoltage sets {SUB_ACTION_KEY:?} itself"
                )));
            }
            self.validate_voltage()?;
        }

        Ok(())
    }

    fn validate_voltage(&self) -> Result<()> {
        // "0" is a legitimate level and must not be mistaken for a missing value
        let Some(raw) = self
            .parameters
            .get(VOLTAGE_PARAM)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
        else {
            return Err(Error::InvalidRequest(
                "TestVoltage requires a voltage parameter".to_string(),
            ));
        };

        match raw.parse::<f64>() {
            Ok(volts) if volts.is_finite() => Ok(()),
            _ => Err(Error::InvalidRequest(format!(
                "voltage must be numeric, got {raw:?}"
            ))),
        }
    }

    /// Argument payload sent with every per-target call
    #[must_use]
    pub fn args(&self) -> serde_json::Value {
        let mut args = serde_json::Map::new();
        let fixed_sub_action = self.action == Action::TestVoltage;
        if fixed_sub_action {
            args.insert(SUB_ACTION_KEY.to_string(), json!("testVoltage"));
        }
        for (key, value) in &self.parameters {
            if fixed_sub_action && key == SUB_ACTION_KEY {
                continue;
            }
            args.insert(key.clone(), json!(value));
        }
        serde_json::Value::Object(args)
    }
}
