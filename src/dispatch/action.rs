//! Control actions forwarded to nodes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Remote method that carries device test operations
pub const SENSOR_ACTION_METHOD: &str = "SensorAction";

/// A named control action
///
/// The known variants are the ones the panel offers or that need extra
/// validation; any other name is forwarded verbatim through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    Start,
    Stop,
    Restart,
    Quit,
    /// List the A/D cards on a node
    ListDevices,
    /// Drive a calibration voltage onto an A/D channel; needs `voltage`
    TestVoltage,
    /// Automated calibration run, disabled in this control plane
    AutoCal,
    Other(String),
}

impl Action {
    /// Name as shown to and typed by the operator
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Start => "Start",
            Self::Stop => "Stop",
            Self::Restart => "Restart",
            Self::Quit => "Quit",
            Self::ListDevices => "List_NCAR_A2Ds",
            Self::TestVoltage => "TestVoltage",
            Self::AutoCal => "AutoCal",
            Self::Other(name) => name,
        }
    }

    /// Method invoked on the node's RPC server
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::TestVoltage => SENSOR_ACTION_METHOD,
            other => other.name(),
        }
    }

    /// Whether this action is stubbed and must never reach a node
    #[must_use]
    pub const fn is_guarded(&self) -> bool {
        matches!(self, Self::AutoCal)
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let action = match name {
            "" => return Err(Error::InvalidRequest("action is not set".to_string())),
            "Start" => Self::Start,
            "Stop" => Self::Stop,
            "Restart" => Self::Restart,
            "Quit" => Self::Quit,
            "List_NCAR_A2Ds" | "ListDevices" => Self::ListDevices,
            "TestVoltage" | "testVoltage" => Self::TestVoltage,
            "AutoCal" => Self::AutoCal,
            other => Self::Other(other.to_string()),
        };
        Ok(action)
    }
}

impl TryFrom<String> for Action {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.name().to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
