//! Configuration management for the DSM control plane
//!
//! Values are layered: built-in defaults, then the TOML file, then
//! environment variables. CLI flags are applied last by the binary.

pub mod file;

use std::path::Path;
use std::time::Duration;

use crate::nodes::{Node, NodeKind};
use crate::{Error, Result};

use file::DsmConfigFile;

/// Host identifier of the machine running `dsm_server`
pub const DEFAULT_CONTROL_HOST: &str = "localhost";

/// Port of the control host's listing/command server
pub const DEFAULT_CONTROL_PORT: u16 = 30003;

/// Port every fleet member's command server listens on
pub const DEFAULT_FLEET_PORT: u16 = 30002;

/// Port of the clock/status server on the control host
pub const DEFAULT_STATUS_PORT: u16 = 30006;

/// Client hosts on the aircraft network that get live updates
const DEFAULT_PERIODIC_HOSTS: [&str; 5] = [
    "localhost",
    "192.168.184.1",
    "acserver",
    "acserver.raf.ucar.edu",
    "hyper.guest.ucar.edu",
];

/// Control plane configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub rpc: RpcConfig,
    pub registry: RegistryConfig,
    pub polling: PollingConfig,
    pub dispatch: DispatchConfig,
    pub api_server: ApiServerConfig,
}

/// RPC transport configuration
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Request path on every server
    pub path: String,

    /// Upper bound on a single call
    pub timeout: Duration,
}

/// Node registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub control_host: String,
    pub control_port: u16,
    pub fleet_port: u16,
    pub status_port: u16,

    /// Entries appended to every fleet listing
    pub well_known: Vec<Node>,
}

/// Polling scheduler configuration
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Time between ticks
    pub period: Duration,

    /// Detailed status is refreshed on every Nth tick
    pub detail_every: u32,

    /// Client hosts served at full rate; everyone else gets a static page
    pub periodic_hosts: Vec<String>,
}

/// Command dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum number of per-target calls in flight at once
    pub max_in_flight: usize,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig {
                path: "/RPC2".to_string(),
                timeout: Duration::from_secs(5),
            },
            registry: RegistryConfig::default(),
            polling: PollingConfig {
                period: Duration::from_secs(1),
                detail_every: 3,
                periodic_hosts: DEFAULT_PERIODIC_HOSTS.iter().map(ToString::to_string).collect(),
            },
            dispatch: DispatchConfig { max_in_flight: 8 },
            api_server: ApiServerConfig { port: 30080 },
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            control_host: DEFAULT_CONTROL_HOST.to_string(),
            control_port: DEFAULT_CONTROL_PORT,
            fleet_port: DEFAULT_FLEET_PORT,
            status_port: DEFAULT_STATUS_PORT,
            well_known: default_well_known(),
        }
    }
}

/// The controller itself plus the auxiliary service hosts
#[must_use]
pub fn default_well_known() -> Vec<Node> {
    vec![
        Node::new("dsm_server", "dsm_server", DEFAULT_CONTROL_HOST, NodeKind::LocalController),
        Node::new("nimbus", "nimbus", "nimbus", NodeKind::NamedService),
        Node::new("mtp-pc", "mtp-pc", "mtp-pc", NodeKind::NamedService),
    ]
}

impl PollingConfig {
    /// Whether a client connecting from `client_host` gets live polling
    ///
    /// Clients outside the aircraft network (e.g. over satcom) are served a
    /// static page with no background refresh.
    #[must_use]
    pub fn is_periodic(&self, client_host: &str) -> bool {
        self.periodic_hosts
            .iter()
            .any(|h| h.eq_ignore_ascii_case(client_host))
    }
}

impl Config {
    /// Load configuration from the default file location and process env
    ///
    /// # Errors
    ///
    /// Returns error if the resulting configuration is invalid
    pub fn load() -> Result<Self> {
        let file = file::load_config_file();
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Load configuration from an explicit file and process env
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or the result is invalid
    pub fn load_from(path: &Path) -> Result<Self> {
        let file = file::read_config_file(path)?;
        tracing::info!(path = %path.display(), "loaded config file");
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if the resulting configuration is invalid
    pub fn from_sources(
        file: DsmConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();
        config.apply_file(file);
        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: DsmConfigFile) {
        if let Some(path) = file.rpc.path {
            self.rpc.path = path;
        }
        if let Some(ms) = file.rpc.timeout_ms {
            self.rpc.timeout = Duration::from_millis(ms);
        }

        let registry = file.registry;
        if let Some(host) = registry.control_host {
            self.registry.control_host = host;
        }
        if let Some(port) = registry.control_port {
            self.registry.control_port = port;
        }
        if let Some(port) = registry.fleet_port {
            self.registry.fleet_port = port;
        }
        if let Some(port) = registry.status_port {
            self.registry.status_port = port;
        }
        if let Some(entries) = registry.well_known {
            self.registry.well_known = entries
                .into_iter()
                .map(|e| {
                    let display_name = e.display_name.unwrap_or_else(|| e.id.clone());
                    Node::new(e.id, display_name, e.address, e.kind)
                })
                .collect();
        }

        if let Some(ms) = file.polling.period_ms {
            self.polling.period = Duration::from_millis(ms);
        }
        if let Some(n) = file.polling.detail_every {
            self.polling.detail_every = n;
        }
        if let Some(hosts) = file.polling.periodic_hosts {
            self.polling.periodic_hosts = hosts;
        }

        if let Some(n) = file.dispatch.max_in_flight {
            self.dispatch.max_in_flight = n;
        }
        if let Some(port) = file.server.port {
            self.api_server.port = port;
        }
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(host) = env("DSM_CONTROL_HOST") {
            self.registry.control_host = host;
        }
        if let Some(port) = parse_env(&env, "DSM_CONTROL_PORT") {
            self.registry.control_port = port;
        }
        if let Some(port) = parse_env(&env, "DSM_FLEET_PORT") {
            self.registry.fleet_port = port;
        }
        if let Some(port) = parse_env(&env, "DSM_STATUS_PORT") {
            self.registry.status_port = port;
        }
        if let Some(ms) = parse_env(&env, "DSM_RPC_TIMEOUT_MS") {
            self.rpc.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_env(&env, "DSM_POLL_PERIOD_MS") {
            self.polling.period = Duration::from_millis(ms);
        }
        if let Some(n) = parse_env(&env, "DSM_MAX_IN_FLIGHT") {
            self.dispatch.max_in_flight = n;
        }
        if let Some(port) = parse_env(&env, "DSM_API_PORT") {
            self.api_server.port = port;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.polling.detail_every == 0 {
            return Err(Error::Config("polling.detail_every must be at least 1".to_string()));
        }
        if self.polling.period.is_zero() {
            return Err(Error::Config("polling.period must be non-zero".to_string()));
        }
        if self.dispatch.max_in_flight == 0 {
            return Err(Error::Config("dispatch.max_in_flight must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_aircraft_network() {
        let config = Config::default();
        assert_eq!(config.registry.control_host, "localhost");
        assert_eq!(config.registry.control_port, 30003);
        assert_eq!(config.registry.fleet_port, 30002);
        assert_eq!(config.registry.status_port, 30006);
        assert_eq!(config.polling.detail_every, 3);
        assert_eq!(config.polling.period, Duration::from_secs(1));

        let ids: Vec<&str> = config.registry.well_known.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["dsm_server", "nimbus", "mtp-pc"]);
    }

    #[test]
    fn env_overrides_file() {
        let file: DsmConfigFile = toml::from_str(
            r"
            [registry]
            control_port = 31003
            fleet_port = 31002
            ",
        )
        .unwrap();

        let config =
            Config::from_sources(file, env_from(&[("DSM_CONTROL_PORT", "32003")])).unwrap();
        assert_eq!(config.registry.control_port, 32003);
        assert_eq!(config.registry.fleet_port, 31002);
    }

    #[test]
    fn bad_env_value_is_ignored() {
        let config = Config::from_sources(
            DsmConfigFile::default(),
            env_from(&[("DSM_FLEET_PORT", "not-a-port")]),
        )
        .unwrap();
        assert_eq!(config.registry.fleet_port, DEFAULT_FLEET_PORT);
    }

    #[test]
    fn zero_detail_cadence_is_rejected() {
        let file: DsmConfigFile = toml::from_str("[polling]\ndetail_every = 0").unwrap();
        assert!(matches!(
            Config::from_sources(file, env_from(&[])),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn periodic_hosts_are_case_insensitive() {
        let polling = Config::default().polling;
        assert!(polling.is_periodic("ACServer"));
        assert!(polling.is_periodic("192.168.184.1"));
        assert!(!polling.is_periodic("satcom-relay.example.org"));
    }

    #[test]
    fn load_from_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 8088\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_server.port, 8088);
    }
}
