//! Configuration for kvgate
//!
//! Centralized configuration with sensible defaults, overridable from the
//! environment.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Which front ends this process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// RPC server and HTTP gateway in one process
    All,
    /// RPC server only
    Store,
    /// HTTP gateway only, dialling a remote RPC server
    Gateway,
}

impl Role {
    pub fn runs_store(&self) -> bool {
        matches!(self, Role::All | Role::Store)
    }

    pub fn runs_gateway(&self) -> bool {
        matches!(self, Role::All | Role::Gateway)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Role::All),
            "store" => Ok(Role::Store),
            "gateway" => Ok(Role::Gateway),
            _ => Err("expected one of: all, store, gateway".to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::All => "all",
            Role::Store => "store",
            Role::Gateway => "gateway",
        })
    }
}

/// Main configuration for a kvgate process
#[derive(Debug, Clone)]
pub struct Config {
    pub role: Role,

    // -------------------------------------------------------------------------
    // RPC Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address of the RPC server
    pub rpc_listen_addr: String,

    /// Address the gateway dials to reach the RPC server
    pub rpc_server_addr: String,

    /// Deadline for one RPC call, connect included
    pub rpc_timeout: Duration,

    // -------------------------------------------------------------------------
    // HTTP Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address of the HTTP gateway
    pub http_listen_addr: String,

    /// Time limit for one HTTP request
    pub http_timeout: Duration,

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------
    /// How long in-flight work may drain after a shutdown signal
    pub shutdown_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            role: Role::All,
            rpc_listen_addr: "0.0.0.0:50051".to_string(),
            rpc_server_addr: "127.0.0.1:50051".to_string(),
            rpc_timeout: Duration::from_secs(5),
            http_listen_addr: "0.0.0.0:8080".to_string(),
            http_timeout: Duration::from_secs(15),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(value) = lookup("KVGATE_ROLE") {
            config.role = value.parse().map_err(|reason| ConfigError::Invalid {
                name: "KVGATE_ROLE",
                value,
                reason,
            })?;
        }
        if let Some(value) = lookup("KVGATE_RPC_LISTEN") {
            config.rpc_listen_addr = value;
        }
        if let Some(value) = lookup("KVGATE_HTTP_LISTEN") {
            config.http_listen_addr = value;
        }
        // GRPC_SERVER_ADDRESS is the name older deployments set
        if let Some(value) = lookup("RPC_SERVER_ADDRESS").or_else(|| lookup("GRPC_SERVER_ADDRESS")) {
            config.rpc_server_addr = value;
        }
        if let Some(value) = lookup("KVGATE_RPC_TIMEOUT_MS") {
            config.rpc_timeout = parse_millis("KVGATE_RPC_TIMEOUT_MS", value)?;
        }
        if let Some(value) = lookup("KVGATE_HTTP_TIMEOUT_MS") {
            config.http_timeout = parse_millis("KVGATE_HTTP_TIMEOUT_MS", value)?;
        }
        if let Some(value) = lookup("KVGATE_SHUTDOWN_TIMEOUT_MS") {
            config.shutdown_timeout = parse_millis("KVGATE_SHUTDOWN_TIMEOUT_MS", value)?;
        }

        Ok(config)
    }
}

fn parse_millis(name: &'static str, value: String) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            name,
            value,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(ms) => Ok(Duration::from_millis(ms)),
        Err(e) => Err(ConfigError::Invalid {
            name,
            value,
            reason: e.to_string(),
        }),
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn role(mut self, role: Role) -> Self {
        self.config.role = role;
        self
    }

    /// Set the RPC listen address
    pub fn rpc_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.rpc_listen_addr = addr.into();
        self
    }

    /// Set the RPC server address the gateway dials
    pub fn rpc_server_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.rpc_server_addr = addr.into();
        self
    }

    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.config.rpc_timeout = timeout;
        self
    }

    /// Set the HTTP listen address
    pub fn http_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.http_listen_addr = addr.into();
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
