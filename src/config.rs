//! Global configuration parsing and validation.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::acp::schema::{McpServer, NameValue};
use crate::agents::AgentCommand;
use crate::{AppError, Result};

/// Configurable timeout values (seconds) for the session handshake and turn.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Bound on the `initialize` exchange.
    #[serde(default = "default_initialize_seconds")]
    pub initialize_seconds: u64,
    /// Bound on the prompt turn; 0 means no timeout.
    #[serde(default)]
    pub prompt_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            initialize_seconds: default_initialize_seconds(),
            prompt_seconds: 0,
        }
    }
}

fn default_initialize_seconds() -> u64 {
    30
}

fn default_agent() -> String {
    "claude".into()
}

/// An external tool server that can be attached to a session.
///
/// Exactly one of `command` (stdio server) or `url` (HTTP server) is set.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct McpServerConfig {
    /// Unique name used by `--mcp`.
    pub name: String,
    /// Executable for a stdio server.
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments for a stdio server.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment for a stdio server.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Endpoint of an HTTP server.
    #[serde(default)]
    pub url: Option<String>,
    /// Headers for an HTTP server.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl McpServerConfig {
    /// Wire descriptor sent in `session/new`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` unless exactly one of `command` / `url` is set.
    pub fn descriptor(&self) -> Result<McpServer> {
        match (&self.command, &self.url) {
            (Some(command), None) => Ok(McpServer::Stdio {
                name: self.name.clone(),
                command: command.clone(),
                args: self.args.clone(),
                env: name_values(&self.env),
            }),
            (None, Some(url)) => Ok(McpServer::Http {
                kind: "http".into(),
                name: self.name.clone(),
                url: url.clone(),
                headers: name_values(&self.headers),
            }),
            _ => Err(AppError::Config(format!(
                "mcp server '{}' needs exactly one of `command` or `url`",
                self.name
            ))),
        }
    }
}

fn name_values(map: &BTreeMap<String, String>) -> Vec<NameValue> {
    map.iter()
        .map(|(name, value)| NameValue {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Agent used when `--agent` is not given.
    #[serde(default = "default_agent")]
    pub default_agent: String,
    /// Forward agent stderr into debug logs.
    #[serde(default)]
    pub log_agent_stderr: bool,
    /// Timeout configuration.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Agent launch commands overriding or extending the built-ins.
    #[serde(default)]
    pub agents: BTreeMap<String, AgentCommand>,
    /// External tool servers available for attachment.
    #[serde(default)]
    pub mcp_servers: Vec<McpServerConfig>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_agent: default_agent(),
            log_agent_stderr: false,
            timeouts: TimeoutConfig::default(),
            agents: BTreeMap::new(),
            mcp_servers: Vec::new(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Bound on the `initialize` exchange.
    #[must_use]
    pub fn initialize_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.initialize_seconds)
    }

    /// Bound on the prompt turn, if any.
    #[must_use]
    pub fn prompt_timeout(&self) -> Option<Duration> {
        (self.timeouts.prompt_seconds > 0).then(|| Duration::from_secs(self.timeouts.prompt_seconds))
    }

    /// Descriptors for the named servers, in the order given.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for a name with no configured server.
    pub fn mcp_descriptors(&self, names: &[String]) -> Result<Vec<McpServer>> {
        names
            .iter()
            .map(|name| {
                self.mcp_servers
                    .iter()
                    .find(|server| &server.name == name)
                    .ok_or_else(|| AppError::NotFound(format!("mcp server '{name}' is not configured")))
                    .and_then(McpServerConfig::descriptor)
            })
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.timeouts.initialize_seconds == 0 {
            return Err(AppError::Config(
                "timeouts.initialize_seconds must be greater than zero".into(),
            ));
        }

        for (name, command) in &self.agents {
            if command.program.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "agent '{name}' has an empty command"
                )));
            }
        }

        let mut seen = HashSet::new();
        for server in &self.mcp_servers {
            if !seen.insert(server.name.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate mcp server name '{}'",
                    server.name
                )));
            }
            server.descriptor()?;
        }

        Ok(())
    }
}
