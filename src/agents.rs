//! Agent registry: maps agent names to launch commands.
//!
//! A small built-in table covers the common ACP agents; entries from the
//! `[agents]` config table override or extend it.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{AppError, Result};

/// Executable plus literal argument vector. No shell is involved.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentCommand {
    /// Executable name or path.
    #[serde(rename = "command")]
    pub program: String,
    /// Arguments passed verbatim.
    #[serde(default)]
    pub args: Vec<String>,
}

impl AgentCommand {
    /// Build a command from string slices.
    #[must_use]
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_owned(),
            args: args.iter().map(|&a| a.to_owned()).collect(),
        }
    }
}

impl std::fmt::Display for AgentCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Built-in agents: `(name, program, args)`.
pub const BUILTIN_AGENTS: &[(&str, &str, &[&str])] = &[
    ("claude", "npx", &["-y", "@zed-industries/claude-code-acp"]),
    ("codex", "npx", &["-y", "@zed-industries/codex-acp"]),
    ("gemini", "gemini", &["--experimental-acp"]),
];

/// Merge the built-in table with configured overrides, sorted by name.
#[must_use]
pub fn agent_table(overrides: &BTreeMap<String, AgentCommand>) -> BTreeMap<String, AgentCommand> {
    let mut table: BTreeMap<String, AgentCommand> = BUILTIN_AGENTS
        .iter()
        .map(|(name, program, args)| ((*name).to_owned(), AgentCommand::new(program, args)))
        .collect();
    for (name, command) in overrides {
        table.insert(name.clone(), command.clone());
    }
    table
}

/// Resolve an agent name to its launch command.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] listing the known names when `name` is
/// not registered.
pub fn resolve_agent(
    name: &str,
    overrides: &BTreeMap<String, AgentCommand>,
) -> Result<AgentCommand> {
    let table = agent_table(overrides);
    table.get(name).cloned().ok_or_else(|| {
        let known: Vec<&str> = table.keys().map(String::as_str).collect();
        AppError::NotFound(format!("unknown agent '{name}' (known: {})", known.join(", ")))
    })
}
