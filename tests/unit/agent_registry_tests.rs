//! Unit tests for the agent name → launch command registry.

use std::collections::BTreeMap;

use agent_bridge::agents::{agent_table, resolve_agent, AgentCommand};
use agent_bridge::AppError;

#[test]
fn builtin_agents_resolve() {
    let none = BTreeMap::new();

    let claude = resolve_agent("claude", &none).expect("claude");
    assert_eq!(claude.program, "npx");
    assert_eq!(claude.args, vec!["-y", "@zed-industries/claude-code-acp"]);

    let gemini = resolve_agent("gemini", &none).expect("gemini");
    assert_eq!(gemini.to_string(), "gemini --experimental-acp");
}

#[test]
fn overrides_replace_and_extend_builtins() {
    let mut overrides = BTreeMap::new();
    overrides.insert("claude".to_owned(), AgentCommand::new("claude-acp", &[]));
    overrides.insert("local".to_owned(), AgentCommand::new("./agent", &["--acp"]));

    let table = agent_table(&overrides);

    assert_eq!(table["claude"], AgentCommand::new("claude-acp", &[]));
    assert_eq!(table["local"].args, vec!["--acp"]);
    assert!(table.contains_key("codex"));
    assert_eq!(table.len(), 4);
}

#[test]
fn unknown_agent_lists_known_names() {
    let err = resolve_agent("cursor", &BTreeMap::new()).expect_err("unknown");

    assert_eq!(
        err,
        AppError::NotFound("unknown agent 'cursor' (known: claude, codex, gemini)".into())
    );
}
