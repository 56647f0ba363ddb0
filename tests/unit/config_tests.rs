//! Unit tests for configuration parsing and validation.

use std::io::Write;
use std::time::Duration;

use agent_bridge::acp::schema::{McpServer, NameValue};
use agent_bridge::{AppError, GlobalConfig};

const FULL_CONFIG: &str = r#"
default_agent = "codex"
log_agent_stderr = true

[timeouts]
initialize_seconds = 10
prompt_seconds = 600

[agents.local]
command = "/opt/agent/bin/acp"
args = ["--stdio"]

[[mcp_servers]]
name = "github"
command = "github-mcp"
args = ["serve"]
env = { GITHUB_TOKEN = "t" }

[[mcp_servers]]
name = "docs"
url = "https://docs.example.com/mcp"
headers = { Authorization = "Bearer x" }
"#;

#[test]
fn empty_config_uses_defaults() {
    let config = GlobalConfig::from_toml_str("").expect("empty config is valid");

    assert_eq!(config, GlobalConfig::default());
    assert_eq!(config.default_agent, "claude");
    assert!(!config.log_agent_stderr);
    assert_eq!(config.initialize_timeout(), Duration::from_secs(30));
    assert_eq!(config.prompt_timeout(), None);
}

#[test]
fn full_config_parses() {
    let config = GlobalConfig::from_toml_str(FULL_CONFIG).expect("valid config");

    assert_eq!(config.default_agent, "codex");
    assert!(config.log_agent_stderr);
    assert_eq!(config.initialize_timeout(), Duration::from_secs(10));
    assert_eq!(config.prompt_timeout(), Some(Duration::from_secs(600)));
    assert_eq!(config.agents["local"].program, "/opt/agent/bin/acp");
    assert_eq!(config.agents["local"].args, vec!["--stdio"]);
    assert_eq!(config.mcp_servers.len(), 2);
}

#[test]
fn mcp_descriptors_follow_requested_order() {
    let config = GlobalConfig::from_toml_str(FULL_CONFIG).expect("valid config");

    let servers = config
        .mcp_descriptors(&["docs".to_owned(), "github".to_owned()])
        .expect("descriptors");

    assert_eq!(
        servers,
        vec![
            McpServer::Http {
                kind: "http".to_owned(),
                name: "docs".to_owned(),
                url: "https://docs.example.com/mcp".to_owned(),
                headers: vec![NameValue {
                    name: "Authorization".to_owned(),
                    value: "Bearer x".to_owned()
                }],
            },
            McpServer::Stdio {
                name: "github".to_owned(),
                command: "github-mcp".to_owned(),
                args: vec!["serve".to_owned()],
                env: vec![NameValue {
                    name: "GITHUB_TOKEN".to_owned(),
                    value: "t".to_owned()
                }],
            },
        ]
    );
}

#[test]
fn stdio_descriptor_serializes_in_wire_shape() {
    let config = GlobalConfig::from_toml_str(FULL_CONFIG).expect("valid config");
    let servers = config.mcp_descriptors(&["github".to_owned()]).expect("descriptor");

    let wire = serde_json::to_value(&servers[0]).expect("serialize");

    assert_eq!(
        wire,
        serde_json::json!({
            "name": "github",
            "command": "github-mcp",
            "args": ["serve"],
            "env": [{"name": "GITHUB_TOKEN", "value": "t"}]
        })
    );
}

#[test]
fn unknown_mcp_server_is_not_found() {
    let config = GlobalConfig::default();
    let err = config
        .mcp_descriptors(&["nope".to_owned()])
        .expect_err("must fail");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn zero_initialize_timeout_is_rejected() {
    let err = GlobalConfig::from_toml_str("[timeouts]\ninitialize_seconds = 0\n")
        .expect_err("must fail");
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("initialize_seconds")));
}

#[test]
fn empty_agent_command_is_rejected() {
    let err = GlobalConfig::from_toml_str("[agents.bad]\ncommand = \"  \"\n").expect_err("must fail");
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("bad")));
}

#[test]
fn duplicate_mcp_names_are_rejected() {
    let raw = r#"
[[mcp_servers]]
name = "x"
command = "a"

[[mcp_servers]]
name = "x"
command = "b"
"#;
    let err = GlobalConfig::from_toml_str(raw).expect_err("must fail");
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("duplicate")));
}

#[test]
fn mcp_server_needs_exactly_one_transport() {
    let both = "[[mcp_servers]]\nname = \"x\"\ncommand = \"a\"\nurl = \"http://h\"\n";
    let neither = "[[mcp_servers]]\nname = \"x\"\n";

    assert!(matches!(GlobalConfig::from_toml_str(both), Err(AppError::Config(_))));
    assert!(matches!(GlobalConfig::from_toml_str(neither), Err(AppError::Config(_))));
}

#[test]
fn invalid_toml_is_a_config_error() {
    let err = GlobalConfig::from_toml_str("default_agent = [").expect_err("must fail");
    assert!(matches!(err, AppError::Config(ref msg) if msg.starts_with("invalid config")));
}

#[test]
fn config_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(FULL_CONFIG.as_bytes()).expect("write");

    let config = GlobalConfig::load_from_path(file.path()).expect("load");

    assert_eq!(config.default_agent, "codex");
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = GlobalConfig::load_from_path(dir.path().join("absent.toml")).expect_err("must fail");
    assert!(matches!(err, AppError::Config(_)));
}
