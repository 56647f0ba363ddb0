//! Typed ACP payloads exchanged with the agent.
//!
//! Only the subset of the Agent Client Protocol this bridge consumes is
//! modelled. Unknown enum tags decode to catch-all variants so a newer agent
//! does not break the session.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Protocol version announced in `initialize`.
pub const PROTOCOL_VERSION: u32 = 1;

/// Request identifier carried by agent-initiated requests.
///
/// Our own outbound requests always use integers; the agent may use either.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric identifier.
    Number(i64),
    /// String identifier.
    Text(String),
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// ── initialize ────────────────────────────────────────────────────────────────

/// `initialize` request parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version spoken by the client.
    pub protocol_version: u32,
    /// Capabilities the client offers to the agent.
    pub client_capabilities: ClientCapabilities,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            client_capabilities: ClientCapabilities::default(),
        }
    }
}

/// Client capabilities; the bridge serves no file-system or terminal methods.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    /// File-system access offered to the agent.
    pub fs: FsCapabilities,
    /// Whether the client hosts terminals for the agent.
    pub terminal: bool,
}

/// File-system capability flags.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FsCapabilities {
    /// `fs/read_text_file` support.
    pub read_text_file: bool,
    /// `fs/write_text_file` support.
    pub write_text_file: bool,
}

/// `initialize` result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol version the agent settled on.
    #[serde(default)]
    pub protocol_version: Option<u32>,
    /// Raw agent capability object.
    #[serde(default)]
    pub agent_capabilities: Value,
    /// Agent self-description, when provided.
    #[serde(default)]
    pub agent_info: Option<AgentInfo>,
}

/// Agent name and version reported during `initialize`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AgentInfo {
    /// Agent name.
    pub name: String,
    /// Agent version string.
    #[serde(default)]
    pub version: Option<String>,
}

// ── session/new ───────────────────────────────────────────────────────────────

/// `session/new` request parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionParams {
    /// Absolute working directory for the session.
    pub cwd: PathBuf,
    /// External tool servers attached to the session.
    pub mcp_servers: Vec<McpServer>,
}

/// Descriptor of an external tool server handed to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum McpServer {
    /// Server launched by the agent over stdio.
    Stdio {
        /// Display name.
        name: String,
        /// Executable.
        command: String,
        /// Literal argument vector.
        args: Vec<String>,
        /// Extra environment for the server process.
        env: Vec<NameValue>,
    },
    /// Server reached over streamable HTTP.
    Http {
        /// Always `"http"`.
        #[serde(rename = "type")]
        kind: String,
        /// Display name.
        name: String,
        /// Endpoint URL.
        url: String,
        /// Extra HTTP headers.
        headers: Vec<NameValue>,
    },
}

impl McpServer {
    /// Server display name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Stdio { name, .. } | Self::Http { name, .. } => name,
        }
    }
}

/// `{name, value}` pair used for environment variables and headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameValue {
    /// Variable or header name.
    pub name: String,
    /// Variable or header value.
    pub value: String,
}

/// `session/new` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionResult {
    /// Opaque session identifier.
    pub session_id: String,
    /// Model menu, when the agent supports model switching.
    #[serde(default)]
    pub models: Option<SessionModels>,
}

/// Models the agent offers for a session.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionModels {
    /// Every selectable model.
    #[serde(default)]
    pub available_models: Vec<ModelInfo>,
    /// The model the session starts with.
    pub current_model_id: String,
}

/// One selectable model.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Machine identifier sent back in `session/set_model`.
    pub model_id: String,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

// ── session/set_model ─────────────────────────────────────────────────────────

/// `session/set_model` request parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetModelParams {
    /// Target session.
    pub session_id: String,
    /// Model to switch to.
    pub model_id: String,
}

// ── session/prompt ────────────────────────────────────────────────────────────

/// `session/prompt` request parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptParams {
    /// Target session.
    pub session_id: String,
    /// Prompt content.
    pub prompt: Vec<ContentBlock>,
}

/// A content block. Only text is produced by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// Image, audio, resource and anything newer.
    #[serde(other)]
    Other,
}

/// `session/prompt` result.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PromptResult {
    /// Why the agent stopped.
    pub stop_reason: StopReason,
}

/// Agent-reported terminal classification of a prompt turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The agent finished its turn.
    EndTurn,
    /// The turn was cancelled.
    Cancelled,
    /// Any other agent-defined reason, kept verbatim.
    Other(String),
}

impl<'de> Deserialize<'de> for StopReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "end_turn" => Self::EndTurn,
            "cancelled" => Self::Cancelled,
            _ => Self::Other(raw),
        })
    }
}

impl Display for StopReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndTurn => f.write_str("end_turn"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

// ── session/update ────────────────────────────────────────────────────────────

/// `session/update` notification parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNotification {
    /// Session the update belongs to.
    pub session_id: String,
    /// The update payload.
    pub update: SessionUpdate,
}

/// Session update payloads, tagged by `sessionUpdate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "sessionUpdate", rename_all = "snake_case")]
pub enum SessionUpdate {
    /// A new tool call was started.
    ToolCall(ToolCallStarted),
    /// An existing tool call changed.
    ToolCallUpdate(ToolCallUpdated),
    /// A chunk of the agent's reply text.
    AgentMessageChunk {
        /// Chunk content.
        content: ContentBlock,
    },
    /// Plans, thoughts, mode changes and anything newer.
    #[serde(other)]
    Other,
}

/// Wire `kind` of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Reading files or data.
    Read,
    /// Modifying files.
    Edit,
    /// Removing files.
    Delete,
    /// Moving or renaming files.
    Move,
    /// Searching.
    Search,
    /// Running a command.
    Execute,
    /// Internal reasoning.
    Think,
    /// Retrieving external data.
    Fetch,
    /// Switching session mode.
    SwitchMode,
    /// Delegated to a tool of an attached third-party server.
    Mcp,
    /// Anything else.
    #[serde(other)]
    Other,
}

/// Lifecycle status reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    /// Not started yet.
    Pending,
    /// Running.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl ToolCallStatus {
    /// Whether no further transitions may follow.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// `tool_call` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallStarted {
    /// Call identifier.
    pub tool_call_id: String,
    /// Human title.
    #[serde(default)]
    pub title: String,
    /// Wire category.
    #[serde(default)]
    pub kind: Option<ToolCategory>,
    /// Initial status; some agents report completion immediately.
    #[serde(default)]
    pub status: Option<ToolCallStatus>,
}

/// `tool_call_update` payload. Every field but the id is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallUpdated {
    /// Call identifier.
    pub tool_call_id: String,
    /// New status.
    #[serde(default)]
    pub status: Option<ToolCallStatus>,
    /// Updated title.
    #[serde(default)]
    pub title: Option<String>,
    /// Updated category.
    #[serde(default)]
    pub kind: Option<ToolCategory>,
}

// ── session/request_permission ────────────────────────────────────────────────

/// `session/request_permission` request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    /// Session the request belongs to.
    pub session_id: String,
    /// The call awaiting permission.
    pub tool_call: PermissionToolCall,
    /// Mutually exclusive options.
    pub options: Vec<PermissionOption>,
}

/// Reference to the tool call a permission request is about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionToolCall {
    /// Call identifier.
    pub tool_call_id: String,
    /// Human title, when the agent includes one.
    #[serde(default)]
    pub title: Option<String>,
}

/// One named option of a permission request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionOption {
    /// Machine identifier returned in the reply.
    pub option_id: String,
    /// Label shown to the operator.
    pub name: String,
    /// Classification hint.
    #[serde(default)]
    pub kind: Option<PermissionOptionKind>,
}

/// Classification hint for a permission option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionOptionKind {
    /// Allow this call only.
    AllowOnce,
    /// Allow this and future calls.
    AllowAlways,
    /// Reject this call only.
    RejectOnce,
    /// Reject this and future calls.
    RejectAlways,
    /// A hint this bridge does not know.
    #[serde(other)]
    Unknown,
}

impl PermissionOptionKind {
    /// Short operator-facing hint.
    #[must_use]
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Self::AllowOnce => Some("allow once"),
            Self::AllowAlways => Some("allow always"),
            Self::RejectOnce => Some("reject once"),
            Self::RejectAlways => Some("reject always"),
            Self::Unknown => None,
        }
    }
}

/// Reply to a permission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PermissionOutcome {
    /// The operator picked an option.
    Selected {
        /// The chosen option's id.
        #[serde(rename = "optionId")]
        option_id: String,
    },
    /// The operator declined to choose.
    Cancelled,
}

/// Envelope for [`PermissionOutcome`]: `{ "outcome": { ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionResponse {
    /// The outcome.
    pub outcome: PermissionOutcome,
}
