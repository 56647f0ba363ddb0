//! Tool-call classification.
//!
//! Pure functions over the wire category and the free-text title. The rules
//! live in one ordered table so they can be read, and tested, in isolation
//! from the state machine.

use crate::acp::schema::ToolCategory;

/// Bridge-side classification of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolClass {
    /// Reading file contents.
    Read,
    /// Listing a directory.
    List,
    /// Creating, editing, moving or deleting files.
    Write,
    /// Searching.
    Search,
    /// Running a command.
    Command,
    /// Delegated to a tool of an attached third-party server.
    ExternalTool,
    /// Retrieving external data.
    Fetch,
    /// Internal reasoning.
    Think,
    /// Switching session mode.
    SwitchMode,
    /// Anything else.
    Other,
}

/// Title prefix the agents use for delegated third-party tools.
const EXTERNAL_TITLE_PREFIX: &str = "mcp__";

/// Internal bookkeeping tools hidden from progress (case-insensitive exact).
pub const SUPPRESSED_TITLES: &[&str] = &[
    "todowrite",
    "todo_write",
    "update todos",
    "update_plan",
    "write todos",
];

/// One classification rule: matches on category and title, first hit wins.
struct Rule {
    category: Option<ToolCategory>,
    title_contains: Option<&'static str>,
    title_prefix: Option<&'static str>,
    class: ToolClass,
}

impl Rule {
    const fn category(category: ToolCategory, class: ToolClass) -> Self {
        Self {
            category: Some(category),
            title_contains: None,
            title_prefix: None,
            class,
        }
    }

    fn matches(&self, category: ToolCategory, title: &str) -> bool {
        self.category.map_or(true, |c| c == category)
            && self.title_contains.map_or(true, |needle| title.contains(needle))
            && self.title_prefix.map_or(true, |prefix| title.starts_with(prefix))
    }
}

/// Ordered rule table. Titles are compared lower-cased.
const RULES: &[Rule] = &[
    Rule::category(ToolCategory::Mcp, ToolClass::ExternalTool),
    Rule {
        category: None,
        title_contains: None,
        title_prefix: Some(EXTERNAL_TITLE_PREFIX),
        class: ToolClass::ExternalTool,
    },
    Rule {
        category: Some(ToolCategory::Read),
        title_contains: Some("list"),
        title_prefix: None,
        class: ToolClass::List,
    },
    Rule::category(ToolCategory::Read, ToolClass::Read),
    Rule::category(ToolCategory::Edit, ToolClass::Write),
    Rule::category(ToolCategory::Delete, ToolClass::Write),
    Rule::category(ToolCategory::Move, ToolClass::Write),
    Rule::category(ToolCategory::Search, ToolClass::Search),
    Rule::category(ToolCategory::Execute, ToolClass::Command),
    Rule::category(ToolCategory::Fetch, ToolClass::Fetch),
    Rule::category(ToolCategory::Think, ToolClass::Think),
    Rule::category(ToolCategory::SwitchMode, ToolClass::SwitchMode),
];

/// Classify a call from its wire category (absent means `other`) and title.
#[must_use]
pub fn classify(category: Option<ToolCategory>, title: &str) -> ToolClass {
    let category = category.unwrap_or(ToolCategory::Other);
    let title = title.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.matches(category, &title))
        .map_or(ToolClass::Other, |rule| rule.class)
}

/// Whether a title names an internal bookkeeping tool.
#[must_use]
pub fn is_suppressed(title: &str) -> bool {
    let title = title.trim();
    SUPPRESSED_TITLES
        .iter()
        .any(|suppressed| suppressed.eq_ignore_ascii_case(title))
}

/// Current-action label shown while a call of this class runs.
#[must_use]
pub fn action_label(class: ToolClass) -> &'static str {
    match class {
        ToolClass::Read | ToolClass::List | ToolClass::Search => "Analyzing",
        ToolClass::Write => "Writing",
        ToolClass::Command => "Running command",
        ToolClass::ExternalTool => "Calling tool",
        ToolClass::Fetch => "Fetching",
        ToolClass::Think => "Thinking",
        ToolClass::SwitchMode | ToolClass::Other => "Working",
    }
}
