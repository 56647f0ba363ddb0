//! Unit tests for tool-call classification and action labels.

use agent_bridge::acp::schema::ToolCategory;
use agent_bridge::tracker::classify::{action_label, classify, is_suppressed, ToolClass};

#[test]
fn read_category_is_read() {
    assert_eq!(classify(Some(ToolCategory::Read), "Read src/lib.rs"), ToolClass::Read);
}

#[test]
fn read_with_list_in_title_is_list() {
    assert_eq!(classify(Some(ToolCategory::Read), "List src/"), ToolClass::List);
    assert_eq!(classify(Some(ToolCategory::Read), "LIST_DIRECTORY"), ToolClass::List);
}

#[test]
fn edit_delete_and_move_are_writes() {
    for category in [ToolCategory::Edit, ToolCategory::Delete, ToolCategory::Move] {
        assert_eq!(classify(Some(category), "whatever"), ToolClass::Write);
    }
}

#[test]
fn search_and_execute_map_directly() {
    assert_eq!(classify(Some(ToolCategory::Search), "grep"), ToolClass::Search);
    assert_eq!(classify(Some(ToolCategory::Execute), "cargo test"), ToolClass::Command);
}

#[test]
fn mcp_category_is_external() {
    assert_eq!(classify(Some(ToolCategory::Mcp), "lookup"), ToolClass::ExternalTool);
}

#[test]
fn mcp_title_prefix_is_external_regardless_of_category() {
    assert_eq!(
        classify(Some(ToolCategory::Other), "mcp__github__create_issue"),
        ToolClass::ExternalTool
    );
    assert_eq!(classify(None, "MCP__jira__search"), ToolClass::ExternalTool);
    assert_eq!(
        classify(Some(ToolCategory::Read), "mcp__docs__list_pages"),
        ToolClass::ExternalTool,
        "the external rule comes before the list rule"
    );
}

#[test]
fn missing_category_is_other() {
    assert_eq!(classify(None, "Do something"), ToolClass::Other);
}

#[test]
fn fetch_think_and_switch_mode_have_their_own_class() {
    assert_eq!(classify(Some(ToolCategory::Fetch), "GET"), ToolClass::Fetch);
    assert_eq!(classify(Some(ToolCategory::Think), "hmm"), ToolClass::Think);
    assert_eq!(classify(Some(ToolCategory::SwitchMode), "plan"), ToolClass::SwitchMode);
}

#[test]
fn bookkeeping_titles_are_suppressed_case_insensitively() {
    assert!(is_suppressed("TodoWrite"));
    assert!(is_suppressed("  update_plan "));
    assert!(is_suppressed("Update Todos"));
    assert!(!is_suppressed("TodoWrite the report"));
    assert!(!is_suppressed("Read todo.md"));
}

#[test]
fn action_labels_follow_class() {
    assert_eq!(action_label(ToolClass::Read), "Analyzing");
    assert_eq!(action_label(ToolClass::List), "Analyzing");
    assert_eq!(action_label(ToolClass::Write), "Writing");
    assert_eq!(action_label(ToolClass::Command), "Running command");
    assert_eq!(action_label(ToolClass::ExternalTool), "Calling tool");
    assert_eq!(action_label(ToolClass::Other), "Working");
}
