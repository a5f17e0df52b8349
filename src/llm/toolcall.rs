//! Tool-call extraction from model output.
//!
//! Models request tool use by embedding
//! `<tool_call>{"name": ..., "args": {...}}</tool_call>` markers in
//! their free-text output. Absence of any marker is the normal case,
//! not an error.

use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

use crate::types::ToolCall;

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<tool_call>\s*(\{.*?\})\s*</tool_call>").expect("valid tool-call regex")
    })
}

/// Scan text for tool-call markers, left to right. A marker whose
/// payload is not a JSON object with a `name` string and an `args`
/// object is logged and skipped; later markers are still parsed.
pub fn parse_tool_calls(text: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    for capture in marker_regex().captures_iter(text) {
        let payload = &capture[1];
        match serde_json::from_str::<serde_json::Value>(payload) {
            Ok(value) => {
                let name = value.get("name").and_then(|n| n.as_str());
                let args = value.get("args").filter(|a| a.is_object());
                match (name, args) {
                    (Some(name), Some(args)) => calls.push(ToolCall {
                        name: name.to_string(),
                        args: args.clone(),
                    }),
                    _ => {
                        warn!(payload, "tool call missing name or args, skipping");
                    }
                }
            }
            Err(e) => {
                warn!(payload, error = %e, "malformed tool call JSON, skipping");
            }
        }
    }
    calls
}

/// Strip tool-call markers from text, leaving the surrounding prose.
pub fn strip_tool_calls(text: &str) -> String {
    marker_regex().replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_markers_yields_empty() {
        assert!(parse_tool_calls("Just a normal answer.").is_empty());
        assert!(parse_tool_calls("").is_empty());
    }

    #[test]
    fn test_single_marker() {
        let text = r#"Let me check. <tool_call>{"name": "calculator", "args": {"expression": "2+2"}}</tool_call>"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "calculator");
        assert_eq!(calls[0].args, json!({"expression": "2+2"}));
    }

    #[test]
    fn test_two_markers_in_order() {
        let text = r#"<tool_call>{"name": "first", "args": {}}</tool_call> and
            <tool_call>{"name": "second", "args": {}}</tool_call>"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "first");
        assert_eq!(calls[1].name, "second");
    }

    #[test]
    fn test_case_insensitive_tags() {
        let text = r#"<TOOL_CALL>{"name": "t", "args": {}}</TOOL_CALL>"#;
        assert_eq!(parse_tool_calls(text).len(), 1);
    }

    #[test]
    fn test_malformed_json_skipped_not_fatal() {
        let text = r#"<tool_call>{not json}</tool_call>
            <tool_call>{"name": "good", "args": {"x": 1}}</tool_call>"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "good");
    }

    #[test]
    fn test_missing_name_or_args_skipped() {
        let no_name = r#"<tool_call>{"args": {}}</tool_call>"#;
        assert!(parse_tool_calls(no_name).is_empty());

        let args_not_object = r#"<tool_call>{"name": "t", "args": "loose"}</tool_call>"#;
        assert!(parse_tool_calls(args_not_object).is_empty());
    }

    #[test]
    fn test_strip_tool_calls() {
        let text = r#"Before. <tool_call>{"name": "t", "args": {}}</tool_call> After."#;
        assert_eq!(strip_tool_calls(text), "Before.  After.");
    }
}
