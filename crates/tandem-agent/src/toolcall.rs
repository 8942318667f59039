//! Tool-call directive parsing.
//!
//! Workers receive LLM text containing `<tool_call name="..." args="..." />`
//! directives.  The `args` attribute carries one of two encodings:
//!
//! 1. **JSON form**: `{"cmd": "<subcommand>", "args": { ... }}`.  The inner
//!    object is flattened into CLI-style `--key value` pairs.
//! 2. **CLI form**: a whitespace-tokenized string whose first token is the
//!    subcommand.
//!
//! Before flattening, common LLM key mistakes are rewritten per subcommand
//! (`path` -> `file`, `pattern` -> `term`, ...), and base64-looking `content`
//! values on `write`/`patch` get an implicit `encoding=base64`.

use serde_json::{Map, Value};

use crate::error::{AgentError, Result};
use crate::tagscan::scan_tags;

/// One extracted (but not yet decoded) tool-call directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallTag {
    /// The `name` attribute (e.g. `@coder`); informational only.
    pub name: String,
    /// The raw `args` attribute value.
    pub args: String,
}

/// A decoded tool call, ready for whitelist checks and execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCall {
    /// The engine subcommand.
    pub subcommand: String,
    /// CLI-style `--key value` arguments.
    pub cli_args: Vec<String>,
}

/// Extract every `<tool_call>` directive from `text`, in textual order.
///
/// Directives missing either attribute are discarded.
pub fn parse_tool_calls(text: &str) -> Vec<ToolCallTag> {
    scan_tags(text, "tool_call")
        .into_iter()
        .filter_map(|tag| {
            let name = tag.attr("name")?.to_owned();
            let args = tag.attr("args")?.to_owned();
            Some(ToolCallTag { name, args })
        })
        .collect()
}

/// Decode an `args` attribute into a subcommand and CLI arguments.
pub fn decode_args(raw: &str) -> Result<DecodedCall> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AgentError::InvalidToolArgs {
            reason: "empty args".to_owned(),
        });
    }

    if trimmed.starts_with('{') {
        decode_json_args(trimmed)
    } else {
        let mut tokens = trimmed.split_whitespace();
        let subcommand = tokens
            .next()
            .ok_or_else(|| AgentError::InvalidToolArgs {
                reason: "missing subcommand".to_owned(),
            })?
            .to_owned();
        Ok(DecodedCall {
            subcommand,
            cli_args: tokens.map(str::to_owned).collect(),
        })
    }
}

/// Decode the JSON form: `{"cmd": "...", "args": {...}}`.
fn decode_json_args(raw: &str) -> Result<DecodedCall> {
    let value: Value = serde_json::from_str(raw).map_err(|e| AgentError::InvalidToolArgs {
        reason: format!("malformed JSON args: {e}"),
    })?;

    let subcommand = value
        .get("cmd")
        .and_then(Value::as_str)
        .ok_or_else(|| AgentError::InvalidToolArgs {
            reason: "JSON args missing string `cmd`".to_owned(),
        })?
        .to_owned();

    let mut args = value
        .get("args")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    normalize_aliases(&subcommand, &mut args);
    apply_base64_heuristic(&subcommand, &mut args);

    let mut cli_args = Vec::with_capacity(args.len() * 2);
    for (key, val) in &args {
        cli_args.push(format!("--{key}"));
        cli_args.push(value_to_string(val));
    }

    Ok(DecodedCall {
        subcommand,
        cli_args,
    })
}

/// Extract the target file path from an `args` attribute, for lock
/// acquisition.  Falls back to scanning CLI tokens for `--file`/`-f`.
pub fn extract_file_path(raw: &str) -> Option<String> {
    if let Ok(decoded) = decode_args(raw) {
        return find_file_flag(&decoded.cli_args);
    }
    let tokens: Vec<String> = raw.split_whitespace().map(str::to_owned).collect();
    find_file_flag(&tokens)
}

fn find_file_flag(tokens: &[String]) -> Option<String> {
    tokens
        .iter()
        .position(|t| t == "--file" || t == "-f")
        .and_then(|i| tokens.get(i + 1))
        .cloned()
}

// ---------------------------------------------------------------------------
// Alias normalization
// ---------------------------------------------------------------------------

/// Key-rewrite rules: `(from, to, applicable subcommands)`.  An empty
/// subcommand list means the rule applies everywhere.
const ALIAS_RULES: &[(&str, &str, &[&str])] = &[
    ("path", "file", &["read", "write", "patch"]),
    ("filepath", "file", &["read", "write", "patch"]),
    ("filename", "file", &["read", "write", "patch"]),
    ("pattern", "term", &["search"]),
    ("query", "term", &["search"]),
    ("regex", "term", &["search"]),
    ("directory", "dir", &[]),
    ("cwd", "dir", &[]),
    ("workdir", "dir", &[]),
    ("command", "cmd", &["exec"]),
    ("content_b64", "content", &["write", "patch"]),
    ("body", "content", &["write", "patch"]),
    ("data", "content", &["write", "patch"]),
    ("begin", "start", &["read"]),
    ("from", "start", &["read"]),
    ("to", "end", &["read"]),
    ("depth", "max-depth", &["tree"]),
    ("max_depth", "max-depth", &["tree"]),
    ("maxdepth", "max-depth", &["tree"]),
];

/// Rewrite common LLM key mistakes for `subcommand`.  Applied once; an
/// existing destination key wins over the alias.
fn normalize_aliases(subcommand: &str, args: &mut Map<String, Value>) {
    for (from, to, applies) in ALIAS_RULES {
        if !applies.is_empty() && !applies.contains(&subcommand) {
            continue;
        }
        if let Some(value) = args.remove(*from) {
            args.entry(to.to_owned()).or_insert(value);
        }
    }
}

/// Mark base64-looking `content` values so the engine decodes them.
fn apply_base64_heuristic(subcommand: &str, args: &mut Map<String, Value>) {
    if subcommand != "write" && subcommand != "patch" {
        return;
    }
    if args.contains_key("encoding") {
        return;
    }
    let Some(content) = args.get("content").and_then(Value::as_str) else {
        return;
    };
    if looks_like_base64(content) {
        args.insert("encoding".to_owned(), Value::String("base64".to_owned()));
    }
}

/// Heuristic: long, and free of whitespace, braces, and angle brackets.
fn looks_like_base64(value: &str) -> bool {
    value.len() > 50
        && !value
            .chars()
            .any(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '{' | '}' | '<' | '>'))
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_pair(call: &DecodedCall, key: &str) -> Option<String> {
        call.cli_args
            .iter()
            .position(|a| a == key)
            .and_then(|i| call.cli_args.get(i + 1))
            .cloned()
    }

    #[test]
    fn extract_self_closing_and_paired() {
        let text = r#"
            <tool_call name="@file" args="read --file a.rs" />
            <tool_call name="@file" args="read --file b.rs"></tool_call>
        "#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args, "read --file a.rs");
    }

    #[test]
    fn missing_attributes_are_discarded() {
        let calls = parse_tool_calls(r#"<tool_call name="@file" />"#);
        assert!(calls.is_empty());
    }

    #[test]
    fn cli_form_decodes() {
        let call = decode_args("search --term TODO --dir src").unwrap();
        assert_eq!(call.subcommand, "search");
        assert_eq!(call.cli_args, vec!["--term", "TODO", "--dir", "src"]);
    }

    #[test]
    fn json_form_flattens() {
        let call = decode_args(r#"{"cmd":"read","args":{"file":"main.rs","start":10}}"#).unwrap();
        assert_eq!(call.subcommand, "read");
        assert_eq!(cli_pair(&call, "--file").as_deref(), Some("main.rs"));
        assert_eq!(cli_pair(&call, "--start").as_deref(), Some("10"));
    }

    #[test]
    fn json_without_args_object() {
        let call = decode_args(r#"{"cmd":"git-status"}"#).unwrap();
        assert_eq!(call.subcommand, "git-status");
        assert!(call.cli_args.is_empty());
    }

    #[test]
    fn malformed_json_errors() {
        let err = decode_args(r#"{"cmd": read}"#).unwrap_err();
        assert!(matches!(err, AgentError::InvalidToolArgs { .. }));
    }

    #[test]
    fn json_missing_cmd_errors() {
        let err = decode_args(r#"{"args":{"file":"x"}}"#).unwrap_err();
        assert!(matches!(err, AgentError::InvalidToolArgs { .. }));
    }

    #[test]
    fn path_alias_rewrites_to_file() {
        let call = decode_args(r#"{"cmd":"read","args":{"path":"main.go"}}"#).unwrap();
        assert_eq!(cli_pair(&call, "--file").as_deref(), Some("main.go"));
        assert!(!call.cli_args.iter().any(|a| a == "--path"));
    }

    #[test]
    fn alias_does_not_overwrite_existing_destination() {
        let call =
            decode_args(r#"{"cmd":"read","args":{"path":"alias.rs","file":"real.rs"}}"#).unwrap();
        assert_eq!(cli_pair(&call, "--file").as_deref(), Some("real.rs"));
        assert!(!call.cli_args.iter().any(|a| a == "--path"));
    }

    #[test]
    fn alias_respects_subcommand_scope() {
        // `pattern` only rewrites for `search`.
        let call = decode_args(r#"{"cmd":"read","args":{"pattern":"x"}}"#).unwrap();
        assert_eq!(cli_pair(&call, "--pattern").as_deref(), Some("x"));

        let call = decode_args(r#"{"cmd":"search","args":{"pattern":"x"}}"#).unwrap();
        assert_eq!(cli_pair(&call, "--term").as_deref(), Some("x"));
    }

    #[test]
    fn dir_alias_applies_everywhere() {
        let call = decode_args(r#"{"cmd":"tree","args":{"directory":"src","max_depth":2}}"#).unwrap();
        assert_eq!(cli_pair(&call, "--dir").as_deref(), Some("src"));
        assert_eq!(cli_pair(&call, "--max-depth").as_deref(), Some("2"));
    }

    #[test]
    fn base64_heuristic_sets_encoding() {
        let blob = "A".repeat(80);
        let call =
            decode_args(&format!(r#"{{"cmd":"write","args":{{"file":"x","content":"{blob}"}}}}"#))
                .unwrap();
        assert_eq!(cli_pair(&call, "--encoding").as_deref(), Some("base64"));
    }

    #[test]
    fn base64_heuristic_skips_plain_text() {
        let prose = "fn main() { println!(\\\"hi\\\"); } // plenty of spaces here to be sure";
        let call =
            decode_args(&format!(r#"{{"cmd":"write","args":{{"file":"x","content":"{prose}"}}}}"#))
                .unwrap();
        assert!(cli_pair(&call, "--encoding").is_none());
    }

    #[test]
    fn base64_heuristic_respects_explicit_encoding() {
        let blob = "B".repeat(80);
        let call = decode_args(&format!(
            r#"{{"cmd":"write","args":{{"file":"x","content":"{blob}","encoding":"utf-8"}}}}"#
        ))
        .unwrap();
        assert_eq!(cli_pair(&call, "--encoding").as_deref(), Some("utf-8"));
    }

    #[test]
    fn file_path_from_json() {
        let path = extract_file_path(r#"{"cmd":"write","args":{"path":"/tmp/x","content":"hi"}}"#);
        assert_eq!(path.as_deref(), Some("/tmp/x"));
    }

    #[test]
    fn file_path_from_cli_tokens() {
        assert_eq!(
            extract_file_path("write --file /tmp/y --content hi").as_deref(),
            Some("/tmp/y")
        );
        assert_eq!(extract_file_path("write -f short.rs").as_deref(), Some("short.rs"));
        assert!(extract_file_path("exec --cmd ls").is_none());
    }
}
