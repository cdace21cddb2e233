//! Turning raw `perform_actions` arguments into [`Action`]s.
//!
//! Models usually return clean JSON, but not always. Parsing tries, in
//! order:
//! 1. the text as-is
//! 2. the body of a markdown code block
//! 3. either of the above with trailing commas removed
//!
//! The parsed value may be `{"actions": [...]}`, a bare array, or a single
//! action object. Each element goes through [`Action::from_json`], so an
//! unknown kind becomes [`Action::Unhandled`] rather than an error.

use serde_json::Value;

use chronicle_types::Action;

use crate::error::RunnerError;

/// Parse tool-call arguments into actions.
pub fn parse_actions(raw: &str) -> Result<Vec<Action>, RunnerError> {
    let value = parse_lenient(raw)?;
    actions_from_value(&value)
}

fn parse_lenient(raw: &str) -> Result<Value, RunnerError> {
    let trimmed = raw.trim();
    let fenced = extract_json_from_codeblock(trimmed);

    let candidates = [Some(trimmed), fenced].into_iter().flatten();
    for candidate in candidates.clone() {
        if let Ok(value) = serde_json::from_str(candidate) {
            return Ok(value);
        }
    }
    for candidate in candidates {
        if let Ok(value) = serde_json::from_str(&strip_trailing_commas(candidate)) {
            return Ok(value);
        }
    }

    Err(RunnerError::Parse(format!(
        "no JSON could be recovered from: {trimmed}"
    )))
}

fn actions_from_value(value: &Value) -> Result<Vec<Action>, RunnerError> {
    let items = match value {
        Value::Object(map) => match map.get("actions") {
            Some(Value::Array(items)) => items.as_slice(),
            Some(other) => {
                return Err(RunnerError::Parse(format!(
                    "`actions` is not an array: {other}"
                )));
            }
            None if map.contains_key("type") => std::slice::from_ref(value),
            None => {
                return Err(RunnerError::Parse(
                    "object has neither `actions` nor `type`".to_owned(),
                ));
            }
        },
        Value::Array(items) => items.as_slice(),
        other => {
            return Err(RunnerError::Parse(format!(
                "expected an object or array, got {other}"
            )));
        }
    };
    Ok(items.iter().map(Action::from_json).collect())
}

/// The body of the first markdown code block, with or without a language
/// tag.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let (_, after_fence) = text.split_once("```")?;
    // Skip the language tag line, if there is one.
    let body = match after_fence.split_once('\n') {
        Some((tag, rest)) if !tag.trim_start().starts_with(['{', '[']) => rest,
        _ => after_fence,
    };
    let (inner, _) = body.split_once("```")?;
    Some(inner.trim())
}

/// Remove commas that directly precede a closing brace or bracket, leaving
/// string contents alone.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            out.push(c);
            continue;
        }
        match c {
            '"' => in_string = true,
            ',' => {
                let rest = chars.clone().find(|ch| !ch.is_whitespace());
                if matches!(rest, Some('}' | ']')) {
                    continue;
                }
            }
            _ => {}
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chronicle_types::{AgentId, CityId};

    use super::*;

    #[test]
    fn wrapped_actions_parse_in_order() {
        let raw = r#"{"actions": [
            {"type": "MOVE", "targetCity": "ember-forges"},
            {"type": "CHAT", "targetId": "Mydei", "content": "On my way."}
        ]}"#;
        let actions = parse_actions(raw).unwrap();
        assert_eq!(
            actions,
            vec![
                Action::Move {
                    target_city: CityId::new("ember-forges")
                },
                Action::Chat {
                    target_id: "Mydei".to_owned(),
                    content: "On my way.".to_owned()
                },
            ]
        );
    }

    #[test]
    fn bare_array_and_single_object_are_accepted() {
        assert_eq!(
            parse_actions(r#"[{"type": "REST"}]"#).unwrap(),
            vec![Action::Rest]
        );
        assert_eq!(
            parse_actions(r#"{"type": "inspect", "targetId": "hero_2"}"#).unwrap(),
            vec![Action::Inspect {
                target_id: AgentId::new("hero_2")
            }]
        );
    }

    #[test]
    fn fenced_block_is_unwrapped() {
        let raw = "Here you go:\n```json\n{\"actions\": [{\"type\": \"FORAGE\"}]}\n```\nGood luck.";
        assert_eq!(parse_actions(raw).unwrap(), vec![Action::Forage]);
    }

    #[test]
    fn trailing_commas_are_repaired() {
        let raw = r#"{"actions": [{"type": "REST",},],}"#;
        assert_eq!(parse_actions(raw).unwrap(), vec![Action::Rest]);
    }

    #[test]
    fn commas_inside_strings_survive() {
        let raw = r#"{"actions": [{"type": "CHAT", "targetId": "hero_2", "content": "wait, ]"},]}"#;
        let actions = parse_actions(raw).unwrap();
        assert!(matches!(
            actions.first(),
            Some(Action::Chat { content, .. }) if content == "wait, ]"
        ));
    }

    #[test]
    fn unknown_kinds_become_unhandled() {
        let actions = parse_actions(r#"{"actions": [{"type": "DANCE"}]}"#).unwrap();
        assert!(matches!(actions.first(), Some(Action::Unhandled { kind, .. }) if kind == "DANCE"));
    }

    #[test]
    fn empty_action_list_is_fine() {
        assert!(parse_actions(r#"{"actions": []}"#).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_actions("I think I will rest now.").is_err());
        assert!(parse_actions("").is_err());
        assert!(parse_actions(r#"{"actions": "rest"}"#).is_err());
        assert!(parse_actions(r#"{"reasoning": "tired"}"#).is_err());
    }

    #[test]
    fn codeblock_without_language_tag() {
        assert_eq!(
            extract_json_from_codeblock("```\n{\"a\": 1}\n```"),
            Some("{\"a\": 1}")
        );
        assert_eq!(
            extract_json_from_codeblock("```{\"a\": 1}```"),
            Some("{\"a\": 1}")
        );
    }
}
