//! Parsing of raw backend output for both passes.

use serde_json::{Map, Value};

use super::error::{AssistantError, Result};
use super::types::Pass1Result;

/// Fields pass 1 must return.
pub const PASS1_REQUIRED_FIELDS: [&str; 4] = ["category", "confidence", "reasoning", "user-data"];

const TARGET_MARKER: &str = "TARGET_DEVICE:";

/// Strip markdown fences and return the outermost `{...}` span, or the
/// trimmed text when there is none.
pub fn extract_json(text: &str) -> String {
    let cleaned = text.replace("```json", "").replace("```", "");
    match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => cleaned[start..=end].to_owned(),
        _ => cleaned.trim().to_owned(),
    }
}

/// Collapse a leading `{{` and trailing `}}` into single braces.
fn repair_double_braces(json: &str) -> &str {
    let mut repaired = json;
    if repaired.starts_with("{{") {
        repaired = &repaired[1..];
    }
    if repaired.ends_with("}}") {
        repaired = &repaired[..repaired.len() - 1];
    }
    repaired
}

fn parse_object(json: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Parse pass 1 output into a [`Pass1Result`].
///
/// # Errors
///
/// [`AssistantError::Categorization`] when no JSON object can be recovered or
/// a required field is missing.
pub fn parse_pass1(raw: &str) -> Result<Pass1Result> {
    let candidate = extract_json(raw);
    let object = parse_object(&candidate)
        .or_else(|| parse_object(repair_double_braces(&candidate)))
        .ok_or_else(|| {
            AssistantError::Categorization(format!("pass 1 output is not a JSON object: {raw}"))
        })?;

    if let Some(missing) = PASS1_REQUIRED_FIELDS
        .iter()
        .find(|field| !object.contains_key(**field))
    {
        return Err(AssistantError::Categorization(format!(
            "Pass 1 output missing required field: {missing}"
        )));
    }

    let text = |key: &str| match &object[key] {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(Pass1Result {
        category: text("category"),
        confidence: object["confidence"].clone(),
        reasoning: text("reasoning"),
        user_data: text("user-data"),
    })
}

/// Command and target device parsed from pass 2 output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pass2Output {
    pub command: String,
    /// Empty when the output had no `TARGET_DEVICE:` line.
    pub target_device: String,
}

/// Scan pass 2 output: the first non-empty line that is not a
/// `TARGET_DEVICE:` line is the command; the last `TARGET_DEVICE:` line
/// names the target. Without a command line the whole trimmed output is the
/// command.
pub fn parse_pass2(raw: &str) -> Pass2Output {
    let mut command = String::new();
    let mut target_device = String::new();

    for line in raw.trim().lines().map(str::trim) {
        if let Some(target) = line.strip_prefix(TARGET_MARKER) {
            target_device = target.trim().to_owned();
        } else if !line.is_empty() && command.is_empty() {
            command = line.to_owned();
        }
    }

    if command.is_empty() {
        command = raw.trim().to_owned();
    }
    Pass2Output {
        command,
        target_device,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    const VALID: &str = r#"{"category": "bt-control", "confidence": 0.93, "reasoning": "device command", "user-data": "turn on the lamp"}"#;

    #[test]
    fn parses_plain_json() {
        let result = parse_pass1(VALID).unwrap();
        assert_eq!(result.category, "bt-control");
        assert_eq!(result.user_data, "turn on the lamp");
        assert_eq!(result.confidence, serde_json::json!(0.93));
    }

    #[test]
    fn strips_markdown_fences_and_prose() {
        let raw = format!("Sure! Here you go:\n```json\n{VALID}\n```\nHope that helps.");
        assert_eq!(parse_pass1(&raw).unwrap().reasoning, "device command");
    }

    #[test]
    fn repairs_doubled_braces() {
        let raw = format!("{{{VALID}}}");
        assert_eq!(parse_pass1(&raw).unwrap().category, "bt-control");
    }

    #[test]
    fn nested_objects_are_not_mangled() {
        let raw = r#"{"category": "text-generation", "confidence": 1, "reasoning": "r", "user-data": "x", "extra": {"a": {"b": 1}}}"#;
        let result = parse_pass1(raw).unwrap();
        assert_eq!(result.user_data, "x");
    }

    #[test]
    fn missing_field_is_categorization_error() {
        let raw = r#"{"category": "bt-control", "confidence": 0.5, "reasoning": "r"}"#;
        let err = parse_pass1(raw).unwrap_err();
        assert_eq!(err.code(), "CATEGORIZATION_FAILED");
        assert!(err.message().contains("user-data"));
    }

    #[test]
    fn garbage_is_categorization_error() {
        let err = parse_pass1("I cannot help with that.").unwrap_err();
        assert_eq!(err.code(), "CATEGORIZATION_FAILED");
    }

    #[test]
    fn pass2_command_then_target() {
        let out = parse_pass2("LIGHT_ON\nTARGET_DEVICE: Lamp\n");
        assert_eq!(out.command, "LIGHT_ON");
        assert_eq!(out.target_device, "Lamp");
    }

    #[test]
    fn pass2_target_first() {
        let out = parse_pass2("TARGET_DEVICE: Speaker\n\nVOLUME:30");
        assert_eq!(out.command, "VOLUME:30");
        assert_eq!(out.target_device, "Speaker");
    }

    #[test]
    fn pass2_without_target() {
        let out = parse_pass2("  PLAY  \nPAUSE");
        assert_eq!(out.command, "PLAY");
        assert!(out.target_device.is_empty());
    }

    #[test]
    fn pass2_only_target_falls_back_to_whole_output() {
        let out = parse_pass2("TARGET_DEVICE: Fan");
        assert_eq!(out.command, "TARGET_DEVICE: Fan");
        assert_eq!(out.target_device, "Fan");
    }
}
