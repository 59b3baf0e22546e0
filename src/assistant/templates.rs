//! Prompt templates for the two assistant passes.
//!
//! Templates live in a directory with three optional files:
//!
//! | File | Contents |
//! |------|----------|
//! | `pass1_categorization.txt` | pass 1 prompt, `{user_query}` replaced literally |
//! | `pass2_task_prompts.json` | `{"bt-control": {"user_prompt_template": "..."}}` |
//! | `task_schemas.json` | `{"pass2_output_formats": {"bt-control": {"output-format": ...}}}` |
//!
//! Missing files fall back to built-in defaults. A file that exists but is
//! malformed is an error.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use super::error::{AssistantError, Result};

pub const PASS1_FILE: &str = "pass1_categorization.txt";
pub const PASS2_FILE: &str = "pass2_task_prompts.json";
pub const SCHEMAS_FILE: &str = "task_schemas.json";

const BT_CONTROL: &str = "bt-control";

const DEFAULT_PASS1: &str = r#"You are the intent classifier for a voice assistant that can also control nearby devices.

Classify the user's request into exactly one category:
- "text-generation": questions, conversation, or any request answered with text.
- "bt-control": a command for a device (lights, speakers, fans, plugs, Bluetooth accessories).

Respond with a single JSON object and nothing else:
{"category": "<text-generation|bt-control>", "confidence": <0.0-1.0>, "reasoning": "<one sentence>", "user-data": "<the user's request, verbatim>"}

User request: {user_query}"#;

const DEFAULT_BT_CONTROL: &str = r#"You translate a user's request into one command for a device.

Request: {user_data}

Known devices:
{device_list}

Allowed command formats (JSON list, may be null): {output_format}

Reply with exactly two lines:
<the command>
TARGET_DEVICE: <device name from the list>"#;

/// Loaded prompt templates.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplates {
    pub pass1: String,
    pub bt_control: String,
    /// Output-format hint for bt-control, rendered as JSON (`null` when absent).
    pub bt_output_format: Option<Value>,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            pass1: DEFAULT_PASS1.to_owned(),
            bt_control: DEFAULT_BT_CONTROL.to_owned(),
            bt_output_format: None,
        }
    }
}

impl PromptTemplates {
    /// Load templates from `dir`, using defaults for missing files.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Template`] when a present file cannot be read
    /// or lacks the expected structure.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut templates = Self::default();

        if let Some(text) = read_optional(&dir.join(PASS1_FILE))? {
            if !text.contains("{user_query}") {
                return Err(AssistantError::Template(format!(
                    "{PASS1_FILE} has no {{user_query}} placeholder"
                )));
            }
            templates.pass1 = text;
        }

        if let Some(value) = read_optional_json(&dir.join(PASS2_FILE))? {
            templates.bt_control = value
                .get(BT_CONTROL)
                .and_then(|t| t.get("user_prompt_template"))
                .and_then(Value::as_str)
                .map(String::from)
                .ok_or_else(|| {
                    AssistantError::Template(format!(
                        "{PASS2_FILE} has no {BT_CONTROL}.user_prompt_template"
                    ))
                })?;
        }

        if let Some(value) = read_optional_json(&dir.join(SCHEMAS_FILE))? {
            templates.bt_output_format = value
                .get("pass2_output_formats")
                .and_then(|f| f.get(BT_CONTROL))
                .and_then(|f| f.get("output-format"))
                .filter(|f| !is_empty_format(f))
                .cloned();
        }

        info!("prompt templates loaded from {}", dir.display());
        Ok(templates)
    }

    /// The output-format hint as inserted into the pass 2 prompt.
    pub fn output_format_json(&self) -> String {
        match &self.bt_output_format {
            Some(value) => value.to_string(),
            None => "null".to_owned(),
        }
    }

    pub fn render_pass1(&self, user_query: &str) -> String {
        self.pass1.replace("{user_query}", user_query)
    }

    /// # Errors
    ///
    /// Returns [`AssistantError::Template`] for malformed placeholders.
    pub fn render_bt_control(&self, user_data: &str, device_list: &str) -> Result<String> {
        render_format(
            &self.bt_control,
            &[
                ("user_data", user_data),
                ("device_list", device_list),
                ("output_format", &self.output_format_json()),
            ],
        )
    }
}

fn is_empty_format(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} not found, using built-in template", path.display());
            Ok(None)
        }
        Err(e) => Err(AssistantError::Template(format!(
            "failed to read {}: {e}",
            path.display()
        ))),
    }
}

fn read_optional_json(path: &Path) -> Result<Option<Value>> {
    read_optional(path)?
        .map(|text| {
            serde_json::from_str(&text).map_err(|e| {
                AssistantError::Template(format!("invalid JSON in {}: {e}", path.display()))
            })
        })
        .transpose()
}

/// Substitute `{name}` placeholders. `{{` and `}}` are literal braces.
///
/// # Errors
///
/// Unknown placeholders, unclosed `{` and stray `}` are
/// [`AssistantError::Template`] errors.
pub fn render_format(template: &str, vars: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => {
                            return Err(AssistantError::Template(
                                "unclosed '{' in template".into(),
                            ));
                        }
                    }
                }
                let value = vars
                    .iter()
                    .find(|(key, _)| *key == name.trim())
                    .map(|(_, value)| *value)
                    .ok_or_else(|| {
                        AssistantError::Template(format!("unknown placeholder '{{{name}}}'"))
                    })?;
                out.push_str(value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(AssistantError::Template(
                    "single '}' encountered in template".into(),
                ));
            }
            other => out.push(other),
        }
    }
    Ok(out)
}
