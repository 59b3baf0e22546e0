//! Two-pass request handling.
//!
//! ```text
//! START -> PASS1_CATEGORIZE -> TEXT_GENERATION            (stream directive)
//!                           -> BT_CONTROL -> BT_LOOKUP -> BT_RESPOND
//!                           -> ERROR
//! ```

use std::sync::Arc;

use echohub_devices::{DeviceRecord, DeviceRegistry};
use tracing::{debug, info, warn};

use super::error::{AssistantError, Result, error_codes};
use super::parse::{parse_pass1, parse_pass2};
use super::templates::PromptTemplates;
use super::types::{
    AssistantOutcome, BtControlResult, Category, ErrorBody, GeneratedOutput, Pass1Result,
    StreamDirective,
};
use crate::llm::TextBackend;

const BT_CONTROL_TASK: &str = "bt-control";
const PROCESSING_DEVICE: &str = "server";

/// Runs the categorize-then-act pipeline against a text backend and the
/// device registry.
pub struct Orchestrator {
    backend: Arc<dyn TextBackend>,
    registry: Arc<DeviceRegistry>,
    templates: PromptTemplates,
    default_model: String,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("backend", &self.backend.name())
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn TextBackend>,
        registry: Arc<DeviceRegistry>,
        templates: PromptTemplates,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            registry,
            templates,
            default_model: default_model.into(),
        }
    }

    /// Handle one assistant request. Never fails: every error becomes
    /// [`AssistantOutcome::Failure`].
    pub async fn handle_request(
        &self,
        user_query: &str,
        source_mac: &str,
        lm_model: Option<&str>,
    ) -> AssistantOutcome {
        info!(source = source_mac, "assistant request: {user_query}");
        match self.run(user_query, source_mac, lm_model).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("assistant request failed: {err}");
                AssistantOutcome::Failure(err)
            }
        }
    }

    async fn run(
        &self,
        user_query: &str,
        source_mac: &str,
        lm_model: Option<&str>,
    ) -> Result<AssistantOutcome> {
        let pass1 = self.pass1_categorize(user_query, lm_model).await?;
        info!(
            category = %pass1.category,
            confidence = %pass1.confidence,
            "pass 1 complete"
        );

        match Category::parse(&pass1.category) {
            Category::TextGeneration => Ok(AssistantOutcome::Stream(
                self.handle_text_generation(&pass1, lm_model),
            )),
            Category::BtControl => Ok(AssistantOutcome::Response(
                self.handle_bt_control(&pass1, source_mac, lm_model).await?,
            )),
            Category::Other(other) => Err(AssistantError::UnknownCategory(other)),
        }
    }

    fn model_for(&self, lm_model: Option<&str>) -> String {
        lm_model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model)
            .to_owned()
    }

    /// Pass 1: classify the query.
    ///
    /// # Errors
    ///
    /// [`AssistantError::Generation`] when the backend fails,
    /// [`AssistantError::Categorization`] when its output is unusable.
    pub async fn pass1_categorize(
        &self,
        user_query: &str,
        lm_model: Option<&str>,
    ) -> Result<Pass1Result> {
        let prompt = self.templates.render_pass1(user_query);
        let raw = self
            .backend
            .generate(&self.model_for(lm_model), &prompt)
            .await?;
        debug!("pass 1 raw output: {}", raw.trim());
        parse_pass1(raw.trim())
    }

    fn handle_text_generation(&self, pass1: &Pass1Result, lm_model: Option<&str>) -> StreamDirective {
        StreamDirective {
            prompt: pass1.user_data.clone(),
            model: lm_model.map(String::from),
        }
    }

    async fn handle_bt_control(
        &self,
        pass1: &Pass1Result,
        source_mac: &str,
        lm_model: Option<&str>,
    ) -> Result<BtControlResult> {
        let user_data = pass1.user_data.as_str();
        let (keys, devices): (Vec<String>, Vec<DeviceRecord>) =
            self.registry.entries().into_iter().unzip();
        let device_list = format_device_list(&devices);
        debug!("device list:\n{device_list}");

        let prompt = self.templates.render_bt_control(user_data, &device_list)?;
        let raw = self
            .backend
            .generate(&self.model_for(lm_model), &prompt)
            .await?;
        debug!("pass 2 raw output: {}", raw.trim());
        let pass2 = parse_pass2(&raw);
        info!(command = %pass2.command, target = %pass2.target_device, "pass 2 complete");

        let source = describe_device(self.registry.get_device(source_mac).as_ref(), source_mac);

        let Some(index) = find_device_index(&devices, &pass2.target_device) else {
            warn!("pass 2 target '{}' not in registry", pass2.target_device);
            return Ok(BtControlResult {
                task: BT_CONTROL_TASK.to_owned(),
                user_data: user_data.to_owned(),
                processing_device: PROCESSING_DEVICE.to_owned(),
                source_device: source.clone(),
                target_device: format!("{} (NOT FOUND)", pass2.target_device),
                parent_device: source,
                output: GeneratedOutput {
                    generated_output: format!(
                        "ERROR:{}:{}",
                        error_codes::DEVICE_NOT_FOUND,
                        pass2.target_device
                    ),
                },
                error: Some(ErrorBody {
                    code: error_codes::DEVICE_NOT_FOUND.to_owned(),
                    message: format!("Device '{}' not found in registry", pass2.target_device),
                }),
            });
        };

        let (target_key, target) = (&keys[index], &devices[index]);
        let target_str = describe_device(Some(target), &target.mac_address);
        if self.registry.update_last_seen(target_key) {
            debug!(key = %target_key, "refreshed activity for target");
        } else {
            warn!(key = %target_key, "target vanished before its activity could be refreshed");
        }

        let parent_str = match target.parent_device.as_deref() {
            Some(parent) if !parent.is_empty() => {
                describe_device(self.registry.get_device(parent).as_ref(), parent)
            }
            _ => target_str.clone(),
        };

        Ok(BtControlResult {
            task: BT_CONTROL_TASK.to_owned(),
            user_data: user_data.to_owned(),
            processing_device: PROCESSING_DEVICE.to_owned(),
            source_device: source,
            target_device: target_str,
            parent_device: parent_str,
            output: GeneratedOutput {
                generated_output: pass2.command,
            },
            error: None,
        })
    }
}

/// One line per device for the pass 2 prompt.
pub fn format_device_list(devices: &[DeviceRecord]) -> String {
    if devices.is_empty() {
        return "No devices available".to_owned();
    }
    devices
        .iter()
        .map(|d| {
            if d.is_bluetooth() {
                format!(
                    "- {}: {} [Bluetooth, status: {}]",
                    d.display_name(),
                    d.mac_address,
                    d.status
                )
            } else {
                format!("- {}: {} [status: {}]", d.display_name(), d.mac_address, d.status)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Find a device by custom or reported name, case-insensitively.
///
/// Exact matches win over substring matches; within each pass the first
/// device in `devices` order wins. An empty name never matches.
pub fn find_device_by_name<'a>(devices: &'a [DeviceRecord], name: &str) -> Option<&'a DeviceRecord> {
    find_device_index(devices, name).map(|i| &devices[i])
}

/// Position in `devices` of the device [`find_device_by_name`] would pick.
fn find_device_index(devices: &[DeviceRecord], name: &str) -> Option<usize> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    let names = |d: &DeviceRecord| {
        (
            d.custom_name.as_deref().unwrap_or_default().trim().to_lowercase(),
            d.device_name.trim().to_lowercase(),
        )
    };

    devices
        .iter()
        .position(|d| {
            let (custom, reported) = names(d);
            custom == wanted || reported == wanted
        })
        .or_else(|| {
            devices.iter().position(|d| {
                let (custom, reported) = names(d);
                (!custom.is_empty() && custom.contains(&wanted)) || reported.contains(&wanted)
            })
        })
}

/// `"<name> (MAC: <mac>)"`, or `"Unknown (MAC: <mac>)"` for unknown devices.
pub fn describe_device(device: Option<&DeviceRecord>, mac: &str) -> String {
    let name = device.map_or("Unknown", DeviceRecord::display_name);
    format!("{name} (MAC: {mac})")
}
