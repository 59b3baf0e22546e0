//! End-to-end assistant pipeline tests against a scripted text backend.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use echohub::assistant::{AssistantOutcome, Orchestrator, PromptTemplates, error_codes};
use echohub::llm::{LlmError, ModelListing, TextBackend};
use echohub_devices::{
    DeviceRegistry, DeviceStatus, ManualClock, RegistrationRequest, RegistryConfig,
};

/// Replies with queued responses in order and records every call.
#[derive(Default)]
struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedBackend {
    fn new(replies: impl IntoIterator<Item = Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::default(),
        })
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_owned(), prompt.to_owned()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::ProviderError("script exhausted".into())))
    }

    async fn list_models(&self) -> Result<Vec<ModelListing>, LlmError> {
        Ok(Vec::new())
    }
}

const PHONE_MAC: &str = "11:22:33:44:55:66";
const LAMP_MAC: &str = "AA:BB:CC:DD:EE:FF";

fn registry() -> Arc<DeviceRegistry> {
    let registry = DeviceRegistry::in_memory();
    registry.register(
        RegistrationRequest::new("phone-1", "Pixel", "Pixel 8", "10.0.0.5").with_mac(PHONE_MAC),
    );
    registry.register(
        RegistrationRequest::new("lamp-1", "Lamp", "ESP32", "10.0.0.7").with_mac(LAMP_MAC),
    );
    Arc::new(registry)
}

fn orchestrator(backend: Arc<ScriptedBackend>, registry: Arc<DeviceRegistry>) -> Orchestrator {
    Orchestrator::new(backend, registry, PromptTemplates::default(), "gemini-test")
}

fn pass1(category: &str, user_data: &str) -> Result<String, LlmError> {
    Ok(format!(
        r#"{{"category": "{category}", "confidence": 0.9, "reasoning": "test", "user-data": "{user_data}"}}"#
    ))
}

#[tokio::test]
async fn bt_control_targets_registered_device() {
    let backend = ScriptedBackend::new([
        pass1("bt-control", "turn on the lamp"),
        Ok("LIGHT_ON\nTARGET_DEVICE: Lamp".to_owned()),
    ]);
    let registry = registry();
    let outcome = orchestrator(backend.clone(), registry.clone())
        .handle_request("turn on the lamp", PHONE_MAC, None)
        .await;

    let AssistantOutcome::Response(result) = outcome else {
        panic!("expected a device-control response, got {outcome:?}");
    };
    assert_eq!(result.task, "bt-control");
    assert_eq!(result.user_data, "turn on the lamp");
    assert_eq!(result.processing_device, "server");
    assert_eq!(result.source_device, format!("Pixel (MAC: {PHONE_MAC})"));
    assert_eq!(result.target_device, format!("Lamp (MAC: {LAMP_MAC})"));
    assert_eq!(result.parent_device, result.target_device);
    assert_eq!(result.output.generated_output, "LIGHT_ON");
    assert!(result.error.is_none());

    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(model, _)| model == "gemini-test"));
    assert!(calls[0].1.contains("turn on the lamp"));
    assert!(calls[1].1.contains(LAMP_MAC), "pass 2 prompt lists devices");
}

#[tokio::test]
async fn bt_control_reports_missing_device() {
    let backend = ScriptedBackend::new([
        pass1("bt-control", "start the robot"),
        Ok("ROBOT_START\nTARGET_DEVICE: Robot".to_owned()),
    ]);
    let outcome = orchestrator(backend, registry())
        .handle_request("start the robot", PHONE_MAC, None)
        .await;

    let json = outcome.to_json();
    assert_eq!(json["status"], "success");
    let result = &json["result"];
    assert_eq!(result["target-device"], "Robot (NOT FOUND)");
    assert_eq!(
        result["output"]["generated_output"],
        "ERROR:DEVICE_NOT_FOUND:Robot"
    );
    assert_eq!(result["error"]["code"], error_codes::DEVICE_NOT_FOUND);
}

#[tokio::test]
async fn bt_control_brings_offline_target_back_online() {
    let clock = Arc::new(ManualClock::starting_now());
    let registry = Arc::new(DeviceRegistry::with_clock(
        &RegistryConfig::default(),
        None,
        clock.clone(),
    ));
    registry.register(
        RegistrationRequest::new("phone-1", "Pixel", "Pixel 8", "10.0.0.5").with_mac(PHONE_MAC),
    );
    // An IP-shaped MAC is stored as sent but the record is keyed by device id.
    registry.register(
        RegistrationRequest::new("fan-1", "Fan", "ESP32", "10.0.0.9").with_mac("192.168.1.9"),
    );
    clock.advance(chrono::Duration::minutes(3));
    assert_eq!(registry.update_device_statuses(), 2);
    let before = registry.get_device("fan-1").unwrap();
    assert_eq!(before.status, DeviceStatus::Offline);
    assert_eq!(before.mac_address, "192.168.1.9");

    clock.advance(chrono::Duration::seconds(5));
    let backend = ScriptedBackend::new([
        pass1("bt-control", "turn on the fan"),
        Ok("FAN_ON\nTARGET_DEVICE: Fan".to_owned()),
    ]);
    let outcome = orchestrator(backend, registry.clone())
        .handle_request("turn on the fan", PHONE_MAC, None)
        .await;

    let AssistantOutcome::Response(result) = outcome else {
        panic!("expected a device-control response, got {outcome:?}");
    };
    assert_eq!(result.target_device, "Fan (MAC: 192.168.1.9)");
    assert!(result.error.is_none());

    let after = registry.get_device("fan-1").unwrap();
    assert_eq!(after.status, DeviceStatus::Online);
    assert!(after.last_seen > before.last_seen);
}

#[tokio::test]
async fn missing_device_leaves_registry_untouched() {
    let registry = registry();
    let before = registry.entries();
    let backend = ScriptedBackend::new([
        pass1("bt-control", "start the robot"),
        Ok("ROBOT_START\nTARGET_DEVICE: Robot".to_owned()),
    ]);
    let outcome = orchestrator(backend, registry.clone())
        .handle_request("start the robot", PHONE_MAC, None)
        .await;

    assert!(!outcome.is_failure());
    assert_eq!(registry.entries(), before);
}

#[tokio::test]
async fn bt_control_uses_parent_for_bluetooth_accessory() {
    let registry = registry();
    registry.register(
        RegistrationRequest::new("buds-1", "Buds", "Earbuds", "10.0.0.5")
            .with_mac("22:33:44:55:66:77")
            .with_device_type("bluetooth")
            .with_parent(PHONE_MAC),
    );
    let backend = ScriptedBackend::new([
        pass1("bt-control", "pause the buds"),
        Ok("PAUSE\nTARGET_DEVICE: buds".to_owned()),
    ]);
    let outcome = orchestrator(backend, registry)
        .handle_request("pause the buds", PHONE_MAC, None)
        .await;

    let AssistantOutcome::Response(result) = outcome else {
        panic!("expected a device-control response, got {outcome:?}");
    };
    assert_eq!(result.target_device, "Buds (MAC: 22:33:44:55:66:77)");
    assert_eq!(result.parent_device, format!("Pixel (MAC: {PHONE_MAC})"));
}

#[tokio::test]
async fn text_generation_returns_stream_directive() {
    let backend = ScriptedBackend::new([pass1("text-generation", "hello there")]);
    let outcome = orchestrator(backend.clone(), registry())
        .handle_request("hello there", PHONE_MAC, Some("gemini-2.5-pro"))
        .await;

    let AssistantOutcome::Stream(directive) = outcome else {
        panic!("expected a stream directive, got {outcome:?}");
    };
    assert_eq!(directive.prompt, "hello there");
    assert_eq!(directive.model.as_deref(), Some("gemini-2.5-pro"));

    let calls = backend.calls();
    assert_eq!(calls.len(), 1, "text generation needs only pass 1");
    assert_eq!(calls[0].0, "gemini-2.5-pro");
}

#[tokio::test]
async fn pass1_repairs_double_braces() {
    let backend = ScriptedBackend::new([Ok(
        "```json\n{{\"category\": \"text-generation\", \"confidence\": 0.8, \"reasoning\": \"chat\", \"user-data\": \"tell me a joke\"}}\n```"
            .to_owned(),
    )]);
    let outcome = orchestrator(backend, registry())
        .handle_request("tell me a joke", PHONE_MAC, None)
        .await;
    let AssistantOutcome::Stream(directive) = outcome else {
        panic!("expected a stream directive, got {outcome:?}");
    };
    assert_eq!(directive.prompt, "tell me a joke");
}

#[tokio::test]
async fn unknown_category_fails() {
    let backend = ScriptedBackend::new([pass1("weather", "is it raining")]);
    let outcome = orchestrator(backend, registry())
        .handle_request("is it raining", PHONE_MAC, None)
        .await;

    assert!(outcome.is_failure());
    let json = outcome.to_json();
    assert_eq!(json["error"]["code"], error_codes::UNKNOWN_CATEGORY);
    assert_eq!(json["error"]["message"], "Unknown category: weather");
}

#[tokio::test]
async fn malformed_pass1_is_categorization_failure() {
    let backend = ScriptedBackend::new([Ok("I think this is a device command".to_owned())]);
    let outcome = orchestrator(backend, registry())
        .handle_request("turn on the lamp", PHONE_MAC, None)
        .await;

    let json = outcome.to_json();
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], error_codes::CATEGORIZATION_FAILED);
}

#[tokio::test]
async fn missing_pass1_field_is_categorization_failure() {
    let backend = ScriptedBackend::new([Ok(
        r#"{"category": "bt-control", "confidence": 0.9, "reasoning": "x"}"#.to_owned(),
    )]);
    let outcome = orchestrator(backend, registry())
        .handle_request("turn on the lamp", PHONE_MAC, None)
        .await;

    let json = outcome.to_json();
    assert_eq!(json["error"]["code"], error_codes::CATEGORIZATION_FAILED);
    assert!(
        json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("user-data")
    );
}

#[tokio::test]
async fn backend_failure_is_generation_failure() {
    let backend = ScriptedBackend::new([Err(LlmError::AuthError("bad key".into()))]);
    let outcome = orchestrator(backend, registry())
        .handle_request("hello", PHONE_MAC, None)
        .await;

    let json = outcome.to_json();
    assert_eq!(json["error"]["code"], error_codes::GENERATION_FAILED);
}
