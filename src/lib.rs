//! echohub: device registry and assistant backend for voice clients.
//!
//! Clients (phones, ESP32 boards, Bluetooth accessories relayed by a phone)
//! send audio and text to the hub, which proxies them to external engines:
//!
//! - **STT**: an OpenAI-compatible Whisper server ([`stt`])
//! - **LM**: the Gemini REST API ([`llm`])
//!
//! Around those it keeps a registry of client devices
//! ([`echohub_devices`]) and runs a two-pass assistant ([`assistant`]) that
//! either streams a text answer or turns a spoken request into a command
//! for a registered device.
//!
//! # Architecture
//!
//! - [`server`]: axum router, device-activity middleware, SSE responses
//! - [`catalog`]: which STT/LM models clients may request
//! - [`monitor`]: periodic offline sweep
//! - [`config`], [`dirs`], [`secrets`], [`logging`]: ambient setup

pub mod assistant;
pub mod catalog;
pub mod config;
pub mod dirs;
pub mod error;
pub mod llm;
pub mod logging;
pub mod monitor;
pub mod secrets;
pub mod server;
pub mod stt;

pub use config::HubConfig;
pub use error::{HubError, Result};
pub use echohub_devices::{DeviceRecord, DeviceRegistry, DeviceStatus};
pub use server::{ApiServer, AppState};
