//! Real-time full-duplex voice conversation client: microphone capture and
//! encoding, a persistent WebSocket to the speech service, transcript and
//! synthesized-speech handling, and gap-free playback with barge-in.

mod audio_io;
mod client;
mod engine;
mod error;
mod hooks;
mod playback;
mod session;
mod watchdog;

pub use voicechat_types as types;
pub use voicechat_utils as utils;

pub use client::config::{Config, ConfigBuilder};
pub use client::{Client, connect, connect_with_config};
pub use error::{Error, Result};
pub use hooks::{AudioLifecycle, Hooks};
pub use session::{ConnectionState, SessionSnapshot};
