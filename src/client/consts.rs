use std::time::Duration;

pub const WS_URL_ENV: &str = "VOICECHAT_WS_URL";
pub const API_KEY_ENV: &str = "VOICECHAT_API_KEY";
pub const LANGUAGE_ENV: &str = "VOICECHAT_LANGUAGE";

pub const DEFAULT_BASE_URL: &str = "ws://localhost:8000/ws/voice";
pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const DEFAULT_CAPACITY: usize = 1024;

pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// How long to wait for an agent response after a final transcript before
/// logging a warning. Expiry is never fatal: the service may still be
/// synthesizing audio.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);
