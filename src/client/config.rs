use std::time::Duration;

use secrecy::SecretString;

use crate::client::consts;

/// Connection settings for the voice service.
pub struct Config {
    base_url: String,
    api_key: Option<SecretString>,
    language: String,
    input_device: Option<String>,
    output_device: Option<String>,
    tts_sample_rate: f64,
    response_timeout: Duration,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    /// Endpoint of the speech service; `http(s)://` values are rewritten to
    /// `ws(s)://` at connect time.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.api_key = Some(SecretString::from(api_key.to_string()));
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.config.language = language.to_string();
        self
    }

    pub fn with_input_device(mut self, name: &str) -> Self {
        self.config.input_device = Some(name.to_string());
        self
    }

    pub fn with_output_device(mut self, name: &str) -> Self {
        self.config.output_device = Some(name.to_string());
        self
    }

    pub fn with_tts_sample_rate(mut self, rate: f64) -> Self {
        self.config.tts_sample_rate = rate;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.config.response_timeout = timeout;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Config {
    /// Defaults, with the endpoint, token and language taken from the
    /// environment when present.
    pub fn new() -> Self {
        Self {
            base_url: std::env::var(consts::WS_URL_ENV)
                .unwrap_or_else(|_| consts::DEFAULT_BASE_URL.to_string()),
            api_key: std::env::var(consts::API_KEY_ENV).ok().map(SecretString::from),
            language: std::env::var(consts::LANGUAGE_ENV)
                .unwrap_or_else(|_| consts::DEFAULT_LANGUAGE.to_string()),
            input_device: None,
            output_device: None,
            tts_sample_rate: voicechat_utils::audio::TTS_PCM16_SAMPLE_RATE,
            response_timeout: consts::RESPONSE_TIMEOUT,
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn input_device(&self) -> Option<&str> {
        self.input_device.as_deref()
    }

    pub fn output_device(&self) -> Option<&str> {
        self.output_device.as_deref()
    }

    pub fn tts_sample_rate(&self) -> f64 {
        self.tts_sample_rate
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }
}
