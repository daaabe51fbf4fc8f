use secrecy::ExposeSecret;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;

use crate::client::config::Config;
use crate::client::consts::AUTHORIZATION_HEADER;

pub fn build_request(config: &Config) -> tokio_tungstenite::tungstenite::Result<Request> {
    let mut request = normalize_url(config.base_url()).into_client_request()?;
    if let Some(api_key) = config.api_key() {
        request.headers_mut().insert(
            AUTHORIZATION_HEADER,
            format!("Bearer {}", api_key.expose_secret())
                .as_str()
                .parse()?,
        );
    }
    Ok(request)
}

/// Accept http(s) endpoints from configuration and rewrite them to ws(s).
pub fn normalize_url(base_url: &str) -> String {
    if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    }
}
