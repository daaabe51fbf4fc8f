pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Microphone access refused by the user or the OS.
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    /// No usable audio device.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Socket-level failure. Terminal for the session; reconnecting is an
    /// explicit user action.
    #[error("transport failure: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server declared speech-to-text unavailable for this session.
    #[error("speech service unavailable for this session")]
    ServiceUnavailable,

    #[error("not connected")]
    NotConnected,
}
