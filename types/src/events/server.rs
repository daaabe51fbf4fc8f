use crate::audio::Base64EncodedAudioBytes;

/// `connection_ready` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConnectionReadyEvent {}

/// `stt_ready` event
///
/// Grants permission to stream microphone audio.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SttReadyEvent {}

/// `stt_unavailable` event
///
/// Streaming is permanently denied for this session.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SttUnavailableEvent {}

/// `speech_started` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SpeechStartedEvent {}

/// `utterance_end` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UtteranceEndEvent {}

/// `partial_transcript` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PartialTranscriptEvent {
    text: String,
}

impl PartialTranscriptEvent {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `final_transcript` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FinalTranscriptEvent {
    text: String,
}

impl FinalTranscriptEvent {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `agent_response` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AgentResponseEvent {
    text: String,
}

impl AgentResponseEvent {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `audio_chunk` (or `audio`) event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AudioChunkEvent {
    /// One unit of synthesized speech, 16-bit PCM, base64
    audio: Base64EncodedAudioBytes,
}

impl AudioChunkEvent {
    pub fn audio(&self) -> &str {
        &self.audio
    }
}

/// `audio_end` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AudioEndEvent {}

/// `tts_interrupted` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TtsInterruptedEvent {}

/// `tts_cancelled` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TtsCancelledEvent {}

/// `error` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorEvent {
    message: String,
}

impl ErrorEvent {
    pub fn message(&self) -> &str {
        &self.message
    }
}
