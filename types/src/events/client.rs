use crate::audio::Base64EncodedAudioBytes;

/// `stt_stream_start` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SttStreamStartEvent {
    /// BCP-47 tag for the language the speech service should transcribe
    language: String,
}

impl SttStreamStartEvent {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

/// `stt_audio_chunk` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SttAudioChunkEvent {
    /// One frame of microphone audio, 16-bit PCM, base64
    audio: Base64EncodedAudioBytes,
}

impl SttAudioChunkEvent {
    pub fn new(audio: Base64EncodedAudioBytes) -> Self {
        Self { audio }
    }

    pub fn audio(&self) -> &str {
        &self.audio
    }
}

/// `stt_stream_end` event
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SttStreamEndEvent {}

impl SttStreamEndEvent {
    pub fn new() -> Self {
        Self {}
    }
}
