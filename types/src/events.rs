pub mod client;
pub mod server;

use client::*;
use server::*;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "stt_stream_start")]
    SttStreamStart(SttStreamStartEvent),
    #[serde(rename = "stt_audio_chunk")]
    SttAudioChunk(SttAudioChunkEvent),
    #[serde(rename = "stt_stream_end")]
    SttStreamEnd(SttStreamEndEvent),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "connection_ready")]
    ConnectionReady(ConnectionReadyEvent),
    #[serde(rename = "stt_ready")]
    SttReady(SttReadyEvent),
    #[serde(rename = "stt_unavailable")]
    SttUnavailable(SttUnavailableEvent),
    #[serde(rename = "speech_started")]
    SpeechStarted(SpeechStartedEvent),
    #[serde(rename = "utterance_end")]
    UtteranceEnd(UtteranceEndEvent),
    #[serde(rename = "partial_transcript")]
    PartialTranscript(PartialTranscriptEvent),
    #[serde(rename = "final_transcript")]
    FinalTranscript(FinalTranscriptEvent),
    #[serde(rename = "agent_response")]
    AgentResponse(AgentResponseEvent),
    /// Some backends label synthesized speech `audio_chunk`, others plain `audio`.
    #[serde(rename = "audio_chunk", alias = "audio")]
    AudioChunk(AudioChunkEvent),
    #[serde(rename = "audio_end")]
    AudioEnd(AudioEndEvent),
    #[serde(rename = "tts_interrupted")]
    TtsInterrupted(TtsInterruptedEvent),
    #[serde(rename = "tts_cancelled")]
    TtsCancelled(TtsCancelledEvent),
    #[serde(rename = "error")]
    Error(ErrorEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_stream_start_carries_language() {
        let event = ClientEvent::SttStreamStart(SttStreamStartEvent::new("en-US"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stt_stream_start");
        assert_eq!(json["language"], "en-US");
    }

    #[test]
    fn outbound_stream_end_is_bare() {
        let event = ClientEvent::SttStreamEnd(SttStreamEndEvent::new());
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"stt_stream_end"}"#);
    }

    #[test]
    fn outbound_audio_chunk_round_trips() {
        let event = ClientEvent::SttAudioChunk(SttAudioChunkEvent::new("AAAA".to_string()));
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ClientEvent = serde_json::from_str(&json).unwrap();
        match parsed {
            ClientEvent::SttAudioChunk(chunk) => assert_eq!(chunk.audio(), "AAAA"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn inbound_transcripts_parse() {
        let partial: ServerEvent =
            serde_json::from_str(r#"{"type":"partial_transcript","text":"hel"}"#).unwrap();
        match partial {
            ServerEvent::PartialTranscript(event) => assert_eq!(event.text(), "hel"),
            other => panic!("unexpected variant: {other:?}"),
        }

        let fin: ServerEvent =
            serde_json::from_str(r#"{"type":"final_transcript","text":"hello"}"#).unwrap();
        assert!(matches!(fin, ServerEvent::FinalTranscript(_)));
    }

    #[test]
    fn inbound_audio_accepts_both_labels() {
        let chunk: ServerEvent =
            serde_json::from_str(r#"{"type":"audio_chunk","audio":"UklGRg=="}"#).unwrap();
        let plain: ServerEvent =
            serde_json::from_str(r#"{"type":"audio","audio":"UklGRg=="}"#).unwrap();
        for event in [chunk, plain] {
            match event {
                ServerEvent::AudioChunk(audio) => assert_eq!(audio.audio(), "UklGRg=="),
                other => panic!("unexpected variant: {other:?}"),
            }
        }
    }

    #[test]
    fn inbound_bare_events_parse() {
        for raw in [
            r#"{"type":"connection_ready"}"#,
            r#"{"type":"stt_ready"}"#,
            r#"{"type":"stt_unavailable"}"#,
            r#"{"type":"speech_started"}"#,
            r#"{"type":"utterance_end"}"#,
            r#"{"type":"audio_end"}"#,
            r#"{"type":"tts_interrupted"}"#,
            r#"{"type":"tts_cancelled"}"#,
        ] {
            serde_json::from_str::<ServerEvent>(raw).unwrap_or_else(|e| panic!("{raw}: {e}"));
        }
    }

    #[test]
    fn inbound_tolerates_extra_fields() {
        let event: ServerEvent = serde_json::from_str(
            r#"{"type":"speech_started","timestamp":123,"channel":0}"#,
        )
        .unwrap();
        assert!(matches!(event, ServerEvent::SpeechStarted(_)));
    }

    #[test]
    fn unknown_kind_is_a_parse_error() {
        assert!(serde_json::from_str::<ServerEvent>(r#"{"type":"warp_drive"}"#).is_err());
    }

    #[test]
    fn server_error_carries_message() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"error","message":"stt backend down"}"#).unwrap();
        match event {
            ServerEvent::Error(err) => assert_eq!(err.message(), "stt backend down"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
