use std::time::Instant;

use voicechat_types::ServerEvent;

/// Connection/activity state, in the order a call progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Listening,
    Speaking,
    Processing,
}

/// Externally observable view of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub recording: bool,
    /// Server-granted permission to stream microphone audio.
    pub stt_active: bool,
    /// Server-side voice activity detection currently reports speech.
    pub vad_active: bool,
    /// Milliseconds from detected speech start to the last final transcript.
    pub latency_ms: u64,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            recording: false,
            stt_active: false,
            vad_active: false,
            latency_ms: 0,
        }
    }
}

/// Side effects the engine executes after a transition. Keeping them as data
/// makes the dispatch table testable without a socket or an audio device.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Effect {
    ForwardTranscript { text: String, is_partial: bool },
    ForwardResponse { text: String },
    PlayAudio { audio: String },
    /// Barge-in or server-signalled end: cancel whatever is playing.
    StopPlayback,
    ArmWatchdog { seq: u64 },
    DisarmWatchdog,
    /// The server refused streaming for good; wind the call down.
    StopCall,
}

/// One session per connection attempt. Owned exclusively by the engine task;
/// mutated only here, by socket events and explicit user commands.
#[derive(Debug)]
pub(crate) struct Session {
    state: ConnectionState,
    recording: bool,
    stt_active: bool,
    stt_denied: bool,
    vad_active: bool,
    latency_ms: u64,
    last_speech: Option<Instant>,
    transcript_seq: u64,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            state: ConnectionState::Connecting,
            recording: false,
            stt_active: false,
            stt_denied: false,
            vad_active: false,
            latency_ms: 0,
            last_speech: None,
            transcript_seq: 0,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn recording(&self) -> bool {
        self.recording
    }

    pub(crate) fn stt_active(&self) -> bool {
        self.stt_active
    }

    pub(crate) fn stt_denied(&self) -> bool {
        self.stt_denied
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            recording: self.recording,
            stt_active: self.stt_active,
            vad_active: self.vad_active,
            latency_ms: self.latency_ms,
        }
    }

    pub(crate) fn on_socket_open(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Connected;
        } else {
            tracing::debug!(state = ?self.state, "socket open in unexpected state");
        }
    }

    /// Terminal from every state; the engine releases capture and playback.
    pub(crate) fn on_socket_closed(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.recording = false;
        self.stt_active = false;
        self.vad_active = false;
    }

    /// The microphone is live; enter the call.
    pub(crate) fn on_call_started(&mut self) {
        self.state = ConnectionState::Listening;
        self.recording = true;
    }

    pub(crate) fn on_call_stopped(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Listening | ConnectionState::Speaking | ConnectionState::Processing
        ) {
            self.state = ConnectionState::Connected;
        }
        self.recording = false;
        self.stt_active = false;
        self.vad_active = false;
    }

    pub(crate) fn on_server_event(&mut self, event: &ServerEvent, now: Instant) -> Vec<Effect> {
        match event {
            ServerEvent::ConnectionReady(_) => {
                tracing::debug!("voice connection ready");
                vec![]
            }
            ServerEvent::SttReady(_) => {
                if self.state == ConnectionState::Listening {
                    self.stt_active = true;
                    tracing::debug!("stt ready, streaming enabled");
                } else {
                    tracing::debug!(state = ?self.state, "stt_ready outside a call, ignored");
                }
                vec![]
            }
            ServerEvent::SttUnavailable(_) => {
                tracing::warn!("speech-to-text unavailable for this session");
                self.stt_denied = true;
                if self.recording {
                    vec![Effect::StopCall]
                } else {
                    vec![]
                }
            }
            ServerEvent::SpeechStarted(_) => match self.state {
                ConnectionState::Listening | ConnectionState::Speaking => {
                    self.state = ConnectionState::Speaking;
                    self.vad_active = true;
                    self.last_speech = Some(now);
                    vec![Effect::StopPlayback]
                }
                // Barge-in still cancels agent audio while a reply is pending;
                // the utterance flow stays where it is.
                ConnectionState::Processing => {
                    self.last_speech = Some(now);
                    vec![Effect::StopPlayback]
                }
                _ => {
                    tracing::debug!(state = ?self.state, "speech_started outside a call, ignored");
                    vec![]
                }
            },
            ServerEvent::UtteranceEnd(_) => {
                if self.state == ConnectionState::Speaking {
                    self.state = ConnectionState::Processing;
                    self.vad_active = false;
                } else {
                    tracing::debug!(state = ?self.state, "utterance_end out of order, ignored");
                }
                vec![]
            }
            ServerEvent::PartialTranscript(t) => vec![Effect::ForwardTranscript {
                text: t.text().to_string(),
                is_partial: true,
            }],
            ServerEvent::FinalTranscript(t) => {
                if let Some(at) = self.last_speech {
                    self.latency_ms = now.duration_since(at).as_millis() as u64;
                }
                self.transcript_seq += 1;
                vec![
                    Effect::ForwardTranscript {
                        text: t.text().to_string(),
                        is_partial: false,
                    },
                    Effect::ArmWatchdog {
                        seq: self.transcript_seq,
                    },
                ]
            }
            ServerEvent::AgentResponse(r) => {
                if self.state == ConnectionState::Processing {
                    self.state = ConnectionState::Listening;
                }
                vec![
                    Effect::DisarmWatchdog,
                    Effect::ForwardResponse {
                        text: r.text().to_string(),
                    },
                ]
            }
            ServerEvent::AudioChunk(a) => vec![Effect::PlayAudio {
                audio: a.audio().to_string(),
            }],
            ServerEvent::AudioEnd(_) => vec![Effect::StopPlayback],
            ServerEvent::TtsInterrupted(_) | ServerEvent::TtsCancelled(_) => {
                tracing::debug!("tts interrupted/cancelled by server");
                vec![]
            }
            ServerEvent::Error(e) => {
                tracing::warn!(message = e.message(), "server reported an error");
                vec![]
            }
        }
    }
}
