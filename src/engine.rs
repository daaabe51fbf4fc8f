use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot, watch};

use voicechat_types::events::client::{SttAudioChunkEvent, SttStreamEndEvent, SttStreamStartEvent};
use voicechat_types::{ClientEvent, ServerEvent};
use voicechat_utils::visualizer::BAR_COUNT;
use voicechat_utils::{audio, visualizer};

use crate::audio_io::{AudioHandle, PlaybackNotice};
use crate::error::{Error, Result};
use crate::hooks::{AudioLifecycle, Hooks};
use crate::playback::PlaybackSlot;
use crate::session::{ConnectionState, Effect, Session, SessionSnapshot};
use crate::watchdog::Watchdog;

/// Mean absolute amplitude above which a frame is worth a trace line.
const SPEECH_FLOOR: f32 = 0.01;

pub(crate) enum Command {
    StartCall { done: oneshot::Sender<Result<()>> },
    StopCall,
    Disconnect,
}

/// Everything that can wake the engine, merged into one channel so arrival
/// order is processing order.
pub(crate) enum Input {
    Command(Command),
    Server(ServerEvent),
    SocketClosed,
    /// One 16 kHz mono frame from the capture path.
    Frame(Vec<f32>),
    Playback(PlaybackNotice),
    WatchdogFired(u64),
}

/// Single task that owns the session state machine, the playback slot and
/// the watchdog; every other component only feeds its channel.
pub(crate) struct Engine {
    session: Session,
    slot: PlaybackSlot,
    watchdog: Watchdog,
    audio: AudioHandle,
    outbound: mpsc::Sender<ClientEvent>,
    hooks: Arc<Mutex<Hooks>>,
    state_tx: Arc<watch::Sender<SessionSnapshot>>,
    input_tx: mpsc::Sender<Input>,
    language: String,
    response_timeout: Duration,
}

impl Engine {
    pub(crate) fn new(
        audio: AudioHandle,
        outbound: mpsc::Sender<ClientEvent>,
        hooks: Arc<Mutex<Hooks>>,
        state_tx: Arc<watch::Sender<SessionSnapshot>>,
        input_tx: mpsc::Sender<Input>,
        language: String,
        response_timeout: Duration,
    ) -> Self {
        Self {
            session: Session::new(),
            slot: PlaybackSlot::new(),
            watchdog: Watchdog::new(),
            audio,
            outbound,
            hooks,
            state_tx,
            input_tx,
            language,
            response_timeout,
        }
    }

    pub(crate) async fn run(mut self, mut input_rx: mpsc::Receiver<Input>) {
        self.session.on_socket_open();
        self.publish_state();

        while let Some(input) = input_rx.recv().await {
            let keep_going = self.handle(input).await;
            self.publish_state();
            if !keep_going {
                break;
            }
        }
        self.teardown();
        self.publish_state();
    }

    async fn handle(&mut self, input: Input) -> bool {
        match input {
            Input::Command(Command::StartCall { done }) => {
                let result = self.start_call().await;
                let _ = done.send(result);
                true
            }
            Input::Command(Command::StopCall) => {
                self.stop_call();
                true
            }
            Input::Command(Command::Disconnect) => {
                tracing::info!("disconnecting");
                false
            }
            Input::SocketClosed => {
                tracing::warn!("socket closed by peer");
                false
            }
            Input::Server(event) => {
                self.dispatch(&event);
                true
            }
            Input::Frame(samples) => {
                self.on_frame(&samples);
                true
            }
            Input::Playback(notice) => {
                self.on_playback_notice(notice);
                true
            }
            Input::WatchdogFired(seq) => {
                if self.watchdog.expire(seq) {
                    tracing::warn!(
                        seq,
                        "no agent response within {:?}; the service may still be synthesizing",
                        self.response_timeout
                    );
                }
                true
            }
        }
    }

    async fn start_call(&mut self) -> Result<()> {
        if self.session.recording() {
            return Ok(());
        }
        if self.session.stt_denied() {
            return Err(Error::ServiceUnavailable);
        }
        if self.session.state() != ConnectionState::Connected {
            return Err(Error::NotConnected);
        }

        self.audio.start_capture().await?;
        self.session.on_call_started();
        self.send(ClientEvent::SttStreamStart(SttStreamStartEvent::new(
            self.language.clone(),
        )));
        tracing::info!("call started, waiting for stt_ready");
        Ok(())
    }

    fn stop_call(&mut self) {
        if !self.session.recording() {
            return;
        }
        let was_stt_active = self.session.stt_active();

        if let Some(end) = self.slot.stop() {
            self.audio.stop_playback();
            self.emit_lifecycle(end);
        }
        self.audio.stop_capture();
        if was_stt_active {
            self.send(ClientEvent::SttStreamEnd(SttStreamEndEvent::new()));
        }
        self.session.on_call_stopped();
        // Blank the meter so the UI doesn't freeze on the last frame.
        self.with_hooks(|h| h.emit_visualizer(&[0.0; BAR_COUNT]));
        tracing::info!("call stopped");
    }

    fn dispatch(&mut self, event: &ServerEvent) {
        for effect in self.session.on_server_event(event, Instant::now()) {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::ForwardTranscript { text, is_partial } => {
                self.with_hooks(|h| h.emit_transcript(&text, is_partial));
            }
            Effect::ForwardResponse { text } => {
                self.with_hooks(|h| h.emit_response(&text));
            }
            Effect::PlayAudio { audio } => self.play(&audio),
            Effect::StopPlayback => {
                if let Some(end) = self.slot.stop() {
                    self.audio.stop_playback();
                    self.emit_lifecycle(end);
                }
            }
            Effect::ArmWatchdog { seq } => {
                self.watchdog
                    .arm(seq, self.response_timeout, self.input_tx.clone());
            }
            Effect::DisarmWatchdog => self.watchdog.disarm(),
            Effect::StopCall => self.stop_call(),
        }
    }

    /// Stop-then-decode-then-start: the previous unit is settled before the
    /// new one is even decoded, so its `end` always precedes the new `start`.
    fn play(&mut self, encoded: &str) {
        let (generation, preempted) = self.slot.replace();
        if let Some(end) = preempted {
            self.audio.stop_playback();
            self.emit_lifecycle(end);
        }

        match audio::decode(encoded) {
            Ok(samples) if !samples.is_empty() => {
                if !self.audio.play(generation, samples) {
                    if let Some(end) = self.slot.abort(generation) {
                        self.emit_lifecycle(end);
                    }
                }
            }
            Ok(_) => {
                tracing::warn!("discarding empty audio unit");
                if let Some(end) = self.slot.abort(generation) {
                    self.emit_lifecycle(end);
                }
            }
            Err(e) => {
                // Local and recoverable: downstream consumers must not be
                // left waiting for an end that would never come.
                tracing::warn!("failed to decode inbound audio: {e}");
                if let Some(end) = self.slot.abort(generation) {
                    self.emit_lifecycle(end);
                }
            }
        }
    }

    fn on_frame(&mut self, samples: &[f32]) {
        if !self.session.recording() {
            // The capture path raced a stop; the frame is stale.
            return;
        }

        let bars = visualizer::bars(samples);
        self.with_hooks(|h| h.emit_visualizer(&bars));

        if !self.session.stt_active() {
            // No streaming permission: visualized, then discarded. Never queued.
            return;
        }

        let level = audio::level(samples);
        if level > SPEECH_FLOOR {
            tracing::trace!(level, "voiced frame");
        }
        self.send(ClientEvent::SttAudioChunk(SttAudioChunkEvent::new(
            audio::encode(samples),
        )));
    }

    fn on_playback_notice(&mut self, notice: PlaybackNotice) {
        match notice {
            PlaybackNotice::Started(generation) => {
                if let Some(start) = self.slot.on_started(generation) {
                    self.emit_lifecycle(start);
                }
            }
            PlaybackNotice::Drained(generation) => {
                if let Some(end) = self.slot.on_drained(generation) {
                    self.emit_lifecycle(end);
                }
            }
        }
    }

    /// Outbound transmission is fire-and-forget: a closed or congested socket
    /// drops the message with a log line, never an error to the caller.
    fn send(&self, event: ClientEvent) {
        if let Err(e) = self.outbound.try_send(event) {
            tracing::warn!("dropping outbound message: {e}");
        }
    }

    fn emit_lifecycle(&self, event: AudioLifecycle) {
        self.with_hooks(|h| h.emit_audio_lifecycle(event));
    }

    fn with_hooks(&self, f: impl FnOnce(&Hooks)) {
        if let Ok(hooks) = self.hooks.lock() {
            f(&hooks);
        }
    }

    fn publish_state(&self) {
        let snapshot = self.session.snapshot();
        if *self.state_tx.borrow() != snapshot {
            self.state_tx.send_replace(snapshot);
        }
    }

    fn teardown(&mut self) {
        self.watchdog.disarm();
        self.audio.stop_capture();
        if let Some(end) = self.slot.stop() {
            self.audio.stop_playback();
            self.emit_lifecycle(end);
        }
        self.audio.shutdown();
        self.session.on_socket_closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_io::AudioSettings;
    use std::sync::mpsc as std_mpsc;

    fn ev(raw: &str) -> ServerEvent {
        serde_json::from_str(raw).unwrap()
    }

    struct Harness {
        engine: Engine,
        outbound_rx: mpsc::Receiver<ClientEvent>,
        _input_rx: mpsc::Receiver<Input>,
    }

    fn harness(hooks: Hooks) -> Harness {
        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        let (input_tx, input_rx) = mpsc::channel(64);
        let audio = AudioHandle::spawn(
            AudioSettings {
                input_device: None,
                output_device: None,
                tts_sample_rate: 24000.0,
            },
            input_tx.clone(),
        );
        let state_tx = Arc::new(watch::channel(SessionSnapshot::default()).0);
        let engine = Engine::new(
            audio,
            outbound_tx,
            Arc::new(Mutex::new(hooks)),
            state_tx,
            input_tx,
            "en-US".to_string(),
            Duration::from_secs(10),
        );
        Harness {
            engine,
            outbound_rx,
            _input_rx: input_rx,
        }
    }

    /// Enter a call without touching real devices.
    fn enter_call(engine: &mut Engine) {
        engine.session.on_socket_open();
        engine.session.on_call_started();
    }

    #[tokio::test]
    async fn frames_before_permission_are_visualized_but_never_sent() {
        let (bars_tx, bars_rx) = std_mpsc::channel();
        let mut h = harness(Hooks::new().with_visualizer(move |bars| {
            let _ = bars_tx.send(bars[0]);
        }));
        enter_call(&mut h.engine);

        for _ in 0..3 {
            h.engine.handle(Input::Frame(vec![0.1; 1024])).await;
        }
        assert_eq!(bars_rx.try_iter().count(), 3);
        assert!(h.outbound_rx.try_recv().is_err(), "no frames before stt_ready");

        h.engine
            .handle(Input::Server(ev(r#"{"type":"stt_ready"}"#)))
            .await;
        h.engine.handle(Input::Frame(vec![0.1; 1024])).await;

        match h.outbound_rx.try_recv().unwrap() {
            ClientEvent::SttAudioChunk(_) => {}
            other => panic!("unexpected outbound event: {other:?}"),
        }
        // Only the post-permission frame went out.
        assert!(h.outbound_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn barge_in_settles_the_old_unit_before_the_new_one() {
        let (life_tx, life_rx) = std_mpsc::channel();
        let mut h = harness(Hooks::new().with_audio_lifecycle(move |event| {
            let _ = life_tx.send(event);
        }));
        enter_call(&mut h.engine);
        h.engine
            .handle(Input::Server(ev(r#"{"type":"stt_ready"}"#)))
            .await;

        let unit = audio::encode(&[0.5; 256]);
        h.engine
            .handle(Input::Server(ev(&format!(
                r#"{{"type":"audio_chunk","audio":"{unit}"}}"#
            ))))
            .await;
        // The device reports the first pull of generation 1.
        h.engine
            .handle(Input::Playback(PlaybackNotice::Started(1)))
            .await;

        // User speaks: barge-in must stop playback immediately.
        h.engine
            .handle(Input::Server(ev(r#"{"type":"speech_started"}"#)))
            .await;

        // A second unit plays and finishes naturally.
        h.engine
            .handle(Input::Server(ev(&format!(
                r#"{{"type":"audio","audio":"{unit}"}}"#
            ))))
            .await;
        h.engine
            .handle(Input::Playback(PlaybackNotice::Started(2)))
            .await;
        // A stale drain for the cancelled generation is silent.
        h.engine
            .handle(Input::Playback(PlaybackNotice::Drained(1)))
            .await;
        h.engine
            .handle(Input::Playback(PlaybackNotice::Drained(2)))
            .await;

        let events: Vec<AudioLifecycle> = life_rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                AudioLifecycle::Start,
                AudioLifecycle::End,
                AudioLifecycle::Start,
                AudioLifecycle::End,
            ]
        );
    }

    #[tokio::test]
    async fn undecodable_audio_still_ends() {
        let (life_tx, life_rx) = std_mpsc::channel();
        let mut h = harness(Hooks::new().with_audio_lifecycle(move |event| {
            let _ = life_tx.send(event);
        }));
        enter_call(&mut h.engine);

        h.engine
            .handle(Input::Server(ev(
                r#"{"type":"audio_chunk","audio":"!!not-base64!!"}"#,
            )))
            .await;

        assert_eq!(
            life_rx.try_iter().collect::<Vec<_>>(),
            vec![AudioLifecycle::End]
        );
    }

    #[tokio::test]
    async fn stop_call_sends_stream_end_and_blanks_the_meter() {
        let (bars_tx, bars_rx) = std_mpsc::channel();
        let mut h = harness(Hooks::new().with_visualizer(move |bars| {
            let _ = bars_tx.send(*bars);
        }));
        enter_call(&mut h.engine);
        h.engine
            .handle(Input::Server(ev(r#"{"type":"stt_ready"}"#)))
            .await;

        h.engine.handle(Input::Command(Command::StopCall)).await;

        match h.outbound_rx.try_recv().unwrap() {
            ClientEvent::SttStreamEnd(_) => {}
            other => panic!("unexpected outbound event: {other:?}"),
        }
        let frames: Vec<[f32; BAR_COUNT]> = bars_rx.try_iter().collect();
        assert_eq!(frames.last(), Some(&[0.0; BAR_COUNT]));

        // Frames arriving after the stop are stale and dropped entirely.
        h.engine.handle(Input::Frame(vec![0.1; 1024])).await;
        assert!(h.outbound_rx.try_recv().is_err());
    }
}
