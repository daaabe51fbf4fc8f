use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;

use voicechat_types as types;

use crate::audio_io::{AudioHandle, AudioSettings};
use crate::engine::{Command, Engine, Input};
use crate::error::{Error, Result};
use crate::hooks::Hooks;
use crate::session::{ConnectionState, SessionSnapshot};

pub mod config;
mod consts;
mod utils;

/// Full-duplex voice conversation client. One live session at a time;
/// `connect` after a teardown starts a fresh one.
pub struct Client {
    capacity: usize,
    config: config::Config,
    hooks: Arc<Mutex<Hooks>>,
    state_tx: Arc<watch::Sender<SessionSnapshot>>,
    live: Option<Live>,
}

/// Per-session resources; dropped as a unit on teardown.
struct Live {
    input_tx: mpsc::Sender<Input>,
    outbound_tx: mpsc::Sender<types::ClientEvent>,
    engine_handle: tokio::task::JoinHandle<()>,
    send_handle: tokio::task::JoinHandle<()>,
    recv_handle: tokio::task::JoinHandle<()>,
}

impl Client {
    pub fn new(capacity: usize, config: config::Config) -> Self {
        let (state_tx, _) = watch::channel(SessionSnapshot::default());
        Self {
            capacity,
            config,
            hooks: Arc::new(Mutex::new(Hooks::new())),
            state_tx: Arc::new(state_tx),
            live: None,
        }
    }

    /// Replace the collaborator callback registry wholesale.
    pub fn set_hooks(&self, hooks: Hooks) {
        if let Ok(mut current) = self.hooks.lock() {
            *current = hooks;
        }
    }

    /// Observe connection/recording state changes.
    pub fn watch_state(&self) -> watch::Receiver<SessionSnapshot> {
        self.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state_tx.borrow().clone()
    }

    /// Open the socket and start a fresh session. Idempotent while a session
    /// is live: no duplicate sockets.
    pub async fn connect(&mut self) -> Result<()> {
        if let Some(live) = &self.live {
            if !live.input_tx.is_closed() {
                tracing::debug!("already connected");
                return Ok(());
            }
        }
        // A previous session (possibly dead from a socket error) must be
        // fully released before the new one exists.
        self.disconnect().await;

        let request = utils::build_request(&self.config)?;
        self.state_tx.send_replace(SessionSnapshot {
            state: ConnectionState::Connecting,
            ..SessionSnapshot::default()
        });

        let (ws_stream, _) = match tokio_tungstenite::connect_async(request).await {
            Ok(ok) => ok,
            Err(e) => {
                self.state_tx.send_replace(SessionSnapshot::default());
                return Err(Error::Transport(e));
            }
        };
        let (mut write, mut read) = ws_stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<types::ClientEvent>(self.capacity);
        let (input_tx, input_rx) = mpsc::channel::<Input>(self.capacity);

        let send_handle = tokio::spawn(async move {
            while let Some(event) = outbound_rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!("failed to send message: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize event: {}", e);
                    }
                }
            }
            let _ = write.close().await;
        });

        let recv_input = input_tx.clone();
        let recv_handle = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        break;
                    }
                    Ok(message) => message,
                };
                match message {
                    Message::Text(text) => {
                        match serde_json::from_str::<types::ServerEvent>(&text) {
                            Ok(event) => {
                                if recv_input.send(Input::Server(event)).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                // Unknown kinds are protocol chatter, not failures.
                                tracing::warn!(
                                    "ignoring unrecognized message: {}, text=> {:?}",
                                    e,
                                    text
                                );
                            }
                        }
                    }
                    Message::Binary(bin) => {
                        tracing::warn!("unexpected binary message: {} bytes", bin.len());
                    }
                    Message::Close(reason) => {
                        tracing::info!("connection closed: {:?}", reason);
                        break;
                    }
                    _ => {}
                }
            }
            let _ = recv_input.send(Input::SocketClosed).await;
        });

        let audio = AudioHandle::spawn(
            AudioSettings {
                input_device: self.config.input_device().map(str::to_string),
                output_device: self.config.output_device().map(str::to_string),
                tts_sample_rate: self.config.tts_sample_rate(),
            },
            input_tx.clone(),
        );

        let engine = Engine::new(
            audio,
            outbound_tx.clone(),
            Arc::clone(&self.hooks),
            Arc::clone(&self.state_tx),
            input_tx.clone(),
            self.config.language().to_string(),
            self.config.response_timeout(),
        );
        let engine_handle = tokio::spawn(engine.run(input_rx));

        self.live = Some(Live {
            input_tx,
            outbound_tx,
            engine_handle,
            send_handle,
            recv_handle,
        });
        Ok(())
    }

    /// Tear the session down: capture released, playback stopped with its
    /// `end` event, watchdog cleared, socket closed. Idempotent.
    pub async fn disconnect(&mut self) {
        if let Some(live) = self.live.take() {
            let Live {
                input_tx,
                outbound_tx,
                engine_handle,
                send_handle,
                recv_handle,
            } = live;
            let _ = input_tx.send(Input::Command(Command::Disconnect)).await;
            let _ = engine_handle.await;
            recv_handle.abort();
            // The send task exits once every outbound sender is gone.
            drop(outbound_tx);
            drop(input_tx);
            let _ = send_handle.await;
        }
    }

    /// Acquire the microphone and request an STT stream. The session stays
    /// `connected` (not streaming) when the microphone is refused.
    pub async fn start_call(&mut self) -> Result<()> {
        let Some(live) = &self.live else {
            return Err(Error::NotConnected);
        };
        let (done_tx, done_rx) = oneshot::channel();
        live.input_tx
            .send(Input::Command(Command::StartCall { done: done_tx }))
            .await
            .map_err(|_| Error::NotConnected)?;
        done_rx.await.map_err(|_| Error::NotConnected)?
    }

    /// End the call: microphone released, stream end requested. No-op when
    /// idle.
    pub async fn stop_call(&mut self) {
        if let Some(live) = &self.live {
            let _ = live.input_tx.send(Input::Command(Command::StopCall)).await;
        }
    }

    /// Start the call if idle, stop it if running. Returns whether the call
    /// is running afterwards.
    pub async fn toggle_call(&mut self) -> Result<bool> {
        if self.snapshot().recording {
            self.stop_call().await;
            Ok(false)
        } else {
            self.start_call().await?;
            Ok(true)
        }
    }

    /// Serialize and transmit one message. Fire-and-forget: failures are
    /// logged, never surfaced to the caller.
    pub fn send(&self, event: types::ClientEvent) {
        match &self.live {
            Some(live) => {
                if let Err(e) = live.outbound_tx.try_send(event) {
                    tracing::warn!("dropping outbound message: {e}");
                }
            }
            None => tracing::warn!("not connected; dropping outbound message"),
        }
    }
}

pub async fn connect_with_config(capacity: usize, config: config::Config) -> Result<Client> {
    let mut client = Client::new(capacity, config);
    client.connect().await?;
    Ok(client)
}

pub async fn connect() -> Result<Client> {
    let config = config::Config::new();
    connect_with_config(consts::DEFAULT_CAPACITY, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_for(
        rx: &mut watch::Receiver<SessionSnapshot>,
        pred: impl Fn(&SessionSnapshot) -> bool,
    ) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if pred(&rx.borrow()) {
                    return;
                }
                if rx.changed().await.is_err() {
                    panic!("state channel closed");
                }
            }
        })
        .await
        .expect("timed out waiting for state");
    }

    #[tokio::test]
    async fn session_dispatches_inbound_events_and_tears_down() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            for raw in [
                r#"{"type":"connection_ready"}"#,
                r#"{"type":"partial_transcript","text":"hel"}"#,
                r#"{"type":"final_transcript","text":"hello"}"#,
                r#"{"type":"agent_response","text":"hi there"}"#,
            ] {
                ws.send(Message::Text(raw.to_string())).await.unwrap();
            }
            // Hold the socket open until the client hangs up.
            while let Some(Ok(_)) = ws.next().await {}
        });

        let config = config::Config::builder()
            .with_base_url(&format!("ws://{addr}"))
            .build();
        let mut client = Client::new(64, config);

        let (transcript_tx, transcript_rx) = std::sync::mpsc::channel::<(String, bool)>();
        let (response_tx, response_rx) = std::sync::mpsc::channel::<String>();
        client.set_hooks(
            Hooks::new()
                .with_transcript(move |text, is_partial| {
                    let _ = transcript_tx.send((text.to_string(), is_partial));
                })
                .with_response(move |text| {
                    let _ = response_tx.send(text.to_string());
                }),
        );

        client.connect().await.unwrap();
        let mut state = client.watch_state();
        wait_for(&mut state, |s| s.state == ConnectionState::Connected).await;

        let response = tokio::task::spawn_blocking(move || {
            response_rx.recv_timeout(Duration::from_secs(5))
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(response, "hi there");

        let transcripts: Vec<_> = transcript_rx.try_iter().collect();
        assert_eq!(
            transcripts,
            vec![("hel".to_string(), true), ("hello".to_string(), false)]
        );

        client.disconnect().await;
        wait_for(&mut state, |s| s.state == ConnectionState::Disconnected).await;
        server.abort();
    }

    #[tokio::test]
    async fn connect_is_idempotent_while_live() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            // Exactly one handshake is expected.
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let config = config::Config::builder()
            .with_base_url(&format!("ws://{addr}"))
            .build();
        let mut client = Client::new(64, config);
        client.connect().await.unwrap();
        // A second connect on a live session is a no-op, not a second socket.
        client.connect().await.unwrap();

        client.disconnect().await;
        client.disconnect().await;
        server.abort();
    }

    #[tokio::test]
    async fn peer_close_is_terminal_for_the_session() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            drop(ws);
        });

        let config = config::Config::builder()
            .with_base_url(&format!("ws://{addr}"))
            .build();
        let mut client = Client::new(64, config);
        client.connect().await.unwrap();

        let mut state = client.watch_state();
        wait_for(&mut state, |s| s.state == ConnectionState::Disconnected).await;

        // No automatic reconnection: calls fail until the user reconnects.
        assert!(client.start_call().await.is_err());
        server.abort();
    }

    #[tokio::test]
    async fn connect_refused_surfaces_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = config::Config::builder()
            .with_base_url(&format!("ws://{addr}"))
            .build();
        let mut client = Client::new(64, config);
        match client.connect().await {
            Err(Error::Transport(_)) => {}
            other => panic!("expected transport failure, got {other:?}"),
        }
        assert_eq!(client.snapshot().state, ConnectionState::Disconnected);
    }
}
