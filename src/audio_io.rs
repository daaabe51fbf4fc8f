//! Dedicated audio thread. cpal streams are not `Send`, so one thread per
//! session owns both devices; the engine talks to it over channels and the
//! real-time callbacks report back with `try_send`, never blocking.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};
use rubato::Resampler;
use tokio::sync::{mpsc, oneshot};

use voicechat_utils::audio::CAPTURE_PCM16_SAMPLE_RATE;

use crate::engine::Input;
use crate::error::{Error, Result};

/// Samples per outbound frame at the 16 kHz wire rate.
pub(crate) const FRAME_SIZE: usize = 1024;

/// Device-rate samples fed to the input resampler per pass.
const RESAMPLE_CHUNK: usize = 1024;

/// Notices from the output callback about the generation it is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlaybackNotice {
    /// The device actually pulled the first samples of this generation.
    Started(u64),
    /// The queue for this generation ran dry.
    Drained(u64),
}

#[derive(Debug, Clone)]
pub(crate) struct AudioSettings {
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    /// Sample rate synthesized speech arrives at.
    pub tts_sample_rate: f64,
}

enum Ctl {
    StartCapture { done: oneshot::Sender<Result<()>> },
    StopCapture,
    Play { generation: u64, samples: Vec<f32> },
    StopPlayback,
    Shutdown,
}

/// Engine-side handle to the audio thread.
pub(crate) struct AudioHandle {
    ctl_tx: crossbeam_channel::Sender<Ctl>,
}

impl AudioHandle {
    pub(crate) fn spawn(settings: AudioSettings, input_tx: mpsc::Sender<Input>) -> Self {
        let (ctl_tx, ctl_rx) = crossbeam_channel::unbounded();
        thread::Builder::new()
            .name("voicechat-audio".into())
            .spawn(move || run(settings, ctl_rx, input_tx))
            .expect("failed to spawn audio thread");
        Self { ctl_tx }
    }

    /// Acquire the microphone and start producing frames.
    pub(crate) async fn start_capture(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.ctl_tx
            .send(Ctl::StartCapture { done: done_tx })
            .map_err(|_| Error::DeviceUnavailable("audio thread is gone".into()))?;
        done_rx
            .await
            .map_err(|_| Error::DeviceUnavailable("audio thread is gone".into()))?
    }

    /// Release the microphone. Safe to call when already stopped.
    pub(crate) fn stop_capture(&self) {
        let _ = self.ctl_tx.send(Ctl::StopCapture);
    }

    /// Swap `samples` in as the sole playing source. Returns false if the
    /// audio thread is no longer reachable.
    pub(crate) fn play(&self, generation: u64, samples: Vec<f32>) -> bool {
        self.ctl_tx
            .send(Ctl::Play {
                generation,
                samples,
            })
            .is_ok()
    }

    pub(crate) fn stop_playback(&self) {
        let _ = self.ctl_tx.send(Ctl::StopPlayback);
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.ctl_tx.send(Ctl::Shutdown);
    }
}

fn run(
    settings: AudioSettings,
    ctl_rx: crossbeam_channel::Receiver<Ctl>,
    input_tx: mpsc::Sender<Input>,
) {
    let (raw_tx, raw_rx) = crossbeam_channel::bounded::<Vec<f32>>(64);
    let mut capture: Option<CaptureState> = None;
    let mut output: Option<OutputState> = None;

    loop {
        crossbeam_channel::select! {
            recv(ctl_rx) -> msg => match msg {
                Err(_) => break,
                Ok(Ctl::StartCapture { done }) => {
                    let result = if capture.is_some() {
                        Ok(())
                    } else {
                        match start_capture(&settings, raw_tx.clone()) {
                            Ok(state) => {
                                capture = Some(state);
                                Ok(())
                            }
                            Err(e) => Err(e),
                        }
                    };
                    let _ = done.send(result);
                }
                Ok(Ctl::StopCapture) => {
                    if capture.take().is_some() {
                        tracing::debug!("microphone released");
                    }
                    // Discard blocks the callback pushed before the stream died.
                    while raw_rx.try_recv().is_ok() {}
                }
                Ok(Ctl::Play { generation, samples }) => {
                    if output.is_none() {
                        match start_output(&settings, input_tx.clone()) {
                            Ok(state) => output = Some(state),
                            Err(e) => {
                                tracing::error!("failed to open output device: {e}");
                                // The unit can never play; report it drained so
                                // the engine settles its lifecycle.
                                let _ = input_tx.try_send(Input::Playback(
                                    PlaybackNotice::Drained(generation),
                                ));
                            }
                        }
                    }
                    if let Some(out) = output.as_mut() {
                        out.submit(generation, &samples);
                    }
                }
                Ok(Ctl::StopPlayback) => {
                    if let Some(out) = output.as_ref() {
                        out.clear();
                    }
                }
                Ok(Ctl::Shutdown) => break,
            },
            recv(raw_rx) -> block => {
                if let (Ok(block), Some(state)) = (block, capture.as_mut()) {
                    state.ingest(&block, &input_tx);
                }
            }
        }
    }
    // Dropping the states drops the streams: microphone and speaker are
    // released with the session.
}

struct CaptureState {
    _stream: cpal::Stream,
    resampler: rubato::FastFixedIn<f32>,
    channels: usize,
    /// Device-rate mono samples awaiting resampling.
    pending: VecDeque<f32>,
    /// 16 kHz samples awaiting framing.
    resampled: VecDeque<f32>,
}

impl CaptureState {
    fn ingest(&mut self, block: &[f32], input_tx: &mpsc::Sender<Input>) {
        if self.channels == 1 {
            self.pending.extend(block);
        } else {
            self.pending.extend(
                block
                    .chunks(self.channels)
                    .map(|frame| frame.iter().sum::<f32>() / self.channels as f32),
            );
        }

        let chunk_size = self.resampler.input_frames_next();
        while self.pending.len() >= chunk_size {
            let chunk: Vec<f32> = self.pending.drain(..chunk_size).collect();
            match self.resampler.process(&[chunk.as_slice()], None) {
                Ok(resampled) => {
                    if let Some(channel) = resampled.first() {
                        self.resampled.extend(channel.iter().copied());
                    }
                }
                Err(e) => tracing::warn!("input resample failed: {e}"),
            }
        }

        while self.resampled.len() >= FRAME_SIZE {
            let frame: Vec<f32> = self.resampled.drain(..FRAME_SIZE).collect();
            if input_tx.try_send(Input::Frame(frame)).is_err() {
                tracing::trace!("engine busy, dropping captured frame");
            }
        }
    }
}

fn start_capture(
    settings: &AudioSettings,
    raw_tx: crossbeam_channel::Sender<Vec<f32>>,
) -> Result<CaptureState> {
    let device = voicechat_utils::device::get_or_default_input(settings.input_device.clone())
        .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
    let config = device
        .default_input_config()
        .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
    let sample_rate = f64::from(config.sample_rate().0);
    let channels = config.channels() as usize;
    let stream_config: cpal::StreamConfig = config.into();

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if raw_tx.try_send(data.to_vec()).is_err() {
                    tracing::trace!("capture backlog full, dropping block");
                }
            },
            |err| tracing::error!("input stream error: {err}"),
            None,
        )
        .map_err(map_build_error)?;
    stream
        .play()
        .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

    let resampler =
        voicechat_utils::audio::create_resampler(sample_rate, CAPTURE_PCM16_SAMPLE_RATE, RESAMPLE_CHUNK)
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

    tracing::debug!(rate = sample_rate, channels, "microphone capture started");
    Ok(CaptureState {
        _stream: stream,
        resampler,
        channels,
        pending: VecDeque::new(),
        resampled: VecDeque::new(),
    })
}

fn map_build_error(err: cpal::BuildStreamError) -> Error {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            Error::DeviceUnavailable("input device disappeared".into())
        }
        cpal::BuildStreamError::BackendSpecific { err } => {
            let message = err.description;
            let lowered = message.to_lowercase();
            if lowered.contains("denied") || lowered.contains("permission") {
                Error::PermissionDenied(message)
            } else {
                Error::DeviceUnavailable(message)
            }
        }
        other => Error::DeviceUnavailable(other.to_string()),
    }
}

struct OutputQueue {
    queue: VecDeque<f32>,
    /// Generation currently queued; 0 means idle.
    generation: u64,
    started: bool,
}

struct OutputShared {
    state: Mutex<OutputQueue>,
    notices: mpsc::Sender<Input>,
}

struct OutputState {
    _stream: cpal::Stream,
    shared: Arc<OutputShared>,
    resampler: rubato::FastFixedIn<f32>,
}

impl OutputState {
    /// Replace the queue contents atomically: barge-in and fresh playback are
    /// the same operation.
    fn submit(&mut self, generation: u64, samples: &[f32]) {
        let chunk_size = self.resampler.input_frames_next();
        let mut resampled: Vec<f32> = Vec::with_capacity(samples.len());
        for chunk in voicechat_utils::audio::split_for_chunks(samples, chunk_size) {
            match self.resampler.process(&[chunk.as_slice()], None) {
                Ok(out) => {
                    if let Some(channel) = out.first() {
                        resampled.extend(channel.iter().copied());
                    }
                }
                Err(e) => tracing::warn!("output resample failed: {e}"),
            }
        }

        if let Ok(mut q) = self.shared.state.lock() {
            q.queue.clear();
            q.queue.extend(resampled);
            q.generation = generation;
            q.started = false;
        }
    }

    fn clear(&self) {
        if let Ok(mut q) = self.shared.state.lock() {
            q.queue.clear();
            q.generation = 0;
            q.started = false;
        }
    }
}

fn start_output(settings: &AudioSettings, notices: mpsc::Sender<Input>) -> Result<OutputState> {
    let device = voicechat_utils::device::get_or_default_output(settings.output_device.clone())
        .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
    let config = device
        .default_output_config()
        .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
    let device_rate = f64::from(config.sample_rate().0);
    let channels = config.channels() as usize;
    let stream_config: cpal::StreamConfig = config.into();

    let shared = Arc::new(OutputShared {
        state: Mutex::new(OutputQueue {
            queue: VecDeque::new(),
            generation: 0,
            started: false,
        }),
        notices,
    });
    let cb_shared = Arc::clone(&shared);

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut started_gen = 0u64;
                let mut drained_gen = 0u64;
                {
                    let Ok(mut q) = cb_shared.state.lock() else {
                        data.fill(0.0);
                        return;
                    };
                    for frame in data.chunks_mut(channels) {
                        match q.queue.pop_front() {
                            Some(sample) => {
                                if !q.started {
                                    q.started = true;
                                    started_gen = q.generation;
                                }
                                for out in frame.iter_mut() {
                                    *out = sample;
                                }
                            }
                            None => {
                                for out in frame.iter_mut() {
                                    *out = 0.0;
                                }
                            }
                        }
                    }
                    if q.generation != 0 && q.started && q.queue.is_empty() {
                        drained_gen = q.generation;
                        q.generation = 0;
                        q.started = false;
                    }
                }
                if started_gen != 0 {
                    let _ = cb_shared
                        .notices
                        .try_send(Input::Playback(PlaybackNotice::Started(started_gen)));
                }
                if drained_gen != 0 {
                    let _ = cb_shared
                        .notices
                        .try_send(Input::Playback(PlaybackNotice::Drained(drained_gen)));
                }
            },
            |err| tracing::error!("output stream error: {err}"),
            None,
        )
        .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
    stream
        .play()
        .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

    let resampler =
        voicechat_utils::audio::create_resampler(settings.tts_sample_rate, device_rate, RESAMPLE_CHUNK)
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

    tracing::debug!(rate = device_rate, channels, "speaker output started");
    Ok(OutputState {
        _stream: stream,
        shared,
        resampler,
    })
}
