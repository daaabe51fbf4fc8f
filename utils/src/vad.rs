//! Standalone voice-activity detector with hysteresis thresholds.
//!
//! The conversation pipeline takes `speech_started`/`utterance_end` from the
//! server as authoritative; this detector is an opt-in local alternative for
//! callers that want activity estimates without a round trip.

use std::time::{Duration, Instant};

use crate::audio;

#[derive(Debug, Clone, Copy)]
pub struct VadConfig {
    /// Mean absolute amplitude above which a block counts as voiced.
    pub threshold: f32,
    /// Voiced input must persist this long before speech is confirmed.
    pub min_speech: Duration,
    /// Silence must persist this long before speech is considered over.
    pub min_silence: Duration,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            min_speech: Duration::from_millis(300),
            min_silence: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadTransition {
    SpeechStarted,
    SpeechEnded,
}

#[derive(Debug)]
pub struct VoiceActivityDetector {
    config: VadConfig,
    active: bool,
    speech_since: Option<Instant>,
    silence_since: Option<Instant>,
}

impl VoiceActivityDetector {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            active: false,
            speech_since: None,
            silence_since: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.speech_since = None;
        self.silence_since = None;
    }

    /// Feed one block of samples; `now` is injected so recordings can be
    /// replayed off the audio path.
    pub fn process(&mut self, block: &[f32], now: Instant) -> Option<VadTransition> {
        let voiced = audio::level(block) > self.config.threshold;
        match (voiced, self.active) {
            (true, false) => match self.speech_since {
                None => {
                    self.speech_since = Some(now);
                    None
                }
                Some(since) if now.duration_since(since) >= self.config.min_speech => {
                    self.active = true;
                    self.speech_since = None;
                    self.silence_since = None;
                    Some(VadTransition::SpeechStarted)
                }
                Some(_) => None,
            },
            (false, true) => match self.silence_since {
                None => {
                    self.silence_since = Some(now);
                    None
                }
                Some(since) if now.duration_since(since) >= self.config.min_silence => {
                    self.active = false;
                    self.speech_since = None;
                    self.silence_since = None;
                    Some(VadTransition::SpeechEnded)
                }
                Some(_) => None,
            },
            (true, true) => {
                self.silence_since = None;
                None
            }
            (false, false) => {
                self.speech_since = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOUD: [f32; 64] = [0.5; 64];
    const QUIET: [f32; 64] = [0.0; 64];

    fn detector() -> VoiceActivityDetector {
        VoiceActivityDetector::new(VadConfig::default())
    }

    #[test]
    fn speech_confirmed_after_min_duration() {
        let mut vad = detector();
        let t0 = Instant::now();

        assert_eq!(vad.process(&LOUD, t0), None);
        assert!(!vad.is_active());

        let t1 = t0 + Duration::from_millis(300);
        assert_eq!(vad.process(&LOUD, t1), Some(VadTransition::SpeechStarted));
        assert!(vad.is_active());
    }

    #[test]
    fn brief_noise_does_not_trigger() {
        let mut vad = detector();
        let t0 = Instant::now();

        assert_eq!(vad.process(&LOUD, t0), None);
        // Silence resets the pending speech timer.
        assert_eq!(vad.process(&QUIET, t0 + Duration::from_millis(100)), None);
        assert_eq!(vad.process(&LOUD, t0 + Duration::from_millis(200)), None);
        assert_eq!(vad.process(&LOUD, t0 + Duration::from_millis(400)), None);
        assert!(!vad.is_active());
    }

    #[test]
    fn speech_ends_after_min_silence() {
        let mut vad = detector();
        let t0 = Instant::now();
        vad.process(&LOUD, t0);
        vad.process(&LOUD, t0 + Duration::from_millis(300));
        assert!(vad.is_active());

        let t1 = t0 + Duration::from_millis(600);
        assert_eq!(vad.process(&QUIET, t1), None);
        // A voiced block inside the silence window keeps speech alive.
        assert_eq!(vad.process(&LOUD, t1 + Duration::from_millis(200)), None);
        assert!(vad.is_active());

        let t2 = t1 + Duration::from_millis(300);
        assert_eq!(vad.process(&QUIET, t2), None);
        assert_eq!(
            vad.process(&QUIET, t2 + Duration::from_millis(500)),
            Some(VadTransition::SpeechEnded)
        );
        assert!(!vad.is_active());
    }

    #[test]
    fn reset_clears_pending_state() {
        let mut vad = detector();
        let t0 = Instant::now();
        vad.process(&LOUD, t0);
        vad.process(&LOUD, t0 + Duration::from_millis(300));
        assert!(vad.is_active());

        vad.reset();
        assert!(!vad.is_active());
        assert_eq!(vad.process(&LOUD, t0 + Duration::from_millis(400)), None);
    }
}
