use voicechat_utils::visualizer::BAR_COUNT;

/// Playback lifecycle notification for the embedding application, e.g. to
/// drive avatar mouth animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioLifecycle {
    Start,
    End,
}

type TranscriptFn = Box<dyn Fn(&str, bool) + Send>;
type ResponseFn = Box<dyn Fn(&str) + Send>;
type LifecycleFn = Box<dyn Fn(AudioLifecycle) + Send>;
type VisualizerFn = Box<dyn Fn(&[f32; BAR_COUNT]) + Send>;

/// Collaborator callback registry. Registering a new set replaces the
/// previous one wholesale; the last writer wins.
#[derive(Default)]
pub struct Hooks {
    on_transcript: Option<TranscriptFn>,
    on_response: Option<ResponseFn>,
    on_audio_lifecycle: Option<LifecycleFn>,
    on_visualizer: Option<VisualizerFn>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transcript of the user's own speech; `is_partial` marks interim
    /// results that a later transcript supersedes.
    pub fn with_transcript(mut self, f: impl Fn(&str, bool) + Send + 'static) -> Self {
        self.on_transcript = Some(Box::new(f));
        self
    }

    pub fn with_response(mut self, f: impl Fn(&str) + Send + 'static) -> Self {
        self.on_response = Some(Box::new(f));
        self
    }

    pub fn with_audio_lifecycle(mut self, f: impl Fn(AudioLifecycle) + Send + 'static) -> Self {
        self.on_audio_lifecycle = Some(Box::new(f));
        self
    }

    /// Amplitude histogram of the live microphone signal; called at
    /// audio-callback rates.
    pub fn with_visualizer(mut self, f: impl Fn(&[f32; BAR_COUNT]) + Send + 'static) -> Self {
        self.on_visualizer = Some(Box::new(f));
        self
    }

    pub(crate) fn emit_transcript(&self, text: &str, is_partial: bool) {
        if let Some(f) = &self.on_transcript {
            f(text, is_partial);
        }
    }

    pub(crate) fn emit_response(&self, text: &str) {
        if let Some(f) = &self.on_response {
            f(text);
        }
    }

    pub(crate) fn emit_audio_lifecycle(&self, event: AudioLifecycle) {
        if let Some(f) = &self.on_audio_lifecycle {
            f(event);
        }
    }

    pub(crate) fn emit_visualizer(&self, bars: &[f32; BAR_COUNT]) {
        if let Some(f) = &self.on_visualizer {
            f(bars);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn registering_replaces_the_whole_set() {
        let (tx, rx) = mpsc::channel();
        let mut hooks = Hooks::new().with_transcript(move |text, _| {
            let _ = tx.send(text.to_string());
        });

        hooks.emit_transcript("first", false);
        assert_eq!(rx.try_recv().unwrap(), "first");

        // Last writer wins: a fresh registry has no transcript hook.
        hooks = Hooks::new().with_response(|_| {});
        hooks.emit_transcript("second", false);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn missing_hooks_are_no_ops() {
        let hooks = Hooks::new();
        hooks.emit_transcript("x", true);
        hooks.emit_response("y");
        hooks.emit_audio_lifecycle(AudioLifecycle::Start);
        hooks.emit_visualizer(&[0.0; BAR_COUNT]);
    }
}
