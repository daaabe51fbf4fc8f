use crate::hooks::AudioLifecycle;

/// Owned slot for the single active synthesized-speech source.
///
/// Invariant: at most one generation is active, and every generation that
/// entered the slot gets exactly one `End` (natural drain, preemption,
/// decode failure or explicit stop). All preemption funnels through
/// [`PlaybackSlot::replace`], which settles the old source before the new one
/// exists.
#[derive(Debug, Default)]
pub(crate) struct PlaybackSlot {
    next_gen: u64,
    current: Option<Active>,
}

#[derive(Debug)]
struct Active {
    generation: u64,
    started: bool,
}

impl PlaybackSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocate the next generation, preempting whatever is active. Returns
    /// the new generation and the `End` owed to the preempted source.
    pub(crate) fn replace(&mut self) -> (u64, Option<AudioLifecycle>) {
        let ended = self.stop();
        self.next_gen += 1;
        self.current = Some(Active {
            generation: self.next_gen,
            started: false,
        });
        (self.next_gen, ended)
    }

    /// The unit failed before reaching the device; it still owes its `End`.
    pub(crate) fn abort(&mut self, generation: u64) -> Option<AudioLifecycle> {
        if self
            .current
            .as_ref()
            .is_some_and(|a| a.generation == generation)
        {
            self.current = None;
            Some(AudioLifecycle::End)
        } else {
            None
        }
    }

    /// The output callback pulled the first samples of `generation`.
    pub(crate) fn on_started(&mut self, generation: u64) -> Option<AudioLifecycle> {
        match self.current.as_mut() {
            Some(active) if active.generation == generation && !active.started => {
                active.started = true;
                Some(AudioLifecycle::Start)
            }
            // Stale notice from a source that was preempted meanwhile.
            _ => None,
        }
    }

    /// The output queue ran dry for `generation`.
    pub(crate) fn on_drained(&mut self, generation: u64) -> Option<AudioLifecycle> {
        if self
            .current
            .as_ref()
            .is_some_and(|a| a.generation == generation)
        {
            self.current = None;
            Some(AudioLifecycle::End)
        } else {
            None
        }
    }

    /// Stop whatever is active. Idempotent; stopping an ended source is fine.
    pub(crate) fn stop(&mut self) -> Option<AudioLifecycle> {
        self.current.take().map(|_| AudioLifecycle::End)
    }
}
