//! State shared between the control thread and the render callback

use std::sync::{Mutex, MutexGuard};

use crate::generator::{SignalGenerator, ToneParams};

/// Everything the render callback reads, guarded by one lock
///
/// Critical sections only copy scalars or render one block; nothing here
/// calls into the platform audio layer.
#[derive(Debug)]
pub(super) struct SharedState {
    pub left: ToneParams,
    pub right: ToneParams,
    pub linked: bool,
    /// Written before a stream starts and before it is torn down, so a late
    /// callback renders silence instead of tone
    pub playing: bool,
    pub generator: SignalGenerator,
}

impl SharedState {
    pub fn new(generator: SignalGenerator) -> Self {
        Self {
            left: ToneParams::default(),
            right: ToneParams::default(),
            linked: true,
            playing: false,
            generator,
        }
    }

    pub fn set_left(&mut self, params: ToneParams) {
        self.left = params;
        if self.linked {
            self.right = params;
        }
    }

    pub fn set_right(&mut self, params: ToneParams) {
        self.right = params;
        if self.linked {
            self.left = params;
        }
    }

    pub fn set_linked(&mut self, linked: bool) {
        self.linked = linked;
        if linked {
            self.right = self.left;
        }
    }

    /// Render one interleaved stereo block into `out`
    pub fn render(&mut self, out: &mut [f32]) {
        if self.playing {
            let (left, right) = (self.left, self.right);
            self.generator.render_into(out, left, right);
        } else {
            out.fill(0.0);
        }
    }
}

/// Lock the shared state, recovering from a poisoned mutex
///
/// A panic while holding the lock leaves only plain scalars and phases
/// behind, all of which remain valid.
pub(super) fn lock(shared: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}
