use std::sync::Arc;

use parking_lot::Mutex;

use crate::paint::Color;

use super::events::{ControlEvent, EventSink};

/// Outcome of a clear-color write that changed the value.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ClearColorChange {
    /// The color moved between fully opaque and not fully opaque.
    pub different_alpha_mode: bool,
}

/// The clear color, shared between property callers on any thread and the
/// render path.
///
/// The lock is only held to copy, or to compare and store. Change notification is
/// left to the caller, after the lock is released.
#[derive(Debug, Default)]
pub struct ClearColorGuard {
    color: Mutex<Color>,
}

impl ClearColorGuard {
    pub fn new(initial: Color) -> Self {
        Self {
            color: Mutex::new(initial),
        }
    }

    pub fn get(&self) -> Color {
        *self.color.lock()
    }

    /// Stores `value`. Returns `None` when it equals the current color.
    pub fn set(&self, value: Color) -> Option<ClearColorChange> {
        let mut color = self.color.lock();

        if *color == value {
            return None;
        }

        let was_opaque = color.is_opaque();
        let is_opaque = value.is_opaque();
        *color = value;

        Some(ClearColorChange {
            different_alpha_mode: was_opaque != is_opaque,
        })
    }
}

/// Clear-color access for threads other than the control's affinity thread.
///
/// A changing write is reported to the control as
/// [`ControlEvent::ClearColorChanged`] and handled when the control next drains
/// its events.
#[derive(Debug, Clone)]
pub struct ClearColorHandle {
    guard: Arc<ClearColorGuard>,
    events: EventSink,
}

impl ClearColorHandle {
    pub(crate) fn new(guard: Arc<ClearColorGuard>, events: EventSink) -> Self {
        Self { guard, events }
    }

    pub fn get(&self) -> Color {
        self.guard.get()
    }

    pub fn set(&self, value: Color) {
        if let Some(change) = self.guard.set(value) {
            self.events.send(ControlEvent::ClearColorChanged {
                different_alpha_mode: change.different_alpha_mode,
            });
        }
    }
}
