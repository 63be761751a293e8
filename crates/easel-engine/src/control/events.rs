use std::fmt;

use crate::coords::Size;

/// Notification delivered to a control on its affinity thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// The host element entered the live tree.
    Loaded,
    /// The host element left the live tree.
    Unloaded,
    /// The host element was laid out at a new size (DIPs).
    SizeChanged(Size),
    /// The display DPI may have changed; the control re-queries it.
    DpiChanged,
    /// The captured window was shown or hidden; the control re-queries it.
    WindowVisibilityChanged,
    /// The application is about to be suspended.
    ApplicationSuspending,
    /// The clear color was changed through a [`ClearColorHandle`](super::ClearColorHandle).
    ClearColorChanged { different_alpha_mode: bool },
    /// Something the control renders changed; a redraw is needed.
    Changed,
}

/// Sending half of a control's notification queue.
///
/// Sinks are `Send + Sync` and may be cloned freely; events are queued until the
/// control drains them on its affinity thread.
#[derive(Clone)]
pub struct EventSink {
    tx: flume::Sender<ControlEvent>,
}

impl EventSink {
    pub(crate) fn channel() -> (EventSink, flume::Receiver<ControlEvent>) {
        let (tx, rx) = flume::unbounded();
        (EventSink { tx }, rx)
    }

    /// Queues `event`. Events sent after the control was dropped are discarded.
    pub fn send(&self, event: ControlEvent) {
        if let Err(flume::SendError(event)) = self.tx.send(event) {
            log::trace!("control is gone; dropping {event:?}");
        }
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("queued", &self.tx.len())
            .finish()
    }
}
