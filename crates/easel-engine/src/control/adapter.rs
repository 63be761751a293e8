use std::fmt;

use crate::coords::Size;
use crate::device::{GraphicsDevice, RecreatableDeviceManager};

use super::events::EventSink;

/// Keeps a host notification subscription alive; unsubscribes on drop.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum WindowVisibility {
    Visible,
    Hidden,
    /// No window is attached yet (designers, headless hosts).
    Unavailable,
}

/// The platform window a control was created in.
pub trait HostWindow {
    fn visibility(&self) -> anyhow::Result<WindowVisibility>;
}

/// The UI element hosting the control's pixels.
pub trait HostElement {
    /// Current laid-out size in DIPs.
    fn actual_size(&self) -> anyhow::Result<Size>;

    /// Asks the host to schedule a redraw.
    fn invalidate(&self);
}

/// Everything a control needs from its host.
///
/// Called only on the affinity thread, and only during construction except for
/// the element and window, which the control keeps.
pub trait ControlAdapter {
    type Device: GraphicsDevice;
    type Window: HostWindow;
    type Element: HostElement;
    /// Host-side object the application composes into its UI tree.
    type Component;

    /// Builds the host element. The host delivers Loaded, Unloaded and SizeChanged
    /// through `events`.
    fn create_host_element(&self, events: EventSink) -> anyhow::Result<(Self::Component, Self::Element)>;

    fn create_device_manager(&self) -> RecreatableDeviceManager<Self::Device>;

    fn subscribe_application_suspending(&self, events: EventSink) -> anyhow::Result<Subscription>;

    fn subscribe_dpi_changed(&self, events: EventSink) -> anyhow::Result<Subscription>;

    /// Delivers [`ControlEvent::WindowVisibilityChanged`](super::ControlEvent) when
    /// the captured window is shown or hidden.
    fn subscribe_window_visibility_changed(&self, events: EventSink) -> anyhow::Result<Subscription>;

    fn logical_dpi(&self) -> f32;

    fn window_of_current_thread(&self) -> Self::Window;
}
