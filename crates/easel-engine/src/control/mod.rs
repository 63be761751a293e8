//! The control core: lifecycle controller, render-target store, clear-color
//! guard and draw dispatcher, plus the host and variant seams they call through.

mod adapter;
mod base;
mod clear_color;
mod dispatcher;
mod events;
mod render_target;
mod surface;
mod variant;

pub use adapter::{ControlAdapter, HostElement, HostWindow, Subscription, WindowVisibility};
pub use base::{BaseControl, ControlState, FramePass};
pub use clear_color::{ClearColorChange, ClearColorGuard, ClearColorHandle};
pub use dispatcher::{DrawDispatcher, DrawEventArgs, DrawHandler};
pub use events::{ControlEvent, EventSink};
pub use render_target::{RenderTarget, RenderTargetStore};
pub use surface::{BackgroundMode, DrawingSession, RenderSurface};
pub use variant::{ControlVariant, DeviceOf, SessionOf};
