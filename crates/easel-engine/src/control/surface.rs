use crate::coords::Size;
use crate::device::{DeviceId, GraphicsDevice};
use crate::paint::Color;

/// Whether a render target is composed as opaque or with per-pixel alpha.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum BackgroundMode {
    #[default]
    Opaque,
    Transparent,
}

impl BackgroundMode {
    /// Opaque exactly when the clear color is fully opaque.
    pub fn from_clear_color(color: Color) -> Self {
        if color.is_opaque() {
            BackgroundMode::Opaque
        } else {
            BackgroundMode::Transparent
        }
    }
}

/// A drawable surface bound to one device.
pub trait RenderSurface: Sized {
    type Device: GraphicsDevice;
    type Session: DrawingSession + 'static;

    /// Builds a surface for `size` (DIPs) at `dpi` on `device`.
    fn create(device: &Self::Device, mode: BackgroundMode, dpi: f32, size: Size) -> anyhow::Result<Self>;

    /// Id of the device this surface was built on.
    fn device_id(&self) -> DeviceId;

    /// Starts a frame, pre-cleared to `clear`.
    fn create_drawing_session(&mut self, clear: Color) -> anyhow::Result<Self::Session>;

    /// Adapts the surface to new parameters without rebuilding it.
    ///
    /// Returns `Ok(false)` when this surface type cannot absorb the change.
    fn resize(&mut self, mode: BackgroundMode, dpi: f32, size: Size) -> anyhow::Result<bool> {
        let _ = (mode, dpi, size);
        Ok(false)
    }
}

/// One frame's worth of draw commands against a surface.
pub trait DrawingSession {
    /// Finishes the frame. Must be called before the surface is reused.
    fn close(self) -> anyhow::Result<()>;
}
