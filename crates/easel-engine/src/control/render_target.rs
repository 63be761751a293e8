use crate::coords::Size;
use crate::device::GraphicsDevice;

use super::surface::{BackgroundMode, RenderSurface};

/// A built render target together with the parameters it was built for.
#[derive(Debug)]
pub struct RenderTarget<T> {
    pub target: T,
    pub background_mode: BackgroundMode,
    pub dpi: f32,
    pub size: Size,
}

/// Holds the current render target and decides between rebuild and reuse.
///
/// The stored record's fields always describe the parameters of the last
/// successful build or in-place update.
#[derive(Debug)]
pub struct RenderTargetStore<T> {
    current: Option<RenderTarget<T>>,
}

impl<T: RenderSurface> RenderTargetStore<T> {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn current(&self) -> Option<&RenderTarget<T>> {
        self.current.as_ref()
    }

    pub fn target_mut(&mut self) -> Option<&mut T> {
        self.current.as_mut().map(|rt| &mut rt.target)
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Size of the stored target, or zero when empty.
    pub fn size(&self) -> Size {
        self.current.as_ref().map_or(Size::ZERO, |rt| rt.size)
    }

    pub fn dpi(&self) -> Option<f32> {
        self.current.as_ref().map(|rt| rt.dpi)
    }

    pub fn background_mode(&self) -> Option<BackgroundMode> {
        self.current.as_ref().map(|rt| rt.background_mode)
    }

    /// Drops the stored target.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Rebuilds the target whenever any parameter differs from the stored one.
    pub fn recreate_if_changed(
        &mut self,
        device: &T::Device,
        mode: BackgroundMode,
        dpi: f32,
        size: Size,
    ) -> anyhow::Result<()> {
        self.create_or_update(device, mode, dpi, size, |_, _, _, _| Ok(false))
    }

    /// Brings the stored target in line with the given parameters.
    ///
    /// - empty, or built on another device: rebuilt.
    /// - same device, same parameters: kept as is.
    /// - same device, other parameters: `resize_in_place` is tried first
    ///   (typically `T::resize`); the target is rebuilt if it reports `false`.
    ///
    /// On error the store is left empty rather than holding a stale record.
    pub fn create_or_update<R>(
        &mut self,
        device: &T::Device,
        mode: BackgroundMode,
        dpi: f32,
        size: Size,
        resize_in_place: R,
    ) -> anyhow::Result<()>
    where
        R: FnOnce(&mut T, BackgroundMode, f32, Size) -> anyhow::Result<bool>,
    {
        if let Some(rt) = &mut self.current {
            if rt.target.device_id() == device.id() {
                if rt.background_mode == mode && rt.dpi == dpi && rt.size == size {
                    return Ok(());
                }

                match resize_in_place(&mut rt.target, mode, dpi, size) {
                    Ok(true) => {
                        log::debug!("render target updated in place to {size:?} @ {dpi} dpi ({mode:?})");
                        rt.background_mode = mode;
                        rt.dpi = dpi;
                        rt.size = size;
                        return Ok(());
                    }
                    Ok(false) => {}
                    Err(err) => {
                        self.current = None;
                        return Err(err);
                    }
                }
            }
        }

        self.current = None;
        let target = T::create(device, mode, dpi, size)?;
        log::debug!("render target created: {size:?} @ {dpi} dpi ({mode:?})");

        self.current = Some(RenderTarget {
            target,
            background_mode: mode,
            dpi,
            size,
        });
        Ok(())
    }
}

impl<T: RenderSurface> Default for RenderTargetStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
