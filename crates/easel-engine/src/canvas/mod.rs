//! On-demand drawable control.
//!
//! A canvas redraws only when something it renders changed: a new draw callback,
//! a resize, a clear-color change, a new device, finished resources or the window
//! being shown again. The host calls [`CanvasControl::render`] when it gets the
//! element's redraw request.

use std::marker::PhantomData;
use std::rc::Rc;

use crate::control::{
    BackgroundMode, BaseControl, ControlAdapter, ControlState, ControlVariant, DeviceOf,
    DrawEventArgs, HostElement, RenderSurface, RenderTargetStore, SessionOf,
};
use crate::coords::Size;
use crate::error::Result;
use crate::time::FrameClock;

/// A [`BaseControl`] that redraws on invalidation.
pub type CanvasControl<A, T> = BaseControl<CanvasVariant<A, T>>;

pub struct CanvasVariant<A, T> {
    needs_redraw: bool,
    clock: FrameClock,
    _marker: PhantomData<fn() -> (A, T)>,
}

impl<A, T> CanvasVariant<A, T> {
    pub fn new() -> Self {
        Self {
            needs_redraw: false,
            clock: FrameClock::new(),
            _marker: PhantomData,
        }
    }

    /// Whether a redraw has been requested and not yet performed.
    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }
}

impl<A, T> Default for CanvasVariant<A, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, T> std::fmt::Debug for CanvasVariant<A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasVariant")
            .field("needs_redraw", &self.needs_redraw)
            .finish()
    }
}

impl<A, T> ControlVariant for CanvasVariant<A, T>
where
    A: ControlAdapter + 'static,
    T: RenderSurface<Device = A::Device> + 'static,
{
    type Adapter = A;
    type Target = T;

    fn create_or_update_render_target(
        &mut self,
        device: &DeviceOf<Self>,
        mode: BackgroundMode,
        dpi: f32,
        size: Size,
        store: &mut RenderTargetStore<T>,
    ) -> anyhow::Result<()> {
        store.recreate_if_changed(device, mode, dpi, size)
    }

    fn create_draw_event_args<'s>(&mut self, session: &'s mut SessionOf<Self>) -> DrawEventArgs<'s, SessionOf<Self>> {
        DrawEventArgs::new(session, Some(self.clock.tick()))
    }

    fn changed(&mut self, state: &mut ControlState<Self>) {
        self.needs_redraw = true;
        if state.is_loaded() {
            state.element().invalidate();
        }
    }

    fn changed_clear_color(&mut self, state: &mut ControlState<Self>, _different_alpha_mode: bool) {
        // The target is rebuilt on the next pass if the background mode flipped.
        self.changed(state);
    }

    fn changed_size(&mut self, state: &mut ControlState<Self>) {
        self.changed(state);
    }

    fn unloaded(&mut self, state: &mut ControlState<Self>) {
        self.clock.reset();
        state.reset_render_target();
    }

    fn check_thread_restriction(&self, state: &ControlState<Self>) -> Result<()> {
        state.check_affinity_thread()
    }
}

impl<A, T> CanvasControl<A, T>
where
    A: ControlAdapter + 'static,
    T: RenderSurface<Device = A::Device> + 'static,
{
    pub fn create(adapter: Rc<A>) -> Result<Self> {
        BaseControl::new(adapter, CanvasVariant::new())
    }

    /// Requests a redraw.
    pub fn invalidate(&mut self) -> Result<()> {
        self.entry_point("CanvasControl::invalidate", |control| {
            let (state, variant) = control.parts_mut();
            variant.changed(state);
            Ok(())
        })
    }

    /// Draws a frame if one is needed and the control can be seen.
    ///
    /// Nothing happens while unloaded, hidden, without a pending redraw, or at an
    /// empty size. Draw callbacks run only once resources have been created.
    pub fn render(&mut self) -> Result<()> {
        self.entry_point("CanvasControl::render", |control| {
            let (state, variant) = control.parts_mut();
            if !state.is_loaded() || !variant.needs_redraw {
                return Ok(());
            }

            if !state.is_window_visible()? {
                return Ok(());
            }

            let size = state.actual_size()?;
            if size.is_empty() {
                return Ok(());
            }

            variant.needs_redraw = false;

            control.run_with_render_target(size, |pass| {
                let invoke_callbacks = pass.resources_created();
                pass.draw(invoke_callbacks)
            })
        })
    }
}
