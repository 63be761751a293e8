use crate::coords::Size;
use crate::error::Result;

use super::adapter::ControlAdapter;
use super::base::ControlState;
use super::dispatcher::DrawEventArgs;
use super::render_target::RenderTargetStore;
use super::surface::{BackgroundMode, RenderSurface};

/// Device type of a variant's host.
pub type DeviceOf<V> = <<V as ControlVariant>::Adapter as ControlAdapter>::Device;

/// Drawing-session type of a variant's render target.
pub type SessionOf<V> = <<V as ControlVariant>::Target as RenderSurface>::Session;

/// What a concrete control kind adds on top of [`BaseControl`](super::BaseControl).
///
/// Hooks receive the shared [`ControlState`] explicitly; they never call back into
/// the control that invoked them.
pub trait ControlVariant: Sized + 'static {
    type Adapter: ControlAdapter;
    type Target: RenderSurface<Device = <Self::Adapter as ControlAdapter>::Device>;

    /// Brings `store` in line with the requested parameters.
    ///
    /// The store is already empty when the device was just created.
    fn create_or_update_render_target(
        &mut self,
        device: &DeviceOf<Self>,
        mode: BackgroundMode,
        dpi: f32,
        size: Size,
        store: &mut RenderTargetStore<Self::Target>,
    ) -> anyhow::Result<()>;

    fn create_draw_event_args<'s>(&mut self, session: &'s mut SessionOf<Self>) -> DrawEventArgs<'s, SessionOf<Self>>;

    /// Something the control renders changed.
    fn changed(&mut self, state: &mut ControlState<Self>);

    fn changed_clear_color(&mut self, state: &mut ControlState<Self>, different_alpha_mode: bool);

    fn changed_size(&mut self, state: &mut ControlState<Self>);

    /// Runs before the control is marked unloaded.
    fn unloaded(&mut self, state: &mut ControlState<Self>);

    /// Fails with `InvalidState` when called from a thread this variant does not allow.
    fn check_thread_restriction(&self, state: &ControlState<Self>) -> Result<()>;
}
