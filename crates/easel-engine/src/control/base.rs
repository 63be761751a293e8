use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use crate::coords::{self, Size};
use crate::device::{
    CreateResourcesEventArgs, GraphicsDevice, RecreatableDeviceManager, RunWithDeviceFlags,
};
use crate::error::{boundary, ControlError, Result};
use crate::event::EventToken;
use crate::paint::Color;

use super::adapter::{ControlAdapter, HostElement, HostWindow, Subscription, WindowVisibility};
use super::clear_color::{ClearColorGuard, ClearColorHandle};
use super::dispatcher::{DrawDispatcher, DrawEventArgs};
use super::events::{ControlEvent, EventSink};
use super::render_target::RenderTargetStore;
use super::surface::BackgroundMode;
use super::variant::{ControlVariant, DeviceOf, SessionOf};

type WindowOf<V> = <<V as ControlVariant>::Adapter as ControlAdapter>::Window;
type ElementOf<V> = <<V as ControlVariant>::Adapter as ControlAdapter>::Element;
type ComponentOf<V> = <<V as ControlVariant>::Adapter as ControlAdapter>::Component;

/// State shared by every control variant.
///
/// Lives on the affinity thread. Variant hooks get mutable access to it.
pub struct ControlState<V: ControlVariant> {
    // Captured at construction; never re-queried.
    window: WindowOf<V>,
    adapter: Rc<V::Adapter>,
    component: ComponentOf<V>,
    element: ElementOf<V>,

    device_manager: RecreatableDeviceManager<DeviceOf<V>>,
    loaded: bool,
    dpi: f32,

    draw: DrawDispatcher<SessionOf<V>>,
    clear_color: Arc<ClearColorGuard>,
    render_target: RenderTargetStore<V::Target>,

    events: EventSink,
    inbox: flume::Receiver<ControlEvent>,
    _subscriptions: Vec<Subscription>,

    affinity: ThreadId,
}

impl<V: ControlVariant> ControlState<V> {
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    pub fn element(&self) -> &ElementOf<V> {
        &self.element
    }

    pub fn render_target(&self) -> &RenderTargetStore<V::Target> {
        &self.render_target
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color.get()
    }

    /// A sink that queues events for this control.
    pub fn events(&self) -> EventSink {
        self.events.clone()
    }

    /// Laid-out size of the host element, in DIPs.
    pub fn actual_size(&self) -> Result<Size> {
        self.element
            .actual_size()
            .map_err(|err| ControlError::platform("failed to query element size", err))
    }

    /// Whether the captured window is visible. A window that cannot report its
    /// visibility (designer surfaces) counts as visible.
    pub fn is_window_visible(&self) -> Result<bool> {
        let visibility = self
            .window
            .visibility()
            .map_err(|err| ControlError::platform("failed to query window visibility", err))?;

        Ok(!matches!(visibility, WindowVisibility::Hidden))
    }

    /// Drops the render target and queues Changed.
    pub fn reset_render_target(&mut self) {
        self.render_target.reset();
        self.events.send(ControlEvent::Changed);
    }

    /// Fails with `InvalidState` off the thread that created the control.
    pub fn check_affinity_thread(&self) -> Result<()> {
        if thread::current().id() == self.affinity {
            Ok(())
        } else {
            Err(ControlError::InvalidState(
                "control accessed from a thread other than the one that created it".into(),
            ))
        }
    }
}

impl<V: ControlVariant> fmt::Debug for ControlState<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlState")
            .field("loaded", &self.loaded)
            .field("dpi", &self.dpi)
            .field("device_manager", &self.device_manager)
            .field("draw_handlers", &self.draw.len())
            .field("clear_color", &self.clear_color.get())
            .field("target_size", &self.render_target.size())
            .field("affinity", &self.affinity)
            .finish()
    }
}

/// One render pass, as handed to [`BaseControl::run_with_render_target`].
pub struct FramePass<'p, V: ControlVariant> {
    target: &'p mut V::Target,
    device: &'p DeviceOf<V>,
    clear_color: Color,
    resources_created: bool,
    draw: &'p mut DrawDispatcher<SessionOf<V>>,
    variant: &'p mut V,
}

impl<V: ControlVariant> FramePass<'_, V> {
    pub fn target(&mut self) -> &mut V::Target {
        &mut *self.target
    }

    pub fn device(&self) -> &DeviceOf<V> {
        self.device
    }

    /// The clear color as read once at the start of the pass.
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn resources_created(&self) -> bool {
        self.resources_created
    }

    pub fn variant(&mut self) -> &mut V {
        &mut *self.variant
    }

    /// Draws one frame on the pass's target, optionally running the draw callbacks.
    pub fn draw(&mut self, invoke_callbacks: bool) -> Result<()> {
        let variant = &mut *self.variant;
        self.draw.draw(&mut *self.target, self.clear_color, invoke_callbacks, |session| {
            variant.create_draw_event_args(session)
        })
    }
}

/// The lifecycle controller behind every drawable control.
///
/// Owns the device manager, render target, clear color and draw callbacks, and
/// routes host notifications to them and to the variant `V`. Notifications can be
/// delivered directly through the `on_*` methods or queued through an [`EventSink`];
/// each mutating entry point drains the queue before it returns.
pub struct BaseControl<V: ControlVariant> {
    state: ControlState<V>,
    variant: V,
}

impl<V: ControlVariant> BaseControl<V> {
    pub fn new(adapter: Rc<V::Adapter>, variant: V) -> Result<Self> {
        boundary("BaseControl::new", || {
            let window = adapter.window_of_current_thread();
            let dpi = adapter.logical_dpi();
            let (events, inbox) = EventSink::channel();

            let mut device_manager = adapter.create_device_manager();
            let changed = events.clone();
            device_manager.set_changed_callback(Arc::new(move || changed.send(ControlEvent::Changed)));

            let (component, element) = adapter
                .create_host_element(events.clone())
                .map_err(|err| ControlError::platform("failed to create host element", err))?;

            let suspending = adapter
                .subscribe_application_suspending(events.clone())
                .map_err(|err| ControlError::platform("failed to subscribe to application suspending", err))?;
            let dpi_changed = adapter
                .subscribe_dpi_changed(events.clone())
                .map_err(|err| ControlError::platform("failed to subscribe to dpi changes", err))?;
            let visibility_changed = adapter
                .subscribe_window_visibility_changed(events.clone())
                .map_err(|err| ControlError::platform("failed to subscribe to window visibility", err))?;

            log::debug!("control created at {dpi} dpi");

            Ok(Self {
                state: ControlState {
                    window,
                    adapter,
                    component,
                    element,
                    device_manager,
                    loaded: false,
                    dpi,
                    draw: DrawDispatcher::new(),
                    clear_color: Arc::new(ClearColorGuard::new(Color::TRANSPARENT)),
                    render_target: RenderTargetStore::new(),
                    events,
                    inbox,
                    _subscriptions: vec![suspending, dpi_changed, visibility_changed],
                    affinity: thread::current().id(),
                },
                variant,
            })
        })
    }

    pub fn state(&self) -> &ControlState<V> {
        &self.state
    }

    pub fn variant(&self) -> &V {
        &self.variant
    }

    pub fn variant_mut(&mut self) -> &mut V {
        &mut self.variant
    }

    /// Split access for variant entry points.
    pub fn parts_mut(&mut self) -> (&mut ControlState<V>, &mut V) {
        (&mut self.state, &mut self.variant)
    }

    /// The host-side object to place in the UI tree.
    pub fn component(&self) -> &ComponentOf<V> {
        &self.state.component
    }

    pub fn render_target(&self) -> &RenderTargetStore<V::Target> {
        &self.state.render_target
    }

    /// A sink that queues notifications for this control from any thread.
    pub fn events(&self) -> EventSink {
        self.state.events()
    }

    /// Runs `body` as a public entry point: failures and panics are reported as
    /// [`ControlError`]s, and queued notifications are drained afterward.
    pub fn entry_point<T>(
        &mut self,
        entry: &'static str,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        boundary(entry, || {
            let outcome = body(self);
            let drained = self.drain_events();
            let value = outcome?;
            drained.map(|()| value)
        })
    }

    // ---------------------------------------------------------------------
    // Clear color
    // ---------------------------------------------------------------------

    pub fn clear_color(&self) -> Color {
        self.state.clear_color.get()
    }

    pub fn set_clear_color(&mut self, value: Color) -> Result<()> {
        self.entry_point("BaseControl::set_clear_color", |control| {
            if let Some(change) = control.state.clear_color.set(value) {
                control
                    .variant
                    .changed_clear_color(&mut control.state, change.different_alpha_mode);
            }
            Ok(())
        })
    }

    /// A `Send + Sync` handle for reading and writing the clear color from other
    /// threads. Changes made through it reach the control as queued events.
    pub fn clear_color_handle(&self) -> ClearColorHandle {
        ClearColorHandle::new(self.state.clear_color.clone(), self.state.events())
    }

    // ---------------------------------------------------------------------
    // Callbacks
    // ---------------------------------------------------------------------

    pub fn add_create_resources<F>(&mut self, handler: F) -> Result<EventToken>
    where
        F: FnMut(&CreateResourcesEventArgs<'_, DeviceOf<V>>) -> anyhow::Result<()> + 'static,
    {
        self.entry_point("BaseControl::add_create_resources", |control| {
            control.variant.check_thread_restriction(&control.state)?;
            control.state.device_manager.add_create_resources(handler)
        })
    }

    pub fn remove_create_resources(&mut self, token: EventToken) -> Result<()> {
        self.entry_point("BaseControl::remove_create_resources", |control| {
            control.variant.check_thread_restriction(&control.state)?;
            control.state.device_manager.remove_create_resources(token);
            Ok(())
        })
    }

    /// Registers a draw callback. Fires the variant's `changed` hook so the new
    /// callback gets a frame.
    pub fn add_draw<F>(&mut self, handler: F) -> Result<EventToken>
    where
        F: FnMut(&mut DrawEventArgs<'_, SessionOf<V>>) -> anyhow::Result<()> + 'static,
    {
        self.entry_point("BaseControl::add_draw", |control| {
            let token = control.state.draw.add(handler);
            control.variant.changed(&mut control.state);
            Ok(token)
        })
    }

    pub fn remove_draw(&mut self, token: EventToken) -> Result<()> {
        self.entry_point("BaseControl::remove_draw", |control| {
            if !control.state.draw.remove(token) {
                log::debug!("remove_draw: unknown token {}", token.value());
            }
            Ok(())
        })
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn ready_to_draw(&self) -> Result<bool> {
        boundary("BaseControl::ready_to_draw", || {
            self.variant.check_thread_restriction(&self.state)?;
            Ok(self.state.device_manager.is_ready_to_draw())
        })
    }

    /// The current device. Fails with `InvalidArgument` before one was created.
    pub fn device(&self) -> Result<DeviceOf<V>> {
        boundary("BaseControl::device", || {
            self.state.device_manager.device().cloned().ok_or_else(|| {
                ControlError::InvalidArgument("the device has not been created yet".into())
            })
        })
    }

    pub fn dpi(&self) -> f32 {
        self.state.dpi
    }

    pub fn convert_pixels_to_dips(&self, pixels: i32) -> f32 {
        coords::pixels_to_dips(pixels, self.state.dpi)
    }

    pub fn convert_dips_to_pixels(&self, dips: f32) -> i32 {
        coords::dips_to_pixels(dips, self.state.dpi)
    }

    // ---------------------------------------------------------------------
    // Host notifications
    // ---------------------------------------------------------------------

    pub fn on_loaded(&mut self) -> Result<()> {
        self.handle_event(ControlEvent::Loaded)
    }

    pub fn on_unloaded(&mut self) -> Result<()> {
        self.handle_event(ControlEvent::Unloaded)
    }

    pub fn on_size_changed(&mut self, new_size: Size) -> Result<()> {
        self.handle_event(ControlEvent::SizeChanged(new_size))
    }

    pub fn on_dpi_changed(&mut self) -> Result<()> {
        self.handle_event(ControlEvent::DpiChanged)
    }

    pub fn on_window_visibility_changed(&mut self) -> Result<()> {
        self.handle_event(ControlEvent::WindowVisibilityChanged)
    }

    /// Trims the device, if one exists. Trim failures are returned.
    pub fn on_application_suspending(&mut self) -> Result<()> {
        self.handle_event(ControlEvent::ApplicationSuspending)
    }

    pub fn handle_event(&mut self, event: ControlEvent) -> Result<()> {
        self.entry_point("BaseControl::handle_event", |control| control.dispatch(event))
    }

    /// Delivers every queued notification.
    ///
    /// All events are processed; the first failure is returned.
    pub fn process_events(&mut self) -> Result<()> {
        self.entry_point("BaseControl::process_events", |_| Ok(()))
    }

    fn drain_events(&mut self) -> Result<()> {
        let mut first_error = None;

        while let Ok(event) = self.state.inbox.try_recv() {
            if let Err(err) = self.dispatch(event) {
                match first_error {
                    None => first_error = Some(err),
                    Some(_) => log::warn!("queued event failed: {err:#}"),
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn dispatch(&mut self, event: ControlEvent) -> Result<()> {
        log::trace!("control event {event:?}");

        let state = &mut self.state;
        match event {
            ControlEvent::Loaded => {
                state.loaded = true;
                self.variant.changed(state);
            }
            ControlEvent::Unloaded => {
                self.variant.unloaded(state);
                state.loaded = false;
            }
            ControlEvent::SizeChanged(new_size) => {
                // Hosts may report the same size repeatedly.
                if new_size != state.render_target.size() {
                    self.variant.changed_size(state);
                }
            }
            ControlEvent::DpiChanged => {
                let new_dpi = state.adapter.logical_dpi();
                if new_dpi != state.dpi {
                    log::debug!("dpi changed {} -> {new_dpi}", state.dpi);
                    state.dpi = new_dpi;
                    state.device_manager.set_dpi_changed();
                }
            }
            ControlEvent::WindowVisibilityChanged => {
                // A frame skipped while hidden is requested again once shown.
                if state.loaded && state.is_window_visible()? {
                    self.variant.changed(state);
                }
            }
            ControlEvent::ApplicationSuspending => {
                if let Some(device) = state.device_manager.device() {
                    device
                        .trim()
                        .map_err(|err| ControlError::platform("device trim failed", err))?;
                }
            }
            ControlEvent::ClearColorChanged { different_alpha_mode } => {
                self.variant.changed_clear_color(state, different_alpha_mode);
            }
            ControlEvent::Changed => self.variant.changed(state),
        }

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Rendering
    // ---------------------------------------------------------------------

    /// Runs one render pass at `size` with a valid device and an up-to-date target.
    ///
    /// A target built for a device that was just replaced is discarded first. The
    /// background mode follows the clear color, read once for the whole pass.
    pub fn run_with_render_target<F>(&mut self, size: Size, f: F) -> Result<()>
    where
        F: FnOnce(&mut FramePass<'_, V>) -> Result<()>,
    {
        let BaseControl { state, variant } = self;
        let ControlState {
            device_manager,
            render_target,
            draw,
            clear_color,
            dpi,
            ..
        } = state;
        let dpi = *dpi;

        device_manager.run_with_device(|device, flags| {
            let clear = clear_color.get();
            let resources_created = !flags.contains(RunWithDeviceFlags::RESOURCES_NOT_CREATED);

            if flags.contains(RunWithDeviceFlags::NEWLY_CREATED_DEVICE) {
                render_target.reset();
            }

            let mode = BackgroundMode::from_clear_color(clear);
            variant
                .create_or_update_render_target(device, mode, dpi, size, render_target)
                .map_err(|err| ControlError::platform("failed to update render target", err))?;

            let Some(target) = render_target.target_mut() else {
                return Err(ControlError::InvalidState(
                    "render target missing after update".into(),
                ));
            };

            let mut pass = FramePass {
                target,
                device,
                clear_color: clear,
                resources_created,
                draw,
                variant,
            };
            f(&mut pass)
        })
    }
}

impl<V: ControlVariant + fmt::Debug> fmt::Debug for BaseControl<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseControl")
            .field("state", &self.state)
            .field("variant", &self.variant)
            .finish()
    }
}
