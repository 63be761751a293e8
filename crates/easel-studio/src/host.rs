//! Host collaborators backed by a winit window.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use easel_engine::control::{
    ControlAdapter, ControlEvent, EventSink, HostElement, HostWindow, Subscription,
    WindowVisibility,
};
use easel_engine::coords::{Size, DEFAULT_DPI};
use easel_engine::device::RecreatableDeviceManager;
use easel_engine::gpu::{GpuInit, WgpuDevice, WgpuDeviceFactory};
use anyhow::Context;
use winit::window::{Window, WindowId};

/// Sinks subscribed to one kind of platform notification.
#[derive(Clone, Default)]
pub struct Notifier {
    inner: Rc<RefCell<NotifierInner>>,
}

#[derive(Default)]
struct NotifierInner {
    next_id: u64,
    sinks: Vec<(u64, EventSink)>,
}

impl Notifier {
    pub fn subscribe(&self, sink: EventSink) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.sinks.push((id, sink));
            id
        };

        let inner = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.borrow_mut().sinks.retain(|(i, _)| *i != id);
            }
        })
    }

    pub fn notify(&self, event: ControlEvent) {
        for (_, sink) in self.inner.borrow().sinks.iter() {
            sink.send(event.clone());
        }
    }
}

#[derive(Clone)]
pub struct StudioWindow {
    window: Arc<Window>,
    occluded: Rc<Cell<bool>>,
}

impl HostWindow for StudioWindow {
    fn visibility(&self) -> anyhow::Result<WindowVisibility> {
        if self.occluded.get() {
            return Ok(WindowVisibility::Hidden);
        }

        Ok(match self.window.is_visible() {
            Some(true) => WindowVisibility::Visible,
            Some(false) => WindowVisibility::Hidden,
            None => WindowVisibility::Unavailable,
        })
    }
}

/// The window's client area acts as the control's element.
pub struct StudioElement {
    window: Arc<Window>,
    events: EventSink,
}

impl StudioElement {
    /// Forwards a window notification to the control.
    pub fn post(&self, event: ControlEvent) {
        self.events.send(event);
    }

    pub fn logical_size(&self) -> Size {
        let scale = self.window.scale_factor();
        let size = self.window.inner_size().to_logical::<f32>(scale);
        Size::new(size.width, size.height)
    }
}

impl HostElement for StudioElement {
    fn actual_size(&self) -> anyhow::Result<Size> {
        Ok(self.logical_size())
    }

    fn invalidate(&self) {
        self.window.request_redraw();
    }
}

pub struct StudioAdapter {
    window: Arc<Window>,
    gpu_init: GpuInit,
    instance: wgpu::Instance,
    surface: Arc<wgpu::Surface<'static>>,
    occluded: Rc<Cell<bool>>,
    suspending: Notifier,
    dpi_changed: Notifier,
    visibility_changed: Notifier,
}

impl StudioAdapter {
    pub fn new(window: Arc<Window>, gpu_init: GpuInit) -> anyhow::Result<Self> {
        let instance = gpu_init.create_instance();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create window surface")?;

        Ok(Self {
            window,
            gpu_init,
            instance,
            surface: Arc::new(surface),
            occluded: Rc::new(Cell::new(false)),
            suspending: Notifier::default(),
            dpi_changed: Notifier::default(),
            visibility_changed: Notifier::default(),
        })
    }

    /// The window's surface; devices are only requested from adapters that can
    /// present to it.
    pub fn surface(&self) -> &Arc<wgpu::Surface<'static>> {
        &self.surface
    }

    pub fn set_occluded(&self, occluded: bool) {
        if self.occluded.replace(occluded) != occluded {
            self.visibility_changed.notify(ControlEvent::WindowVisibilityChanged);
        }
    }

    pub fn notify_suspending(&self) {
        self.suspending.notify(ControlEvent::ApplicationSuspending);
    }

    pub fn notify_dpi_changed(&self) {
        self.dpi_changed.notify(ControlEvent::DpiChanged);
    }
}

impl ControlAdapter for StudioAdapter {
    type Device = WgpuDevice;
    type Window = StudioWindow;
    type Element = StudioElement;
    type Component = WindowId;

    fn create_host_element(&self, events: EventSink) -> anyhow::Result<(WindowId, StudioElement)> {
        let element = StudioElement {
            window: self.window.clone(),
            events,
        };
        Ok((self.window.id(), element))
    }

    fn create_device_manager(&self) -> RecreatableDeviceManager<WgpuDevice> {
        let factory = WgpuDeviceFactory::with_instance(self.instance.clone(), self.gpu_init.clone())
            .with_compatible_surface(self.surface.clone());
        RecreatableDeviceManager::new(factory)
    }

    fn subscribe_application_suspending(&self, events: EventSink) -> anyhow::Result<Subscription> {
        Ok(self.suspending.subscribe(events))
    }

    fn subscribe_dpi_changed(&self, events: EventSink) -> anyhow::Result<Subscription> {
        Ok(self.dpi_changed.subscribe(events))
    }

    fn subscribe_window_visibility_changed(&self, events: EventSink) -> anyhow::Result<Subscription> {
        Ok(self.visibility_changed.subscribe(events))
    }

    fn logical_dpi(&self) -> f32 {
        self.window.scale_factor() as f32 * DEFAULT_DPI
    }

    fn window_of_current_thread(&self) -> StudioWindow {
        StudioWindow {
            window: self.window.clone(),
            occluded: self.occluded.clone(),
        }
    }
}
