//! Fake host collaborators for driving controls without a GPU or a window.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use easel_engine::control::{
    BackgroundMode, BaseControl, ControlAdapter, ControlEvent, ControlState, ControlVariant,
    DeviceOf, DrawEventArgs, DrawingSession, EventSink, HostElement, HostWindow,
    RenderSurface, RenderTargetStore, SessionOf, Subscription, WindowVisibility,
};
use easel_engine::coords::{Size, DEFAULT_DPI};
use easel_engine::device::{DeviceFactory, DeviceId, GraphicsDevice, RecreatableDeviceManager};
use easel_engine::paint::Color;
use easel_engine::{ControlError, Result};

// ── journal ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    DeviceCreated(DeviceId),
    TargetBuilt {
        device: DeviceId,
        mode: BackgroundMode,
        dpi: f32,
        size: Size,
    },
    SessionOpened(Color),
    SessionClosed,
    Trimmed(DeviceId),
}

#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<Entry>>>);

impl Journal {
    pub fn push(&self, entry: Entry) {
        self.0.borrow_mut().push(entry);
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn builds(&self) -> Vec<Entry> {
        self.0
            .borrow()
            .iter()
            .filter(|e| matches!(e, Entry::TargetBuilt { .. }))
            .cloned()
            .collect()
    }
}

// ── device ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FakeDevice {
    id: DeviceId,
    lost: Rc<Cell<bool>>,
    trim_fails: Rc<Cell<bool>>,
    journal: Journal,
}

impl FakeDevice {
    pub fn lose(&self) {
        self.lost.set(true);
    }
}

impl GraphicsDevice for FakeDevice {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn is_lost(&self) -> bool {
        self.lost.get()
    }

    fn trim(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.trim_fails.get(), "device hung");
        self.journal.push(Entry::Trimmed(self.id));
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    pub journal: Journal,
    pub created: Rc<RefCell<Vec<FakeDevice>>>,
    pub fail: Rc<Cell<bool>>,
    pub trim_fails: Rc<Cell<bool>>,
}

impl FakeFactory {
    pub fn created_count(&self) -> usize {
        self.created.borrow().len()
    }

    pub fn last(&self) -> Option<FakeDevice> {
        self.created.borrow().last().cloned()
    }
}

impl DeviceFactory for FakeFactory {
    type Device = FakeDevice;

    fn create_device(&mut self) -> anyhow::Result<FakeDevice> {
        anyhow::ensure!(!self.fail.get(), "no adapter");
        let device = FakeDevice {
            id: DeviceId::next(),
            lost: Rc::new(Cell::new(false)),
            trim_fails: self.trim_fails.clone(),
            journal: self.journal.clone(),
        };
        self.journal.push(Entry::DeviceCreated(device.id));
        self.created.borrow_mut().push(device.clone());
        Ok(device)
    }
}

// ── render target ───────────────────────────────────────────────────────────

pub struct FakeTarget {
    device: FakeDevice,
}

pub struct FakeSession {
    device: FakeDevice,
    pub clear: Color,
}

impl FakeTarget {
    /// Largest side, in DIPs, a target may be created with.
    pub const MAX_EXTENT: f32 = 4096.0;
}

impl RenderSurface for FakeTarget {
    type Device = FakeDevice;
    type Session = FakeSession;

    fn create(device: &FakeDevice, mode: BackgroundMode, dpi: f32, size: Size) -> anyhow::Result<Self> {
        anyhow::ensure!(
            size.width <= Self::MAX_EXTENT && size.height <= Self::MAX_EXTENT,
            "target of {size:?} exceeds the device limit"
        );
        device.journal.push(Entry::TargetBuilt {
            device: device.id,
            mode,
            dpi,
            size,
        });
        Ok(FakeTarget {
            device: device.clone(),
        })
    }

    fn device_id(&self) -> DeviceId {
        self.device.id
    }

    fn create_drawing_session(&mut self, clear: Color) -> anyhow::Result<FakeSession> {
        self.device.journal.push(Entry::SessionOpened(clear));
        Ok(FakeSession {
            device: self.device.clone(),
            clear,
        })
    }
}

impl DrawingSession for FakeSession {
    fn close(self) -> anyhow::Result<()> {
        self.device.journal.push(Entry::SessionClosed);
        anyhow::ensure!(!self.device.is_lost(), "device removed");
        Ok(())
    }
}

impl FakeSession {
    pub fn device(&self) -> &FakeDevice {
        &self.device
    }
}

// ── host ────────────────────────────────────────────────────────────────────

pub struct FakeWindow {
    visibility: Rc<Cell<WindowVisibility>>,
}

impl HostWindow for FakeWindow {
    fn visibility(&self) -> anyhow::Result<WindowVisibility> {
        Ok(self.visibility.get())
    }
}

pub struct FakeElement {
    size: Rc<Cell<Size>>,
    invalidations: Rc<Cell<usize>>,
}

impl HostElement for FakeElement {
    fn actual_size(&self) -> anyhow::Result<Size> {
        Ok(self.size.get())
    }

    fn invalidate(&self) {
        self.invalidations.set(self.invalidations.get() + 1);
    }
}

pub struct FakeAdapter {
    pub factory: FakeFactory,
    pub dpi: Cell<f32>,
    pub visibility: Rc<Cell<WindowVisibility>>,
    pub element_size: Rc<Cell<Size>>,
    pub invalidations: Rc<Cell<usize>>,
    pub element_events: RefCell<Option<EventSink>>,
    pub suspending: RefCell<Vec<EventSink>>,
    pub dpi_changed: RefCell<Vec<EventSink>>,
    pub visibility_changed: RefCell<Vec<EventSink>>,
    pub unsubscribed: Rc<Cell<usize>>,
    pub managers_created: Cell<usize>,
}

impl FakeAdapter {
    pub fn new() -> Rc<Self> {
        Rc::new(FakeAdapter {
            factory: FakeFactory::default(),
            dpi: Cell::new(DEFAULT_DPI),
            visibility: Rc::new(Cell::new(WindowVisibility::Visible)),
            element_size: Rc::new(Cell::new(Size::new(100.0, 100.0))),
            invalidations: Rc::new(Cell::new(0)),
            element_events: RefCell::new(None),
            suspending: RefCell::new(Vec::new()),
            dpi_changed: RefCell::new(Vec::new()),
            visibility_changed: RefCell::new(Vec::new()),
            unsubscribed: Rc::new(Cell::new(0)),
            managers_created: Cell::new(0),
        })
    }

    pub fn journal(&self) -> &Journal {
        &self.factory.journal
    }

    /// Simulates the host element raising a routed event.
    pub fn post_to_element(&self, event: ControlEvent) {
        if let Some(sink) = self.element_events.borrow().as_ref() {
            sink.send(event);
        }
    }

    pub fn raise_suspending(&self) {
        for sink in self.suspending.borrow().iter() {
            sink.send(ControlEvent::ApplicationSuspending);
        }
    }

    pub fn raise_dpi_changed(&self, dpi: f32) {
        self.dpi.set(dpi);
        for sink in self.dpi_changed.borrow().iter() {
            sink.send(ControlEvent::DpiChanged);
        }
    }

    pub fn raise_visibility(&self, visibility: WindowVisibility) {
        self.visibility.set(visibility);
        for sink in self.visibility_changed.borrow().iter() {
            sink.send(ControlEvent::WindowVisibilityChanged);
        }
    }

    fn subscription(&self) -> Subscription {
        let unsubscribed = self.unsubscribed.clone();
        Subscription::new(move || unsubscribed.set(unsubscribed.get() + 1))
    }
}

impl ControlAdapter for FakeAdapter {
    type Device = FakeDevice;
    type Window = FakeWindow;
    type Element = FakeElement;
    type Component = ();

    fn create_host_element(&self, events: EventSink) -> anyhow::Result<((), FakeElement)> {
        *self.element_events.borrow_mut() = Some(events);
        Ok((
            (),
            FakeElement {
                size: self.element_size.clone(),
                invalidations: self.invalidations.clone(),
            },
        ))
    }

    fn create_device_manager(&self) -> RecreatableDeviceManager<FakeDevice> {
        self.managers_created.set(self.managers_created.get() + 1);
        RecreatableDeviceManager::new(self.factory.clone())
    }

    fn subscribe_application_suspending(&self, events: EventSink) -> anyhow::Result<Subscription> {
        self.suspending.borrow_mut().push(events);
        Ok(self.subscription())
    }

    fn subscribe_dpi_changed(&self, events: EventSink) -> anyhow::Result<Subscription> {
        self.dpi_changed.borrow_mut().push(events);
        Ok(self.subscription())
    }

    fn subscribe_window_visibility_changed(&self, events: EventSink) -> anyhow::Result<Subscription> {
        self.visibility_changed.borrow_mut().push(events);
        Ok(self.subscription())
    }

    fn logical_dpi(&self) -> f32 {
        self.dpi.get()
    }

    fn window_of_current_thread(&self) -> FakeWindow {
        FakeWindow {
            visibility: self.visibility.clone(),
        }
    }
}

// ── recording variant ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Hooks {
    pub changed: usize,
    pub clear_color: Vec<bool>,
    /// The clear color as read from inside the hook.
    pub seen_colors: Vec<Color>,
    pub size: usize,
    pub unloaded: usize,
}

/// Variant that records every hook call and otherwise does the minimum.
pub struct RecordingVariant {
    pub hooks: Rc<RefCell<Hooks>>,
    pub restricted: Rc<Cell<bool>>,
}

impl ControlVariant for RecordingVariant {
    type Adapter = FakeAdapter;
    type Target = FakeTarget;

    fn create_or_update_render_target(
        &mut self,
        device: &DeviceOf<Self>,
        mode: BackgroundMode,
        dpi: f32,
        size: Size,
        store: &mut RenderTargetStore<FakeTarget>,
    ) -> anyhow::Result<()> {
        store.create_or_update(device, mode, dpi, size, |target, mode, dpi, size| {
            target.resize(mode, dpi, size)
        })
    }

    fn create_draw_event_args<'s>(&mut self, session: &'s mut SessionOf<Self>) -> DrawEventArgs<'s, SessionOf<Self>> {
        DrawEventArgs::new(session, None)
    }

    fn changed(&mut self, _state: &mut ControlState<Self>) {
        self.hooks.borrow_mut().changed += 1;
    }

    fn changed_clear_color(&mut self, state: &mut ControlState<Self>, different_alpha_mode: bool) {
        let mut hooks = self.hooks.borrow_mut();
        hooks.clear_color.push(different_alpha_mode);
        hooks.seen_colors.push(state.clear_color());
    }

    fn changed_size(&mut self, _state: &mut ControlState<Self>) {
        self.hooks.borrow_mut().size += 1;
    }

    fn unloaded(&mut self, state: &mut ControlState<Self>) {
        self.hooks.borrow_mut().unloaded += 1;
        state.reset_render_target();
    }

    fn check_thread_restriction(&self, state: &ControlState<Self>) -> Result<()> {
        if self.restricted.get() {
            return Err(ControlError::InvalidState("restricted".into()));
        }
        state.check_affinity_thread()
    }
}

pub struct Recording {
    pub control: BaseControl<RecordingVariant>,
    pub adapter: Rc<FakeAdapter>,
    pub hooks: Rc<RefCell<Hooks>>,
    pub restricted: Rc<Cell<bool>>,
}

pub fn recording_control() -> Recording {
    let adapter = FakeAdapter::new();
    let hooks = Rc::new(RefCell::new(Hooks::default()));
    let restricted = Rc::new(Cell::new(false));
    let variant = RecordingVariant {
        hooks: hooks.clone(),
        restricted: restricted.clone(),
    };
    let control = BaseControl::new(adapter.clone(), variant).unwrap();

    Recording {
        control,
        adapter,
        hooks,
        restricted,
    }
}

/// One frame at `size`, drawing with callbacks when resources exist.
pub fn frame<V: ControlVariant>(control: &mut BaseControl<V>, size: Size) -> Result<()> {
    control.entry_point("test frame", |c| {
        c.run_with_render_target(size, |pass| {
            let invoke = pass.resources_created();
            pass.draw(invoke)
        })
    })
}
