use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use easel_engine::canvas::CanvasControl;
use easel_engine::control::{ClearColorHandle, ControlEvent};
use easel_engine::gpu::{GpuInit, OffscreenTarget};
use easel_engine::paint::Color;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::host::StudioAdapter;
use crate::present::Presenter;

type StudioCanvas = CanvasControl<StudioAdapter, OffscreenTarget>;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub clear_color: Color,
    /// How often the background thread changes the clear color.
    pub color_period: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "easel studio".to_string(),
            initial_size: LogicalSize::new(960.0, 600.0),
            clear_color: Color::from_argb(255, 24, 26, 32),
            color_period: Duration::from_millis(1500),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    pub fn run(config: RuntimeConfig, gpu_init: GpuInit) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

/// Cycles the clear color from a thread that does not own the control.
struct ColorCycler {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ColorCycler {
    const PALETTE: [Color; 4] = [
        Color::from_argb(255, 24, 26, 32),
        Color::from_argb(255, 40, 64, 96),
        Color::from_argb(160, 96, 40, 64),
        Color::from_argb(255, 32, 80, 48),
    ];

    fn spawn(handle: ClearColorHandle, period: Duration) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();

        let thread = thread::Builder::new()
            .name("clear-color".to_string())
            .spawn(move || {
                let mut index = 0;
                while !flag.load(Ordering::Relaxed) {
                    thread::sleep(period);
                    index = (index + 1) % Self::PALETTE.len();
                    handle.set(Self::PALETTE[index]);
                }
            })
            .context("failed to spawn clear-color thread")?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }
}

impl Drop for ColorCycler {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("clear-color thread panicked");
            }
        }
    }
}

struct WindowEntry {
    // Dropped first so its thread stops before the control goes away.
    _cycler: ColorCycler,
    control: StudioCanvas,
    presenter: Rc<RefCell<Presenter>>,
    adapter: Rc<StudioAdapter>,
    window: Arc<Window>,
}

struct AppState {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    entry: Option<WindowEntry>,
    exit_requested: bool,
}

impl AppState {
    fn new(config: RuntimeConfig, gpu_init: GpuInit) -> Self {
        Self {
            config,
            gpu_init,
            entry: None,
            exit_requested: false,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let adapter = Rc::new(StudioAdapter::new(window.clone(), self.gpu_init.clone())?);
        let mut control = StudioCanvas::create(adapter.clone())?;
        control.set_clear_color(self.config.clear_color)?;

        let presenter = Rc::new(RefCell::new(Presenter::new(
            window.clone(),
            adapter.surface().clone(),
        )));

        let mut frames: u64 = 0;
        let blit = presenter.clone();
        control.add_draw(move |args| {
            blit.borrow_mut().blit(args.session())?;
            frames += 1;
            if let Some(time) = args.timing() {
                log::debug!("frame {} ({:?} since last)", time.frame_index, time.elapsed);
            }
            if frames % 120 == 0 {
                log::info!("{frames} frames drawn");
            }
            Ok(())
        })?;

        control.add_create_resources(|args| {
            log::info!(
                "create resources on {:?} ({:?})",
                args.device().adapter_info().name,
                args.reason()
            );
            Ok(())
        })?;

        let cycler = ColorCycler::spawn(control.clear_color_handle(), self.config.color_period)?;

        control.state().element().post(ControlEvent::Loaded);
        control.process_events()?;

        self.entry = Some(WindowEntry {
            _cycler: cycler,
            control,
            presenter,
            adapter,
            window,
        });
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut entry) = self.entry.take() {
            if let Err(err) = entry.control.on_unloaded() {
                log::error!("unload failed: {err:#}");
            }
        }
        self.exit_requested = true;
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(entry) = &self.entry {
            entry.window.request_redraw();
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            log::error!("failed to create initial window: {e:#}");
            self.exit_requested = true;
            event_loop.exit();
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(entry) = &mut self.entry {
            entry.adapter.notify_suspending();
            if let Err(err) = entry.control.process_events() {
                log::error!("suspend handling failed: {err:#}");
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Wake up periodically to deliver clear-color changes from the cycler.
        event_loop.set_control_flow(ControlFlow::wait_duration(Duration::from_millis(50)));

        if let Some(entry) = &mut self.entry {
            if let Err(err) = entry.control.process_events() {
                log::warn!("event processing failed: {err:#}");
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        if entry.window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.close();
                event_loop.exit();
            }

            WindowEvent::Resized(_) => {
                let element = entry.control.state().element();
                element.post(ControlEvent::SizeChanged(element.logical_size()));
                if let Err(err) = entry.control.process_events() {
                    log::warn!("resize handling failed: {err:#}");
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                entry.adapter.notify_dpi_changed();
                if let Err(err) = entry.control.process_events() {
                    log::warn!("dpi change handling failed: {err:#}");
                }
            }

            WindowEvent::Occluded(occluded) => {
                entry.adapter.set_occluded(occluded);
                if let Err(err) = entry.control.process_events() {
                    log::warn!("visibility change handling failed: {err:#}");
                }
            }

            WindowEvent::RedrawRequested => match entry.control.render() {
                Ok(()) => entry.presenter.borrow_mut().present(),
                Err(err) => {
                    entry.presenter.borrow_mut().discard();
                    log::error!("render failed: {err:#}");
                }
            },

            _ => {}
        }
    }
}
