use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

use crate::device::{DeviceFactory, DeviceId, GraphicsDevice};

use super::GpuInit;

struct DeviceInner {
    id: DeviceId,
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter: wgpu::Adapter,
    adapter_info: wgpu::AdapterInfo,
    lost: Arc<AtomicBool>,
}

/// Shared handle to a wgpu device and its queue.
#[derive(Clone)]
pub struct WgpuDevice {
    inner: Arc<DeviceInner>,
}

impl WgpuDevice {
    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.inner.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.inner.queue
    }

    /// The adapter the device was requested from, for surface capability queries.
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.inner.adapter
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.inner.adapter_info
    }
}

impl GraphicsDevice for WgpuDevice {
    fn id(&self) -> DeviceId {
        self.inner.id
    }

    fn is_lost(&self) -> bool {
        self.inner.lost.load(Ordering::Acquire)
    }

    /// Reclaims resources held by completed submissions.
    fn trim(&self) -> Result<()> {
        self.inner
            .device
            .poll(wgpu::PollType::Poll)
            .context("device poll failed")?;
        Ok(())
    }
}

impl fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("id", &self.inner.id)
            .field("adapter", &self.inner.adapter_info.name)
            .field("backend", &self.inner.adapter_info.backend)
            .field("lost", &self.is_lost())
            .finish()
    }
}

/// Creates wgpu devices from one shared instance.
pub struct WgpuDeviceFactory {
    instance: wgpu::Instance,
    init: GpuInit,
    compatible_surface: Option<Arc<wgpu::Surface<'static>>>,
}

impl WgpuDeviceFactory {
    pub fn new(init: GpuInit) -> Self {
        Self::with_instance(init.create_instance(), init)
    }

    /// Uses an instance the caller also creates surfaces from.
    pub fn with_instance(instance: wgpu::Instance, init: GpuInit) -> Self {
        Self {
            instance,
            init,
            compatible_surface: None,
        }
    }

    /// Only adapters able to present to `surface` are requested.
    pub fn with_compatible_surface(mut self, surface: Arc<wgpu::Surface<'static>>) -> Self {
        self.compatible_surface = Some(surface);
        self
    }

    /// Adapter/device acquisition is asynchronous under wgpu.
    async fn request(&self) -> Result<WgpuDevice> {
        let adapter = self
            .instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: self.init.power_preference,
                compatible_surface: self.compatible_surface.as_deref(),
                force_fallback_adapter: self.init.force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(self.init.label.as_str()),
                required_features: self.init.required_features,
                required_limits: self.init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let id = DeviceId::next();
        let lost = Arc::new(AtomicBool::new(false));
        let flag = lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            log::warn!("device {} lost ({reason:?}): {message}", id.value());
            flag.store(true, Ordering::Release);
        });

        let adapter_info = adapter.get_info();
        log::info!(
            "wgpu device {} on {} ({:?})",
            id.value(),
            adapter_info.name,
            adapter_info.backend
        );

        Ok(WgpuDevice {
            inner: Arc::new(DeviceInner {
                id,
                device,
                queue,
                adapter,
                adapter_info,
                lost,
            }),
        })
    }
}

impl DeviceFactory for WgpuDeviceFactory {
    type Device = WgpuDevice;

    fn create_device(&mut self) -> Result<WgpuDevice> {
        pollster::block_on(self.request())
    }
}

impl fmt::Debug for WgpuDeviceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuDeviceFactory")
            .field("init", &self.init)
            .field("compatible_surface", &self.compatible_surface.is_some())
            .finish()
    }
}
