use anyhow::Result;

use crate::control::{BackgroundMode, DrawingSession, RenderSurface};
use crate::coords::{PixelSize, Size};
use crate::device::{DeviceId, GraphicsDevice};
use crate::paint::Color;

use super::WgpuDevice;

/// Render target backed by an offscreen texture.
///
/// The texture is allocated in physical pixels for the requested DIP size and DPI.
pub struct OffscreenTarget {
    device: WgpuDevice,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    mode: BackgroundMode,
    pixel_size: PixelSize,
}

impl OffscreenTarget {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn pixel_size(&self) -> PixelSize {
        self.pixel_size
    }

    pub fn background_mode(&self) -> BackgroundMode {
        self.mode
    }

    fn clear_value(&self, clear: Color) -> wgpu::Color {
        let [r, g, b, a] = clear.to_premul_f32();
        let a = match self.mode {
            BackgroundMode::Opaque => 1.0,
            BackgroundMode::Transparent => a,
        };

        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }
    }
}

/// Rejects extents wgpu would refuse to allocate.
fn check_extent(pixel_size: PixelSize, max_dimension: u32) -> Result<()> {
    let PixelSize { width, height } = pixel_size;
    anyhow::ensure!(
        width > 0 && height > 0,
        "render target of {width}x{height} pixels is empty"
    );
    anyhow::ensure!(
        width <= max_dimension && height <= max_dimension,
        "render target of {width}x{height} pixels exceeds the device limit of {max_dimension}"
    );
    Ok(())
}

impl RenderSurface for OffscreenTarget {
    type Device = WgpuDevice;
    type Session = WgpuDrawingSession;

    fn create(device: &WgpuDevice, mode: BackgroundMode, dpi: f32, size: Size) -> Result<Self> {
        anyhow::ensure!(!device.is_lost(), "cannot create a render target on a lost device");

        let pixel_size = size.to_pixels(dpi);
        check_extent(pixel_size, device.device().limits().max_texture_dimension_2d)?;

        let texture = device.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("easel offscreen target"),
            size: wgpu::Extent3d {
                width: pixel_size.width,
                height: pixel_size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            device: device.clone(),
            texture,
            view,
            mode,
            pixel_size,
        })
    }

    fn device_id(&self) -> DeviceId {
        self.device.id()
    }

    fn create_drawing_session(&mut self, clear: Color) -> Result<WgpuDrawingSession> {
        let mut encoder = self
            .device
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("easel frame encoder"),
            });

        // Clear pass; dropped before the encoder is handed to the session.
        {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("easel clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_value(clear)),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        Ok(WgpuDrawingSession {
            device: self.device.clone(),
            view: self.view.clone(),
            encoder,
        })
    }
}

/// Commands recorded for one frame on an [`OffscreenTarget`].
pub struct WgpuDrawingSession {
    device: WgpuDevice,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

impl WgpuDrawingSession {
    pub fn device(&self) -> &WgpuDevice {
        &self.device
    }

    /// The target's view, already cleared by this session.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        &mut self.encoder
    }
}

impl DrawingSession for WgpuDrawingSession {
    /// Submits the recorded commands.
    fn close(self) -> Result<()> {
        anyhow::ensure!(!self.device.is_lost(), "device lost before submit");
        self.device.queue().submit(std::iter::once(self.encoder.finish()));
        Ok(())
    }
}
