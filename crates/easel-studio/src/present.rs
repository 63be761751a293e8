//! Shows the canvas's offscreen target in the window.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use easel_engine::device::{DeviceId, GraphicsDevice};
use easel_engine::gpu::{WgpuDevice, WgpuDrawingSession};
use winit::window::Window;

/// Copies each drawn frame onto the window surface.
///
/// [`Presenter::blit`] runs as a draw callback and records the copy into the
/// frame's encoder; [`Presenter::present`] shows it once the frame was submitted.
pub struct Presenter {
    window: Arc<Window>,
    surface: Arc<wgpu::Surface<'static>>,
    state: Option<BlitState>,
    pending: Option<wgpu::SurfaceTexture>,
}

/// Surface configuration and pipeline for one device.
struct BlitState {
    device: DeviceId,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl Presenter {
    pub fn new(window: Arc<Window>, surface: Arc<wgpu::Surface<'static>>) -> Self {
        Self {
            window,
            surface,
            state: None,
            pending: None,
        }
    }

    pub fn blit(&mut self, session: &mut WgpuDrawingSession) -> Result<()> {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        let device = session.device().clone();
        let source = session.view().clone();
        self.ensure_state(&device, size.width, size.height)?;

        let Some(state) = self.state.as_ref() else {
            return Ok(());
        };

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(device.device(), &state.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => bail!("window surface is out of memory"),
            Err(err) => {
                log::debug!("skipping presentation: {err}");
                return Ok(());
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("easel blit bind group"),
            layout: &state.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&state.sampler),
                },
            ],
        });

        {
            let mut rpass = session
                .encoder()
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("easel blit pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });
            rpass.set_pipeline(&state.pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.draw(0..3, 0..1);
        }

        self.pending = Some(frame);
        Ok(())
    }

    /// Shows the frame recorded by the last [`Self::blit`], if any.
    pub fn present(&mut self) {
        if let Some(frame) = self.pending.take() {
            self.window.pre_present_notify();
            frame.present();
        }
    }

    /// Drops a recorded frame whose commands were never submitted.
    pub fn discard(&mut self) {
        self.pending = None;
    }

    fn ensure_state(&mut self, device: &WgpuDevice, width: u32, height: u32) -> Result<()> {
        let stale = self
            .state
            .as_ref()
            .is_none_or(|state| state.device != device.id());

        if stale {
            let state = BlitState::new(device, &self.surface, width, height)?;
            self.surface.configure(device.device(), &state.config);
            self.state = Some(state);
            return Ok(());
        }

        if let Some(state) = self.state.as_mut() {
            if state.config.width != width || state.config.height != height {
                state.config.width = width;
                state.config.height = height;
                self.surface.configure(device.device(), &state.config);
            }
        }
        Ok(())
    }
}

impl BlitState {
    fn new(device: &WgpuDevice, surface: &wgpu::Surface<'_>, width: u32, height: u32) -> Result<Self> {
        let caps = surface.get_capabilities(device.adapter());
        let format = choose_surface_format(&caps.formats)
            .context("the adapter cannot present to this window")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: choose_alpha_mode(&caps.alpha_modes),
            view_formats: vec![],
        };

        let gpu = device.device();
        let shader = gpu.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("easel blit shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        let bind_group_layout = gpu.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("easel blit bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = gpu.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("easel blit pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = gpu.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("easel blit pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let sampler = gpu.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("easel blit sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        log::debug!("presenting {width}x{height} as {format:?} on device {}", device.id().value());

        Ok(Self {
            device: device.id(),
            config,
            pipeline,
            bind_group_layout,
            sampler,
        })
    }
}

/// The offscreen target holds non-sRGB values, so a linear format is preferred.
fn choose_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    let preferred = [wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Rgba8Unorm];
    preferred
        .into_iter()
        .find(|f| formats.contains(f))
        .or_else(|| formats.first().copied())
}

/// Translucent clear colors need a premultiplied compositor mode to show through.
fn choose_alpha_mode(modes: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    if modes.contains(&wgpu::CompositeAlphaMode::PreMultiplied) {
        wgpu::CompositeAlphaMode::PreMultiplied
    } else {
        modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto)
    }
}
