/// Initialization parameters for the GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Backends the instance may use.
    pub backends: wgpu::Backends,

    pub power_preference: wgpu::PowerPreference,

    /// Accept a software adapter when no hardware adapter is available.
    pub force_fallback_adapter: bool,

    /// Required wgpu features.
    ///
    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Debug label given to every device created.
    pub label: String,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            label: "easel device".to_string(),
        }
    }
}

impl GpuInit {
    /// An instance restricted to [`Self::backends`].
    pub fn create_instance(&self) -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: self.backends,
            ..Default::default()
        })
    }
}
