//! GPU context management.
//!
//! [`GpuContext`] encapsulates the core wgpu resources: device, queue,
//! surface and surface configuration. It is created on the render thread
//! from a window handle and never leaves it.

use std::sync::Arc;

use winit::window::Window;

/// Errors raised while acquiring or driving the GPU.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to acquire device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// Encapsulates the wgpu device, queue, surface and configuration.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
    adapter_info: wgpu::AdapterInfo,
    max_texture_size: u32,
}

impl GpuContext {
    /// Acquire the GPU and configure the surface for the given window.
    ///
    /// Programs for minimal latency: high-performance adapter, no vsync
    /// backpressure beyond a single frame in flight.
    pub async fn new(window: Arc<Window>, width: u32, height: u32) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("bitchart device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoNoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);

        let adapter_info = adapter.get_info();
        let max_texture_size = adapter.limits().max_texture_dimension_2d;

        Ok(Self {
            device,
            queue,
            surface,
            config,
            adapter_info,
            max_texture_size,
        })
    }

    /// Resize the surface. Dimensions are clamped to at least 1.
    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if self.config.width != width || self.config.height != height {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Reconfigure the surface with the current configuration (after a
    /// `Lost`/`Outdated` frame).
    pub fn configure_surface(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn get_current_texture(&self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_info.name
    }

    pub fn backend_name(&self) -> String {
        format!("{:?}", self.adapter_info.backend)
    }

    pub fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }
}

#[cfg(test)]
mod tests {
    // GpuContext requires a real GPU and a window; it is exercised through
    // the demo binary rather than CI-runnable unit tests.
}
