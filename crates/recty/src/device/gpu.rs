use anyhow::{Context, Result};

use super::{GpuInit, OffscreenTarget};
use crate::render::{RenderCtx, RenderTarget};

/// Owns the wgpu core objects for headless rendering.
///
/// Window and swapchain management live in the host application; this type
/// only provides what the rectangle renderer needs to record and submit work:
/// - creates and stores Instance/Adapter/Device/Queue
/// - begins frames against an offscreen target and submits them
pub struct Gpu {
    /// wgpu instance used to create the adapter.
    instance: wgpu::Instance,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,
}

/// A frame being recorded.
///
/// Finish it with [`Gpu::submit`]; dropping it discards the recorded commands.
pub struct GpuFrame {
    pub encoder: wgpu::CommandEncoder,
}

impl GpuFrame {
    /// Borrows the encoder together with a color view as a [`RenderTarget`].
    pub fn target<'a>(&'a mut self, color_view: &'a wgpu::TextureView) -> RenderTarget<'a> {
        RenderTarget::new(&mut self.encoder, color_view)
    }
}

impl Gpu {
    /// Creates a device without any surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(init: GpuInit) -> Result<Self> {
        let GpuInit {
            backends,
            power_preference,
            force_fallback_adapter,
            required_features,
            required_limits,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("recty device"),
                required_features,
                required_limits,
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await
            .context("failed to create wgpu device/queue")?;

        // Errors outside an error scope would otherwise panic inside wgpu.
        device.on_uncaptured_error(Box::new(|err| {
            log::error!("uncaptured wgpu error: {err}");
        }));

        let info = adapter.get_info();
        log::debug!("using adapter {} ({:?})", info.name, info.backend);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Blocking variant of [`Gpu::new`] for tests and simple tools.
    pub fn new_blocking(init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::new(init))
    }

    /// Returns the wgpu instance.
    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    /// Returns the selected adapter.
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Renderer-facing context for drawing into `target`.
    pub fn render_ctx(&self, target: &OffscreenTarget) -> RenderCtx<'_> {
        RenderCtx::new(&self.device, &self.queue, target.format())
    }

    /// Creates an encoder for a new frame.
    pub fn begin_frame(&self) -> GpuFrame {
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("recty frame encoder"),
            });
        GpuFrame { encoder }
    }

    /// Submits the recorded commands for the given frame.
    pub fn submit(&self, frame: GpuFrame) {
        self.queue.submit(std::iter::once(frame.encoder.finish()));
    }
}
