use std::sync::mpsc;

use anyhow::{Context, Result};

use super::Gpu;

/// Color format of offscreen targets.
///
/// Non-sRGB so readback values equal the shaded values byte for byte.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const BYTES_PER_PIXEL: u32 = 4;

/// Render texture that can be copied back to the CPU.
pub struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl OffscreenTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("recty offscreen target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
        }
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        OFFSCREEN_FORMAT
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Copies the texture into tightly packed RGBA8 rows, top row first.
    ///
    /// Blocks until the GPU has finished all previously submitted work.
    pub fn read_rgba(&self, gpu: &Gpu) -> Result<Vec<u8>> {
        let row_bytes = self.width * BYTES_PER_PIXEL;
        let padded_row_bytes = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let readback = gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("recty offscreen readback"),
            size: u64::from(padded_row_bytes) * u64::from(self.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("recty readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        gpu.queue().submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = sender.send(res);
        });
        gpu.device()
            .poll(wgpu::PollType::Wait)
            .context("failed to wait for readback")?;
        receiver
            .recv()
            .context("readback callback dropped")?
            .context("failed to map readback buffer")?;

        let mapped = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((row_bytes * self.height) as usize);
        for row in mapped.chunks(padded_row_bytes as usize) {
            pixels.extend_from_slice(&row[..row_bytes as usize]);
        }
        drop(mapped);
        readback.unmap();

        Ok(pixels)
    }
}

/// Returns the RGBA pixel at `(x, y)` from a buffer produced by
/// [`OffscreenTarget::read_rgba`], or `None` outside the image.
pub fn pixel_at(pixels: &[u8], width: u32, x: u32, y: u32) -> Option<[u8; 4]> {
    if x >= width {
        return None;
    }
    let i = (y as usize * width as usize + x as usize) * BYTES_PER_PIXEL as usize;
    let px = pixels.get(i..i + BYTES_PER_PIXEL as usize)?;
    px.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2×2 image, pixel value = [index; 4]
    fn image() -> Vec<u8> {
        (0..4u8).flat_map(|i| [i; 4]).collect()
    }

    #[test]
    fn pixel_at_reads_row_major() {
        let pixels = image();
        assert_eq!(pixel_at(&pixels, 2, 0, 0), Some([0; 4]));
        assert_eq!(pixel_at(&pixels, 2, 1, 0), Some([1; 4]));
        assert_eq!(pixel_at(&pixels, 2, 0, 1), Some([2; 4]));
        assert_eq!(pixel_at(&pixels, 2, 1, 1), Some([3; 4]));
    }

    #[test]
    fn pixel_at_out_of_range_is_none() {
        let pixels = image();
        assert_eq!(pixel_at(&pixels, 2, 2, 0), None);
        assert_eq!(pixel_at(&pixels, 2, 0, 2), None);
        assert_eq!(pixel_at(&[], 2, 0, 0), None);
    }
}
