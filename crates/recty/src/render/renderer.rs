use wgpu::util::DeviceExt;

use super::batch::{expand_on_host, ExpandedVertex, QUAD_INDICES, RECT_STRIDE, VERTICES_PER_RECT};
use super::config::{ErrorChecks, Expansion, RectyConfig};
use super::error::{ErrorScope, RenderError};
use super::stages::{self, RECT_SHADER};
use super::{RectRecord, RenderCtx, RenderTarget, TransformMatrix};

/// Counts for one [`Recty::draw`] call.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DrawStats {
    /// Rectangles submitted.
    pub rects: usize,
    /// Vertices the pipeline emits: four per rectangle.
    pub vertices: usize,
}

impl DrawStats {
    #[inline]
    pub const fn for_rects(rects: usize) -> Self {
        Self {
            rects,
            vertices: rects * VERTICES_PER_RECT as usize,
        }
    }
}

/// Sampler, layout and current bind group for textured renderers.
struct TextureBinding {
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    placeholder: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// Batch renderer for axis-aligned colored rectangles.
///
/// Every rectangle of a [`draw`](Self::draw) call shares one affine
/// transform and becomes one quad on the GPU.
///
/// All methods must be called from the thread that records into the
/// caller's encoder; nothing here synchronizes.
pub struct Recty {
    config: RectyConfig,
    pipeline: wgpu::RenderPipeline,
    target_format: wgpu::TextureFormat,

    transform: TransformMatrix,
    transform_layout: wgpu::BindGroupLayout,
    transform_ubo: wgpu::Buffer,
    transform_bind_group: wgpu::BindGroup,
    transform_dirty: bool,

    texture: Option<TextureBinding>,

    vbo: Option<wgpu::Buffer>,
    ibo: Option<wgpu::Buffer>,
}

impl Recty {
    /// Compiles and links the rectangle pipeline and allocates its resources.
    ///
    /// The transform starts as the identity. Fails with the driver's
    /// diagnostic when compilation, linking or resource setup reports an
    /// error; no partially usable renderer is returned.
    pub fn init(ctx: &RenderCtx<'_>, config: RectyConfig) -> Result<Self, RenderError> {
        Self::init_with_source(ctx, config, RECT_SHADER)
    }

    pub(crate) fn init_with_source(
        ctx: &RenderCtx<'_>,
        config: RectyConfig,
        source: &str,
    ) -> Result<Self, RenderError> {
        let stages::Stages {
            pipeline,
            transform_layout,
            texture_layout,
        } = stages::build(ctx, &config, source)?;

        let scope = ErrorScope::push(ctx.device, "recty init");

        let transform = TransformMatrix::IDENTITY;
        let (transform_ubo, transform_bind_group) =
            create_transform_binding(ctx, &transform_layout, transform);

        let texture = texture_layout.map(|layout| {
            let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("recty sampler"),
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            });
            let placeholder = create_placeholder_texture(ctx);
            let view = placeholder.create_view(&wgpu::TextureViewDescriptor::default());
            let bind_group = create_texture_bind_group(ctx, &layout, &sampler, &view);
            TextureBinding {
                layout,
                sampler,
                placeholder,
                bind_group,
            }
        });

        scope.check()?;

        log::debug!("recty initialized ({config:?})");

        Ok(Self {
            config,
            pipeline,
            target_format: ctx.target_format,
            transform,
            transform_layout,
            transform_ubo,
            transform_bind_group,
            transform_dirty: false,
            texture,
            vbo: None,
            ibo: None,
        })
    }

    #[inline]
    pub fn config(&self) -> &RectyConfig {
        &self.config
    }

    /// The transform the next draw will use.
    #[inline]
    pub fn transform(&self) -> TransformMatrix {
        self.transform
    }

    /// Replaces the transform with
    ///
    /// ```text
    /// | a  d  g |
    /// | b  e  h |
    /// | 0  0  1 |
    /// ```
    ///
    /// i.e. `x' = a·x + d·y + g`, `y' = b·x + e·y + h`. Takes effect on the
    /// next draw; draws already recorded keep the transform they were
    /// recorded with. Degenerate matrices are accepted.
    pub fn set_transform(&mut self, a: f32, d: f32, g: f32, b: f32, e: f32, h: f32) {
        self.set_matrix(TransformMatrix::from_parts(a, d, g, b, e, h));
    }

    /// Scales by `(w, h)` and then offsets by `(dx, dy)`, in the same space as
    /// the rectangle corners. Same as `set_transform(w, 0, dx, 0, h, dy)`.
    pub fn set_scale(&mut self, w: f32, h: f32, dx: f32, dy: f32) {
        self.set_transform(w, 0.0, dx, 0.0, h, dy);
    }

    /// Replaces the transform with a prebuilt matrix.
    pub fn set_matrix(&mut self, transform: TransformMatrix) {
        if !self.transform.same_bits(&transform) {
            self.transform = transform;
            self.transform_dirty = true;
        }
    }

    /// Samples `view` in every fragment from the next draw on.
    ///
    /// Ignored (with a warning) unless the renderer was created with
    /// `textured: true`.
    pub fn bind_texture(&mut self, ctx: &RenderCtx<'_>, view: &wgpu::TextureView) {
        let Some(texture) = self.texture.as_mut() else {
            log::warn!("recty: bind_texture on an untextured renderer; ignored");
            return;
        };
        texture.bind_group =
            create_texture_bind_group(ctx, &texture.layout, &texture.sampler, view);
    }

    /// Draws `rects` into `target` with one draw call.
    ///
    /// The vertex buffer is specified anew from `rects` on each call, so no
    /// rectangle from an earlier call is drawn again. The pass loads the
    /// existing target contents. An empty slice records the pass without
    /// emitting primitives.
    ///
    /// A batch whose upload exceeds the device's `max_buffer_size` is
    /// rejected with [`RenderError::Device`] before anything is recorded.
    /// With [`ErrorChecks::EveryCall`] the draw also rejects a `ctx` whose
    /// target format differs from the one the pipeline was built for, and
    /// reports errors raised while creating the draw's buffers. Validation
    /// of the recorded pass itself is reported by wgpu when the caller
    /// finishes the encoder.
    pub fn draw(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        rects: &[RectRecord],
    ) -> Result<DrawStats, RenderError> {
        let checked = self.config.error_checks == ErrorChecks::EveryCall;
        self.validate_draw(ctx, rects.len(), checked)?;

        let scope = checked.then(|| ErrorScope::push(ctx.device, "recty draw"));

        self.flush_transform(ctx);
        self.upload(ctx, rects);

        {
            let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("recty rect pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.transform_bind_group, &[]);
            if let Some(texture) = self.texture.as_ref() {
                rpass.set_bind_group(1, &texture.bind_group, &[]);
            }

            let count = rects.len() as u32;
            match (self.config.expansion, self.vbo.as_ref(), self.ibo.as_ref()) {
                (Expansion::Instanced, Some(vbo), _) => {
                    rpass.set_vertex_buffer(0, vbo.slice(..));
                    rpass.draw(0..VERTICES_PER_RECT, 0..count);
                }
                (Expansion::Host, Some(vbo), Some(ibo)) => {
                    rpass.set_vertex_buffer(0, vbo.slice(..));
                    rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);
                    rpass.draw_indexed(0..count * QUAD_INDICES.len() as u32, 0, 0..1);
                }
                // Empty batch: nothing bound, nothing emitted.
                _ => {}
            }
        }

        if let Some(scope) = scope {
            scope.check()?;
        }

        let stats = DrawStats::for_rects(rects.len());
        log::trace!("recty draw: {} rects, {} vertices", stats.rects, stats.vertices);
        Ok(stats)
    }

    /// Releases every GPU resource owned by the renderer.
    ///
    /// Buffers and textures are destroyed immediately, so call this only
    /// after the encoders that recorded its draws have been submitted.
    pub fn delete(self) {
        let Self {
            pipeline,
            transform_ubo,
            transform_bind_group,
            texture,
            vbo,
            ibo,
            ..
        } = self;

        drop(transform_bind_group);
        transform_ubo.destroy();
        if let Some(texture) = texture {
            texture.placeholder.destroy();
        }
        for buffer in [vbo, ibo].into_iter().flatten() {
            buffer.destroy();
        }
        drop(pipeline);

        log::debug!("recty deleted");
    }

    /// Rejects draws wgpu would fail on, using only what the draw can see.
    fn validate_draw(
        &self,
        ctx: &RenderCtx<'_>,
        rects: usize,
        check_format: bool,
    ) -> Result<(), RenderError> {
        let upload = upload_size(self.config.expansion, rects);
        let max = ctx.device.limits().max_buffer_size;
        if upload > max {
            return Err(draw_error(format!(
                "batch of {rects} rects needs a {upload}-byte buffer, device allows {max}"
            )));
        }

        if check_format && ctx.target_format != self.target_format {
            return Err(draw_error(format!(
                "target format {:?} does not match pipeline format {:?}",
                ctx.target_format, self.target_format
            )));
        }

        Ok(())
    }

    /// Publishes a changed transform in a fresh uniform buffer.
    ///
    /// Rewriting the existing buffer would also change draws that are
    /// recorded but not yet submitted.
    fn flush_transform(&mut self, ctx: &RenderCtx<'_>) {
        if !self.transform_dirty {
            return;
        }
        let (ubo, bind_group) =
            create_transform_binding(ctx, &self.transform_layout, self.transform);
        self.transform_ubo = ubo;
        self.transform_bind_group = bind_group;
        self.transform_dirty = false;
    }

    /// Re-specifies the vertex (and for host expansion, index) buffer.
    fn upload(&mut self, ctx: &RenderCtx<'_>, rects: &[RectRecord]) {
        self.vbo = None;
        self.ibo = None;
        if rects.is_empty() {
            return;
        }

        match self.config.expansion {
            Expansion::Instanced => {
                self.vbo = Some(ctx.device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("recty rect vbo"),
                        contents: bytemuck::cast_slice(rects),
                        usage: wgpu::BufferUsages::VERTEX,
                    },
                ));
            }
            Expansion::Host => {
                let (vertices, indices) = expand_on_host(rects);
                self.vbo = Some(ctx.device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("recty expanded vbo"),
                        contents: bytemuck::cast_slice(&vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    },
                ));
                self.ibo = Some(ctx.device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("recty expanded ibo"),
                        contents: bytemuck::cast_slice(&indices),
                        usage: wgpu::BufferUsages::INDEX,
                    },
                ));
            }
        }
    }
}

/// Size of the largest buffer a draw of `rects` rectangles allocates.
fn upload_size(expansion: Expansion, rects: usize) -> u64 {
    let per_rect = match expansion {
        Expansion::Instanced => RECT_STRIDE,
        Expansion::Host => {
            std::mem::size_of::<ExpandedVertex>() as u64 * u64::from(VERTICES_PER_RECT)
        }
    };
    per_rect.saturating_mul(rects as u64)
}

fn draw_error(message: String) -> RenderError {
    log::error!("recty draw rejected: {message}");
    RenderError::Device {
        label: "recty draw",
        message,
    }
}

fn create_transform_binding(
    ctx: &RenderCtx<'_>,
    layout: &wgpu::BindGroupLayout,
    transform: TransformMatrix,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let ubo = ctx
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("recty transform ubo"),
            contents: bytemuck::bytes_of(&transform.to_uniform()),
            usage: wgpu::BufferUsages::UNIFORM,
        });

    let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("recty transform bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: ubo.as_entire_binding(),
        }],
    });

    (ubo, bind_group)
}

fn create_placeholder_texture(ctx: &RenderCtx<'_>) -> wgpu::Texture {
    ctx.device.create_texture_with_data(
        ctx.queue,
        &wgpu::TextureDescriptor {
            label: Some("recty placeholder texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &[0, 0, 0, 0],
    )
}

fn create_texture_bind_group(
    ctx: &RenderCtx<'_>,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    view: &wgpu::TextureView,
) -> wgpu::BindGroup {
    ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("recty texture bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Gpu, GpuInit, OffscreenTarget};
    use crate::logging::{init_logging, LoggingConfig};

    fn gpu() -> Option<Gpu> {
        init_logging(LoggingConfig::for_tests());
        match Gpu::new_blocking(GpuInit::default()) {
            Ok(gpu) => Some(gpu),
            Err(err) => {
                log::warn!("skipping GPU test: {err:#}");
                None
            }
        }
    }

    // ── stats ─────────────────────────────────────────────────────────────

    #[test]
    fn stats_count_four_vertices_per_rect() {
        assert_eq!(DrawStats::for_rects(0), DrawStats { rects: 0, vertices: 0 });
        assert_eq!(DrawStats::for_rects(7).vertices, 28);
    }

    #[test]
    fn upload_size_uses_the_larger_host_vertices() {
        assert_eq!(upload_size(Expansion::Instanced, 3), 120);
        assert_eq!(upload_size(Expansion::Host, 3), 384);
        assert_eq!(upload_size(Expansion::Instanced, 0), 0);
    }

    // ── init failures ─────────────────────────────────────────────────────

    #[test]
    fn broken_shader_reports_compiler_diagnostic() {
        let Some(gpu) = gpu() else { return };
        let target = OffscreenTarget::new(gpu.device(), 4, 4);
        let ctx = gpu.render_ctx(&target);

        let err = Recty::init_with_source(&ctx, RectyConfig::default(), "fn vs_rect( {")
            .err()
            .expect("init must fail");
        assert!(matches!(err, RenderError::Compile(_)), "{err}");
        assert!(!err.diagnostic().is_empty());

        // Nothing was left pending for the next scope to pick up.
        let scope = ErrorScope::push(gpu.device(), "after failed init");
        assert_eq!(scope.finish(), None);
    }

    #[test]
    fn missing_entry_point_fails_at_link() {
        let Some(gpu) = gpu() else { return };
        let target = OffscreenTarget::new(gpu.device(), 4, 4);
        let ctx = gpu.render_ctx(&target);

        let err = Recty::init_with_source(&ctx, RectyConfig::default(), "fn unused() {}")
            .err()
            .expect("init must fail");
        assert!(matches!(err, RenderError::Link(_)), "{err}");
    }

    // ── transform state ───────────────────────────────────────────────────

    #[test]
    fn set_scale_matches_set_transform() {
        let Some(gpu) = gpu() else { return };
        let target = OffscreenTarget::new(gpu.device(), 4, 4);
        let ctx = gpu.render_ctx(&target);

        let mut a = Recty::init(&ctx, RectyConfig::default()).expect("init");
        let mut b = Recty::init(&ctx, RectyConfig::default()).expect("init");
        assert_eq!(a.transform(), TransformMatrix::IDENTITY);

        a.set_scale(0.5, 2.0, -0.25, 0.75);
        b.set_transform(0.5, 0.0, -0.25, 0.0, 2.0, 0.75);
        assert_eq!(
            bytemuck::bytes_of(&a.transform().to_uniform()),
            bytemuck::bytes_of(&b.transform().to_uniform())
        );

        a.delete();
        b.delete();
    }

    #[test]
    fn set_transform_stores_negative_zero() {
        let Some(gpu) = gpu() else { return };
        let target = OffscreenTarget::new(gpu.device(), 4, 4);
        let ctx = gpu.render_ctx(&target);

        let mut recty = Recty::init(&ctx, RectyConfig::default()).expect("init");
        recty.set_transform(1.0, 0.0, -0.0, 0.0, 1.0, 0.0);
        assert!(recty.transform().columns()[2][0].is_sign_negative());
        assert!(recty.transform_dirty);
        recty.delete();
    }

    #[test]
    fn bind_texture_on_untextured_renderer_is_ignored() {
        let Some(gpu) = gpu() else { return };
        let target = OffscreenTarget::new(gpu.device(), 4, 4);
        let ctx = gpu.render_ctx(&target);

        let mut recty = Recty::init(&ctx, RectyConfig::default()).expect("init");
        recty.bind_texture(&ctx, target.view());
        assert!(recty.texture.is_none());
        recty.delete();
    }
}
