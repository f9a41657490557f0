//! Shader stages, vertex layouts and pipeline assembly.

use super::batch::{ExpandedVertex, RECT_STRIDE};
use super::config::{Expansion, RectyConfig};
use super::error::{ErrorScope, RenderError};
use super::transform::TransformUniform;
use super::{RectRecord, RenderCtx};

/// WGSL source for every stage of the rectangle pipeline.
pub const RECT_SHADER: &str = include_str!("shaders/rect.wgsl");

// ── vertex layouts ────────────────────────────────────────────────────────

impl RectRecord {
    /// `rect` @0, `color` @16, `texcoord` @32; one record per instance.
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x4, // rect
        1 => Float32x4, // color
        2 => Float32x2  // texcoord
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: RECT_STRIDE,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

impl ExpandedVertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x4, // color
        2 => Float32x2  // texcoord
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ExpandedVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

// ── pipeline ──────────────────────────────────────────────────────────────

/// Compiled pipeline plus the layouts the renderer binds against.
pub(crate) struct Stages {
    pub pipeline: wgpu::RenderPipeline,
    pub transform_layout: wgpu::BindGroupLayout,
    pub texture_layout: Option<wgpu::BindGroupLayout>,
}

/// Compiles `source` and links it into a render pipeline for `config`.
///
/// Compilation and linking run in separate error scopes so the failure
/// category is reported precisely.
pub(crate) fn build(
    ctx: &RenderCtx<'_>,
    config: &RectyConfig,
    source: &str,
) -> Result<Stages, RenderError> {
    let scope = ErrorScope::push(ctx.device, "recty shader compile");
    let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("recty rect shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    if let Some(diagnostic) = scope.finish() {
        return Err(RenderError::Compile(diagnostic));
    }

    let scope = ErrorScope::push(ctx.device, "recty pipeline link");

    let transform_layout = ctx
        .device
        .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("recty transform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(TransformUniform::SIZE),
                },
                count: None,
            }],
        });

    let texture_layout = config.textured.then(|| {
        ctx.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("recty texture bgl"),
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
            })
    });

    let mut bind_group_layouts = vec![&transform_layout];
    bind_group_layouts.extend(texture_layout.as_ref());

    let pipeline_layout = ctx
        .device
        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("recty pipeline layout"),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

    let (vs_entry, vertex_layout, topology) = match config.expansion {
        Expansion::Instanced => (
            "vs_rect",
            RectRecord::layout(),
            wgpu::PrimitiveTopology::TriangleStrip,
        ),
        Expansion::Host => (
            "vs_expanded",
            ExpandedVertex::layout(),
            wgpu::PrimitiveTopology::TriangleList,
        ),
    };
    let fs_entry = if config.textured { "fs_textured" } else { "fs_solid" };

    let pipeline = ctx
        .device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("recty pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(vs_entry),
                compilation_options: Default::default(),
                buffers: &[vertex_layout],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(fs_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.target_format,
                    blend: Some(config.blend.state()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Mirrored rectangles flip winding; both faces must draw.
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

    if let Some(diagnostic) = scope.finish() {
        return Err(RenderError::Link(diagnostic));
    }

    log::debug!(
        "recty pipeline ready: {vs_entry}/{fs_entry}, {:?}, format {:?}",
        config.expansion,
        ctx.target_format
    );

    Ok(Stages {
        pipeline,
        transform_layout,
        texture_layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instanced_layout_matches_record_offsets() {
        let layout = RectRecord::layout();
        assert_eq!(layout.array_stride, 40);
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Instance);
        let offsets: Vec<_> = layout
            .attributes
            .iter()
            .map(|a| (a.shader_location, a.offset, a.format))
            .collect();
        assert_eq!(
            offsets,
            [
                (0, 0, wgpu::VertexFormat::Float32x4),
                (1, 16, wgpu::VertexFormat::Float32x4),
                (2, 32, wgpu::VertexFormat::Float32x2),
            ]
        );
    }

    #[test]
    fn expanded_layout_is_per_vertex() {
        let layout = ExpandedVertex::layout();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Vertex);
        assert_eq!(layout.attributes.len(), 3);
    }

    #[test]
    fn shader_declares_every_entry_point() {
        for entry in ["vs_rect", "vs_expanded", "fs_solid", "fs_textured"] {
            assert!(RECT_SHADER.contains(&format!("fn {entry}(")), "missing {entry}");
        }
        assert!(RECT_SHADER.contains("var<uniform> transform"));
    }
}
