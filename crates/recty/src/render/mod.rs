//! Rectangle batch rendering.
//!
//! A caller hands [`Recty::draw`] a slice of [`RectRecord`]s; each record is
//! one rectangle (two corners, a color, a texcoord) and becomes one quad on
//! the GPU under the renderer's shared [`TransformMatrix`].
//!
//! Convention:
//! - Corners are in the space the transform maps to normalized device
//!   coordinates; with the identity transform that is NDC itself.
//! - GPU handles are never ambient: every call receives a [`RenderCtx`] and,
//!   when it records work, a [`RenderTarget`].

mod batch;
mod config;
mod ctx;
mod error;
mod renderer;
mod stages;
mod transform;

pub use batch::{BatchBuffer, RectRecord, RECT_FLOATS, RECT_STRIDE, VERTICES_PER_RECT};
pub use config::{Blend, ErrorChecks, Expansion, RectyConfig};
pub use ctx::{RenderCtx, RenderTarget};
pub use error::RenderError;
pub use renderer::{DrawStats, Recty};
pub use stages::RECT_SHADER;
pub use transform::TransformMatrix;
