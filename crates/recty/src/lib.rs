//! Recty: a GPU batch renderer for axis-aligned colored rectangles.
//!
//! [`render`] holds the renderer itself. [`device`] bootstraps a headless
//! wgpu device and offscreen targets for tools and tests; applications with
//! their own window and surface only need [`render`].

pub mod device;
pub mod logging;
pub mod render;

pub use render::{
    BatchBuffer, Blend, DrawStats, ErrorChecks, Expansion, RectRecord, Recty, RectyConfig,
    RenderCtx, RenderError, RenderTarget, TransformMatrix,
};
