//! Headless GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue without a window
//! - offscreen render targets with CPU readback
//!
//! Applications that own a window and surface build their own
//! [`RenderCtx`](crate::render::RenderCtx) instead.

mod gpu;
mod init;
mod offscreen;

pub use gpu::{Gpu, GpuFrame};
pub use init::GpuInit;
pub use offscreen::{pixel_at, OffscreenTarget, OFFSCREEN_FORMAT};
