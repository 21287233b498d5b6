//! GPU rendering with wgpu.
//!
//! A [WgpuPainter] owns the pipelines for a device and hands out a [WgpuSurface]
//! per paint. The surface is GPU backed, so a [crate::LiveView] painting onto it
//! keeps the current frame in a [WgpuTexture] and only uploads when the frame changes.
//!
//! ```ignore
//! let painter = WgpuPainter::headless(wgpu::TextureFormat::Rgba8Unorm).await?;
//! let mut surface = painter.surface(&target, size);
//! view.paint(&mut surface, rect);
//! surface.submit();
//! ```

use thiserror::Error;

mod painter;

pub use painter::*;

/// Errors that can occur while setting up the renderer.
///
/// Nothing fails once a painter exists; drawing never returns an error.
#[derive(Debug, Error)]
pub enum RenderError {
	#[error("no suitable GPU adapter found")]
	NoAdapter,

	#[error("failed to create device: {0}")]
	Device(#[from] wgpu::RequestDeviceError),
}

pub type Result<T> = std::result::Result<T, RenderError>;
