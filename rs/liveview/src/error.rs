use std::{path::PathBuf, sync::Arc};

/// A list of possible errors from the configuration and frame constructors.
///
/// Rendering itself never fails; see [crate::LiveView::paint].
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
	#[error("failed to read {}: {source}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: Arc<std::io::Error>,
	},

	#[error("invalid settings in {}: {source}", .path.display())]
	Config {
		path: PathBuf,
		#[source]
		source: Arc<toml::de::Error>,
	},

	/// The pixel buffer is smaller than `stride * height`.
	#[error("frame buffer too small: expected {expected} bytes, got {actual}")]
	FrameTooSmall { expected: usize, actual: usize },

	/// The stride can't hold a full row of pixels.
	#[error("invalid stride {stride} for width {width}")]
	InvalidStride { stride: usize, width: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
