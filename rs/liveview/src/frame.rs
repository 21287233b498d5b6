use std::fmt;

use bytes::Bytes;

use crate::{Error, Result};

/// The dimensions of a frame in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
	pub width: u32,
	pub height: u32,
}

impl Size {
	pub const fn new(width: u32, height: u32) -> Self {
		Self { width, height }
	}

	/// True if either dimension is zero.
	pub fn is_empty(&self) -> bool {
		self.width == 0 || self.height == 0
	}
}

impl fmt::Display for Size {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}x{}", self.width, self.height)
	}
}

impl From<(u32, u32)> for Size {
	fn from((width, height): (u32, u32)) -> Self {
		Self { width, height }
	}
}

/// The layout of a single pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PixelFormat {
	/// 32-bit packed color, bytes in B, G, R, A order. Video frames are always opaque.
	#[default]
	Bgra32,
}

impl PixelFormat {
	pub const fn bytes_per_pixel(&self) -> usize {
		match self {
			Self::Bgra32 => 4,
		}
	}
}

/// A snapshot of decoded pixels handed over by a [crate::StreamProducer].
///
/// Cloning is cheap and shares the underlying buffer.
/// Two frames are the [same](Self::is_same) if they share that buffer, regardless of content.
#[derive(Clone)]
pub struct FrameBuffer {
	size: Size,
	stride: usize,
	format: PixelFormat,
	data: Bytes,
}

impl FrameBuffer {
	/// Wrap tightly packed BGRA pixels.
	pub fn new(size: Size, data: impl Into<Bytes>) -> Result<Self> {
		let stride = size.width as usize * PixelFormat::Bgra32.bytes_per_pixel();
		Self::with_stride(size, stride, data)
	}

	/// Wrap BGRA pixels whose rows are `stride` bytes apart.
	pub fn with_stride(size: Size, stride: usize, data: impl Into<Bytes>) -> Result<Self> {
		let format = PixelFormat::Bgra32;
		let data = data.into();

		if stride < size.width as usize * format.bytes_per_pixel() {
			return Err(Error::InvalidStride {
				stride,
				width: size.width,
			});
		}

		let expected = stride * size.height as usize;
		if data.len() < expected {
			return Err(Error::FrameTooSmall {
				expected,
				actual: data.len(),
			});
		}

		Ok(Self {
			size,
			stride,
			format,
			data,
		})
	}

	pub fn size(&self) -> Size {
		self.size
	}

	pub fn width(&self) -> u32 {
		self.size.width
	}

	pub fn height(&self) -> u32 {
		self.size.height
	}

	/// The number of bytes between the start of consecutive rows.
	pub fn stride(&self) -> usize {
		self.stride
	}

	pub fn format(&self) -> PixelFormat {
		self.format
	}

	pub fn data(&self) -> &[u8] {
		&self.data
	}

	/// A single row of pixels, without any stride padding.
	pub fn row(&self, y: u32) -> &[u8] {
		let start = y as usize * self.stride;
		let len = self.size.width as usize * self.format.bytes_per_pixel();
		&self.data[start..start + len]
	}

	/// A frame without pixels is treated the same as no frame at all.
	pub fn is_empty(&self) -> bool {
		self.size.is_empty()
	}

	/// Returns true if both frames point at the same buffer.
	///
	/// Holding either frame keeps the buffer alive, so its address can't be reused by another frame.
	pub fn is_same(&self, other: &Self) -> bool {
		self.data.as_ptr() == other.data.as_ptr() && self.data.len() == other.data.len()
	}
}

impl fmt::Debug for FrameBuffer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FrameBuffer")
			.field("size", &self.size)
			.field("stride", &self.stride)
			.field("format", &self.format)
			.field("data", &self.data.as_ptr())
			.finish()
	}
}
