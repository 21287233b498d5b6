use crate::{FrameBuffer, Gpu, Size, TextureParams};

struct Cached<T> {
	texture: T,
	size: Size,

	// Holding the frame pins its buffer, so the identity check can't be fooled by a reused address.
	uploaded: FrameBuffer,
}

/// A single GPU texture, reconciled against the latest frame on each paint.
///
/// Uploads are skipped when the producer hands over the same buffer again,
/// so repainting between frames costs no bandwidth.
/// The texture is released by [Self::invalidate], by disabling acceleration, or on drop.
pub struct TextureCache<T> {
	cached: Option<Cached<T>>,
	enabled: bool,
}

impl<T> TextureCache<T> {
	pub fn new(enabled: bool) -> Self {
		Self { cached: None, enabled }
	}

	/// Make sure the texture holds `frame`, returning it for drawing.
	///
	/// Returns None without touching the GPU if the frame is empty or acceleration is disabled.
	pub fn ensure<G: Gpu<Texture = T>>(&mut self, gpu: &mut G, frame: &FrameBuffer) -> Option<&T> {
		if frame.is_empty() || !self.enabled {
			return None;
		}

		// A size mismatch means we missed the size change; never upload into the wrong dimensions.
		if self.cached.as_ref().is_some_and(|cached| cached.size != frame.size()) {
			self.invalidate();
		}

		match &mut self.cached {
			Some(cached) if cached.uploaded.is_same(frame) => {}
			Some(cached) => {
				gpu.update_texture(&mut cached.texture, frame);
				cached.uploaded = frame.clone();
			}
			None => {
				let texture = gpu.create_texture(frame, &TextureParams::VIDEO);
				tracing::debug!(size = %frame.size(), "allocated texture");

				self.cached = Some(Cached {
					texture,
					size: frame.size(),
					uploaded: frame.clone(),
				});
			}
		}

		self.cached.as_ref().map(|cached| &cached.texture)
	}

	/// Release the texture, if any. Returns true if one was released.
	pub fn invalidate(&mut self) -> bool {
		match self.cached.take() {
			Some(cached) => {
				tracing::debug!(size = %cached.size, "released texture");
				true
			}
			None => false,
		}
	}

	/// Disabling acceleration releases the texture immediately.
	pub fn set_enabled(&mut self, enabled: bool) {
		self.enabled = enabled;
		if !enabled {
			self.invalidate();
		}
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	pub fn is_allocated(&self) -> bool {
		self.cached.is_some()
	}

	/// The dimensions of the allocated texture.
	pub fn size(&self) -> Option<Size> {
		self.cached.as_ref().map(|cached| cached.size)
	}
}

impl<T> Default for TextureCache<T> {
	fn default() -> Self {
		Self::new(true)
	}
}
