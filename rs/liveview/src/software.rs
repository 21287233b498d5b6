use image::{Rgba, RgbaImage, imageops};

use crate::{Capabilities, Color, Composition, FrameBuffer, Gpu, Quad, Rect, Surface, TextureParams};

/// A CPU surface backed by an RGBA image.
///
/// It has no native graphics context, so a [crate::LiveView] always composites onto it directly.
#[derive(Debug, Clone)]
pub struct Canvas {
	image: RgbaImage,
}

impl Canvas {
	pub fn new(width: u32, height: u32) -> Self {
		Self {
			image: RgbaImage::new(width, height),
		}
	}

	pub fn width(&self) -> u32 {
		self.image.width()
	}

	pub fn height(&self) -> u32 {
		self.image.height()
	}

	/// The whole canvas as a rectangle.
	pub fn bounds(&self) -> Rect {
		Rect::new(0.0, 0.0, self.width() as f32, self.height() as f32)
	}

	pub fn pixel(&self, x: u32, y: u32) -> Color {
		let Rgba([r, g, b, a]) = *self.image.get_pixel(x, y);
		Color { r, g, b, a }
	}

	pub fn image(&self) -> &RgbaImage {
		&self.image
	}

	pub fn into_image(self) -> RgbaImage {
		self.image
	}
}

/// The graphics context of a surface without one. It can't be constructed.
#[derive(Debug)]
pub enum Unaccelerated {}

impl Gpu for Unaccelerated {
	type Texture = Unaccelerated;

	fn create_texture(&mut self, _frame: &FrameBuffer, _params: &TextureParams) -> Self::Texture {
		match *self {}
	}

	fn update_texture(&mut self, _texture: &mut Self::Texture, _frame: &FrameBuffer) {
		match *self {}
	}

	fn draw_quad(&mut self, _texture: &Self::Texture, _quad: &Quad) {
		match *self {}
	}
}

// Snap a rectangle to whole pixels: (x, y, width, height).
fn snap(rect: Rect) -> Option<(i64, i64, u32, u32)> {
	if rect.is_empty() {
		return None;
	}

	let x = rect.x.round() as i64;
	let y = rect.y.round() as i64;
	let width = (rect.right().round() as i64 - x).max(0) as u32;
	let height = (rect.bottom().round() as i64 - y).max(0) as u32;

	match width > 0 && height > 0 {
		true => Some((x, y, width, height)),
		false => None,
	}
}

// Swizzle BGRA rows into an RGBA image, dropping any stride padding.
fn to_rgba(frame: &FrameBuffer) -> RgbaImage {
	let mut image = RgbaImage::new(frame.width(), frame.height());

	for (y, row) in image.rows_mut().enumerate() {
		let src = frame.row(y as u32).chunks_exact(4);
		for (dst, bgra) in row.zip(src) {
			*dst = Rgba([bgra[2], bgra[1], bgra[0], bgra[3]]);
		}
	}

	image
}

impl Surface for Canvas {
	type Gpu = Unaccelerated;

	fn capabilities(&self) -> Capabilities {
		Capabilities { native_gpu: false }
	}

	fn begin_native(&mut self) -> Option<&mut Unaccelerated> {
		None
	}

	fn end_native(&mut self) {}

	fn fill_rect(&mut self, rect: Rect, color: Color) {
		let Some((x, y, width, height)) = snap(rect) else {
			return;
		};

		let fill = RgbaImage::from_pixel(width, height, Rgba([color.r, color.g, color.b, color.a]));
		imageops::replace(&mut self.image, &fill, x, y);
	}

	fn draw_frame(&mut self, rect: Rect, frame: &FrameBuffer, composition: Composition) {
		let Some((x, y, width, height)) = snap(rect) else {
			return;
		};

		if frame.is_empty() {
			return;
		}

		let mut pixels = to_rgba(frame);
		if pixels.dimensions() != (width, height) {
			pixels = imageops::resize(&pixels, width, height, imageops::FilterType::Triangle);
		}

		match composition {
			Composition::Replace => imageops::replace(&mut self.image, &pixels, x, y),
			Composition::Over => imageops::overlay(&mut self.image, &pixels, x, y),
		}
	}
}
