//! The seam between the view and whatever it draws on.
//!
//! A [Surface] is the host's 2D drawing target. Some surfaces can also hand out their
//! underlying graphics context as a [Gpu] for the duration of a [native] scope.

use crate::FrameBuffer;

/// A rectangle in surface coordinates, origin at the top left.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
	pub x: f32,
	pub y: f32,
	pub width: f32,
	pub height: f32,
}

impl Rect {
	pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
		Self { x, y, width, height }
	}

	pub fn right(&self) -> f32 {
		self.x + self.width
	}

	pub fn bottom(&self) -> f32 {
		self.y + self.height
	}

	pub fn is_empty(&self) -> bool {
		self.width <= 0.0 || self.height <= 0.0
	}
}

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: u8,
}

impl Color {
	/// Drawn in place of a missing frame.
	pub const BLACK: Self = Self::rgb(0, 0, 0);

	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 255 }
	}
}

/// How drawn pixels combine with what's already on the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Composition {
	/// Source pixels overwrite the destination outright.
	#[default]
	Replace,

	/// Source pixels are alpha blended over the destination.
	Over,
}

/// What a surface supports, queried once per paint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
	/// The surface is GPU backed and supports a [native] drawing scope.
	pub native_gpu: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
	Nearest,
	Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
	Repeat,
	ClampToEdge,
}

/// Parameters applied when a texture is created; they never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureParams {
	pub filter: Filter,
	pub wrap: Wrap,
	pub composition: Composition,
}

impl TextureParams {
	/// Video frames are opaque and scaled to fit.
	pub const VIDEO: Self = Self {
		filter: Filter::Linear,
		wrap: Wrap::ClampToEdge,
		composition: Composition::Replace,
	};
}

/// A textured quad, vertices in triangle fan order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
	pub positions: [[f32; 2]; 4],
	pub tex_coords: [[f32; 2]; 4],
}

impl Quad {
	/// Cover `rect` with the whole texture.
	///
	/// Row zero of the frame maps to the top edge, so the image is upright on a y-down surface.
	pub fn new(rect: Rect) -> Self {
		let (left, top, right, bottom) = (rect.x, rect.y, rect.right(), rect.bottom());

		Self {
			positions: [[left, top], [right, top], [right, bottom], [left, bottom]],
			tex_coords: [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
		}
	}
}

/// The native graphics API, only reachable inside a [native] scope.
pub trait Gpu {
	/// An allocated texture. Dropping it releases the GPU memory.
	type Texture;

	fn enable_texturing(&mut self) {}

	/// Allocate a texture the size of `frame` and upload all of its pixels.
	///
	/// Creation can't fail on a context that reached a native scope; implementations panic instead.
	fn create_texture(&mut self, frame: &FrameBuffer, params: &TextureParams) -> Self::Texture;

	/// Replace the full contents of an existing texture of the same size.
	fn update_texture(&mut self, texture: &mut Self::Texture, frame: &FrameBuffer);

	/// Draw the 4-vertex fan with `texture` bound.
	fn draw_quad(&mut self, texture: &Self::Texture, quad: &Quad);
}

/// A drawing target owned by the host.
pub trait Surface {
	type Gpu: Gpu;

	fn capabilities(&self) -> Capabilities;

	/// Enter native drawing, returning the graphics context.
	///
	/// Always followed by [Self::end_native], even when this returns None.
	fn begin_native(&mut self) -> Option<&mut Self::Gpu>;

	/// Leave native drawing and restore the surface's own state.
	fn end_native(&mut self);

	fn fill_rect(&mut self, rect: Rect, color: Color);

	/// Scale `frame` into `rect` without creating any persistent GPU resource.
	fn draw_frame(&mut self, rect: Rect, frame: &FrameBuffer, composition: Composition);
}

struct NativeScope<'a, S: Surface> {
	surface: &'a mut S,
}

impl<S: Surface> Drop for NativeScope<'_, S> {
	fn drop(&mut self) {
		self.surface.end_native();
	}
}

/// Run `f` inside a native drawing scope.
///
/// The scope is closed on every exit, including a panic in `f`.
/// Returns None if the surface couldn't provide a graphics context.
pub fn native<S, R, F>(surface: &mut S, f: F) -> Option<R>
where
	S: Surface,
	F: FnOnce(&mut S::Gpu) -> R,
{
	let scope = NativeScope { surface };
	let gpu = scope.surface.begin_native()?;
	Some(f(gpu))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test::{Call, MockSurface};

	#[test]
	fn test_quad_is_upright() {
		let quad = Quad::new(Rect::new(10.0, 20.0, 100.0, 50.0));

		assert_eq!(quad.positions[0], [10.0, 20.0]);
		assert_eq!(quad.positions[2], [110.0, 70.0]);
		// The top left corner samples the first row.
		assert_eq!(quad.tex_coords[0], [0.0, 0.0]);
		assert_eq!(quad.tex_coords[3], [0.0, 1.0]);
	}

	#[test]
	fn test_native_scope_always_closes() {
		let mut surface = MockSurface::accelerated();
		let res = native(&mut surface, |gpu| {
			gpu.enable_texturing();
			42
		});

		assert_eq!(res, Some(42));
		assert_eq!(surface.calls(), [Call::BeginNative, Call::EnableTexturing, Call::EndNative]);
	}

	#[test]
	fn test_native_scopes_are_balanced() {
		let mut surface = MockSurface::accelerated();
		native(&mut surface, |_| ());
		native(&mut surface, |gpu| gpu.enable_texturing());

		assert_eq!(
			surface.calls(),
			[
				Call::BeginNative,
				Call::EndNative,
				Call::BeginNative,
				Call::EnableTexturing,
				Call::EndNative
			]
		);
	}

	#[test]
	fn test_native_scope_closes_on_failure() {
		let mut surface = MockSurface::accelerated();
		surface.fail_native = true;

		let res = native(&mut surface, |_| ());
		assert_eq!(res, None);
		assert_eq!(surface.calls(), [Call::BeginNative, Call::EndNative]);
	}

	#[test]
	fn test_native_scope_closes_on_panic() {
		let mut surface = MockSurface::accelerated();

		let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
			let _: Option<()> = native(&mut surface, |_| panic!("boom"));
		}));

		assert!(res.is_err());
		assert_eq!(surface.calls().last(), Some(&Call::EndNative));
	}
}
