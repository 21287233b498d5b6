use std::sync::Arc;

use image::{Rgba, RgbaImage, imageops};
use wgpu::util::DeviceExt;

use super::{RenderError, Result};
use crate::{
	Capabilities, Color, Composition, Filter, FrameBuffer, Gpu, Quad, Rect, Size, Surface, TextureParams, Wrap,
};

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
	position: [f32; 2],
	tex_coord: [f32; 2],
}

impl Vertex {
	const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

	fn layout() -> wgpu::VertexBufferLayout<'static> {
		wgpu::VertexBufferLayout {
			array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
			step_mode: wgpu::VertexStepMode::Vertex,
			attributes: &Self::ATTRIBUTES,
		}
	}
}

/// The pipelines and layouts needed to draw frames on a device.
pub struct WgpuPainter {
	device: Arc<wgpu::Device>,
	queue: Arc<wgpu::Queue>,
	format: wgpu::TextureFormat,
	bind_group_layout: wgpu::BindGroupLayout,

	// One pipeline per composition mode.
	replace: wgpu::RenderPipeline,
	over: wgpu::RenderPipeline,
}

impl WgpuPainter {
	/// Create a painter that draws into targets of `format`.
	pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, format: wgpu::TextureFormat) -> Self {
		let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
			label: Some("LiveView Shader"),
			source: wgpu::ShaderSource::Wgsl(include_str!("shaders/quad.wgsl").into()),
		});

		let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
			label: Some("LiveView Bind Group Layout"),
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
		});

		let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
			label: Some("LiveView Pipeline Layout"),
			bind_group_layouts: &[&bind_group_layout],
			push_constant_ranges: &[],
		});

		let pipeline = |label: &str, blend: wgpu::BlendState| {
			device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
				label: Some(label),
				layout: Some(&layout),
				vertex: wgpu::VertexState {
					module: &shader,
					entry_point: Some("vs_main"),
					buffers: &[Vertex::layout()],
					compilation_options: Default::default(),
				},
				fragment: Some(wgpu::FragmentState {
					module: &shader,
					entry_point: Some("fs_main"),
					targets: &[Some(wgpu::ColorTargetState {
						format,
						blend: Some(blend),
						write_mask: wgpu::ColorWrites::ALL,
					})],
					compilation_options: Default::default(),
				}),
				primitive: wgpu::PrimitiveState {
					topology: wgpu::PrimitiveTopology::TriangleStrip,
					strip_index_format: None,
					front_face: wgpu::FrontFace::Ccw,
					cull_mode: None,
					polygon_mode: wgpu::PolygonMode::Fill,
					unclipped_depth: false,
					conservative: false,
				},
				depth_stencil: None,
				multisample: wgpu::MultisampleState {
					count: 1,
					mask: !0,
					alpha_to_coverage_enabled: false,
				},
				multiview: None,
				cache: None,
			})
		};

		let replace = pipeline("LiveView Replace Pipeline", wgpu::BlendState::REPLACE);
		let over = pipeline("LiveView Over Pipeline", wgpu::BlendState::ALPHA_BLENDING);

		Self {
			device,
			queue,
			format,
			bind_group_layout,
			replace,
			over,
		}
	}

	/// Create a painter on the default adapter, without a window.
	pub async fn headless(format: wgpu::TextureFormat) -> Result<Self> {
		let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
			backends: wgpu::Backends::all(),
			..Default::default()
		});

		let adapter = instance
			.request_adapter(&wgpu::RequestAdapterOptions {
				power_preference: wgpu::PowerPreference::LowPower,
				compatible_surface: None,
				force_fallback_adapter: false,
			})
			.await
			.ok_or(RenderError::NoAdapter)?;

		let info = adapter.get_info();
		let limits = adapter.limits();
		tracing::debug!(
			name = %info.name,
			backend = ?info.backend,
			max_texture = limits.max_texture_dimension_2d,
			"using GPU adapter"
		);

		let (device, queue) = adapter
			.request_device(
				&wgpu::DeviceDescriptor {
					label: Some("LiveView Device"),
					required_features: wgpu::Features::empty(),
					required_limits: limits,
					memory_hints: Default::default(),
				},
				None,
			)
			.await?;

		device.on_uncaptured_error(Box::new(|error| {
			tracing::warn!(%error, "wgpu error");
		}));

		Ok(Self::new(Arc::new(device), Arc::new(queue), format))
	}

	pub fn device(&self) -> &Arc<wgpu::Device> {
		&self.device
	}

	pub fn queue(&self) -> &Arc<wgpu::Queue> {
		&self.queue
	}

	pub fn format(&self) -> wgpu::TextureFormat {
		self.format
	}

	/// Start a paint into `target`, which must be `size` pixels and of [Self::format].
	///
	/// Nothing reaches the GPU until [WgpuSurface::submit].
	pub fn surface<'a>(&'a self, target: &'a wgpu::TextureView, size: Size) -> WgpuSurface<'a> {
		let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
			label: Some("LiveView Encoder"),
		});

		WgpuSurface {
			painter: self,
			target,
			size,
			encoder,
		}
	}

	fn texture(&self, size: Size, params: &TextureParams) -> WgpuTexture {
		let texture = self.device.create_texture(&wgpu::TextureDescriptor {
			label: Some("LiveView Frame"),
			size: extent(size),
			mip_level_count: 1,
			sample_count: 1,
			dimension: wgpu::TextureDimension::D2,
			format: wgpu::TextureFormat::Bgra8Unorm,
			usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
			view_formats: &[],
		});

		let address_mode = match params.wrap {
			Wrap::Repeat => wgpu::AddressMode::Repeat,
			Wrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
		};

		let filter = match params.filter {
			Filter::Nearest => wgpu::FilterMode::Nearest,
			Filter::Linear => wgpu::FilterMode::Linear,
		};

		let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
			label: Some("LiveView Sampler"),
			address_mode_u: address_mode,
			address_mode_v: address_mode,
			address_mode_w: address_mode,
			mag_filter: filter,
			min_filter: filter,
			mipmap_filter: wgpu::FilterMode::Nearest,
			..Default::default()
		});

		let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
		let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
			label: Some("LiveView Bind Group"),
			layout: &self.bind_group_layout,
			entries: &[
				wgpu::BindGroupEntry {
					binding: 0,
					resource: wgpu::BindingResource::TextureView(&view),
				},
				wgpu::BindGroupEntry {
					binding: 1,
					resource: wgpu::BindingResource::Sampler(&sampler),
				},
			],
		});

		WgpuTexture {
			texture,
			bind_group,
			size,
			composition: params.composition,
		}
	}

	// Frames larger than the device allows are scaled down on the CPU first.
	fn fit(&self, frame: &FrameBuffer) -> FrameBuffer {
		let max = self.device.limits().max_texture_dimension_2d;
		let size = fitted(frame.size(), max);
		if size == frame.size() {
			return frame.clone();
		}

		tracing::debug!(from = %frame.size(), to = %size, max, "frame exceeds texture limit");
		shrink(frame, size)
	}

	fn upload(&self, texture: &WgpuTexture, frame: &FrameBuffer) {
		let frame = self.fit(frame);
		assert_eq!(texture.size, frame.size(), "texture size mismatch");

		self.queue.write_texture(
			wgpu::ImageCopyTexture {
				texture: &texture.texture,
				mip_level: 0,
				origin: wgpu::Origin3d::ZERO,
				aspect: wgpu::TextureAspect::All,
			},
			frame.data(),
			wgpu::ImageDataLayout {
				offset: 0,
				bytes_per_row: Some(frame.stride() as u32),
				rows_per_image: Some(frame.height()),
			},
			extent(frame.size()),
		);
	}
}

// Keep the aspect ratio, with no side past `max`.
fn fitted(size: Size, max: u32) -> Size {
	let longest = size.width.max(size.height);
	if longest <= max {
		return size;
	}

	let scale = |side: u32| (side as u64 * max as u64 / longest as u64).max(1) as u32;
	Size::new(scale(size.width), scale(size.height))
}

// The channels are only resampled, so BGRA stays BGRA.
fn shrink(frame: &FrameBuffer, size: Size) -> FrameBuffer {
	let source = RgbaImage::from_fn(frame.width(), frame.height(), |x, y| {
		let pixel = &frame.row(y)[x as usize * 4..][..4];
		Rgba([pixel[0], pixel[1], pixel[2], pixel[3]])
	});

	let scaled = imageops::resize(&source, size.width, size.height, imageops::FilterType::Triangle);

	// The buffer comes from an image of exactly this size, so this can't fail.
	FrameBuffer::new(size, scaled.into_raw()).unwrap_or_else(|err| unreachable!("{err}"))
}

fn extent(size: Size) -> wgpu::Extent3d {
	wgpu::Extent3d {
		width: size.width,
		height: size.height,
		depth_or_array_layers: 1,
	}
}

// Convert surface pixels (y down) to clip space (y up), reordering the fan as a strip.
fn clip_space(quad: &Quad, size: Size) -> [Vertex; 4] {
	let width = size.width.max(1) as f32;
	let height = size.height.max(1) as f32;

	let vertex = |i: usize| {
		let [x, y] = quad.positions[i];
		Vertex {
			position: [x / width * 2.0 - 1.0, 1.0 - y / height * 2.0],
			tex_coord: quad.tex_coords[i],
		}
	};

	// The fan 0-1-2-3 is the strip 0-1-3-2.
	[vertex(0), vertex(1), vertex(3), vertex(2)]
}

/// A frame uploaded to the GPU.
///
/// Dropping it frees the GPU memory once any submitted work using it has finished.
pub struct WgpuTexture {
	texture: wgpu::Texture,
	bind_group: wgpu::BindGroup,
	size: Size,
	composition: Composition,
}

/// A single paint into a texture view.
///
/// Texture uploads go straight to the queue, so a surface should cover one paint and be submitted before the next.
pub struct WgpuSurface<'a> {
	painter: &'a WgpuPainter,
	target: &'a wgpu::TextureView,
	size: Size,
	encoder: wgpu::CommandEncoder,
}

impl WgpuSurface<'_> {
	/// Send everything drawn to the GPU.
	pub fn submit(self) -> wgpu::SubmissionIndex {
		self.painter.queue.submit(Some(self.encoder.finish()))
	}

	fn draw(&mut self, texture: &WgpuTexture, quad: &Quad, composition: Composition) {
		let vertices = clip_space(quad, self.size);
		let buffer = self.painter.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
			label: Some("LiveView Vertex Buffer"),
			contents: bytemuck::cast_slice(&vertices),
			usage: wgpu::BufferUsages::VERTEX,
		});

		let pipeline = match composition {
			Composition::Replace => &self.painter.replace,
			Composition::Over => &self.painter.over,
		};

		let mut pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
			label: Some("LiveView Render Pass"),
			color_attachments: &[Some(wgpu::RenderPassColorAttachment {
				view: self.target,
				resolve_target: None,
				ops: wgpu::Operations {
					load: wgpu::LoadOp::Load,
					store: wgpu::StoreOp::Store,
				},
			})],
			depth_stencil_attachment: None,
			timestamp_writes: None,
			occlusion_query_set: None,
		});

		pass.set_pipeline(pipeline);
		pass.set_bind_group(0, &texture.bind_group, &[]);
		pass.set_vertex_buffer(0, buffer.slice(..));
		pass.draw(0..4, 0..1);
	}
}

impl Gpu for WgpuSurface<'_> {
	type Texture = WgpuTexture;

	fn create_texture(&mut self, frame: &FrameBuffer, params: &TextureParams) -> WgpuTexture {
		let size = fitted(frame.size(), self.painter.device.limits().max_texture_dimension_2d);
		let texture = self.painter.texture(size, params);
		self.painter.upload(&texture, frame);
		texture
	}

	fn update_texture(&mut self, texture: &mut WgpuTexture, frame: &FrameBuffer) {
		self.painter.upload(texture, frame);
	}

	fn draw_quad(&mut self, texture: &WgpuTexture, quad: &Quad) {
		self.draw(texture, quad, texture.composition);
	}
}

impl Surface for WgpuSurface<'_> {
	type Gpu = Self;

	fn capabilities(&self) -> Capabilities {
		Capabilities { native_gpu: true }
	}

	fn begin_native(&mut self) -> Option<&mut Self> {
		Some(self)
	}

	fn end_native(&mut self) {}

	fn fill_rect(&mut self, rect: Rect, color: Color) {
		let params = TextureParams {
			filter: Filter::Nearest,
			..TextureParams::VIDEO
		};

		let Ok(pixel) = FrameBuffer::new(Size::new(1, 1), vec![color.b, color.g, color.r, color.a]) else {
			return;
		};
		let texture = self.create_texture(&pixel, &params);
		self.draw(&texture, &Quad::new(rect), Composition::Replace);
	}

	fn draw_frame(&mut self, rect: Rect, frame: &FrameBuffer, composition: Composition) {
		if frame.is_empty() {
			return;
		}

		let texture = self.create_texture(frame, &TextureParams::VIDEO);
		self.draw(&texture, &Quad::new(rect), composition);
	}
}
