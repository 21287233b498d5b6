//! Recording doubles for the GPU, surface and stream producer.

use std::{
	cell::{Cell, RefCell},
	rc::Rc,
	sync::Mutex,
};

use crate::{
	Capabilities, Color, Composition, ConnectionState, FrameBuffer, Gpu, Listeners, Quad, Rect, Size, StreamEvent,
	StreamProducer, Subscriber, Surface, TextureParams,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Call {
	BeginNative,
	EndNative,
	EnableTexturing,
	CreateTexture { id: u32, size: Size },
	UpdateTexture { id: u32 },
	DeleteTexture { id: u32 },
	DrawQuad { id: u32, quad: Quad },
	FillRect { rect: Rect, color: Color },
	DrawFrame { rect: Rect, composition: Composition },
}

impl Call {
	/// Any call that touches GPU memory or issues a GPU draw.
	pub fn is_gpu(&self) -> bool {
		matches!(
			self,
			Call::EnableTexturing
				| Call::CreateTexture { .. }
				| Call::UpdateTexture { .. }
				| Call::DeleteTexture { .. }
				| Call::DrawQuad { .. }
		)
	}
}

#[derive(Clone, Default)]
pub struct Log {
	calls: Rc<RefCell<Vec<Call>>>,
	live: Rc<Cell<usize>>,
	max_live: Rc<Cell<usize>>,
}

impl Log {
	fn push(&self, call: Call) {
		self.calls.borrow_mut().push(call);
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.borrow().clone()
	}

	pub fn clear(&self) {
		self.calls.borrow_mut().clear();
	}

	pub fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
		self.calls.borrow().iter().filter(|call| f(call)).count()
	}

	/// The number of textures currently allocated.
	pub fn live(&self) -> usize {
		self.live.get()
	}

	/// The most textures that were ever allocated at once.
	pub fn max_live(&self) -> usize {
		self.max_live.get()
	}
}

pub struct MockTexture {
	pub id: u32,
	log: Log,
}

impl Drop for MockTexture {
	fn drop(&mut self) {
		self.log.live.set(self.log.live.get() - 1);
		self.log.push(Call::DeleteTexture { id: self.id });
	}
}

#[derive(Default)]
pub struct MockGpu {
	pub log: Log,
	next_id: u32,
}

impl Gpu for MockGpu {
	type Texture = MockTexture;

	fn enable_texturing(&mut self) {
		self.log.push(Call::EnableTexturing);
	}

	fn create_texture(&mut self, frame: &FrameBuffer, params: &TextureParams) -> MockTexture {
		assert_eq!(*params, TextureParams::VIDEO);

		self.next_id += 1;
		let live = self.log.live.get() + 1;
		self.log.live.set(live);
		self.log.max_live.set(self.log.max_live.get().max(live));

		self.log.push(Call::CreateTexture {
			id: self.next_id,
			size: frame.size(),
		});

		MockTexture {
			id: self.next_id,
			log: self.log.clone(),
		}
	}

	fn update_texture(&mut self, texture: &mut MockTexture, frame: &FrameBuffer) {
		assert!(!frame.is_empty());
		self.log.push(Call::UpdateTexture { id: texture.id });
	}

	fn draw_quad(&mut self, texture: &MockTexture, quad: &Quad) {
		self.log.push(Call::DrawQuad { id: texture.id, quad: *quad });
	}
}

pub struct MockSurface {
	pub gpu: MockGpu,
	pub native_gpu: bool,
	pub fail_native: bool,
}

impl MockSurface {
	pub fn accelerated() -> Self {
		Self {
			gpu: MockGpu::default(),
			native_gpu: true,
			fail_native: false,
		}
	}

	pub fn unaccelerated() -> Self {
		Self {
			native_gpu: false,
			..Self::accelerated()
		}
	}

	pub fn log(&self) -> Log {
		self.gpu.log.clone()
	}

	pub fn calls(&self) -> Vec<Call> {
		self.gpu.log.calls()
	}
}

impl Surface for MockSurface {
	type Gpu = MockGpu;

	fn capabilities(&self) -> Capabilities {
		Capabilities {
			native_gpu: self.native_gpu,
		}
	}

	fn begin_native(&mut self) -> Option<&mut MockGpu> {
		self.gpu.log.push(Call::BeginNative);
		match self.native_gpu && !self.fail_native {
			true => Some(&mut self.gpu),
			false => None,
		}
	}

	fn end_native(&mut self) {
		self.gpu.log.push(Call::EndNative);
	}

	fn fill_rect(&mut self, rect: Rect, color: Color) {
		self.gpu.log.push(Call::FillRect { rect, color });
	}

	fn draw_frame(&mut self, rect: Rect, _frame: &FrameBuffer, composition: Composition) {
		self.gpu.log.push(Call::DrawFrame { rect, composition });
	}
}

#[derive(Default)]
struct StreamState {
	state: ConnectionState,
	paused: bool,
	fps: f64,
	frame: Option<FrameBuffer>,
	error: Option<String>,
	started: usize,
}

/// A producer driven by the test.
#[derive(Default)]
pub struct MockStream {
	state: Mutex<StreamState>,
	listeners: Listeners,
}

impl MockStream {
	pub fn new(state: ConnectionState) -> Self {
		let stream = Self::default();
		stream.state.lock().unwrap().state = state;
		stream
	}

	pub fn started(&self) -> usize {
		self.state.lock().unwrap().started
	}

	pub fn subscribers(&self) -> usize {
		self.listeners.len()
	}

	pub fn set_fps(&self, fps: f64) {
		self.state.lock().unwrap().fps = fps;
	}

	pub fn set_state(&self, state: ConnectionState, error: Option<&str>) {
		{
			let mut current = self.state.lock().unwrap();
			current.state = state;
			current.error = error.map(str::to_string);
		}
		self.listeners.notify(StreamEvent::StateChanged(state));
	}

	pub fn push_frame(&self, frame: Option<FrameBuffer>) {
		self.state.lock().unwrap().frame = frame;
		self.listeners.notify(StreamEvent::FrameReady);
	}

	pub fn resize(&self, size: Size) {
		self.listeners.notify(StreamEvent::SizeChanged(size));
	}
}

impl StreamProducer for MockStream {
	fn start(&self) {
		self.state.lock().unwrap().started += 1;
	}

	fn is_paused(&self) -> bool {
		self.state.lock().unwrap().paused
	}

	fn set_paused(&self, paused: bool) {
		self.state.lock().unwrap().paused = paused;
		self.listeners.notify(StreamEvent::PausedChanged(paused));
	}

	fn state(&self) -> ConnectionState {
		self.state.lock().unwrap().state
	}

	fn received_fps(&self) -> f64 {
		self.state.lock().unwrap().fps
	}

	fn current_frame(&self) -> Option<FrameBuffer> {
		self.state.lock().unwrap().frame.clone()
	}

	fn error_message(&self) -> Option<String> {
		self.state.lock().unwrap().error.clone()
	}

	fn subscribe(&self) -> Subscriber {
		self.listeners.subscribe()
	}
}

/// A solid BGRA frame in a freshly allocated buffer.
pub fn frame(width: u32, height: u32) -> FrameBuffer {
	let data = vec![0x80u8; width as usize * height as usize * 4];
	FrameBuffer::new(Size::new(width, height), data).unwrap()
}
