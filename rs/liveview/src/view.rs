use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
	Color, Composition, ConnectionState, Gpu, Quad, Rect, Settings, Size, StatusText, StreamEvent, StreamHandle,
	Subscriber, Surface, TextureCache, surface,
};

/// A notification from a [LiveView] to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
	PausedChanged(bool),
	ConnectedChanged(bool),

	/// The overlay text to show over the video.
	ErrorTextChanged(StatusText),

	FrameSizeChanged(Size),

	/// A new frame arrived; the host should schedule a paint.
	Update,
}

struct Binding {
	stream: StreamHandle,
	subscriber: Subscriber,
}

/// Displays a live stream on a host [Surface].
///
/// `T` is the texture type of the [Gpu] behind the surfaces it paints on.
/// All methods run on the render thread; the producer's notifications are queued
/// and applied by [Self::process_events], [Self::wait] or at the start of [Self::paint].
pub struct LiveView<T> {
	binding: Option<Binding>,
	textures: TextureCache<T>,
	settings: Arc<dyn Settings>,
	observers: Vec<mpsc::UnboundedSender<ViewEvent>>,

	// The last value sent, so repeated states don't repeat the notification.
	connected: bool,
	status: StatusText,
	frame_size: Size,

	// Only log the render path once.
	logged_accelerated: bool,
}

impl<T> LiveView<T> {
	pub fn new(settings: Arc<dyn Settings>) -> Self {
		let config = settings.render_config();

		Self {
			binding: None,
			textures: TextureCache::new(config.acceleration),
			settings,
			observers: Vec::new(),
			connected: false,
			status: StatusText::NONE,
			frame_size: Size::default(),
			logged_accelerated: false,
		}
	}

	/// Receive notifications until the receiver is dropped.
	pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ViewEvent> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.observers.push(tx);
		rx
	}

	/// Bind to a stream, or unbind with None.
	///
	/// Rebinding to the same stream does nothing. Otherwise the previous stream is
	/// unsubscribed before the new one is subscribed, and its queued notifications are discarded.
	pub fn set_stream(&mut self, stream: Option<StreamHandle>) {
		let current = self.binding.as_ref().map(|binding| &binding.stream);
		let unchanged = match (current, &stream) {
			(Some(a), Some(b)) => Arc::ptr_eq(a, b),
			(None, None) => true,
			_ => false,
		};

		if unchanged {
			return;
		}

		// Drop the old subscription first so nothing from it is observed after this returns.
		self.binding = None;

		match stream {
			Some(stream) => {
				let subscriber = stream.subscribe();
				stream.start();

				let status = StatusText::from(stream.state());
				self.binding = Some(Binding { stream, subscriber });
				self.set_status(status);
			}
			None => self.set_status(StatusText::NO_VIDEO),
		}

		self.emit(ViewEvent::PausedChanged(self.is_paused()));

		self.connected = self.is_connected();
		self.emit(ViewEvent::ConnectedChanged(self.connected));

		// The texture belongs to the previous stream's frames.
		self.textures.invalidate();
		self.frame_size = self.current_size();
		self.emit(ViewEvent::FrameSizeChanged(self.frame_size));

		self.emit(ViewEvent::Update);
	}

	/// Unbind the stream and release the texture.
	pub fn clear(&mut self) {
		self.set_stream(None);
		self.textures.invalidate();
	}

	pub fn stream(&self) -> Option<&StreamHandle> {
		self.binding.as_ref().map(|binding| &binding.stream)
	}

	pub fn is_paused(&self) -> bool {
		self.stream().is_some_and(|stream| stream.is_paused())
	}

	pub fn set_paused(&self, paused: bool) {
		if let Some(stream) = self.stream() {
			stream.set_paused(paused);
		}
	}

	pub fn is_connected(&self) -> bool {
		self.stream().is_some_and(|stream| stream.state().is_connected())
	}

	/// The rate frames are arriving, rounded to the nearest integer.
	pub fn fps(&self) -> u32 {
		self.stream().map_or(0, |stream| stream.received_fps().round().max(0.0) as u32)
	}

	pub fn frame_size(&self) -> Size {
		self.frame_size
	}

	/// The overlay text most recently sent to observers.
	pub fn status(&self) -> StatusText {
		self.status
	}

	/// The producer's error detail. It's not shown by default; hosts may surface it as a tooltip.
	pub fn error_message(&self) -> Option<String> {
		self.stream()
			.filter(|stream| stream.state() == ConnectionState::Error)
			.and_then(|stream| stream.error_message())
	}

	/// True while a GPU texture is allocated.
	pub fn has_texture(&self) -> bool {
		self.textures.is_allocated()
	}

	/// Re-read the injected settings.
	///
	/// Disabling acceleration releases the texture before this returns.
	pub fn reload_settings(&mut self) {
		let config = self.settings.render_config();
		if config.acceleration != self.textures.is_enabled() {
			tracing::info!(acceleration = config.acceleration, "render settings changed");
		}

		self.textures.set_enabled(config.acceleration);
	}

	/// Apply every queued stream notification without waiting.
	pub fn process_events(&mut self) {
		while let Some(event) = self.binding.as_mut().and_then(|binding| binding.subscriber.try_next()) {
			self.handle(event);
		}
	}

	/// Wait for the next stream notification, then apply it and anything queued behind it.
	///
	/// Returns false if no stream is bound or the producer has gone away.
	pub async fn wait(&mut self) -> bool {
		let Some(binding) = self.binding.as_mut() else {
			return false;
		};

		let Some(event) = binding.subscriber.next().await else {
			return false;
		};

		self.handle(event);
		self.process_events();

		true
	}

	fn handle(&mut self, event: StreamEvent) {
		match event {
			StreamEvent::FrameReady => self.emit(ViewEvent::Update),
			StreamEvent::SizeChanged(size) => {
				self.textures.invalidate();
				self.frame_size = size;
				self.emit(ViewEvent::FrameSizeChanged(size));
			}
			StreamEvent::StateChanged(state) => self.state_changed(state),
			StreamEvent::PausedChanged(paused) => self.emit(ViewEvent::PausedChanged(paused)),
		}
	}

	fn state_changed(&mut self, state: ConnectionState) {
		let connected = state.is_connected();
		if connected != self.connected {
			self.connected = connected;
			self.emit(ViewEvent::ConnectedChanged(connected));
		}

		if state == ConnectionState::Error {
			let message = self.stream().and_then(|stream| stream.error_message());
			tracing::debug!(?message, "live stream error");
		}

		self.set_status(StatusText::from(state));
	}

	fn set_status(&mut self, status: StatusText) {
		self.status = status;
		self.emit(ViewEvent::ErrorTextChanged(status));
	}

	fn current_size(&self) -> Size {
		self.stream()
			.and_then(|stream| stream.current_frame())
			.map(|frame| frame.size())
			.unwrap_or_default()
	}

	fn emit(&mut self, event: ViewEvent) {
		self.observers.retain(|tx| tx.send(event).is_ok());
	}

	/// Draw the current frame into `rect`.
	///
	/// Never fails: a missing frame is drawn as a black fill, and a surface that
	/// can't provide a graphics context falls back to compositing the frame directly.
	pub fn paint<S>(&mut self, surface: &mut S, rect: Rect)
	where
		S: Surface,
		S::Gpu: Gpu<Texture = T>,
	{
		self.process_events();

		let Some(stream) = self.stream() else {
			return;
		};

		let Some(frame) = stream.current_frame().filter(|frame| !frame.is_empty()) else {
			surface.fill_rect(rect, Color::BLACK);
			return;
		};

		let accelerated = self.textures.is_enabled() && surface.capabilities().native_gpu;
		if accelerated {
			if !self.logged_accelerated {
				self.logged_accelerated = true;
				tracing::debug!("using accelerated output");
			}

			let textures = &mut self.textures;
			let drawn = surface::native(surface, |gpu| {
				gpu.enable_texturing();
				if let Some(texture) = textures.ensure(gpu, &frame) {
					gpu.draw_quad(texture, &Quad::new(rect));
				}
			});

			if drawn.is_some() {
				return;
			}

			tracing::warn!("native drawing unavailable, falling back");
		}

		// Video is opaque, so blending with the previous contents would be wrong and wasted work.
		surface.draw_frame(rect, &frame, Composition::Replace);
	}
}
