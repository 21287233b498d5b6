use std::{
	collections::VecDeque,
	sync::{Arc, Mutex, Weak},
	time::Duration,
};

use bytes::Bytes;
use liveview::{ConnectionState, FrameBuffer, Listeners, Size, StreamEvent, StreamProducer, Subscriber};
use tokio::time::{Instant, MissedTickBehavior};

// 75% colour bars, left to right, as BGRA.
const BARS: [[u8; 4]; 8] = [
	[0xc0, 0xc0, 0xc0, 0xff],
	[0x00, 0xc0, 0xc0, 0xff],
	[0xc0, 0xc0, 0x00, 0xff],
	[0x00, 0xc0, 0x00, 0xff],
	[0xc0, 0x00, 0xc0, 0xff],
	[0x00, 0x00, 0xc0, 0xff],
	[0xc0, 0x00, 0x00, 0xff],
	[0x00, 0x00, 0x00, 0xff],
];

// Received FPS is the number of frames in this trailing window.
const FPS_WINDOW: Duration = Duration::from_secs(1);

#[derive(clap::Args, Clone, Debug)]
pub struct PatternConfig {
	/// The width of the generated frames.
	#[arg(long, default_value_t = 640)]
	pub width: u32,

	/// The height of the generated frames.
	#[arg(long, default_value_t = 360)]
	pub height: u32,

	/// The number of frames generated per second.
	#[arg(long, default_value_t = 30)]
	pub fps: u32,

	/// How long the simulated connection takes, in milliseconds.
	#[arg(long, default_value_t = 500)]
	pub connect_ms: u64,

	/// Report the stream as offline instead of streaming.
	#[arg(long, conflicts_with = "fail")]
	pub offline: bool,

	/// Fail the connection with this error message.
	#[arg(long)]
	pub fail: Option<String>,
}

impl Default for PatternConfig {
	fn default() -> Self {
		Self {
			width: 640,
			height: 360,
			fps: 30,
			connect_ms: 500,
			offline: false,
			fail: None,
		}
	}
}

#[derive(Default)]
struct State {
	connection: ConnectionState,
	paused: bool,
	started: bool,
	frame: Option<FrameBuffer>,
	error: Option<String>,
	received: VecDeque<Instant>,
}

struct Shared {
	config: PatternConfig,
	state: Mutex<State>,
	listeners: Listeners,
}

impl Shared {
	fn set_connection(&self, connection: ConnectionState, error: Option<String>) {
		{
			let mut state = self.state.lock().unwrap();
			state.connection = connection;
			state.error = error;
		}

		tracing::debug!(?connection, "test pattern state");
		self.listeners.notify(StreamEvent::StateChanged(connection));
	}
}

/// Moving colour bars, produced on a background task once started.
///
/// The task stops when the last handle is dropped.
pub struct TestPattern {
	shared: Arc<Shared>,
}

impl TestPattern {
	pub fn new(config: PatternConfig) -> Arc<Self> {
		Arc::new(Self {
			shared: Arc::new(Shared {
				config,
				state: Default::default(),
				listeners: Listeners::new(),
			}),
		})
	}
}

impl StreamProducer for TestPattern {
	fn start(&self) {
		{
			let mut state = self.shared.state.lock().unwrap();
			if state.started {
				return;
			}
			state.started = true;
		}

		self.shared.set_connection(ConnectionState::Connecting, None);
		tokio::spawn(run(Arc::downgrade(&self.shared)));
	}

	fn is_paused(&self) -> bool {
		self.shared.state.lock().unwrap().paused
	}

	fn set_paused(&self, paused: bool) {
		{
			let mut state = self.shared.state.lock().unwrap();
			if state.paused == paused {
				return;
			}
			state.paused = paused;
		}

		self.shared.listeners.notify(StreamEvent::PausedChanged(paused));
	}

	fn state(&self) -> ConnectionState {
		self.shared.state.lock().unwrap().connection
	}

	fn received_fps(&self) -> f64 {
		let state = self.shared.state.lock().unwrap();
		let now = Instant::now();
		state
			.received
			.iter()
			.filter(|at| now.duration_since(**at) < FPS_WINDOW)
			.count() as f64
	}

	fn current_frame(&self) -> Option<FrameBuffer> {
		self.shared.state.lock().unwrap().frame.clone()
	}

	fn error_message(&self) -> Option<String> {
		self.shared.state.lock().unwrap().error.clone()
	}

	fn subscribe(&self) -> Subscriber {
		self.shared.listeners.subscribe()
	}
}

async fn run(shared: Weak<Shared>) {
	let config = match shared.upgrade() {
		Some(shared) => shared.config.clone(),
		None => return,
	};

	tokio::time::sleep(Duration::from_millis(config.connect_ms)).await;

	{
		let Some(shared) = shared.upgrade() else {
			return;
		};

		if let Some(message) = config.fail {
			shared.set_connection(ConnectionState::Error, Some(message));
			return;
		}

		if config.offline {
			shared.set_connection(ConnectionState::StreamOffline, None);
			return;
		}

		shared.set_connection(ConnectionState::Streaming, None);
		shared
			.listeners
			.notify(StreamEvent::SizeChanged(Size::new(config.width, config.height)));
	}

	let period = Duration::from_secs_f64(1.0 / config.fps.max(1) as f64);
	let mut interval = tokio::time::interval(period);
	interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

	for index in 0u64.. {
		interval.tick().await;

		let Some(shared) = shared.upgrade() else {
			tracing::debug!("test pattern dropped");
			return;
		};

		if shared.state.lock().unwrap().paused {
			continue;
		}

		let frame = bars(config.width, config.height, index);

		{
			let mut state = shared.state.lock().unwrap();
			let now = Instant::now();
			state.frame = Some(frame);
			state.received.push_back(now);
			while state
				.received
				.front()
				.is_some_and(|at| now.duration_since(*at) >= FPS_WINDOW)
			{
				state.received.pop_front();
			}
		}

		shared.listeners.notify(StreamEvent::FrameReady);
	}
}

/// Render the bars shifted left by `index` columns, in a new buffer.
fn bars(width: u32, height: u32, index: u64) -> FrameBuffer {
	let width = width.max(1);
	let bar_width = (width as usize).div_ceil(BARS.len());

	let mut row = Vec::with_capacity(width as usize * 4);
	for x in 0..width as usize {
		let shifted = (x + index as usize) % width as usize;
		row.extend_from_slice(&BARS[(shifted / bar_width).min(BARS.len() - 1)]);
	}

	let data = Bytes::from(row.repeat(height as usize));

	// The buffer is sized from the same dimensions, so this can't fail.
	FrameBuffer::new(Size::new(width, height), data).unwrap_or_else(|err| unreachable!("{err}"))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config() -> PatternConfig {
		PatternConfig {
			width: 16,
			height: 8,
			fps: 10,
			connect_ms: 100,
			..Default::default()
		}
	}

	#[test]
	fn test_bars_move() {
		let a = bars(16, 2, 0);
		let b = bars(16, 2, 2);

		assert_eq!(a.size(), Size::new(16, 2));
		assert_eq!(&a.row(0)[..4], &BARS[0]);
		assert_eq!(&a.row(1)[60..], &BARS[7]);
		assert_eq!(&b.row(0)[..4], &BARS[1]);
		assert!(!a.is_same(&b));
	}

	#[tokio::test(start_paused = true)]
	async fn test_streams_after_connecting() {
		let pattern = TestPattern::new(config());
		let mut events = pattern.subscribe();

		pattern.start();
		pattern.start();
		assert_eq!(pattern.state(), ConnectionState::Connecting);

		assert_eq!(events.next().await, Some(StreamEvent::StateChanged(ConnectionState::Connecting)));
		assert_eq!(events.next().await, Some(StreamEvent::StateChanged(ConnectionState::Streaming)));
		assert_eq!(events.next().await, Some(StreamEvent::SizeChanged(Size::new(16, 8))));
		assert_eq!(events.next().await, Some(StreamEvent::FrameReady));

		let first = pattern.current_frame().unwrap();
		assert_eq!(first.size(), Size::new(16, 8));

		assert_eq!(events.next().await, Some(StreamEvent::FrameReady));
		assert!(!pattern.current_frame().unwrap().is_same(&first));
	}

	#[tokio::test(start_paused = true)]
	async fn test_received_fps() {
		let pattern = TestPattern::new(config());
		let mut events = pattern.subscribe();
		pattern.start();

		tokio::time::sleep(Duration::from_millis(2550)).await;
		while events.try_next().is_some() {}

		assert_eq!(pattern.received_fps().round(), 10.0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_offline() {
		let config = PatternConfig {
			offline: true,
			..config()
		};
		let pattern = TestPattern::new(config);
		let mut events = pattern.subscribe();
		pattern.start();

		events.next().await;
		assert_eq!(events.next().await, Some(StreamEvent::StateChanged(ConnectionState::StreamOffline)));

		tokio::time::sleep(Duration::from_secs(1)).await;
		assert!(events.try_next().is_none());
		assert!(pattern.current_frame().is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn test_fail() {
		let config = PatternConfig {
			fail: Some("connection refused".to_string()),
			..config()
		};
		let pattern = TestPattern::new(config);
		let mut events = pattern.subscribe();
		pattern.start();

		events.next().await;
		assert_eq!(events.next().await, Some(StreamEvent::StateChanged(ConnectionState::Error)));
		assert_eq!(pattern.error_message().as_deref(), Some("connection refused"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_pause_stops_frames() {
		let pattern = TestPattern::new(config());
		let mut events = pattern.subscribe();
		pattern.start();

		tokio::time::sleep(Duration::from_millis(150)).await;
		while events.try_next().is_some() {}

		pattern.set_paused(true);
		pattern.set_paused(true);
		assert_eq!(events.try_next(), Some(StreamEvent::PausedChanged(true)));

		tokio::time::sleep(Duration::from_secs(1)).await;
		assert!(events.try_next().is_none());

		pattern.set_paused(false);
		assert_eq!(events.next().await, Some(StreamEvent::PausedChanged(false)));
		assert_eq!(events.next().await, Some(StreamEvent::FrameReady));
	}

	#[tokio::test(start_paused = true)]
	async fn test_drop_stops() {
		let pattern = TestPattern::new(config());
		let mut events = pattern.subscribe();
		pattern.start();
		drop(pattern);

		// Dropping the pattern drops its listeners, closing the channel.
		while events.next().await.is_some() {}
		assert!(events.try_next().is_none());
		assert!(events.next().await.is_none());
	}
}
