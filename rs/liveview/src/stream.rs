use std::sync::{Arc, Mutex, Weak};

use slab::Slab;
use tokio::sync::mpsc;

use crate::{ConnectionState, FrameBuffer, Size};

/// A shared reference to a live stream.
///
/// The view holds at most one at a time; the rest of the application may hold more.
pub type StreamHandle = Arc<dyn StreamProducer>;

/// A notification from a [StreamProducer].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
	/// A new frame is available via [StreamProducer::current_frame].
	FrameReady,

	/// The dimensions of future frames changed.
	SizeChanged(Size),

	StateChanged(ConnectionState),

	PausedChanged(bool),
}

/// The source of decoded frames and connection state.
///
/// Decoding, networking and buffering all happen behind this trait, possibly on other threads.
/// Notifications are delivered through a [Subscriber] and applied later on the render thread.
pub trait StreamProducer: Send + Sync {
	/// Begin producing frames. Called each time a view binds to the stream.
	fn start(&self);

	fn is_paused(&self) -> bool;

	fn set_paused(&self, paused: bool);

	fn state(&self) -> ConnectionState;

	/// The rate at which frames are currently arriving.
	fn received_fps(&self) -> f64;

	/// The latest decoded frame, valid until the next [StreamEvent::FrameReady].
	fn current_frame(&self) -> Option<FrameBuffer>;

	/// The reason for [ConnectionState::Error], if any.
	fn error_message(&self) -> Option<String>;

	/// Register for notifications until the returned [Subscriber] is dropped.
	fn subscribe(&self) -> Subscriber;
}

type Senders = Mutex<Slab<mpsc::UnboundedSender<StreamEvent>>>;

/// A registry of subscribers for implementing [StreamProducer::subscribe].
#[derive(Clone, Default)]
pub struct Listeners {
	senders: Arc<Senders>,
}

impl Listeners {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&self) -> Subscriber {
		let (tx, rx) = mpsc::unbounded_channel();
		let id = self.senders.lock().unwrap().insert(tx);

		Subscriber {
			events: rx,
			_registration: Registration {
				id,
				senders: Arc::downgrade(&self.senders),
			},
		}
	}

	/// Deliver an event to every live subscriber.
	pub fn notify(&self, event: StreamEvent) {
		let senders = self.senders.lock().unwrap();
		for (_, tx) in senders.iter() {
			// The receiver is only dropped alongside its registration.
			let _ = tx.send(event);
		}
	}

	pub fn len(&self) -> usize {
		self.senders.lock().unwrap().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

struct Registration {
	id: usize,
	senders: Weak<Senders>,
}

impl Drop for Registration {
	fn drop(&mut self) {
		if let Some(senders) = self.senders.upgrade() {
			senders.lock().unwrap().try_remove(self.id);
		}
	}
}

/// The receiving end of a stream subscription.
///
/// Dropping it unsubscribes; events still queued are discarded with it.
pub struct Subscriber {
	events: mpsc::UnboundedReceiver<StreamEvent>,
	// Removes the sender from the registry when dropped.
	_registration: Registration,
}

impl Subscriber {
	/// Return a queued event without waiting.
	pub fn try_next(&mut self) -> Option<StreamEvent> {
		self.events.try_recv().ok()
	}

	/// Wait for the next event, returning None if the producer is gone.
	pub async fn next(&mut self) -> Option<StreamEvent> {
		self.events.recv().await
	}
}
