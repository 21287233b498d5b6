use std::{
	cmp::Ordering,
	fmt,
	hash::{Hash, Hasher},
};

use num_enum::FromPrimitive;

/// The connection state reported by a [crate::StreamProducer].
///
/// The discriminants are part of the producer contract and are compared as ordinals.
/// Only the [Streaming](Self::Streaming) threshold is load-bearing: anything at or above it is connected.
/// Equality, ordering and hashing all go by ordinal, so `Other(2)` is `Streaming`.
#[derive(Debug, Clone, Copy, FromPrimitive)]
#[repr(i8)]
pub enum ConnectionState {
	Error = -2,
	StreamOffline = -1,
	NotConnected = 0,
	Connecting = 1,
	Streaming = 2,

	/// A value this crate doesn't know about, kept so it still orders correctly.
	#[num_enum(catch_all)]
	Other(i8),
}

impl ConnectionState {
	pub fn ordinal(&self) -> i8 {
		match self {
			Self::Error => -2,
			Self::StreamOffline => -1,
			Self::NotConnected => 0,
			Self::Connecting => 1,
			Self::Streaming => 2,
			Self::Other(ordinal) => *ordinal,
		}
	}

	pub fn is_connected(&self) -> bool {
		*self >= Self::Streaming
	}
}

impl Default for ConnectionState {
	fn default() -> Self {
		Self::NotConnected
	}
}

impl PartialEq for ConnectionState {
	fn eq(&self, other: &Self) -> bool {
		self.ordinal() == other.ordinal()
	}
}

impl Eq for ConnectionState {}

impl Hash for ConnectionState {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.ordinal().hash(state);
	}
}

impl PartialOrd for ConnectionState {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for ConnectionState {
	fn cmp(&self, other: &Self) -> Ordering {
		self.ordinal().cmp(&other.ordinal())
	}
}

/// How the host should style a [StatusText].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextStyle {
	#[default]
	Plain,
	Error,
}

/// The text overlaid on the video, empty when the stream is playing normally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusText {
	text: &'static str,
	style: TextStyle,
}

impl StatusText {
	pub const NONE: Self = Self::plain("");
	pub const NO_VIDEO: Self = Self::plain("No Video");
	pub const ERROR: Self = Self {
		text: "Error",
		style: TextStyle::Error,
	};
	pub const OFFLINE: Self = Self::plain("Offline");
	pub const DISCONNECTED: Self = Self::plain("Disconnected");
	pub const CONNECTING: Self = Self::plain("Connecting...");

	const fn plain(text: &'static str) -> Self {
		Self {
			text,
			style: TextStyle::Plain,
		}
	}

	pub fn as_str(&self) -> &'static str {
		self.text
	}

	pub fn style(&self) -> TextStyle {
		self.style
	}

	pub fn is_error(&self) -> bool {
		self.style == TextStyle::Error
	}

	/// No overlay should be shown.
	pub fn is_empty(&self) -> bool {
		self.text.is_empty()
	}
}

impl From<ConnectionState> for StatusText {
	fn from(state: ConnectionState) -> Self {
		match ConnectionState::from(state.ordinal()) {
			// The producer's error message is diagnostic only; see LiveView::error_message.
			ConnectionState::Error => Self::ERROR,
			ConnectionState::StreamOffline => Self::OFFLINE,
			ConnectionState::NotConnected => Self::DISCONNECTED,
			ConnectionState::Connecting => Self::CONNECTING,
			ConnectionState::Streaming | ConnectionState::Other(_) => Self::NONE,
		}
	}
}

impl fmt::Display for StatusText {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.text)
	}
}
