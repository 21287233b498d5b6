//! # liveview: live video on a monitoring surface
//!
//! `liveview` takes decoded frames from a live stream and puts them on screen.
//! It does not decode, connect or persist anything; those are the job of the
//! [StreamProducer] and the host application.
//!
//! ## API
//!
//! The host owns a [LiveView] and a [Surface]:
//! - [LiveView::set_stream] binds a [StreamHandle], subscribing to its notifications.
//! - [LiveView::subscribe] returns a channel of [ViewEvent]s (connected, paused, status text, frame size).
//! - [LiveView::paint] draws the current frame into a rectangle of the [Surface].
//! - [LiveView::reload_settings] applies a changed [RenderConfig].
//!
//! Each paint picks one of two paths:
//! - **Accelerated**: the frame lives in a GPU texture owned by a [TextureCache],
//!   re-uploaded only when the producer hands over a different buffer.
//! - **Fallback**: the frame is composited straight onto the surface with [Composition::Replace].
//!
//! A [Canvas] provides a CPU surface, and the `render` feature adds a wgpu surface.

mod error;
mod frame;
mod settings;
mod software;
mod state;
mod stream;
mod surface;
mod texture;
mod view;

#[cfg(feature = "render")]
pub mod render;

#[cfg(test)]
mod test;

pub use error::*;
pub use frame::*;
pub use settings::*;
pub use software::*;
pub use state::*;
pub use stream::*;
pub use surface::*;
pub use texture::*;
pub use view::*;
