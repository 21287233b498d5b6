mod log;
mod pattern;
mod reload;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use liveview::{
	Canvas, ConnectionState, FileSettings, LiveView, RenderConfig, Settings, StreamHandle, StreamProducer, Unaccelerated,
	ViewEvent,
};
use tokio::sync::mpsc;

use pattern::{PatternConfig, TestPattern};
use reload::SettingsReloader;

#[derive(Parser, Clone)]
pub struct Cli {
	/// The test pattern to display.
	#[command(flatten)]
	pattern: PatternConfig,

	/// A TOML file with render settings, reloaded when it changes or on SIGUSR1.
	#[arg(long, env = "LIVEVIEW_SETTINGS")]
	settings: Option<PathBuf>,

	/// Stop after painting this many frames.
	#[arg(long, default_value_t = 90)]
	frames: u64,

	/// Write the final canvas to this PNG.
	#[arg(long, default_value = "liveview.png")]
	output: PathBuf,

	#[command(flatten)]
	log: log::Log,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	cli.log.init();

	let (settings, mut reloads) = match &cli.settings {
		Some(path) => {
			let settings = FileSettings::load(path).context("failed to load settings")?;
			let (reloader, reloads) = SettingsReloader::new(settings.clone());
			reloader.start_background_task();
			(settings as Arc<dyn Settings>, Some(reloads))
		}
		None => (Arc::new(RenderConfig::default()) as Arc<dyn Settings>, None),
	};

	let mut canvas = Canvas::new(cli.pattern.width, cli.pattern.height);
	let bounds = canvas.bounds();
	let mut view = LiveView::<Unaccelerated>::new(settings);
	let mut events = view.subscribe();

	let pattern = TestPattern::new(cli.pattern.clone());
	view.set_stream(Some(pattern.clone() as StreamHandle));

	let mut painted = 0;

	while painted < cli.frames {
		tokio::select! {
			woke = wake(&mut view, &mut reloads) => match woke {
				Wake::Reload => view.reload_settings(),
				Wake::Stream(alive) => if !alive {
					break;
				},
			},
			res = tokio::signal::ctrl_c() => {
				res.context("failed to listen for ctrl-c")?;
				break;
			}
		}

		while let Ok(event) = events.try_recv() {
			match event {
				ViewEvent::Update => {
					view.paint(&mut canvas, bounds);
					if view.stream().is_some_and(|stream| stream.current_frame().is_some()) {
						painted += 1;
					}
				}
				ViewEvent::ErrorTextChanged(status) if status.is_error() => {
					tracing::warn!(%status, detail = ?view.error_message(), "stream status")
				}
				ViewEvent::ErrorTextChanged(status) => tracing::info!(%status, "stream status"),
				ViewEvent::ConnectedChanged(connected) => tracing::info!(connected, "connection changed"),
				ViewEvent::FrameSizeChanged(size) => tracing::info!(%size, "frame size changed"),
				ViewEvent::PausedChanged(paused) => tracing::info!(paused, "paused changed"),
			}
		}

		// Nothing more is coming from a stream that can't connect.
		if matches!(pattern.state(), ConnectionState::Error | ConnectionState::StreamOffline) {
			view.paint(&mut canvas, bounds);
			break;
		}
	}

	tracing::info!(painted, fps = view.fps(), "finished");

	canvas
		.image()
		.save(&cli.output)
		.with_context(|| format!("failed to write {}", cli.output.display()))?;
	tracing::info!(output = %cli.output.display(), "wrote canvas");

	view.clear();

	Ok(())
}

/// What woke the render loop.
#[derive(Debug, PartialEq)]
enum Wake {
	Reload,
	/// Stream events were applied; false once the stream is gone.
	Stream(bool),
}

// A settings change wins over stream events, so the next paint already uses it.
async fn wake(view: &mut LiveView<Unaccelerated>, reloads: &mut Option<mpsc::UnboundedReceiver<()>>) -> Wake {
	tokio::select! {
		biased;
		Some(()) = changed(reloads) => Wake::Reload,
		alive = view.wait() => Wake::Stream(alive),
	}
}

async fn changed(reloads: &mut Option<mpsc::UnboundedReceiver<()>>) -> Option<()> {
	match reloads {
		Some(reloads) => reloads.recv().await,
		None => std::future::pending().await,
	}
}
