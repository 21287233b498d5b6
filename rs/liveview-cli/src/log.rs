use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(clap::Args, Clone, Debug)]
pub struct Log {
	/// The level of logging, overridden by RUST_LOG.
	#[arg(id = "log-level", long = "log-level", env = "LIVEVIEW_LOG_LEVEL", default_value = "info")]
	pub level: tracing::Level,
}

impl Default for Log {
	fn default() -> Self {
		Self {
			level: tracing::Level::INFO,
		}
	}
}

impl Log {
	pub fn init(&self) {
		let filter = EnvFilter::builder()
			.with_default_directive(LevelFilter::from_level(self.level).into())
			.from_env_lossy();

		tracing_subscriber::registry()
			.with(fmt::layer().with_writer(std::io::stderr))
			.with(filter)
			.init();
	}
}
