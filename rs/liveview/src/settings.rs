use std::{
	path::{Path, PathBuf},
	sync::{Arc, RwLock},
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The settings that affect rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
	/// Draw through a cached GPU texture when the surface supports it.
	pub acceleration: bool,
}

impl Default for RenderConfig {
	fn default() -> Self {
		Self { acceleration: true }
	}
}

/// A source of [RenderConfig], read when a view is created and on each [crate::LiveView::reload_settings].
pub trait Settings: Send + Sync {
	fn render_config(&self) -> RenderConfig;
}

/// Fixed settings.
impl Settings for RenderConfig {
	fn render_config(&self) -> RenderConfig {
		*self
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
	liveview: RenderConfig,
}

/// Settings loaded from a TOML file:
///
/// ```toml
/// [liveview]
/// acceleration = false
/// ```
#[derive(Debug)]
pub struct FileSettings {
	path: PathBuf,
	current: RwLock<RenderConfig>,
}

impl FileSettings {
	pub fn load(path: impl Into<PathBuf>) -> Result<Arc<Self>> {
		let path = path.into();
		let config = Self::read(&path)?;
		tracing::debug!(path = %path.display(), ?config, "loaded settings");

		Ok(Arc::new(Self {
			path,
			current: RwLock::new(config),
		}))
	}

	/// Re-read the file, returning true if anything changed.
	///
	/// On error the previous settings are kept.
	pub fn reload(&self) -> Result<bool> {
		let config = Self::read(&self.path)?;

		let mut current = self.current.write().unwrap();
		if *current == config {
			return Ok(false);
		}

		tracing::info!(path = %self.path.display(), ?config, "settings changed");
		*current = config;
		Ok(true)
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read(path: &Path) -> Result<RenderConfig> {
		let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
			path: path.to_path_buf(),
			source: Arc::new(source),
		})?;

		let file: SettingsFile = toml::from_str(&contents).map_err(|source| Error::Config {
			path: path.to_path_buf(),
			source: Arc::new(source),
		})?;

		Ok(file.liveview)
	}
}

impl Settings for FileSettings {
	fn render_config(&self) -> RenderConfig {
		*self.current.read().unwrap()
	}
}
