use std::{sync::Arc, time::Duration};

use liveview::FileSettings;
use notify::{EventKind, RecursiveMode};
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;

/// Re-reads a settings file when it changes on disk or on SIGUSR1.
///
/// Each successful change is announced on a channel, so the render loop
/// can apply it before the next paint.
pub struct SettingsReloader {
	settings: Arc<FileSettings>,
	changed: mpsc::UnboundedSender<()>,
}

impl SettingsReloader {
	pub fn new(settings: Arc<FileSettings>) -> (Self, mpsc::UnboundedReceiver<()>) {
		let (changed, rx) = mpsc::unbounded_channel();
		(Self { settings, changed }, rx)
	}

	pub fn start_background_task(self) {
		tokio::spawn(async move {
			if let Err(err) = self.start_watching().await {
				tracing::warn!(%err, "failed to watch for settings changes");
			}
		});
	}

	async fn start_watching(&self) -> anyhow::Result<()> {
		let (tx, mut rx) = mpsc::channel(1);

		let mut watcher = notify_debouncer_full::new_debouncer(Duration::from_millis(500), None, move |res| {
			let _ = tx.blocking_send(res);
		})?;

		// Editors often replace the file, so watch the directory and filter by name.
		let path = self.settings.path().to_path_buf();
		let dir = match path.parent() {
			Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
			_ => ".".into(),
		};
		watcher.watch(&dir, RecursiveMode::NonRecursive)?;

		#[cfg(unix)]
		let mut sigusr1 = signal(SignalKind::user_defined1())?;

		loop {
			let reload = tokio::select! {
				_ = async {
					#[cfg(unix)]
					{
						sigusr1.recv().await;
					}
					#[cfg(not(unix))]
					{
						std::future::pending::<()>().await;
					}
				} => true,
				res = rx.recv() => {
					match res {
						Some(Ok(events)) => events.iter().any(|event| {
							matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
								&& event.paths.iter().any(|changed| changed.file_name() == path.file_name())
						}),
						Some(Err(errors)) => {
							for err in errors {
								tracing::warn!(%err, "watcher error");
							}
							false
						}
						None => return Ok(()),
					}
				}
			};

			if !reload {
				continue;
			}

			match self.settings.reload() {
				Ok(true) => {
					if self.changed.send(()).is_err() {
						return Ok(());
					}
				}
				Ok(false) => tracing::debug!("settings unchanged"),
				Err(err) => tracing::warn!(%err, "keeping previous settings"),
			}
		}
	}
}
