use std::sync::Arc;
use std::thread::JoinHandle;

use super::channel::EventChannel;
use super::event::DownloadEvent;
use super::progress::ProgressState;
use crate::host::Host;

/// Starts host update checks and feeds their progress into [`ProgressState`].
pub struct UpdateTrigger {
    host: Arc<dyn Host>,
    progress: ProgressState,
}

impl UpdateTrigger {
    pub fn new(host: Arc<dyn Host>, progress: ProgressState) -> Self {
        Self { host, progress }
    }

    /// Ask the host to check for updates on a background thread.
    ///
    /// Each call gets a fresh channel. Failures are logged and never reach
    /// the caller. Events may arrive before or after the returned thread
    /// finishes; joining it is optional.
    pub fn check_for_update(&self, manually: bool) -> Option<JoinHandle<()>> {
        let channel = EventChannel::<DownloadEvent>::new();
        let progress = self.progress.clone();
        channel.on_message(move |event| progress.apply(&event));

        let host = Arc::clone(&self.host);
        let spawned = std::thread::Builder::new()
            .name("update-check".to_string())
            .spawn(move || {
                let channel_id = channel.id();
                tracing::info!(manually, channel = channel_id, "Checking for updates");
                if let Err(e) = host.manually_check_update(manually, channel) {
                    tracing::error!("Update check failed: {}", e);
                }
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Failed to spawn update check thread: {}", e);
                None
            }
        }
    }
}
