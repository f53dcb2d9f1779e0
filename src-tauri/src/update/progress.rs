use std::sync::Arc;

use serde::Serialize;

use super::event::DownloadEvent;
use crate::reactive::Observable;

/// Snapshot of the update progress sent to the web view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub is_downloading: bool,
    pub download_percent: f64,
}

/// Observable update-progress state, mutated only by [`ProgressState::apply`].
#[derive(Debug, Clone, Default)]
pub struct ProgressState {
    is_downloading: Observable<bool>,
    download_percent: Observable<f64>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_downloading(&self) -> bool {
        self.is_downloading.get()
    }

    #[cfg(test)]
    pub fn download_percent(&self) -> f64 {
        self.download_percent.get()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            is_downloading: self.is_downloading.get(),
            download_percent: self.download_percent.get(),
        }
    }

    /// Call `f` with a fresh snapshot whenever either cell changes.
    pub fn on_change<F>(&self, f: F)
    where
        F: Fn(ProgressSnapshot) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let state = self.clone();
        let notify = Arc::clone(&f);
        self.is_downloading.subscribe(move |_| notify(state.snapshot()));
        let state = self.clone();
        self.download_percent.subscribe(move |_| f(state.snapshot()));
    }

    /// Project one channel event onto the state.
    pub fn apply(&self, event: &DownloadEvent) {
        match *event {
            // NOTE: `newVersion` means "an update exists", not "a download
            // started". The host contract maps one onto the other; kept as is.
            DownloadEvent::Started { new_version } => {
                self.is_downloading.set(new_version);
            }
            DownloadEvent::Progress {
                downloaded,
                content_length,
            } => match percent(downloaded, content_length) {
                Some(value) => {
                    self.download_percent.set(value);
                }
                None => {
                    tracing::warn!(
                        downloaded,
                        content_length,
                        "Ignoring progress event with zero content length"
                    );
                }
            },
            DownloadEvent::Finished { finished } => {
                tracing::debug!(finished, "Update download finished");
            }
        }
    }
}

/// Completion percentage rounded to two decimals, or `None` when the total
/// is unknown.
pub fn percent(downloaded: u64, content_length: u64) -> Option<f64> {
    if content_length == 0 {
        return None;
    }
    let value = round2(downloaded as f64 / content_length as f64 * 100.0);
    value.is_finite().then_some(value)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
