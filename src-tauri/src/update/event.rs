use serde::{Deserialize, Serialize};

/// Update-progress event pushed by the host over an [`EventChannel`].
///
/// Wire shape: `{ "event": "started" | "progress" | "finished", "data": { .. } }`.
///
/// [`EventChannel`]: super::channel::EventChannel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum DownloadEvent {
    #[serde(rename_all = "camelCase")]
    Started { new_version: bool },
    #[serde(rename_all = "camelCase")]
    Progress { downloaded: u64, content_length: u64 },
    #[serde(rename_all = "camelCase")]
    Finished { finished: bool },
}

impl DownloadEvent {
    /// Decode an event from an untrusted host payload.
    pub fn decode(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, DownloadEvent::Finished { .. })
    }
}
