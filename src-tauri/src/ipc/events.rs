//! Event names used for Tauri IPC communication.
//! Backend -> Frontend events.

/// The current user name changed.
/// Payload: UserNamePayload { userName }
pub const USER_NAME_CHANGED: &str = "user-name-changed";

/// Update progress changed.
/// Payload: ProgressSnapshot { isDownloading, downloadPercent }
pub const UPDATE_PROGRESS: &str = "update-progress";

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNamePayload {
    pub user_name: String,
}
