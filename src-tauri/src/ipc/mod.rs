pub mod commands;
pub mod events;

use std::sync::Arc;

use crate::host::Host;
use crate::session::UserSessionStore;
use crate::update::{ProgressState, UpdateTrigger};

/// Application-wide state managed by Tauri.
pub struct AppState {
    pub session: Arc<UserSessionStore>,
    pub progress: ProgressState,
    pub updater: UpdateTrigger,
}

impl AppState {
    pub fn new(host: Arc<dyn Host>) -> std::io::Result<Self> {
        let progress = ProgressState::new();
        Ok(Self {
            session: Arc::new(UserSessionStore::new(Arc::clone(&host))?),
            updater: UpdateTrigger::new(host, progress.clone()),
            progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RecordingHost;
    use crate::update::DownloadEvent;

    #[test]
    fn state_wires_updater_to_shared_progress() {
        let host = Arc::new(RecordingHost::with_script(vec![DownloadEvent::Started {
            new_version: true,
        }]));
        let state = AppState::new(host.clone()).expect("state should build");

        if let Some(handle) = state.updater.check_for_update(true) {
            handle.join().expect("update check thread");
        }
        assert!(state.progress.snapshot().is_downloading);
        assert_eq!(host.check_calls(), vec![true]);
    }

    #[test]
    fn refresh_through_shared_session_from_another_thread() {
        let host = Arc::new(RecordingHost::new("heidi"));
        let state = AppState::new(host.clone()).expect("state should build");

        let session = Arc::clone(&state.session);
        let name = std::thread::spawn(move || session.refresh())
            .join()
            .expect("refresh thread")
            .expect("refresh");
        assert_eq!(name, "heidi");
        assert_eq!(state.session.user_name(), "heidi");
        assert!(host.set_calls().is_empty());
    }
}
