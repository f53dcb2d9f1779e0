use tauri::State;

use crate::ipc::AppState;
use crate::update::ProgressSnapshot;

/// Kick off a host update check. Progress arrives as `update-progress`
/// events; failures are only logged.
#[tauri::command]
pub fn check_for_update(state: State<'_, AppState>, manually: bool) {
    let _ = state.updater.check_for_update(manually);
}

/// Current update progress, for views mounted after events were emitted.
#[tauri::command]
pub fn get_update_progress(state: State<'_, AppState>) -> ProgressSnapshot {
    state.progress.snapshot()
}
