use std::sync::Arc;

use tauri::State;

use crate::ipc::AppState;

/// Current user name as held by the dashboard.
#[tauri::command]
pub fn get_user_name(state: State<'_, AppState>) -> String {
    state.session.user_name()
}

/// Set the user name and notify the host in the background.
#[tauri::command]
pub fn set_user_name(state: State<'_, AppState>, user_name: String) {
    state.session.set_user_name(user_name);
}

/// Sign-out path: empty the user name and notify the host.
#[tauri::command]
pub fn clear_user_name(state: State<'_, AppState>) {
    state.session.clear_user_name();
}

/// Re-read the user name from the host and adopt it locally, without
/// echoing it back.
///
/// The host round-trip blocks, so it runs on the blocking pool.
#[tauri::command]
pub async fn refresh_user_name(state: State<'_, AppState>) -> Result<String, String> {
    let session = Arc::clone(&state.session);
    let name = tauri::async_runtime::spawn_blocking(move || session.refresh())
        .await
        .map_err(|e| format!("User name refresh did not complete: {}", e))?
        .map_err(|e| format!("Failed to read user name: {}", e))?;
    tracing::info!("User name refreshed from host");
    Ok(name)
}
