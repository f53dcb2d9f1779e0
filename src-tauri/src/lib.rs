mod config;
mod host;
mod ipc;
mod reactive;
mod session;
mod update;

use std::sync::Arc;
use std::time::Duration;

use config::DashboardConfig;
use host::{Host, ProcessHost, UnavailableHost};
use ipc::events::{UserNamePayload, UPDATE_PROGRESS, USER_NAME_CHANGED};
use ipc::AppState;
use tauri::{Emitter, Manager};

/// How long exit waits for queued host notifications.
const EXIT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Start the host process, or fall back to a host that fails every call so
/// the dashboard still opens.
fn connect_host(config: &DashboardConfig) -> Arc<dyn Host> {
    match ProcessHost::spawn(&config.host) {
        Ok(host) => Arc::new(host),
        Err(e) => {
            tracing::error!("Host unavailable, running detached: {}", e);
            Arc::new(UnavailableHost::new(e.to_string()))
        }
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let config = DashboardConfig::load();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .init();

    tracing::info!("Starting Dashboard {}", env!("CARGO_PKG_VERSION"));

    let host = connect_host(&config);
    let state = match AppState::new(host) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to start host notifier: {}", e);
            return;
        }
    };
    // The first render must already see the host's user name.
    state.session.initialize();

    let check_on_startup = config.update.check_on_startup;

    let app = tauri::Builder::default()
        .manage(state)
        .invoke_handler(tauri::generate_handler![
            ipc::commands::session::get_user_name,
            ipc::commands::session::set_user_name,
            ipc::commands::session::clear_user_name,
            ipc::commands::session::refresh_user_name,
            ipc::commands::update::check_for_update,
            ipc::commands::update::get_update_progress,
            ipc::commands::app::get_app_version,
        ])
        .setup(move |app| {
            let state = app.state::<AppState>();

            let handle = app.handle().clone();
            state.session.on_change(move |user_name| {
                let payload = UserNamePayload {
                    user_name: user_name.clone(),
                };
                if let Err(e) = handle.emit(USER_NAME_CHANGED, &payload) {
                    tracing::warn!("Failed to emit {}: {}", USER_NAME_CHANGED, e);
                }
            });

            let handle = app.handle().clone();
            state.progress.on_change(move |snapshot| {
                if let Err(e) = handle.emit(UPDATE_PROGRESS, &snapshot) {
                    tracing::warn!("Failed to emit {}: {}", UPDATE_PROGRESS, e);
                }
            });

            if check_on_startup {
                let _ = state.updater.check_for_update(false);
            }

            tracing::info!("Dashboard setup complete");
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("Failed to build Dashboard");

    app.run(|app, event| {
        if let tauri::RunEvent::Exit = event {
            // Deliver queued host notifications before the process goes away.
            app.state::<AppState>().session.flush(EXIT_FLUSH_TIMEOUT);
            tracing::info!("Dashboard exiting");
        }
    });
}
