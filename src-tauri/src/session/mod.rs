pub mod notifier;

use std::sync::Arc;
use std::time::Duration;

use crate::host::{Host, HostError};
use crate::reactive::Observable;

pub use notifier::{HostCommand, Notifier};

/// Observable current user name, mirrored to the host on every change.
///
/// Local state is authoritative once initialized; the host is only read
/// at initialization or on an explicit refresh.
pub struct UserSessionStore {
    user_name: Observable<String>,
    host: Arc<dyn Host>,
    notifier: Notifier,
}

impl UserSessionStore {
    pub fn new(host: Arc<dyn Host>) -> std::io::Result<Self> {
        let notifier = Notifier::spawn(Arc::clone(&host))?;
        Ok(Self {
            user_name: Observable::default(),
            host,
            notifier,
        })
    }

    /// Query the host for the currently authenticated name.
    pub fn get_current_user_name(&self) -> Result<String, HostError> {
        self.host.get_current_user_name()
    }

    /// Adopt the host's value without echoing it back. A failed read keeps
    /// the empty default.
    pub fn initialize(&self) {
        match self.host.get_current_user_name() {
            Ok(name) => {
                tracing::info!("Initial user name loaded from host");
                self.adopt(name);
            }
            Err(e) => {
                tracing::warn!("Failed to read user name from host: {}", e);
            }
        }
    }

    /// Re-read the host's value and adopt it. Nothing is sent back.
    pub fn refresh(&self) -> Result<String, HostError> {
        let name = self.host.get_current_user_name()?;
        self.adopt(name.clone());
        Ok(name)
    }

    /// Replace the local value with one that came from the host.
    fn adopt(&self, name: String) {
        self.user_name.set(name);
    }

    pub fn user_name(&self) -> String {
        self.user_name.get()
    }

    pub fn set_user_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.user_name.set(name.clone());
        self.notifier.send(HostCommand::SetUserName(name));
    }

    pub fn clear_user_name(&self) {
        self.set_user_name(String::new());
    }

    pub fn on_change<F>(&self, f: F)
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.user_name.subscribe(f);
    }

    /// Wait up to `timeout` for queued host notifications to be delivered.
    pub fn flush(&self, timeout: Duration) -> bool {
        self.notifier.flush(timeout)
    }
}
