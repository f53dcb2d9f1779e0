pub mod error;
pub mod process;
pub mod wire;

pub use error::HostError;
pub use process::ProcessHost;

use crate::update::{DownloadEvent, EventChannel};

/// Host call names. These are the wire contract.
pub const GET_CURRENT_USER_NAME: &str = "get_current_user_name";
pub const SET_CURRENT_USER_NAME: &str = "set_current_user_name";
pub const MANUALLY_CHECK_UPDATE: &str = "manually_check_update";

/// Privileged operations provided by the native host process.
pub trait Host: Send + Sync {
    fn get_current_user_name(&self) -> error::Result<String>;

    fn set_current_user_name(&self, user_name: &str) -> error::Result<()>;

    /// Ask the host to check for updates. Progress is pushed over `on_event`
    /// until the host answers; the channel is closed once this returns.
    fn manually_check_update(
        &self,
        manually: bool,
        on_event: EventChannel<DownloadEvent>,
    ) -> error::Result<()>;
}

/// Stand-in used when the host process could not be started.
pub struct UnavailableHost {
    reason: String,
}

impl UnavailableHost {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Host for UnavailableHost {
    fn get_current_user_name(&self) -> error::Result<String> {
        Err(HostError::Unavailable(self.reason.clone()))
    }

    fn set_current_user_name(&self, _user_name: &str) -> error::Result<()> {
        Err(HostError::Unavailable(self.reason.clone()))
    }

    fn manually_check_update(
        &self,
        _manually: bool,
        _on_event: EventChannel<DownloadEvent>,
    ) -> error::Result<()> {
        Err(HostError::Unavailable(self.reason.clone()))
    }
}
