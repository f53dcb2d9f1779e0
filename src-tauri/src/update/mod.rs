pub mod channel;
pub mod event;
pub mod progress;
pub mod trigger;

pub use channel::EventChannel;
pub use event::DownloadEvent;
pub use progress::{ProgressSnapshot, ProgressState};
pub use trigger::UpdateTrigger;
