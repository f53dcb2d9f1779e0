use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Sender};

use crate::host::Host;

/// One-way commands for the host. Nobody waits on their outcome.
#[derive(Debug)]
pub enum HostCommand {
    SetUserName(String),
    /// Acknowledged once every command queued before it has been handled.
    Flush(Sender<()>),
}

/// Ordered, fire-and-forget command queue drained by a worker thread.
///
/// Host failures are logged here and go nowhere else.
pub struct Notifier {
    tx: Option<Sender<HostCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl Notifier {
    pub fn spawn(host: Arc<dyn Host>) -> std::io::Result<Self> {
        let (tx, rx) = unbounded::<HostCommand>();
        let worker = std::thread::Builder::new()
            .name("host-notifier".to_string())
            .spawn(move || {
                for command in rx {
                    match command {
                        HostCommand::SetUserName(user_name) => {
                            if let Err(e) = host.set_current_user_name(&user_name) {
                                tracing::error!("Failed to notify host of user name change: {}", e);
                            }
                        }
                        HostCommand::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
                tracing::debug!("Host notifier stopped");
            })?;

        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    pub fn send(&self, command: HostCommand) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(command).is_err() {
            tracing::warn!("Host notifier is gone; command dropped");
        }
    }

    /// Block until everything queued so far has reached the host, or until
    /// `timeout` passes. Returns whether the queue was drained in time.
    pub fn flush(&self, timeout: Duration) -> bool {
        let (ack_tx, ack_rx) = bounded(1);
        self.send(HostCommand::Flush(ack_tx));
        match ack_rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("Host notifications still pending after {:?}", timeout);
                false
            }
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        // Closing the queue lets the worker drain what is left and exit.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Host notifier thread panicked");
            }
        }
    }
}
