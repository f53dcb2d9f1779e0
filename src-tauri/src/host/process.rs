use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::error::{HostError, Result};
use super::wire::{self, CheckUpdateArgs, Inbound, SetUserNameArgs};
use super::{Host, GET_CURRENT_USER_NAME, MANUALLY_CHECK_UPDATE, SET_CURRENT_USER_NAME};
use crate::config::HostConfig;
use crate::update::{DownloadEvent, EventChannel};

type Reply = Result<Value>;

struct PendingCalls {
    connected: bool,
    calls: HashMap<u64, (&'static str, Sender<Reply>)>,
}

/// Routes host output to waiting callers and open channels.
struct Router {
    pending: Mutex<PendingCalls>,
    channels: Mutex<HashMap<u32, EventChannel<DownloadEvent>>>,
}

impl Router {
    fn new() -> Self {
        Self {
            pending: Mutex::new(PendingCalls {
                connected: true,
                calls: HashMap::new(),
            }),
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn register_call(&self, id: u64, call: &'static str, tx: Sender<Reply>) -> Result<()> {
        let mut pending = self.pending.lock();
        if !pending.connected {
            return Err(HostError::Disconnected);
        }
        pending.calls.insert(id, (call, tx));
        Ok(())
    }

    fn forget_call(&self, id: u64) {
        self.pending.lock().calls.remove(&id);
    }

    fn dispatch(&self, line: &str) {
        let inbound = match wire::decode_inbound(line) {
            Ok(inbound) => inbound,
            Err(e) => {
                // A broken reply still owes its caller an answer.
                let waiting = wire::peek_id(line)
                    .and_then(|id| self.pending.lock().calls.remove(&id));
                match waiting {
                    Some((call, tx)) => {
                        tracing::warn!("Malformed reply to `{}`: {}", call, e);
                        let _ = tx.send(Err(HostError::Json(e)));
                    }
                    None => {
                        tracing::warn!("Dropping malformed host line: {} ({:?})", e, line);
                    }
                }
                return;
            }
        };

        match inbound {
            Inbound::Response { id, result, error } => {
                let Some((call, tx)) = self.pending.lock().calls.remove(&id) else {
                    tracing::warn!("Host replied to unknown request {}", id);
                    return;
                };
                let reply = match error {
                    Some(message) => Err(HostError::remote(call, message)),
                    None => Ok(result),
                };
                let _ = tx.send(reply);
            }
            Inbound::Channel { channel, message } => {
                let event = match DownloadEvent::decode(message) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(channel, "Dropping malformed channel message: {}", e);
                        return;
                    }
                };
                let target = {
                    let mut channels = self.channels.lock();
                    if event.is_finished() {
                        channels.remove(&channel)
                    } else {
                        channels.get(&channel).cloned()
                    }
                };
                match target {
                    Some(target) => target.send(event),
                    None => tracing::warn!(channel, "Message for unknown channel dropped"),
                }
            }
        }
    }

    /// Fail every waiting call and close every channel.
    fn disconnect(&self) {
        let mut pending = self.pending.lock();
        pending.connected = false;
        pending.calls.clear();
        drop(pending);
        self.channels.lock().clear();
    }
}

/// Host backed by a child process speaking line-delimited JSON on stdio.
pub struct ProcessHost {
    command: String,
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    next_id: AtomicU64,
    request_timeout: Duration,
    router: Arc<Router>,
}

impl ProcessHost {
    /// Spawn the host process and its reader threads.
    pub fn spawn(config: &HostConfig) -> Result<Self> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| HostError::Spawn {
                command: config.command.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HostError::Unavailable("host stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HostError::Unavailable("host stdout not captured".to_string()))?;
        let stderr = child.stderr.take();

        let router = Arc::new(Router::new());
        let reader_router = Arc::clone(&router);
        let reader_command = config.command.clone();

        std::thread::Builder::new()
            .name("host-reader".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    match line {
                        Ok(line) if line.trim().is_empty() => {}
                        Ok(line) => reader_router.dispatch(&line),
                        Err(e) => {
                            tracing::error!("Host read error: {}", e);
                            break;
                        }
                    }
                }
                tracing::info!("Host `{}` closed its output", reader_command);
                reader_router.disconnect();
            })?;

        if let Some(stderr) = stderr {
            let stderr_command = config.command.clone();
            std::thread::Builder::new()
                .name("host-stderr".to_string())
                .spawn(move || {
                    for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                        tracing::debug!(host = %stderr_command, "{}", line);
                    }
                })?;
        }

        tracing::info!("Spawned host `{}` (pid {})", config.command, child.id());

        Ok(Self {
            command: config.command.clone(),
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            next_id: AtomicU64::new(1),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            router,
        })
    }

    /// Send one request and wait for its reply, at most `timeout` if given.
    fn call(&self, cmd: &'static str, args: Value, timeout: Option<Duration>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = bounded(1);
        self.router.register_call(id, cmd, tx)?;

        let line = match wire::encode_request(id, cmd, args) {
            Ok(line) => line,
            Err(e) => {
                self.router.forget_call(id);
                return Err(e.into());
            }
        };
        let written = {
            let mut stdin = self.stdin.lock();
            stdin
                .write_all(line.as_bytes())
                .and_then(|_| stdin.flush())
        };
        if let Err(e) = written {
            self.router.forget_call(id);
            return Err(e.into());
        }

        tracing::debug!(id, cmd, "Host request sent");
        match timeout {
            Some(limit) => match rx.recv_timeout(limit) {
                Ok(reply) => reply,
                Err(RecvTimeoutError::Timeout) => {
                    self.router.forget_call(id);
                    Err(HostError::Timeout {
                        call: cmd.to_string(),
                        after: limit,
                    })
                }
                Err(RecvTimeoutError::Disconnected) => Err(HostError::Disconnected),
            },
            None => rx.recv().map_err(|_| HostError::Disconnected)?,
        }
    }

    #[cfg(test)]
    fn open_channels(&self) -> usize {
        self.router.channels.lock().len()
    }
}

impl Host for ProcessHost {
    fn get_current_user_name(&self) -> Result<String> {
        let value = self.call(
            GET_CURRENT_USER_NAME,
            json!({}),
            Some(self.request_timeout),
        )?;
        Ok(serde_json::from_value(value)?)
    }

    fn set_current_user_name(&self, user_name: &str) -> Result<()> {
        let args = serde_json::to_value(SetUserNameArgs {
            user_name: user_name.to_string(),
        })?;
        self.call(SET_CURRENT_USER_NAME, args, Some(self.request_timeout))
            .map(|_| ())
    }

    fn manually_check_update(
        &self,
        manually: bool,
        on_event: EventChannel<DownloadEvent>,
    ) -> Result<()> {
        let channel_id = on_event.id();
        let args = serde_json::to_value(CheckUpdateArgs {
            manually,
            on_event: on_event.reference(),
        })?;
        // Registered before the request so early pushes are routed.
        self.router.channels.lock().insert(channel_id, on_event);

        // The host replies once it has emitted everything for this check, and
        // replies are read in order after those pushes, so the channel closes here.
        let result = self.call(MANUALLY_CHECK_UPDATE, args, None).map(|_| ());
        if self.router.channels.lock().remove(&channel_id).is_some() {
            tracing::debug!(channel = channel_id, "Update channel closed by reply");
        }
        result
    }
}

impl Drop for ProcessHost {
    fn drop(&mut self) {
        let mut child = self.child.lock();
        if let Err(e) = child.kill() {
            tracing::debug!("Host `{}` already exited: {}", self.command, e);
        }
        let _ = child.wait();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const FAKE_HOST: &str = r##"
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p')
  case "$line" in
    *'"cmd":"get_current_user_name"'*)
      printf '{"id":%s,"result":"alice"}\n' "$id" ;;
    *'"cmd":"set_current_user_name"'*)
      printf '{"id":%s,"error":"read only"}\n' "$id" ;;
    *'"cmd":"manually_check_update"'*)
      ch=$(printf '%s\n' "$line" | sed -n 's/.*__CHANNEL__:\([0-9]*\).*/\1/p')
      printf '{"channel":%s,"message":{"event":"started","data":{"newVersion":true}}}\n' "$ch"
      printf '{"channel":%s,"message":{"event":"progress","data":{"downloaded":50,"contentLength":200}}}\n' "$ch"
      printf 'not json\n'
      printf '{"channel":%s,"message":{"event":"progress","data":{"downloaded":-5,"contentLength":200}}}\n' "$ch"
      printf '{"channel":%s,"message":{"event":"progress","data":{"downloaded":200,"contentLength":200}}}\n' "$ch"
      printf '{"channel":%s,"message":{"event":"finished","data":{"finished":true}}}\n' "$ch"
      printf '{"id":%s,"result":null}\n' "$id" ;;
  esac
done
"##;

    /// Answers every request with `{"id":N,<body>}`.
    fn replying_host(body: &str) -> String {
        format!(
            r##"
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p')
  printf '{{"id":%s,{}}}\n' "$id"
done
"##,
            body
        )
    }

    fn spawn_script(script: &str) -> ProcessHost {
        ProcessHost::spawn(&HostConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            ..HostConfig::default()
        })
        .expect("sh should spawn")
    }

    #[test]
    fn get_current_user_name_reads_result() {
        let host = spawn_script(FAKE_HOST);
        assert_eq!(host.get_current_user_name().expect("call should succeed"), "alice");
    }

    #[test]
    fn remote_error_names_the_call() {
        let host = spawn_script(FAKE_HOST);
        match host.set_current_user_name("bob") {
            Err(HostError::Remote { call, message }) => {
                assert_eq!(call, "set_current_user_name");
                assert_eq!(message, "read only");
            }
            other => panic!("expected Remote error, got {:?}", other),
        }
    }

    #[test]
    fn update_events_arrive_in_order_and_malformed_ones_are_dropped() {
        let host = spawn_script(FAKE_HOST);
        let (tx, rx) = crossbeam_channel::unbounded();
        let channel = EventChannel::new();
        channel.on_message(move |event| {
            let _ = tx.send(event);
        });

        host.manually_check_update(true, channel)
            .expect("check should succeed");

        let mut events = Vec::new();
        for _ in 0..4 {
            events.push(
                rx.recv_timeout(Duration::from_secs(5))
                    .expect("event should arrive"),
            );
        }
        assert_eq!(
            events,
            vec![
                DownloadEvent::Started { new_version: true },
                DownloadEvent::Progress {
                    downloaded: 50,
                    content_length: 200
                },
                DownloadEvent::Progress {
                    downloaded: 200,
                    content_length: 200
                },
                DownloadEvent::Finished { finished: true },
            ]
        );
        assert_eq!(host.open_channels(), 0);
    }

    #[test]
    fn pending_call_fails_when_host_exits() {
        let host = spawn_script("read line; exit 0");
        match host.get_current_user_name() {
            Err(HostError::Disconnected) | Err(HostError::Io(_)) => {}
            other => panic!("expected disconnect, got {:?}", other),
        }
    }

    #[test]
    fn spawn_reports_missing_command() {
        let result = ProcessHost::spawn(&HostConfig {
            command: "/nonexistent/dashboard-host".to_string(),
            ..HostConfig::default()
        });
        match result {
            Err(HostError::Spawn { command, .. }) => {
                assert_eq!(command, "/nonexistent/dashboard-host")
            }
            Err(other) => panic!("expected Spawn error, got {:?}", other),
            Ok(_) => panic!("spawn should fail"),
        }
    }

    #[test]
    fn malformed_reply_fails_the_pending_call() {
        let host = spawn_script(&replying_host(r#""error":7"#));
        match host.get_current_user_name() {
            Err(HostError::Json(_)) => {}
            other => panic!("expected Json error, got {:?}", other),
        }
    }

    #[test]
    fn unanswered_request_times_out() {
        let host = ProcessHost::spawn(&HostConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "while read line; do :; done".to_string()],
            request_timeout_ms: 200,
        })
        .expect("sh should spawn");

        match host.get_current_user_name() {
            Err(HostError::Timeout { call, .. }) => assert_eq!(call, "get_current_user_name"),
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[test]
    fn check_without_events_closes_its_channel() {
        let host = spawn_script(&replying_host(r#""result":null"#));
        for _ in 0..3 {
            host.manually_check_update(false, EventChannel::new())
                .expect("check should succeed");
        }
        assert_eq!(host.open_channels(), 0);
    }
}
