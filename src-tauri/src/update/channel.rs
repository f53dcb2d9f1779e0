use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Prefix the host expects in front of a channel id when the channel is
/// passed as a call argument.
pub const CHANNEL_REFERENCE_PREFIX: &str = "__CHANNEL__:";

static NEXT_CHANNEL_ID: AtomicU32 = AtomicU32::new(1);

type Handler<T> = Arc<dyn Fn(T) + Send + Sync>;

struct Slot<T> {
    handler: Option<Handler<T>>,
    pending: VecDeque<T>,
}

struct Inner<T> {
    id: u32,
    slot: Mutex<Slot<T>>,
    /// Held for the duration of a delivery so handlers observe messages
    /// in send order even when senders race.
    delivery: Mutex<()>,
}

/// One-way, ordered host-to-client pipe.
///
/// A channel has at most one handler; registering another replaces it.
/// Messages sent before any handler exists are buffered and flushed, in
/// order, to the first handler registered.
pub struct EventChannel<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for EventChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> EventChannel<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                id: NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed),
                slot: Mutex::new(Slot {
                    handler: None,
                    pending: VecDeque::new(),
                }),
                delivery: Mutex::new(()),
            }),
        }
    }

    pub fn id(&self) -> u32 {
        self.inner.id
    }

    /// Reference string passed to the host in place of the channel itself.
    pub fn reference(&self) -> String {
        format!("{}{}", CHANNEL_REFERENCE_PREFIX, self.inner.id)
    }

    /// Register the message handler, replacing any previous one.
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let handler: Handler<T> = Arc::new(handler);
        let _delivery = self.inner.delivery.lock();
        let backlog = {
            let mut slot = self.inner.slot.lock();
            slot.handler = Some(Arc::clone(&handler));
            std::mem::take(&mut slot.pending)
        };
        if !backlog.is_empty() {
            tracing::debug!(
                channel = self.inner.id,
                count = backlog.len(),
                "Flushing buffered channel messages"
            );
        }
        for message in backlog {
            handler(message);
        }
    }

    /// Deliver a message. Never blocks on the receiver beyond the handler call.
    pub fn send(&self, message: T) {
        let _delivery = self.inner.delivery.lock();
        let handler = {
            let mut slot = self.inner.slot.lock();
            match &slot.handler {
                Some(handler) => Arc::clone(handler),
                None => {
                    slot.pending.push_back(message);
                    return;
                }
            }
        };
        handler(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |m| sink.lock().push(m))
    }

    #[test]
    fn delivers_in_send_order() {
        let channel = EventChannel::new();
        let (seen, handler) = recorder();
        channel.on_message(handler);

        for i in 0..5 {
            channel.send(i);
        }
        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn buffers_until_handler_registered() {
        let channel = EventChannel::new();
        channel.send(1);
        channel.send(2);

        let (seen, handler) = recorder();
        channel.on_message(handler);
        channel.send(3);
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn new_handler_replaces_previous() {
        let channel = EventChannel::new();
        let (first, first_handler) = recorder();
        let (second, second_handler) = recorder();

        channel.on_message(first_handler);
        channel.send(1);
        channel.on_message(second_handler);
        channel.send(2);

        assert_eq!(*first.lock(), vec![1]);
        assert_eq!(*second.lock(), vec![2]);
    }

    #[test]
    fn clones_deliver_to_the_same_handler() {
        let channel = EventChannel::new();
        let (seen, handler) = recorder();
        channel.on_message(handler);

        let sender = channel.clone();
        std::thread::spawn(move || {
            for i in 0..100 {
                sender.send(i);
            }
        })
        .join()
        .expect("sender thread panicked");

        assert_eq!(*seen.lock(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn channels_get_distinct_ids() {
        let a: EventChannel<u32> = EventChannel::new();
        let b: EventChannel<u32> = EventChannel::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn reference_embeds_channel_id() {
        let channel: EventChannel<u32> = EventChannel::new();
        assert_eq!(channel.reference(), format!("__CHANNEL__:{}", channel.id()));
    }
}
