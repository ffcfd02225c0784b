use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use codec::{TopicFilter, TopicName};

use crate::trie::Trie;

/// A message delivered to a subscribed handler.
///
/// `origin` identifies the connection that produced the message (a broker's
/// own opaque per-connection id), if any. It has no meaning for a `Message`
/// dispatched on a bare `Mux`; the broker sets it so a subscriber's own
/// forwarding handler can recognize and skip its own publishes when the v5
/// "no local" option is set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Bytes,
    pub origin: Option<u64>,
}

impl Message {
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            origin: None,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: u64) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// Opaque token returned by [`Mux::handle`], used to remove a registration
/// with [`Mux::remove`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

/// A subscription callback. `Fn`, not `FnMut`: `Trie::lookup` hands out
/// shared references while the mux's lock is held, so a handler that needs
/// mutable state must guard it itself (a connection's forwarding handler
/// does this with its own send-side mutex).
pub type Handler = Box<dyn Fn(&Message) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MuxError {
    /// `dispatch` was called again from inside a handler it is currently
    /// running. Handlers must hand work off (e.g. to a queue or another
    /// thread) rather than call back into the mux synchronously.
    Reentrant,
}

impl fmt::Display for MuxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reentrant => f.write_str("dispatch called re-entrantly from within a handler"),
        }
    }
}

impl std::error::Error for MuxError {}

struct Registration {
    id: HandlerId,
    handler: Handler,
}

struct MuxInner {
    trie: Trie<Registration>,
}

/// The subscription multiplexer: a topic-filter trie of handlers behind a
/// single lock, dispatched to by topic name.
pub struct Mux {
    inner: Mutex<MuxInner>,
    next_id: AtomicU64,
    dispatching: AtomicBool,
}

impl Default for Mux {
    fn default() -> Self {
        Self::new()
    }
}

impl Mux {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MuxInner { trie: Trie::new() }),
            next_id: AtomicU64::new(1),
            dispatching: AtomicBool::new(false),
        }
    }

    /// Register `handler` for `filter`, returning a token that later
    /// identifies this exact registration to [`Mux::remove`].
    ///
    /// # Errors
    ///
    /// Returns `MuxError::Reentrant` if called from within a handler
    /// currently running under [`Mux::dispatch`] — `dispatch` holds the
    /// mux's lock for the duration of the handler loop, and that lock is
    /// not reentrant, so mutating the mux from inside a handler body would
    /// otherwise deadlock rather than fail cleanly.
    pub fn handle(&self, filter: &TopicFilter, handler: Handler) -> Result<HandlerId, MuxError> {
        if self.dispatching.load(Ordering::SeqCst) {
            return Err(MuxError::Reentrant);
        }
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut inner = self.inner.lock().expect("mux mutex poisoned");
        inner.trie.insert(filter, Registration { id, handler });
        Ok(id)
    }

    /// Remove the registration previously returned as `id` for `filter`.
    /// Returns whether a registration was found and removed.
    ///
    /// # Errors
    ///
    /// Returns `MuxError::Reentrant` under the same condition as
    /// [`Mux::handle`].
    pub fn remove(&self, filter: &TopicFilter, id: HandlerId) -> Result<bool, MuxError> {
        if self.dispatching.load(Ordering::SeqCst) {
            return Err(MuxError::Reentrant);
        }
        let mut inner = self.inner.lock().expect("mux mutex poisoned");
        Ok(inner.trie.remove(filter, |reg| reg.id == id))
    }

    /// Deliver `message` to every handler whose filter matches `topic`,
    /// each exactly once even if more than one matching filter resolves to
    /// the same registration.
    pub fn dispatch(&self, topic: &TopicName, message: &Message) -> Result<(), MuxError> {
        // Checked before the lock is taken: the mux's mutex is not
        // reentrant, so a handler calling back into dispatch on the same
        // thread would otherwise deadlock on its own lock instead of
        // observing a clean error.
        if self.dispatching.swap(true, Ordering::SeqCst) {
            return Err(MuxError::Reentrant);
        }
        let inner = self.inner.lock().expect("mux mutex poisoned");
        let mut seen = Vec::new();
        for reg in inner.trie.lookup(topic) {
            if seen.contains(&reg.id) {
                continue;
            }
            seen.push(reg.id);
            (reg.handler)(message);
        }
        drop(inner);
        self.dispatching.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn filter(s: &str) -> TopicFilter {
        TopicFilter::new(s).unwrap()
    }

    fn topic(s: &str) -> TopicName {
        TopicName::new(s).unwrap()
    }

    #[test]
    fn dispatch_calls_matching_handler() {
        let mux = Mux::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        mux.handle(
            &filter("a/+"),
            Box::new(move |_msg| {
                calls2.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
        mux.dispatch(&topic("a/b"), &Message::new("a/b", Bytes::from_static(b"x")))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removed_handler_is_not_called() {
        let mux = Mux::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        let id = mux
            .handle(
                &filter("a/b"),
                Box::new(move |_msg| {
                    calls2.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        assert!(mux.remove(&filter("a/b"), id).unwrap());
        mux.dispatch(&topic("a/b"), &Message::new("a/b", Bytes::from_static(b"x")))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn each_handler_runs_at_most_once_per_dispatch() {
        let mux = Mux::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        // "#" and "a/b" both match topic "a/b"; the registration must still
        // only fire once if it were (hypothetically) reachable via both
        // paths. Here we just confirm two distinct filters both deliver.
        mux.handle(
            &filter("#"),
            Box::new(move |_msg| {
                calls2.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
        mux.dispatch(&topic("a/b"), &Message::new("a/b", Bytes::from_static(b"x")))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reentrant_dispatch_from_within_a_handler_errors() {
        let mux = Arc::new(Mux::new());
        let inner = Arc::clone(&mux);
        mux.handle(
            &filter("a"),
            Box::new(move |msg| {
                let result = inner.dispatch(&TopicName::new("a").unwrap(), msg);
                assert_eq!(result, Err(MuxError::Reentrant));
            }),
        )
        .unwrap();
        mux.dispatch(&topic("a"), &Message::new("a", Bytes::from_static(b"x")))
            .unwrap();
    }

    #[test]
    fn reentrant_handle_from_within_a_handler_errors() {
        let mux = Arc::new(Mux::new());
        let inner = Arc::clone(&mux);
        mux.handle(
            &filter("a"),
            Box::new(move |_msg| {
                let result = inner.handle(&filter("b"), Box::new(|_msg| {}));
                assert_eq!(result.err(), Some(MuxError::Reentrant));
            }),
        )
        .unwrap();
        mux.dispatch(&topic("a"), &Message::new("a", Bytes::from_static(b"x")))
            .unwrap();
    }

    #[test]
    fn reentrant_remove_from_within_a_handler_errors() {
        let mux = Arc::new(Mux::new());
        let inner = Arc::clone(&mux);
        let inner_id = Arc::new(Mutex::new(None));
        let id_for_setup = Arc::clone(&inner_id);
        let id = mux
            .handle(
                &filter("a"),
                Box::new(move |_msg| {
                    let id = id_for_setup.lock().unwrap().expect("id set before dispatch");
                    let result = inner.remove(&filter("a"), id);
                    assert_eq!(result.err(), Some(MuxError::Reentrant));
                }),
            )
            .unwrap();
        *inner_id.lock().unwrap() = Some(id);
        mux.dispatch(&topic("a"), &Message::new("a", Bytes::from_static(b"x")))
            .unwrap();
    }
}
