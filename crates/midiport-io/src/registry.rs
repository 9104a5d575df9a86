//! Process-wide callback registry.
//!
//! The native engine can only carry a `u64` back to us on each delivery, so
//! installed handlers live here keyed by a small integer handle. The token
//! given to the engine also carries a generation number: a delivery that
//! races an unregister can never reach a later registration that reused the
//! same handle.
//!
//! A single lock guards the table. It is held for map access only, never
//! while a handler runs, so handlers may re-enter the registry (for example
//! by cancelling their own callback).

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Inbound message handler: `(bytes, delta_seconds)`.
pub type Handler = Box<dyn FnMut(&[u8], f64) + Send + 'static>;

/// Process-unique identity of an input session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Opaque value passed through the native engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackToken {
    handle: u32,
    generation: u32,
}

impl CallbackToken {
    /// The small registry key, lowest free at registration time.
    pub fn handle(self) -> u32 {
        self.handle
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    pub fn into_raw(self) -> u64 {
        ((self.generation as u64) << 32) | self.handle as u64
    }

    pub fn from_raw(raw: u64) -> Self {
        Self {
            handle: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

struct Registration {
    session: SessionId,
    generation: u32,
    handler: Arc<Mutex<Handler>>,
}

pub struct CallbackRegistry {
    entries: Mutex<BTreeMap<u32, Registration>>,
    generation: AtomicU32,
}

static GLOBAL: CallbackRegistry = CallbackRegistry::new();

impl CallbackRegistry {
    pub const fn new() -> Self {
        Self {
            entries: parking_lot::const_mutex(BTreeMap::new()),
            generation: AtomicU32::new(1),
        }
    }

    /// The registry native deliveries are routed through.
    pub fn global() -> &'static CallbackRegistry {
        &GLOBAL
    }

    /// Stores `handler` under the lowest unused handle.
    pub fn register(&self, session: SessionId, handler: Handler) -> CallbackToken {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.lock();

        let mut handle = 0u32;
        for &key in entries.keys() {
            if key != handle {
                break;
            }
            handle += 1;
        }

        entries.insert(
            handle,
            Registration {
                session,
                generation,
                handler: Arc::new(Mutex::new(handler)),
            },
        );
        debug!("Registered callback handle {} for {}", handle, session);
        CallbackToken { handle, generation }
    }

    /// Removes every registration owned by `session`. Returns how many were removed.
    pub fn unregister(&self, session: SessionId) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, registration| registration.session != session);
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Unregistered {} callback(s) for {}", removed, session);
        }
        removed
    }

    /// Removes the one registration `token` was issued for. A token whose
    /// handle has since been reused by a later registration removes nothing.
    pub fn release(&self, token: CallbackToken) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(&token.handle) {
            Some(registration) if registration.generation == token.generation => {
                entries.remove(&token.handle);
                debug!("Released callback handle {}", token.handle);
                true
            }
            _ => false,
        }
    }

    /// Runs the handler registered under `token`. A miss means the
    /// registration is gone and the delivery is dropped.
    pub fn dispatch(&self, token: CallbackToken, bytes: &[u8], delta: f64) -> bool {
        let handler = {
            let entries = self.entries.lock();
            match entries.get(&token.handle) {
                Some(registration) if registration.generation == token.generation => {
                    Arc::clone(&registration.handler)
                }
                _ => {
                    trace!("Dropping delivery for stale callback token {:?}", token);
                    return false;
                }
            }
        };

        let mut guard = handler.lock();
        let handler: &mut Handler = &mut guard;
        handler(bytes, delta);
        true
    }

    pub fn active_count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn registrations_for(&self, session: SessionId) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|registration| registration.session == session)
            .count()
    }

    pub fn is_registered(&self, handle: u32) -> bool {
        self.entries.lock().contains_key(&handle)
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Delivery entry point handed to the native engine.
pub(crate) fn deliver(delta: f64, bytes: &[u8], token: u64) {
    CallbackRegistry::global().dispatch(CallbackToken::from_raw(token), bytes, delta);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(counter: &Arc<AtomicUsize>) -> Handler {
        let counter = Arc::clone(counter);
        Box::new(move |_bytes, _delta| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_lowest_free_handle_is_reused() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let a = SessionId::next();
        let b = SessionId::next();
        let c = SessionId::next();

        assert_eq!(registry.register(a, counting(&counter)).handle(), 0);
        assert_eq!(registry.register(b, counting(&counter)).handle(), 1);
        assert_eq!(registry.register(c, counting(&counter)).handle(), 2);

        registry.unregister(b);
        assert!(!registry.is_registered(1));
        let d = SessionId::next();
        assert_eq!(registry.register(d, counting(&counter)).handle(), 1);
        assert_eq!(registry.active_count(), 3);
    }

    #[test]
    fn test_unregister_by_identity() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let a = SessionId::next();
        let b = SessionId::next();

        registry.register(a, counting(&counter));
        registry.register(b, counting(&counter));
        assert_eq!(registry.unregister(a), 1);
        assert_eq!(registry.unregister(a), 0);
        assert_eq!(registry.registrations_for(a), 0);
        assert_eq!(registry.registrations_for(b), 1);
    }

    #[test]
    fn test_release_ignores_reused_handle() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let session = SessionId::next();

        let old = registry.register(session, counting(&counter));
        assert!(registry.release(old));
        let new = registry.register(session, counting(&counter));
        assert_eq!(old.handle(), new.handle());

        assert!(!registry.release(old));
        assert!(registry.dispatch(new, &[0xF8], 0.0));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_reaches_handler() {
        let registry = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let token = registry.register(
            SessionId::next(),
            Box::new(move |bytes, delta| sink.lock().push((bytes.to_vec(), delta))),
        );

        assert!(registry.dispatch(token, &[0x90, 60, 100], 0.5));
        assert_eq!(seen.lock().as_slice(), &[(vec![0x90, 60, 100], 0.5)]);
    }

    #[test]
    fn test_stale_token_misses_reused_handle() {
        let registry = CallbackRegistry::new();
        let old_count = Arc::new(AtomicUsize::new(0));
        let new_count = Arc::new(AtomicUsize::new(0));
        let session = SessionId::next();

        let old = registry.register(session, counting(&old_count));
        registry.unregister(session);
        let new = registry.register(session, counting(&new_count));
        assert_eq!(old.handle(), new.handle());

        assert!(!registry.dispatch(old, &[0xF8], 0.0));
        assert!(registry.dispatch(new, &[0xF8], 0.0));
        assert_eq!(old_count.load(Ordering::SeqCst), 0);
        assert_eq!(new_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_may_unregister_itself() {
        let registry = Arc::new(CallbackRegistry::new());
        let session = SessionId::next();
        let inner = Arc::clone(&registry);
        let token = registry.register(
            session,
            Box::new(move |_, _| {
                inner.unregister(session);
            }),
        );

        assert!(registry.dispatch(token, &[0x90, 1, 1], 0.0));
        assert_eq!(registry.active_count(), 0);
        assert!(!registry.dispatch(token, &[0x90, 1, 1], 0.0));
    }

    #[test]
    fn test_token_raw_roundtrip() {
        let token = CallbackToken {
            handle: 3,
            generation: 0xDEAD_BEEF,
        };
        assert_eq!(token.into_raw(), 0xDEAD_BEEF_0000_0003);
        assert_eq!(CallbackToken::from_raw(token.into_raw()), token);
    }

    #[test]
    fn test_concurrent_dispatch_and_churn() {
        let registry = Arc::new(CallbackRegistry::new());
        let live = Arc::new(AtomicUsize::new(0));
        let session = SessionId::next();
        let first = registry.register(session, counting(&live));

        let churn = {
            let registry = Arc::clone(&registry);
            let live = Arc::clone(&live);
            std::thread::spawn(move || {
                let mut tokens = vec![first];
                for _ in 0..500 {
                    registry.unregister(session);
                    tokens.push(registry.register(session, counting(&live)));
                }
                tokens
            })
        };

        let mut misses = 0;
        for _ in 0..2000 {
            if !registry.dispatch(first, &[0xFE], 0.0) {
                misses += 1;
            }
        }
        let tokens = churn.join().unwrap();

        // The first token stops resolving once it has been replaced.
        assert!(misses > 0 || live.load(Ordering::SeqCst) == 2000);
        for stale in &tokens[..tokens.len() - 1] {
            assert!(!registry.dispatch(*stale, &[0xFE], 0.0));
        }
        assert!(registry.dispatch(*tokens.last().unwrap(), &[0xFE], 0.0));
        assert_eq!(registry.registrations_for(session), 1);
    }

    proptest! {
        #[test]
        fn prop_handles_stay_dense_and_unique(ops in proptest::collection::vec(any::<bool>(), 1..64)) {
            let registry = CallbackRegistry::new();
            let mut live: Vec<(SessionId, CallbackToken)> = Vec::new();

            for (step, register) in ops.into_iter().enumerate() {
                if register || live.is_empty() {
                    let session = SessionId::next();
                    let token = registry.register(session, Box::new(|_, _| {}));
                    let lowest_free = (0u32..)
                        .find(|h| !live.iter().any(|(_, t)| t.handle() == *h))
                        .unwrap();
                    prop_assert_eq!(token.handle(), lowest_free);
                    live.push((session, token));
                } else {
                    let (session, _) = live.remove(step % live.len());
                    prop_assert_eq!(registry.unregister(session), 1);
                }
                prop_assert_eq!(registry.active_count(), live.len());
            }
        }
    }
}
