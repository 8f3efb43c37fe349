#![forbid(unsafe_code)]

//! Observation adapter over a [`KeyValueObserving`] substrate.
//!
//! The adapter turns the substrate's per-object observer registrations into
//! opaque [`ObservationToken`]s and forwards each raw change as a [`Change`]
//! carrying the token, the observed key path, the target identity and the
//! new value. It performs no transformation of values.
//!
//! # Invariants
//!
//! 1. Tokens are never reused, so a token is unique among active
//!    subscriptions.
//! 2. `unsubscribe` is idempotent: unknown or already-removed tokens return
//!    `false` and do nothing else.
//! 3. Once `unsubscribe(token)` returns, the callback for `token` never runs
//!    again, even if the substrate had already scheduled it.
//! 4. Targets are held weakly. A released target is simply forgotten on
//!    unsubscribe.
//! 5. Dropping the adapter unsubscribes every active token.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use propbind_core::{KeyPath, KeyValueObserving, ObjectId, Observer, ObserverId, Value};

/// Opaque handle for one active subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservationToken(u64);

impl ObservationToken {
    /// The raw token number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObservationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token#{}", self.0)
    }
}

/// A change forwarded from the substrate.
#[derive(Debug, Clone, Copy)]
pub struct Change<'a> {
    /// Subscription that produced the change.
    pub token: ObservationToken,
    /// Key path the subscription observes.
    pub key_path: &'a KeyPath,
    /// Identity of the observed object.
    pub target: ObjectId,
    /// New value at `key_path`.
    pub value: &'a Value,
}

struct ActiveObservation {
    target: Weak<dyn KeyValueObserving>,
    observer: ObserverId,
    key_path: KeyPath,
    live: Rc<Cell<bool>>,
}

/// Token-based subscribe/unsubscribe over [`KeyValueObserving`] objects.
pub struct ObservationAdapter {
    next_token: Cell<u64>,
    active: RefCell<AHashMap<ObservationToken, ActiveObservation>>,
}

impl ObservationAdapter {
    /// Create an adapter with no active subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_token: Cell::new(1),
            active: RefCell::new(AHashMap::new()),
        }
    }

    /// Observe `key_path` on `target`, forwarding each change to `callback`.
    pub fn subscribe(
        &self,
        target: &Rc<dyn KeyValueObserving>,
        key_path: &KeyPath,
        callback: impl Fn(&Change<'_>) + 'static,
    ) -> ObservationToken {
        let token = ObservationToken(self.next_token.get());
        self.next_token.set(token.0 + 1);

        let live = Rc::new(Cell::new(true));
        let gate = Rc::clone(&live);
        let observed = key_path.clone();
        let target_id = ObjectId::of(target);
        let observer: Observer = Rc::new(move |value: &Value| {
            if !gate.get() {
                return;
            }
            callback(&Change {
                token,
                key_path: &observed,
                target: target_id,
                value,
            });
        });

        let observer = target.add_observer(key_path, observer);
        self.active.borrow_mut().insert(
            token,
            ActiveObservation {
                target: Rc::downgrade(target),
                observer,
                key_path: key_path.clone(),
                live,
            },
        );
        token
    }

    /// Stop observing. Returns `false` if `token` was not active.
    pub fn unsubscribe(&self, token: ObservationToken) -> bool {
        let Some(entry) = self.active.borrow_mut().remove(&token) else {
            return false;
        };
        entry.live.set(false);
        if let Some(target) = entry.target.upgrade() {
            target.remove_observer(entry.observer);
        }
        true
    }

    /// Stop every active subscription. Returns how many were removed.
    pub fn unsubscribe_all(&self) -> usize {
        let drained: Vec<ObservationToken> = self.active.borrow().keys().copied().collect();
        drained
            .into_iter()
            .filter(|token| self.unsubscribe(*token))
            .count()
    }

    /// Whether `token` is currently active.
    #[must_use]
    pub fn is_active(&self, token: ObservationToken) -> bool {
        self.active.borrow().contains_key(&token)
    }

    /// Key path observed by an active `token`.
    #[must_use]
    pub fn key_path(&self, token: ObservationToken) -> Option<KeyPath> {
        self.active
            .borrow()
            .get(&token)
            .map(|entry| entry.key_path.clone())
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.borrow().len()
    }
}

impl Default for ObservationAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ObservationAdapter {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}

impl fmt::Debug for ObservationAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationAdapter")
            .field("active_count", &self.active_count())
            .finish()
    }
}
