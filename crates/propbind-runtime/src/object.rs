#![forbid(unsafe_code)]

//! In-process observable objects.
//!
//! [`ObservableObject`] is a single-threaded JSON document with key-path
//! observers. It implements both [`KeyValueCoding`] and
//! [`KeyValueObserving`], so it can be the target of a binding, the owner of
//! one, or both at once (chained bindings).
//!
//! # Invariants
//!
//! 1. Version increments exactly once per write that changes the document.
//! 2. Writing a value equal to the current one is a no-op (no version bump,
//!    no notifications).
//! 3. An observer fires only when the value at *its* path changed; it
//!    receives that value, or `null` once the path stops resolving.
//! 4. Observers fire in registration order.
//! 5. No internal borrow is held while an observer runs, so observers may
//!    read, write, subscribe and unsubscribe re-entrantly.
//!
//! # Failure Modes
//!
//! - Observer panic: propagates to the caller of `set_value_at`; the write
//!   itself has already been applied.
//! - Observer removed by an earlier observer in the same cycle: it was
//!   already scheduled and still runs. Callers that need stronger
//!   cancellation gate their callback (the observation adapter does).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use propbind_core::value::{assign, resolve, resolve_checked};
use propbind_core::{KeyPath, KeyPathError, KeyValueCoding, KeyValueObserving, Observer, ObserverId};
use serde_json::{Map, Value};

struct ObserverSlot {
    id: ObserverId,
    path: KeyPath,
    callback: Observer,
}

/// A shared, observable JSON document.
pub struct ObservableObject {
    document: RefCell<Value>,
    observers: RefCell<Vec<ObserverSlot>>,
    version: Cell<u64>,
    next_observer: Cell<u64>,
}

impl ObservableObject {
    /// Create an object holding `document`.
    #[must_use]
    pub fn new(document: Value) -> Self {
        Self {
            document: RefCell::new(document),
            observers: RefCell::new(Vec::new()),
            version: Cell::new(0),
            next_observer: Cell::new(0),
        }
    }

    /// Create an object holding an empty JSON object.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Value::Object(Map::new()))
    }

    /// Create a shared object, ready to be bound.
    #[must_use]
    pub fn shared(document: Value) -> Rc<Self> {
        Rc::new(Self::new(document))
    }

    /// Clone of the whole document.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.document.borrow().clone()
    }

    /// Read the value at a dotted path, `None` if it does not parse or resolve.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        let path = KeyPath::parse(path).ok()?;
        resolve(&self.document.borrow(), &path).cloned()
    }

    /// Write a value at a dotted path, notifying affected observers.
    ///
    /// # Errors
    ///
    /// A [`KeyPathError`] when `path` does not parse or cannot be written.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<(), KeyPathError> {
        let path = KeyPath::parse(path)?;
        self.set_value_at(&path, value.into())
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Number of effective mutations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    fn write_and_collect(
        &self,
        path: &KeyPath,
        value: Value,
    ) -> Result<Vec<(Observer, Value)>, KeyPathError> {
        let mut document = self.document.borrow_mut();
        if resolve(&document, path) == Some(&value) {
            return Ok(Vec::new());
        }

        let observers = self.observers.borrow();
        let before: Vec<Option<Value>> = observers
            .iter()
            .map(|slot| {
                slot.path
                    .overlaps(path)
                    .then(|| observed_value(&document, &slot.path))
            })
            .collect();

        assign(&mut document, path, value)?;
        self.version.set(self.version.get() + 1);

        let pending = observers
            .iter()
            .zip(before)
            .filter_map(|(slot, old)| {
                let old = old?;
                let new = observed_value(&document, &slot.path);
                (new != old).then(|| (Rc::clone(&slot.callback), new))
            })
            .collect();
        Ok(pending)
    }
}

fn observed_value(document: &Value, path: &KeyPath) -> Value {
    resolve(document, path).cloned().unwrap_or(Value::Null)
}

impl Default for ObservableObject {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for ObservableObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableObject")
            .field("document", &self.document.borrow())
            .field("version", &self.version.get())
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

impl KeyValueCoding for ObservableObject {
    fn value_at(&self, path: &KeyPath) -> Result<Value, KeyPathError> {
        resolve_checked(&self.document.borrow(), path).cloned()
    }

    fn set_value_at(&self, path: &KeyPath, value: Value) -> Result<(), KeyPathError> {
        let pending = self.write_and_collect(path, value)?;
        for (callback, value) in pending {
            callback(&value);
        }
        Ok(())
    }
}

impl KeyValueObserving for ObservableObject {
    fn add_observer(&self, path: &KeyPath, observer: Observer) -> ObserverId {
        let id = ObserverId::new(self.next_observer.get());
        self.next_observer.set(id.get() + 1);
        self.observers.borrow_mut().push(ObserverSlot {
            id,
            path: path.clone(),
            callback: observer,
        });
        id
    }

    fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|slot| slot.id != id);
        observers.len() != before
    }
}
