#![forbid(unsafe_code)]

//! Capability traits a host object implements to take part in bindings.
//!
//! - [`KeyValueCoding`]: generic get/set of a nested property by key path.
//!   Binding owners need this so the registry can write bound values.
//! - [`KeyValueObserving`]: subscribe to changes at a key path. Binding
//!   targets need this (plus `KeyValueCoding` for the initial read).
//!
//! Both traits take `&self`: objects are shared behind `Rc` on a single
//! thread and mutate through interior mutability, the same way
//! `Observable` does in the reactive layer this engine sits on.

use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::key_path::{KeyPath, KeyPathError};

/// Callback invoked with the new value at an observed key path.
pub type Observer = Rc<dyn Fn(&Value)>;

/// Handle returned by [`KeyValueObserving::add_observer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Wrap a raw observer number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw observer number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Read and write nested properties by key path.
pub trait KeyValueCoding {
    /// Read the value at `path`.
    ///
    /// # Errors
    ///
    /// A [`KeyPathError`] when `path` does not resolve on this object.
    fn value_at(&self, path: &KeyPath) -> Result<Value, KeyPathError>;

    /// Write `value` at `path`.
    ///
    /// # Errors
    ///
    /// A [`KeyPathError`] when `path` cannot be written on this object.
    fn set_value_at(&self, path: &KeyPath, value: Value) -> Result<(), KeyPathError>;
}

/// Change notification at key paths.
///
/// Implementations must deliver notifications synchronously, in the order
/// changes happen, and must not hold internal borrows while an observer runs.
pub trait KeyValueObserving: KeyValueCoding {
    /// Register `observer` for changes at `path`.
    fn add_observer(&self, path: &KeyPath, observer: Observer) -> ObserverId;

    /// Remove a registration. Returns `false` if it was already removed.
    fn remove_observer(&self, id: ObserverId) -> bool;
}

/// Pointer identity of a shared object.
///
/// Two `ObjectId`s are equal exactly when they came from the same
/// allocation. While any `Rc` or `Weak` to that allocation exists the id
/// cannot be reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Identity of the object behind `object`.
    #[must_use]
    pub fn of<T: ?Sized>(object: &Rc<T>) -> Self {
        Self(Rc::as_ptr(object).cast::<()>() as usize)
    }

    /// Identity of the object behind `object`, even if it was released.
    #[must_use]
    pub fn of_weak<T: ?Sized>(object: &Weak<T>) -> Self {
        Self(Weak::as_ptr(object).cast::<()>() as usize)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object@{:#x}", self.0)
    }
}
