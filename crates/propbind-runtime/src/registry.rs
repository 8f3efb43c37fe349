#![forbid(unsafe_code)]

//! The binding registry an owner composes to keep properties in sync.
//!
//! An owner holds one [`BindingRegistry`]. Each [`bind`](BindingRegistry::bind)
//! declares "my property `name` reflects `key_path` on `target`": the current
//! value is written into the owner before `bind` returns, and every later
//! change on the target is written again as it is delivered.
//!
//! # Usage
//!
//! ```
//! use propbind_runtime::{BindingRegistry, ObservableObject};
//! use serde_json::json;
//!
//! let owner = ObservableObject::shared(json!({}));
//! let user = ObservableObject::shared(json!({"profile": {"displayName": "Ada"}}));
//!
//! let registry = BindingRegistry::new(&owner);
//! registry.bind("title", &user, "profile.displayName").unwrap();
//! assert_eq!(owner.get("title"), Some(json!("Ada")));
//!
//! user.set("profile.displayName", "Grace").unwrap();
//! assert_eq!(owner.get("title"), Some(json!("Grace")));
//!
//! registry.unbind("title");
//! user.set("profile.displayName", "Ada").unwrap();
//! assert_eq!(owner.get("title"), Some(json!("Grace")));
//! ```
//!
//! # Invariants
//!
//! 1. At most one binding per name; rebinding a name tears the old one down
//!    (unsubscribing its token) before the new one is installed.
//! 2. A failing `bind` leaves any previous binding for that name untouched,
//!    including when the owner rejects the initial value.
//! 3. After `unbind` returns, no change on the old target reaches the owner,
//!    including changes already in flight.
//! 4. Each substrate change writes each binding exactly once, in bind order.
//! 5. Owner and targets are held weakly; the registry never keeps either
//!    alive.
//! 6. Dropping the registry unsubscribes every remaining binding.
//!
//! # Failure Modes
//!
//! | Failure | Where | Behavior |
//! |---------|-------|----------|
//! | Empty / bad name | `bind` | `Err(InvalidName)`, nothing changes |
//! | Empty / unresolvable path | `bind` | `Err(InvalidPath)`, nothing changes |
//! | Released target | `bind` | `Err(InvalidTarget)`, nothing changes |
//! | Released target | notification | never delivered, no-op |
//! | Owner rejects initial value | `bind` | `Err(WriteFailed)`, nothing changes |
//! | Owner rejects / released | notification | reported on failure channel |
//! | Callback for torn-down binding | notification | swallowed (`trace!`) |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use propbind_core::{BindingError, KeyPath, KeyValueCoding, KeyValueObserving, ObjectId, Value};
use tracing::{debug, trace, warn};

use crate::adapter::{Change, ObservationAdapter, ObservationToken};
use crate::config::RegistryConfig;
use crate::store::{Binding, BindingEntryStore};

type FailureHandler = Rc<dyn Fn(&BindingError)>;

/// Read-only view of one live binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInfo {
    /// The binding name (owner property).
    pub name: String,
    /// Observed key path on the target.
    pub key_path: KeyPath,
    /// Identity of the target.
    pub target: ObjectId,
    /// Whether the target is still alive.
    pub target_alive: bool,
    /// Token of the underlying observation.
    pub token: ObservationToken,
}

impl From<&Binding> for BindingInfo {
    fn from(binding: &Binding) -> Self {
        Self {
            name: binding.name().to_owned(),
            key_path: binding.key_path().clone(),
            target: binding.target_id(),
            target_alive: binding.target_alive(),
            token: binding.token(),
        }
    }
}

struct RegistryCore {
    owner: Weak<dyn KeyValueCoding>,
    store: RefCell<BindingEntryStore>,
    adapter: ObservationAdapter,
    config: RegistryConfig,
    failure_handler: RefCell<Option<FailureHandler>>,
    failures: Cell<u64>,
}

impl RegistryCore {
    fn validate_name(&self, name: &str) -> Result<KeyPath, BindingError> {
        let invalid = |reason: String| BindingError::InvalidName {
            name: name.to_owned(),
            reason,
        };
        if name.is_empty() {
            return Err(invalid("name is empty".to_owned()));
        }
        let path = KeyPath::parse(name).map_err(|err| invalid(err.to_string()))?;
        if !self.config.nested_names && !path.is_single() {
            return Err(invalid("nested owner paths are disabled".to_owned()));
        }
        Ok(path)
    }

    fn check_capacity(&self, name: &str) -> Result<(), BindingError> {
        let Some(limit) = self.config.max_bindings else {
            return Ok(());
        };
        let store = self.store.borrow();
        if !store.contains(name) && store.len() >= limit {
            return Err(BindingError::CapacityExceeded { limit });
        }
        Ok(())
    }

    fn write_owner(&self, name: &KeyPath, value: Value) -> Result<(), BindingError> {
        let owner = self.owner.upgrade().ok_or(BindingError::OwnerReleased)?;
        if self.config.trace_updates {
            trace!(name = %name, value = %value, "writing bound property");
        }
        owner
            .set_value_at(name, value)
            .map_err(|source| BindingError::WriteFailed {
                name: name.to_string(),
                source,
            })
    }

    fn is_live(&self, name: &str, token: ObservationToken) -> bool {
        self.store
            .borrow()
            .get(name)
            .is_some_and(|binding| binding.token() == token)
    }

    /// Route a change delivered by one of this registry's own observations.
    fn deliver(&self, change: &Change<'_>) {
        let owner_path = {
            let store = self.store.borrow();
            store
                .find_by_token(change.token)
                .filter(|binding| binding.target_id() == change.target)
                .map(|binding| binding.owner_path().clone())
        };
        // Secondary guard: the adapter gate already drops callbacks for
        // removed tokens, so this only fires for a token/target mismatch.
        let Some(owner_path) = owner_path else {
            let stale = BindingError::StaleNotification {
                token: change.token.get(),
            };
            trace!(key_path = %change.key_path, error = %stale, "ignoring notification");
            return;
        };
        if let Err(err) = self.write_owner(&owner_path, change.value.clone()) {
            self.report(err);
        }
    }

    fn evaluate(&self, key_path: &KeyPath, target: ObjectId, value: &Value) {
        let matched: Vec<(String, ObservationToken, KeyPath)> = self
            .store
            .borrow()
            .find_by_source(target, key_path)
            .into_iter()
            .filter(|binding| binding.target_alive())
            .map(|binding| {
                (
                    binding.name().to_owned(),
                    binding.token(),
                    binding.owner_path().clone(),
                )
            })
            .collect();
        if matched.is_empty() {
            trace!(key_path = %key_path, object = %target, "no binding for evaluated change");
            return;
        }
        for (name, token, owner_path) in matched {
            // An earlier write may have unbound or replaced this one.
            if !self.is_live(&name, token) {
                continue;
            }
            if let Err(err) = self.write_owner(&owner_path, value.clone()) {
                self.report(err);
            }
        }
    }

    fn report(&self, err: BindingError) {
        self.failures.set(self.failures.get() + 1);
        let handler = self.failure_handler.borrow().clone();
        match handler {
            Some(handler) => handler(&err),
            None => warn!(error = %err, "binding update failed"),
        }
    }

    fn teardown(&self, binding: &Binding, reason: &'static str) {
        self.adapter.unsubscribe(binding.token());
        debug!(
            name = binding.name(),
            key_path = %binding.key_path(),
            token = binding.token().get(),
            reason,
            "binding removed"
        );
    }
}

/// Named one-way bindings from target key paths into an owner.
pub struct BindingRegistry {
    core: Rc<RegistryCore>,
}

impl BindingRegistry {
    /// Create a registry writing into `owner`.
    #[must_use]
    pub fn new<O: KeyValueCoding + 'static>(owner: &Rc<O>) -> Self {
        Self::from_weak(Rc::downgrade(owner))
    }

    /// Create a registry writing into `owner` with `config`.
    #[must_use]
    pub fn with_config<O: KeyValueCoding + 'static>(owner: &Rc<O>, config: RegistryConfig) -> Self {
        Self::from_weak_with_config(Rc::downgrade(owner), config)
    }

    /// Create a registry from a weak owner reference.
    ///
    /// This is the constructor to use inside `Rc::new_cyclic` when the owner
    /// stores the registry as one of its own fields.
    #[must_use]
    pub fn from_weak<O: KeyValueCoding + 'static>(owner: Weak<O>) -> Self {
        Self::from_weak_with_config(owner, RegistryConfig::default())
    }

    /// As [`from_weak`](Self::from_weak), with `config`.
    #[must_use]
    pub fn from_weak_with_config<O: KeyValueCoding + 'static>(
        owner: Weak<O>,
        config: RegistryConfig,
    ) -> Self {
        let owner: Weak<dyn KeyValueCoding> = owner;
        Self {
            core: Rc::new(RegistryCore {
                owner,
                store: RefCell::new(BindingEntryStore::new()),
                adapter: ObservationAdapter::new(),
                config,
                failure_handler: RefCell::new(None),
                failures: Cell::new(0),
            }),
        }
    }

    /// Bind owner property `name` to `key_path` on `target`.
    ///
    /// # Errors
    ///
    /// - [`BindingError::InvalidName`] for an empty or disallowed name.
    /// - [`BindingError::InvalidPath`] for an empty or unresolvable path.
    /// - [`BindingError::CapacityExceeded`] past `max_bindings`.
    /// - [`BindingError::WriteFailed`] / [`BindingError::OwnerReleased`] when
    ///   the initial value cannot be written into the owner.
    pub fn bind<T: KeyValueObserving + 'static>(
        &self,
        name: &str,
        target: &Rc<T>,
        key_path: &str,
    ) -> Result<(), BindingError> {
        let target: Rc<dyn KeyValueObserving> = Rc::<T>::clone(target);
        self.bind_dyn(name, target, key_path)
    }

    /// As [`bind`](Self::bind), for a target that may already be released.
    ///
    /// # Errors
    ///
    /// [`BindingError::InvalidTarget`] when `target` no longer upgrades,
    /// otherwise as [`bind`](Self::bind).
    pub fn bind_weak<T: KeyValueObserving + 'static>(
        &self,
        name: &str,
        target: &Weak<T>,
        key_path: &str,
    ) -> Result<(), BindingError> {
        let target = target.upgrade().ok_or(BindingError::InvalidTarget)?;
        self.bind(name, &target, key_path)
    }

    fn bind_dyn(
        &self,
        name: &str,
        target: Rc<dyn KeyValueObserving>,
        key_path: &str,
    ) -> Result<(), BindingError> {
        let core = &self.core;
        let owner_path = core.validate_name(name)?;
        let invalid_path = |source| BindingError::InvalidPath {
            key_path: key_path.to_owned(),
            source,
        };
        let key_path = KeyPath::parse(key_path).map_err(invalid_path)?;
        let initial = target.value_at(&key_path).map_err(invalid_path)?;
        core.check_capacity(name)?;
        // A rejected initial value must leave any previous binding in place.
        core.write_owner(&owner_path, initial)?;

        let previous = core.store.borrow_mut().remove(name);
        if let Some(previous) = previous {
            core.teardown(&previous, "rebind");
        }

        let weak_core = Rc::downgrade(core);
        let token = core
            .adapter
            .subscribe(&target, &key_path, move |change: &Change<'_>| {
                if let Some(core) = weak_core.upgrade() {
                    core.deliver(change);
                }
            });
        let binding = Binding::new(
            name,
            owner_path.clone(),
            Rc::downgrade(&target),
            key_path.clone(),
            token,
        );
        let displaced = core.store.borrow_mut().insert(binding);
        if let Some(displaced) = displaced {
            core.teardown(&displaced, "displaced");
        }

        debug!(
            name = %name,
            key_path = %key_path,
            object = %ObjectId::of(&target),
            token = token.get(),
            "bound property"
        );
        Ok(())
    }

    /// Remove the binding for `name`. Unknown names are a no-op.
    pub fn unbind(&self, name: &str) {
        let removed = self.core.store.borrow_mut().remove(name);
        match removed {
            Some(binding) => self.core.teardown(&binding, "unbind"),
            None => trace!(name = %name, "unbind of unbound name"),
        }
    }

    /// Remove every binding. Returns how many were removed.
    pub fn unbind_all(&self) -> usize {
        let drained = self.core.store.borrow_mut().drain();
        for binding in &drained {
            self.core.teardown(binding, "teardown");
        }
        drained.len()
    }

    /// Owner notification entry point: write `value` into every binding that
    /// watches `key_path` on `target`. Unmatched calls, and calls for a target
    /// that has since been released, are ignored.
    pub fn evaluate(&self, key_path: &KeyPath, target: ObjectId, value: &Value) {
        self.core.evaluate(key_path, target, value);
    }

    /// Install the failure channel for notification-path errors.
    ///
    /// Replaces the default handler, which logs at `warn` level.
    pub fn on_failure(&self, handler: impl Fn(&BindingError) + 'static) {
        *self.core.failure_handler.borrow_mut() = Some(Rc::new(handler));
    }

    /// Number of failures reported on the failure channel so far.
    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.core.failures.get()
    }

    /// Whether `name` is bound.
    #[must_use]
    pub fn is_bound(&self, name: &str) -> bool {
        self.core.store.borrow().contains(name)
    }

    /// Snapshot of the binding for `name`.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<BindingInfo> {
        self.core.store.borrow().get(name).map(BindingInfo::from)
    }

    /// Bound names in bind order.
    #[must_use]
    pub fn bound_names(&self) -> Vec<String> {
        self.core.store.borrow().names()
    }

    /// Number of bindings.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.core.store.borrow().len()
    }

    /// Whether no bindings exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.store.borrow().is_empty()
    }

    /// Number of observations currently held with the substrate.
    #[must_use]
    pub fn active_observations(&self) -> usize {
        self.core.adapter.active_count()
    }

    /// The registry configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.core.config
    }
}

impl Drop for BindingRegistry {
    fn drop(&mut self) {
        self.unbind_all();
    }
}

impl fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("bound_names", &self.bound_names())
            .field("owner_alive", &(self.core.owner.strong_count() > 0))
            .field("failures", &self.failure_count())
            .finish()
    }
}
