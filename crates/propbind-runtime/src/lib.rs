#![forbid(unsafe_code)]

//! Property binding engine for propbind.
//!
//! An owner object composes a [`BindingRegistry`] to declare "my property
//! `name` always reflects `key_path` on `target`". The registry keeps that
//! link alive through three layers, leaves first:
//!
//! - [`ObservationAdapter`]: token-based subscribe/unsubscribe over any
//!   [`KeyValueObserving`](propbind_core::KeyValueObserving) object.
//! - [`BindingEntryStore`]: the per-owner `name -> Binding` records.
//! - [`BindingRegistry`]: `bind`, `unbind`, `evaluate`, initial sync, and
//!   write-back into the owner.
//!
//! [`ObservableObject`] is the in-process substrate: a JSON document that can
//! be a target, an owner, or both.
//!
//! # Architecture
//!
//! Everything is single-threaded and callback driven: objects are shared
//! with `Rc`, mutate through `RefCell`, and deliver notifications
//! synchronously. Owners and targets are only ever held through `Weak`.
//!
//! # Invariants
//!
//! 1. After `bind` returns, the owner property equals the target's value.
//! 2. Every later change is written into the owner before the substrate's
//!    write call returns.
//! 3. After `unbind` returns, no further change reaches the owner.
//! 4. Rebinding a name removes all observation of the old target.
//! 5. Names bound to the same source all update, in bind order.

pub mod adapter;
pub mod config;
pub mod object;
pub mod registry;
pub mod store;

pub use adapter::{Change, ObservationAdapter, ObservationToken};
#[cfg(feature = "policy-config")]
pub use config::ConfigError;
pub use config::RegistryConfig;
pub use object::ObservableObject;
pub use registry::{BindingInfo, BindingRegistry};
pub use store::{Binding, BindingEntryStore};
