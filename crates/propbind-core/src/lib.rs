#![forbid(unsafe_code)]

//! Core vocabulary for propbind.
//!
//! This crate defines the pieces every other propbind crate speaks in:
//!
//! - [`KeyPath`]: a validated, dot-separated path into a nested value.
//! - [`value`]: read/write helpers that walk a [`Value`] tree by key path.
//! - [`KeyValueCoding`] / [`KeyValueObserving`]: the capabilities a host
//!   object supplies so it can be bound from, or bound into.
//! - [`ObjectId`]: pointer identity for shared objects.
//! - [`BindingError`]: the error taxonomy of the binding engine.
//!
//! The engine itself (observation adapter, entry store, registry) lives in
//! `propbind-runtime`.

pub mod coding;
pub mod error;
pub mod key_path;
pub mod value;

pub use coding::{KeyValueCoding, KeyValueObserving, ObjectId, Observer, ObserverId};
pub use error::BindingError;
pub use key_path::{KeyPath, KeyPathError};
pub use serde_json::Value;
