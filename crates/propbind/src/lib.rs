#![forbid(unsafe_code)]

//! propbind public facade.
//!
//! Re-exports the core vocabulary and the binding engine, plus a
//! [`prelude`] for glob import.
//!
//! ```
//! use propbind::prelude::*;
//! use serde_json::json;
//!
//! let owner = ObservableObject::shared(json!({}));
//! let model = ObservableObject::shared(json!({"count": 1}));
//! let registry = BindingRegistry::new(&owner);
//! registry.bind("label", &model, "count").unwrap();
//! model.set("count", 2).unwrap();
//! assert_eq!(owner.get("label"), Some(json!(2)));
//! ```

pub use propbind_core::{
    BindingError, KeyPath, KeyPathError, KeyValueCoding, KeyValueObserving, ObjectId, Observer,
    ObserverId, Value,
};
pub use propbind_runtime::{
    Binding, BindingEntryStore, BindingInfo, BindingRegistry, Change, ObservableObject,
    ObservationAdapter, ObservationToken, RegistryConfig,
};

/// Glob-importable set of the commonly used types.
pub mod prelude {
    pub use propbind_core::{
        BindingError, KeyPath, KeyValueCoding, KeyValueObserving, ObjectId, Value,
    };
    pub use propbind_runtime::{BindingRegistry, ObservableObject, RegistryConfig};
}
