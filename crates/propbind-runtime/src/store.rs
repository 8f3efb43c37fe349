#![forbid(unsafe_code)]

//! Per-owner storage of binding records.
//!
//! The [`BindingEntryStore`] maps binding names to [`Binding`] records and
//! answers the reverse lookups the registry needs when a notification comes
//! back: by `(target, key path)` pair and by observation token.
//!
//! # Invariants
//!
//! 1. At most one `Binding` per name.
//! 2. Inserting under an existing name hands the displaced record back to the
//!    caller (`#[must_use]`), so its token is never silently orphaned.
//! 3. Multi-result lookups and enumeration follow insertion order.

use std::rc::Weak;

use ahash::AHashMap;
use propbind_core::{KeyPath, KeyValueObserving, ObjectId};

use crate::adapter::ObservationToken;

/// One directional link from a target's key path to an owner property.
pub struct Binding {
    name: String,
    owner_path: KeyPath,
    target: Weak<dyn KeyValueObserving>,
    target_id: ObjectId,
    key_path: KeyPath,
    token: ObservationToken,
    seq: u64,
}

impl Binding {
    /// Create a record for `name`, observing `key_path` on `target` via `token`.
    ///
    /// `owner_path` is the parsed form of `name`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        owner_path: KeyPath,
        target: Weak<dyn KeyValueObserving>,
        key_path: KeyPath,
        token: ObservationToken,
    ) -> Self {
        let target_id = ObjectId::of_weak(&target);
        Self {
            name: name.into(),
            owner_path,
            target,
            target_id,
            key_path,
            token,
            seq: 0,
        }
    }

    /// The binding name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owner property the binding writes, as a key path.
    #[must_use]
    pub fn owner_path(&self) -> &KeyPath {
        &self.owner_path
    }

    /// Non-owning reference to the target.
    #[must_use]
    pub fn target(&self) -> &Weak<dyn KeyValueObserving> {
        &self.target
    }

    /// Identity of the target.
    #[must_use]
    pub fn target_id(&self) -> ObjectId {
        self.target_id
    }

    /// Whether the target is still alive.
    #[must_use]
    pub fn target_alive(&self) -> bool {
        self.target.strong_count() > 0
    }

    /// Observed key path on the target.
    #[must_use]
    pub fn key_path(&self) -> &KeyPath {
        &self.key_path
    }

    /// Observation token needed to unsubscribe.
    #[must_use]
    pub fn token(&self) -> ObservationToken {
        self.token
    }

    fn watches(&self, target: ObjectId, key_path: &KeyPath) -> bool {
        self.target_id == target && &self.key_path == key_path
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("target", &self.target_id)
            .field("key_path", &self.key_path)
            .field("token", &self.token)
            .field("target_alive", &self.target_alive())
            .finish()
    }
}

/// Name-keyed binding records for one owner.
#[derive(Debug, Default)]
pub struct BindingEntryStore {
    entries: AHashMap<String, Binding>,
    next_seq: u64,
}

impl BindingEntryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `binding`, returning the record it displaced, if any.
    #[must_use = "a displaced binding still holds an active observation token"]
    pub fn insert(&mut self, mut binding: Binding) -> Option<Binding> {
        binding.seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(binding.name.clone(), binding)
    }

    /// Look up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entries.get(name)
    }

    /// Whether `name` has a record.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Records watching `key_path` on `target`, in insertion order.
    #[must_use]
    pub fn find_by_source(&self, target: ObjectId, key_path: &KeyPath) -> Vec<&Binding> {
        let mut found: Vec<&Binding> = self
            .entries
            .values()
            .filter(|binding| binding.watches(target, key_path))
            .collect();
        found.sort_by_key(|binding| binding.seq);
        found
    }

    /// The record installed with `token`.
    #[must_use]
    pub fn find_by_token(&self, token: ObservationToken) -> Option<&Binding> {
        self.entries.values().find(|binding| binding.token == token)
    }

    /// Remove by name.
    pub fn remove(&mut self, name: &str) -> Option<Binding> {
        self.entries.remove(name)
    }

    /// All records in insertion order.
    #[must_use]
    pub fn iter(&self) -> Vec<&Binding> {
        let mut all: Vec<&Binding> = self.entries.values().collect();
        all.sort_by_key(|binding| binding.seq);
        all
    }

    /// Binding names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.iter()
            .into_iter()
            .map(|binding| binding.name.clone())
            .collect()
    }

    /// Remove every record, in insertion order.
    pub fn drain(&mut self) -> Vec<Binding> {
        let mut all: Vec<Binding> = self.entries.drain().map(|(_, binding)| binding).collect();
        all.sort_by_key(|binding| binding.seq);
        all
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
