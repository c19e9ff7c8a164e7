//! Variable stores.
//!
//! A [`VariableStore`] is the evaluator's read-only view of named values.
//! Stores are cloned deeply through [`VariableStore::clone_store`], so a
//! context that captured a store never sees later writes to the source store.

use std::collections::HashMap;
use std::fmt;

use crate::el::Value;

/// Name → value lookup used while evaluating expressions.
pub trait VariableStore: fmt::Debug + Send + Sync {
    /// Value bound to `name`, or `None` when the store has no such variable.
    fn lookup(&self, name: &str) -> Option<Value>;

    /// Names of all variables, sorted.
    fn names(&self) -> Vec<String>;

    /// Deep copy of this store.
    fn clone_store(&self) -> Box<dyn VariableStore>;
}

impl Clone for Box<dyn VariableStore> {
    fn clone(&self) -> Self {
        self.clone_store()
    }
}

// ── NullVariableStore ─────────────────────────────────────────────────────────

/// A store in which every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullVariableStore;

impl VariableStore for NullVariableStore {
    fn lookup(&self, _name: &str) -> Option<Value> {
        None
    }

    fn names(&self) -> Vec<String> {
        Vec::new()
    }

    fn clone_store(&self) -> Box<dyn VariableStore> {
        Box::new(*self)
    }
}

// ── VariableTable ─────────────────────────────────────────────────────────────

/// A flat, mutable table of variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableTable {
    vars: HashMap<String, Value>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Remove a variable.  Returns `true` if it existed.
    pub fn unset(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Copy every variable of `other` into this table, overwriting.
    pub fn extend_from(&mut self, other: &VariableTable) {
        self.vars
            .extend(other.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl VariableStore for VariableTable {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vars.keys().cloned().collect();
        names.sort();
        names
    }

    fn clone_store(&self) -> Box<dyn VariableStore> {
        Box::new(self.clone())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for VariableTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        VariableTable {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ── LayeredVariableStore ──────────────────────────────────────────────────────

/// Several stores consulted in order; the first layer that knows a name wins.
#[derive(Debug, Clone, Default)]
pub struct LayeredVariableStore {
    layers: Vec<Box<dyn VariableStore>>,
}

impl LayeredVariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer consulted after all existing layers.
    pub fn push_layer(&mut self, layer: impl VariableStore + 'static) {
        self.layers.push(Box::new(layer));
    }

    /// Builder form of [`push_layer`](Self::push_layer).
    pub fn with_layer(mut self, layer: impl VariableStore + 'static) -> Self {
        self.push_layer(layer);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl VariableStore for LayeredVariableStore {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.layers.iter().find_map(|layer| layer.lookup(name))
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.layers.iter().flat_map(|l| l.names()).collect();
        names.sort();
        names.dedup();
        names
    }

    fn clone_store(&self) -> Box<dyn VariableStore> {
        Box::new(self.clone())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
