use indexmap::IndexMap;

use crate::value::Value;

/// The namespace of bindings produced by directive evaluation.
///
/// Insertion-ordered so that repeated runs render identically. Written only
/// by import resolution: a namespace key, an alias, or exposed names.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    bindings: IndexMap<String, Value>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.bindings.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.bindings.iter()
    }
}
