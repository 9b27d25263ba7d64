use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A structural value parsed from a YAML document.
///
/// Mapping entries retain the 1-based source line of their key; see
/// [`Mapping`]. Everything else carries no position of its own.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Sequence(Vec<Value>),
    Mapping(Mapping),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Convenience lookup for mapping values; `None` on non-mappings.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Truthiness used by `.switch` guards: null, false, zero, and empty
    /// containers/strings are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Sequence(items) => !items.is_empty(),
            Value::Mapping(map) => !map.is_empty(),
        }
    }

    /// String form of a scalar, `None` for sequences and mappings.
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            Value::Null => Some("null".to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Str(s) => Some(s.clone()),
            Value::Sequence(_) | Value::Mapping(_) => None,
        }
    }

    /// Short name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Mapping(map)
    }
}

/// A mapping value paired with the 1-based source line of its key.
#[derive(Debug, Clone, PartialEq)]
pub struct Positioned {
    pub line: usize,
    pub value: Value,
}

impl Positioned {
    pub fn new(line: usize, value: Value) -> Self {
        Self { line, value }
    }
}

/// An insertion-ordered mapping whose entries remember where their keys were
/// declared. Keys are always strings; scalar keys are coerced by the loader.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    entries: IndexMap<String, Positioned>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, line: usize, value: Value) {
        self.entries.insert(key.into(), Positioned::new(line, value));
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|slot| &slot.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key).map(|slot| &mut slot.value)
    }

    pub fn slot(&self, key: &str) -> Option<&Positioned> {
        self.entries.get(key)
    }

    /// Source line of a key, if present.
    pub fn line_of(&self, key: &str) -> Option<usize> {
        self.entries.get(key).map(|slot| slot.line)
    }

    pub fn remove(&mut self, key: &str) -> Option<Positioned> {
        self.entries.shift_remove(key)
    }

    /// Rename a key in place, keeping its value and recorded line.
    /// Returns false when `from` is absent.
    pub fn rename_key(&mut self, from: &str, to: &str) -> bool {
        match self.entries.shift_remove(from) {
            Some(slot) => {
                self.entries.insert(to.to_string(), slot);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Positioned)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Append every entry of `other`, overwriting duplicate keys.
    pub fn merge(&mut self, other: Mapping) {
        for (key, slot) in other.entries {
            self.entries.insert(key, slot);
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, slot) in map.iter() {
                    out.serialize_entry(key, &slot.value)?;
                }
                out.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Mapping {
        let mut map = Mapping::new();
        map.insert("host", 1, Value::from("localhost"));
        map.insert("port", 2, Value::from(8080));
        map
    }

    #[test]
    fn test_insert_and_get() {
        let map = sample();
        assert_eq!(map.get("host"), Some(&Value::from("localhost")));
        assert_eq!(map.get("port"), Some(&Value::from(8080)));
        assert_eq!(map.get("missing"), None);
    }

    #[test]
    fn test_line_of() {
        let map = sample();
        assert_eq!(map.line_of("host"), Some(1));
        assert_eq!(map.line_of("port"), Some(2));
        assert_eq!(map.line_of("missing"), None);
    }

    #[test]
    fn test_rename_key_preserves_line_and_value() {
        let mut map = sample();
        assert!(map.rename_key("port", "listen"));
        assert!(!map.contains_key("port"));
        assert_eq!(map.get("listen"), Some(&Value::from(8080)));
        assert_eq!(map.line_of("listen"), Some(2));
    }

    #[test]
    fn test_rename_key_missing() {
        let mut map = sample();
        assert!(!map.rename_key("nope", "other"));
    }

    #[test]
    fn test_insertion_order() {
        let map = sample();
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, vec!["host", "port"]);
    }

    #[test]
    fn test_merge_overwrites() {
        let mut map = sample();
        let mut other = Mapping::new();
        other.insert("port", 9, Value::from(9090));
        other.insert("tls", 10, Value::from(true));
        map.merge(other);
        assert_eq!(map.get("port"), Some(&Value::from(9090)));
        assert_eq!(map.get("tls"), Some(&Value::from(true)));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::Sequence(vec![]).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(7).is_truthy());
        assert!(Value::from("yes").is_truthy());
    }

    #[test]
    fn test_scalar_string() {
        assert_eq!(Value::Null.scalar_string(), Some("null".to_string()));
        assert_eq!(Value::Int(3).scalar_string(), Some("3".to_string()));
        assert_eq!(Value::from("x").scalar_string(), Some("x".to_string()));
        assert_eq!(Value::Sequence(vec![]).scalar_string(), None);
    }

    #[test]
    fn test_serialize_to_yaml() {
        let mut inner = Mapping::new();
        inner.insert("name", 2, Value::from("core"));
        let mut map = Mapping::new();
        map.insert("server", 1, Value::Mapping(inner));
        map.insert("ports", 3, Value::Sequence(vec![Value::from(80), Value::from(443)]));
        let yaml = serde_yaml::to_string(&Value::Mapping(map)).unwrap();
        assert_eq!(yaml, "server:\n  name: core\nports:\n- 80\n- 443\n");
    }

    #[test]
    fn test_serialize_to_json() {
        let mut map = Mapping::new();
        map.insert("n", 1, Value::Int(1));
        map.insert("none", 2, Value::Null);
        let json = serde_json::to_string(&Value::Mapping(map)).unwrap();
        assert_eq!(json, r#"{"n":1,"none":null}"#);
    }
}
