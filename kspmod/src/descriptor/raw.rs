//! Typed views over untyped descriptor documents.
//!
//! Descriptors are published by many hands and their shapes drift: authors
//! may be a string or a list, versions may be numbers, relationships may be
//! objects or bare names. [`RawDescriptor`] keeps the document as a JSON
//! object and lets each normalization step pull out its own field through a
//! small polymorphic schema, so that a bad field fails alone.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

/// One descriptor document, known to be a JSON object.
#[derive(Debug, Clone)]
pub struct RawDescriptor {
    fields: Map<String, Value>,
}

impl RawDescriptor {
    /// Parse descriptor text.
    pub fn from_json(text: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| format!("not valid JSON: {}", e))?;
        Self::from_value(value)
    }

    /// Wrap an already-parsed document.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(format!("expected a JSON object, found {}", kind_of(&other))),
        }
    }

    /// Raw value of a key; JSON `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// Whether a key is present and not `null`.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Deserialize one field into `T`.
    ///
    /// Returns `Ok(None)` when the key is absent and an error message
    /// naming the expected shape when it does not fit.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, String> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| format!("unexpected shape for {:?} ({}): {}", key, kind_of(value), e)),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A value published either as a single item or as a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Flatten into a list.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

/// Text that some publishers write as a bare JSON number (`"ksp_version": 1.8`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TextValue {
    Text(String),
    Number(serde_json::Number),
}

impl TextValue {
    /// The value as text.
    pub fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

/// One entry of the `install` list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInstallStanza {
    #[serde(default)]
    pub find: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default, alias = "findRegex")]
    pub find_regexp: Option<String>,
    #[serde(default, alias = "installTo")]
    pub install_to: Option<String>,
}

/// One entry of `depends` / `conflicts`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRelationship {
    Named { name: String },
    AnyOf { any_of: Vec<RawRelationship> },
    Bare(String),
}

impl RawRelationship {
    /// The identifier this relationship points at.
    ///
    /// Alternatives (`any_of`) resolve to their first option.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Named { name } => Some(name.as_str()),
            Self::Bare(name) => Some(name.as_str()),
            Self::AnyOf { any_of } => any_of.first().and_then(|r| r.identifier()),
        }
    }
}

/// The `download_hash` object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDownloadHash {
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_non_object() {
        assert!(RawDescriptor::from_json("[1, 2]").is_err());
        assert!(RawDescriptor::from_json("not json").is_err());
        assert!(RawDescriptor::from_json("{}").is_ok());
    }

    #[test]
    fn test_null_is_absent() {
        let raw = RawDescriptor::from_value(json!({ "description": null })).unwrap();
        assert!(!raw.has("description"));
        assert!(raw.field::<String>("description").unwrap().is_none());
    }

    #[test]
    fn test_one_or_many() {
        let raw = RawDescriptor::from_value(json!({ "a": "x", "b": ["y", "z"] })).unwrap();
        let a: OneOrMany<String> = raw.field("a").unwrap().unwrap();
        let b: OneOrMany<String> = raw.field("b").unwrap().unwrap();
        assert_eq!(a.into_vec(), vec!["x"]);
        assert_eq!(b.into_vec(), vec!["y", "z"]);
    }

    #[test]
    fn test_shape_mismatch_is_error_not_panic() {
        let raw = RawDescriptor::from_value(json!({ "author": { "nested": true } })).unwrap();
        let err = raw.field::<OneOrMany<String>>("author").unwrap_err();
        assert!(err.contains("author"));
        assert!(err.contains("object"));
    }

    #[test]
    fn test_text_value_accepts_numbers() {
        let raw = RawDescriptor::from_value(json!({ "ksp_version": 1.8 })).unwrap();
        let value: TextValue = raw.field("ksp_version").unwrap().unwrap();
        assert_eq!(value.into_string(), "1.8");
    }

    #[test]
    fn test_relationship_shapes() {
        let rels: Vec<RawRelationship> = serde_json::from_value(json!([
            { "name": "ModuleManager", "min_version": "4.0" },
            "Kopernicus",
            { "any_of": [ { "name": "A" }, { "name": "B" } ] }
        ]))
        .unwrap();
        let ids: Vec<_> = rels.iter().filter_map(|r| r.identifier()).collect();
        assert_eq!(ids, vec!["ModuleManager", "Kopernicus", "A"]);
    }

    #[test]
    fn test_install_stanza_aliases() {
        let stanza: RawInstallStanza =
            serde_json::from_value(json!({ "findRegex": "^Foo", "installTo": "GameData" }))
                .unwrap();
        assert_eq!(stanza.find_regexp.as_deref(), Some("^Foo"));
        assert_eq!(stanza.install_to.as_deref(), Some("GameData"));
    }
}
