//! Domain types for rendered manifests.
//!
//! A [`ResourceObject`] is an untyped mapping in the shape of a cluster
//! manifest (`apiVersion`, `kind`, `metadata`, ...). Only the fields the
//! pipeline needs are surfaced through accessors; everything else is carried
//! through untouched.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ObjectError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name identifying a configured source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceName(pub String);

impl SourceName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SourceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SourceName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identity of a resource object: `(kind, namespace, name)`.
///
/// Cluster-scoped objects carry an empty namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

// ---------------------------------------------------------------------------
// Cluster scope
// ---------------------------------------------------------------------------

const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "APIService",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "IngressClass",
    "MutatingWebhookConfiguration",
    "Namespace",
    "PersistentVolume",
    "PriorityClass",
    "StorageClass",
    "ValidatingWebhookConfiguration",
];

/// Whether `kind` is a well-known cluster-scoped kind.
///
/// Unknown kinds are assumed to be namespaced.
pub fn is_cluster_scoped(kind: &str) -> bool {
    CLUSTER_SCOPED_KINDS.contains(&kind)
}

// ---------------------------------------------------------------------------
// ResourceObject
// ---------------------------------------------------------------------------

/// One manifest, stored as an untyped JSON mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct ResourceObject {
    object: Map<String, Value>,
}

impl ResourceObject {
    /// Build a minimal object with `apiVersion`, `kind` and `metadata.name`
    /// (plus `metadata.namespace` when non-empty).
    pub fn new(api_version: &str, kind: &str, namespace: &str, name: &str) -> Self {
        let mut metadata = Map::new();
        metadata.insert("name".into(), Value::String(name.to_string()));
        if !namespace.is_empty() {
            metadata.insert("namespace".into(), Value::String(namespace.to_string()));
        }
        let mut object = Map::new();
        object.insert("apiVersion".into(), Value::String(api_version.to_string()));
        object.insert("kind".into(), Value::String(kind.to_string()));
        object.insert("metadata".into(), Value::Object(metadata));
        Self { object }
    }

    /// Validate and wrap an arbitrary JSON value.
    pub fn from_value(value: Value) -> Result<Self, ObjectError> {
        let object = match value {
            Value::Object(map) => map,
            other => {
                return Err(ObjectError::NotAnObject {
                    found: value_type_name(&other),
                })
            }
        };
        if !matches!(object.get("kind"), Some(Value::String(_))) {
            return Err(ObjectError::MissingKind);
        }
        match object.get("metadata") {
            None | Some(Value::Object(_)) => {}
            Some(_) => return Err(ObjectError::InvalidMetadata),
        }
        Ok(Self { object })
    }

    pub fn api_version(&self) -> &str {
        self.object
            .get("apiVersion")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn kind(&self) -> &str {
        self.object
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.metadata_str("name")
    }

    /// Namespace, or `""` when unset.
    pub fn namespace(&self) -> &str {
        self.metadata_str("namespace")
    }

    pub fn set_namespace(&mut self, namespace: &str) {
        self.metadata_mut()
            .insert("namespace".into(), Value::String(namespace.to_string()));
    }

    /// The object's identity tuple.
    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            kind: self.kind().to_string(),
            namespace: self.namespace().to_string(),
            name: self.name().to_string(),
        }
    }

    /// String-valued labels. Non-string entries are ignored.
    pub fn labels(&self) -> BTreeMap<String, String> {
        self.string_map("labels")
    }

    /// Replace all labels. An empty map removes the `labels` field.
    pub fn set_labels(&mut self, labels: BTreeMap<String, String>) {
        self.set_string_map("labels", labels);
    }

    /// String-valued annotations. Non-string entries are ignored.
    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.string_map("annotations")
    }

    /// Replace all annotations. An empty map removes the `annotations` field.
    pub fn set_annotations(&mut self, annotations: BTreeMap<String, String>) {
        self.set_string_map("annotations", annotations);
    }

    /// Top-level field lookup, e.g. `spec`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.object.get(field)
    }

    /// JSON-pointer lookup, e.g. `/spec/replicas`.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        if pointer.is_empty() {
            return None;
        }
        let mut segments = pointer.trim_start_matches('/').split('/');
        let first = segments.next()?;
        let mut current = self.object.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.object
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.object)
    }

    fn metadata(&self) -> Option<&Map<String, Value>> {
        self.object.get("metadata").and_then(Value::as_object)
    }

    fn metadata_str(&self, field: &str) -> &str {
        self.metadata()
            .and_then(|m| m.get(field))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        let entry = self
            .object
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(map) => map,
            _ => unreachable!("metadata was just normalised to a mapping"),
        }
    }

    fn string_map(&self, field: &str) -> BTreeMap<String, String> {
        self.metadata()
            .and_then(|m| m.get(field))
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn set_string_map(&mut self, field: &str, entries: BTreeMap<String, String>) {
        let metadata = self.metadata_mut();
        if entries.is_empty() {
            metadata.remove(field);
            return;
        }
        let map: Map<String, Value> = entries
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        metadata.insert(field.to_string(), Value::Object(map));
    }
}

impl TryFrom<Value> for ResourceObject {
    type Error = ObjectError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<ResourceObject> for Value {
    fn from(obj: ResourceObject) -> Self {
        obj.into_value()
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
