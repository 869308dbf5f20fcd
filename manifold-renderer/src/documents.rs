//! Multi-document YAML → [`ResourceObject`] parsing.

use serde::Deserialize;
use serde_json::Value;

use manifold_core::{ObjectError, ResourceObject};

use crate::error::SourceError;

/// Parse every document in `text` into a resource object.
///
/// Empty and `null` documents are skipped. A document of kind `List` is
/// flattened into its `items`, which must be a sequence. `origin` names the template or file in errors.
pub fn parse_documents(text: &str, origin: &str) -> Result<Vec<ResourceObject>, SourceError> {
    let mut objects = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = Value::deserialize(document).map_err(|source| SourceError::Yaml {
            origin: origin.to_string(),
            source,
        })?;
        if value.is_null() {
            continue;
        }
        let to_object = |value: Value| {
            ResourceObject::from_value(value).map_err(|source| SourceError::Object {
                origin: origin.to_string(),
                index,
                source,
            })
        };
        match value {
            Value::Object(mut map) if map.get("kind").and_then(Value::as_str) == Some("List") => {
                let Some(Value::Array(items)) = map.remove("items") else {
                    return Err(SourceError::Object {
                        origin: origin.to_string(),
                        index,
                        source: ObjectError::InvalidListItems,
                    });
                };
                for item in items {
                    objects.push(to_object(item)?);
                }
            }
            other => objects.push(to_object(other)?),
        }
    }
    Ok(objects)
}
