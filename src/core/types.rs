use std::fmt;
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;
use crate::core::error::{Error, Result};

/// Open attribute map of a document
pub type Fields = Map<String, Value>;

/// Reserved attribute holding the document identifier
pub const ID_FIELD: &str = "id";

/// Engine-assigned document identifier, also the file stem of the persisted unit
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Time-ordered and unique for the lifetime of the process (UUIDv7).
    pub fn generate() -> Self {
        DocId(Uuid::now_v7().to_string())
    }

    /// Accepts only strings usable as a single file name.
    pub fn parse(raw: &str) -> Option<Self> {
        is_safe_component(raw).then(|| DocId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// True if `name` is a non-empty single path component.
pub(crate) fn is_safe_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// A stored document: the attribute map plus its `id`.
///
/// Serialized flat, so the persisted unit is a single JSON object whose `id`
/// sits next to the user attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    /// Builds a document, dropping any caller-provided `id` attribute.
    pub fn new(id: DocId, mut fields: Fields) -> Self {
        fields.remove(ID_FIELD);
        Document { id, fields }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Patch values overwrite existing keys; untouched keys persist. `id` never changes.
    pub fn merge(&mut self, patch: &Fields) {
        for (key, value) in patch {
            if key == ID_FIELD {
                continue;
            }
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// The full attribute map including `id`.
    pub fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        map.insert(ID_FIELD.to_string(), Value::String(self.id.0.clone()));
        Value::Object(map)
    }

    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_value())
            .map_err(|e| Error::decode(format!("document {} does not fit the requested type", self.id), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_generated_ids_are_unique_and_ordered() {
        let ids: Vec<DocId> = (0..256).map(|_| DocId::generate()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, ids);
    }

    #[test]
    fn test_parse_rejects_path_like_ids() {
        assert!(DocId::parse("abc").is_some());
        assert!(DocId::parse("").is_none());
        assert!(DocId::parse("..").is_none());
        assert!(DocId::parse("../etc").is_none());
        assert!(DocId::parse("a\\b").is_none());
    }

    #[test]
    fn test_new_strips_user_id() {
        let doc = Document::new(DocId("x".into()), fields(json!({"id": "mine", "name": "a"})));
        assert_eq!(doc.id.as_str(), "x");
        assert_eq!(doc.fields, fields(json!({"name": "a"})));
    }

    #[test]
    fn test_merge_preserves_id_and_untouched_keys() {
        let mut doc = Document::new(DocId("x".into()), fields(json!({"name": "old", "age": 3})));
        doc.merge(&fields(json!({"name": "new", "id": "hijack"})));
        assert_eq!(doc.id.as_str(), "x");
        assert_eq!(doc.to_value(), json!({"id": "x", "name": "new", "age": 3}));
    }

    #[test]
    fn test_deserialize_into_typed() {
        #[derive(Deserialize)]
        struct User {
            id: String,
            name: String,
        }

        let doc = Document::new(DocId("u1".into()), fields(json!({"name": "alice"})));
        let user: User = doc.deserialize_into().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.name, "alice");

        let err = doc.deserialize_into::<Vec<u8>>().unwrap_err();
        assert_eq!(err.kind(), crate::core::error::ErrorKind::Decode);
    }
}
