use serde::Serialize;
use serde_json::Value;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Document, Fields};

/// JSON codec for persisted units
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentCodec {
    pub pretty: bool,
}

impl DocumentCodec {
    pub fn new(pretty: bool) -> Self {
        DocumentCodec { pretty }
    }

    pub fn encode(&self, document: &Document) -> Result<String> {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(document)
        } else {
            serde_json::to_string(document)
        };
        encoded.map_err(|e| Error::encode(format!("serialize document {}", document.id), e))
    }

    /// Rejects malformed text and objects without a string `id`.
    pub fn decode(&self, text: &str) -> Result<Document> {
        serde_json::from_str(text).map_err(|e| Error::decode("parse persisted document", e))
    }

    pub fn generate_id(&self) -> DocId {
        DocId::generate()
    }
}

/// Converts any serializable value into an attribute map.
///
/// Values that fail to serialize (e.g. maps with non-string keys) or that are
/// not JSON objects are an `Encode` error.
pub fn to_fields<T: Serialize + ?Sized>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(Error::encode(
            "document must serialize to an object",
            format!("got {}", json_type(&other)),
        )),
        Err(e) => Err(Error::encode("serialize attributes", e)),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
