use serde::Serialize;
use serde_json::Value;
use crate::core::error::Result;
use crate::core::types::{DocId, Fields, ID_FIELD};
use crate::storage::codec::to_fields;

/// Partial attribute map; a document matches when every listed key is equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    terms: Fields,
}

impl Predicate {
    /// The empty predicate, matching every document
    pub fn all() -> Self {
        Predicate::default()
    }

    pub fn by_id(id: &DocId) -> Self {
        Predicate::all().field(ID_FIELD, id.as_str())
    }

    /// Builds a predicate from anything that serializes to a JSON object.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Predicate { terms: to_fields(value)? })
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.terms.insert(key.into(), value.into());
        self
    }

    /// Value of the `id` term, which turns the predicate into a point lookup
    pub fn id(&self) -> Option<&Value> {
        self.terms.get(ID_FIELD)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.terms.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl From<Fields> for Predicate {
    fn from(terms: Fields) -> Self {
        Predicate { terms }
    }
}
