use serde_json::Value;
use crate::core::types::{Document, ID_FIELD};
use crate::query::predicate::Predicate;

/// Check if document matches predicate
///
/// Strict subset equality: every predicate key must be present in the document
/// with an equal value. Extra document attributes are ignored, and nested
/// objects and arrays compare structurally.
pub fn matches(document: &Document, predicate: &Predicate) -> bool {
    predicate.iter().all(|(key, expected)| {
        if key == ID_FIELD {
            return matches_id(document, expected);
        }
        document.get(key) == Some(expected)
    })
}

fn matches_id(document: &Document, expected: &Value) -> bool {
    expected.as_str() == Some(document.id.as_str())
}

/// Keeps the documents matching `predicate`, preserving order.
pub fn filter(documents: Vec<Document>, predicate: &Predicate) -> Vec<Document> {
    if predicate.is_empty() {
        return documents;
    }
    documents
        .into_iter()
        .filter(|document| matches(document, predicate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::core::types::DocId;
    use crate::storage::codec::to_fields;

    fn doc(id: &str, value: Value) -> Document {
        Document::new(DocId::parse(id).unwrap(), to_fields(&value).unwrap())
    }

    #[test]
    fn test_empty_predicate_matches_everything() {
        assert!(matches(&doc("a", json!({})), &Predicate::all()));
        assert!(matches(&doc("b", json!({"x": 1})), &Predicate::all()));
    }

    #[test]
    fn test_subset_equality() {
        let d = doc("a", json!({"name": "test", "age": 3, "tags": ["x"]}));

        assert!(matches(&d, &Predicate::all().field("name", "test")));
        assert!(matches(&d, &Predicate::all().field("name", "test").field("age", 3)));
        assert!(matches(&d, &Predicate::all().field("tags", json!(["x"]))));
        assert!(!matches(&d, &Predicate::all().field("name", "other")));
        assert!(!matches(&d, &Predicate::all().field("missing", Value::Null)));
        assert!(!matches(&d, &Predicate::all().field("age", "3")));
    }

    #[test]
    fn test_id_term_compares_against_document_id() {
        let d = doc("abc", json!({"name": "test"}));
        assert!(matches(&d, &Predicate::by_id(&d.id)));
        assert!(matches(&d, &Predicate::by_id(&d.id).field("name", "test")));
        assert!(!matches(&d, &Predicate::by_id(&d.id).field("name", "nope")));
        assert!(!matches(&d, &Predicate::all().field("id", 5)));
    }

    #[test]
    fn test_filter_keeps_order() {
        let docs = vec![
            doc("1", json!({"k": "a"})),
            doc("2", json!({"k": "b"})),
            doc("3", json!({"k": "a"})),
        ];
        let kept: Vec<String> = filter(docs, &Predicate::all().field("k", "a"))
            .into_iter()
            .map(|d| d.id.to_string())
            .collect();
        assert_eq!(kept, vec!["1", "3"]);
    }
}
