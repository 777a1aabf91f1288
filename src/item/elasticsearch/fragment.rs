use mongodb::bson::{Bson, Document};
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::{
    core::item::{ItemProcessor, ItemProcessorResult},
    BatchError,
};

const ID_FIELD: &str = "_id";

/// One document in bulk format: the action line followed by the body line,
/// each terminated by `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFragment {
    id: String,
    bytes: Vec<u8>,
}

impl BulkFragment {
    /// Identifier the document is indexed under.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Serialize)]
struct ActionDescriptor<'a> {
    index: IndexAction<'a>,
}

#[derive(Serialize)]
struct IndexAction<'a> {
    #[serde(rename = "_id")]
    id: &'a str,
    #[serde(rename = "_index")]
    index: &'a str,
}

/// Turns a MongoDB document into a bulk `index` fragment for `index`.
///
/// The `_id` field moves into the action line and is left out of the body.
pub struct BulkFragmentProcessor {
    index: String,
}

impl BulkFragmentProcessor {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
        }
    }

    pub fn encode(&self, document: &Document) -> Result<BulkFragment, BatchError> {
        let mut body = document.clone();

        let id = match body.remove(ID_FIELD) {
            Some(value) => document_id(&value)?,
            None => return Err(BatchError::Encode("document has no _id".to_string())),
        };

        let descriptor = ActionDescriptor {
            index: IndexAction {
                id: &id,
                index: &self.index,
            },
        };

        let mut bytes = serde_json::to_vec(&descriptor)
            .map_err(|err| BatchError::Encode(format!("action line of {id}: {err}")))?;
        bytes.push(b'\n');

        let body = document_to_map(body)
            .map_err(|err| BatchError::Encode(format!("document {id}: {err}")))?;
        serde_json::to_writer(&mut bytes, &body)
            .map_err(|err| BatchError::Encode(format!("document {id}: {err}")))?;
        bytes.push(b'\n');

        Ok(BulkFragment { id, bytes })
    }
}

impl ItemProcessor<Document, BulkFragment> for BulkFragmentProcessor {
    fn process(&self, item: &Document) -> ItemProcessorResult<BulkFragment> {
        self.encode(item)
    }
}

fn document_id(value: &Bson) -> Result<String, BatchError> {
    match value {
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        Bson::String(id) if !id.is_empty() => Ok(id.clone()),
        Bson::Int32(id) => Ok(id.to_string()),
        Bson::Int64(id) => Ok(id.to_string()),
        other => Err(BatchError::Encode(format!(
            "unsupported _id {other} of type {:?}",
            other.element_type()
        ))),
    }
}

/// Converts a document into an ordered JSON object, keeping field order.
pub fn document_to_map(document: Document) -> Result<Map<String, Value>, String> {
    document
        .into_iter()
        .map(|(key, value)| {
            let value = bson_to_json(value).map_err(|err| format!("field {key}: {err}"))?;
            Ok::<_, String>((key, value))
        })
        .collect()
}

fn bson_to_json(value: Bson) -> Result<Value, String> {
    let json = match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(flag) => Value::Bool(flag),
        Bson::Int32(number) => Value::from(number),
        Bson::Int64(number) => Value::from(number),
        Bson::Double(number) => Number::from_f64(number)
            .map(Value::Number)
            .ok_or_else(|| format!("unsupported value {number}"))?,
        Bson::String(text) => Value::String(text),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(date) => match date.try_to_rfc3339_string() {
            Ok(text) => Value::String(text),
            Err(_) => {
                return Err(format!(
                    "date {} ms is outside the RFC 3339 range",
                    date.timestamp_millis()
                ));
            }
        },
        Bson::Decimal128(decimal) => Value::String(decimal.to_string()),
        Bson::Array(items) => Value::Array(
            items
                .into_iter()
                .map(bson_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Bson::Document(nested) => Value::Object(document_to_map(nested)?),
        other => other.into_relaxed_extjson(),
    };

    Ok(json)
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{doc, oid::ObjectId, DateTime, Decimal128};

    use super::*;

    fn lines(fragment: &BulkFragment) -> Vec<Value> {
        fragment
            .as_bytes()
            .split(|byte| *byte == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).unwrap())
            .collect()
    }

    #[test]
    fn encodes_action_line_then_body_without_id() {
        let oid = ObjectId::parse_str("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
        let processor = BulkFragmentProcessor::new("books");

        let fragment = processor
            .encode(&doc! { "_id": oid, "title": "Dune", "year": 1965 })
            .unwrap();

        assert_eq!(fragment.id(), "65a1f0c2e4b0a1b2c3d4e5f6");
        assert_eq!(
            String::from_utf8(fragment.as_bytes().to_vec()).unwrap(),
            "{\"index\":{\"_id\":\"65a1f0c2e4b0a1b2c3d4e5f6\",\"_index\":\"books\"}}\n\
             {\"title\":\"Dune\",\"year\":1965}\n"
        );
    }

    #[test]
    fn id_is_only_in_the_action_line() {
        let processor = BulkFragmentProcessor::new("books");

        let fragment = processor
            .encode(&doc! { "_id": ObjectId::new(), "nested": { "_id": "kept" } })
            .unwrap();

        let lines = lines(&fragment);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["index"]["_id"], fragment.id());
        assert!(lines[1].get("_id").is_none());
        assert_eq!(lines[1]["nested"]["_id"], "kept");
    }

    #[test]
    fn encoding_is_deterministic() {
        let processor = BulkFragmentProcessor::new("books");
        let document = doc! {
            "_id": ObjectId::new(),
            "z": 1,
            "a": [1.5, "two", null],
            "published": DateTime::from_millis(0),
        };

        assert_eq!(
            processor.encode(&document).unwrap(),
            processor.encode(&document).unwrap()
        );
    }

    #[test]
    fn keeps_source_field_order_and_converts_types() {
        let author = ObjectId::new();
        let processor = BulkFragmentProcessor::new("books");

        let fragment = processor
            .encode(&doc! {
                "_id": "isbn-0441013597",
                "z": true,
                "author": author,
                "published": DateTime::from_millis(0),
                "ratings": [4.5, 5],
            })
            .unwrap();

        let body = &lines(&fragment)[1];
        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "author", "published", "ratings"]);
        assert_eq!(body["author"], author.to_hex());
        assert_eq!(body["published"], "1970-01-01T00:00:00Z");
        assert_eq!(body["ratings"], serde_json::json!([4.5, 5]));
        assert_eq!(fragment.id(), "isbn-0441013597");
    }

    #[test]
    fn integer_ids_are_rendered_in_decimal() {
        let processor = BulkFragmentProcessor::new("books");

        let fragment = processor.encode(&doc! { "_id": 42_i64 }).unwrap();

        assert_eq!(fragment.id(), "42");
        assert!(fragment.as_bytes().ends_with(b"{}\n"));
    }

    #[test]
    fn rejects_documents_without_usable_id() {
        let processor = BulkFragmentProcessor::new("books");

        assert!(matches!(
            processor.encode(&doc! { "title": "no id" }),
            Err(BatchError::Encode(_))
        ));
        assert!(matches!(
            processor.encode(&doc! { "_id": { "compound": 1 } }),
            Err(BatchError::Encode(_))
        ));
        assert!(matches!(
            processor.encode(&doc! { "_id": "" }),
            Err(BatchError::Encode(_))
        ));
    }

    #[test]
    fn rejects_values_json_cannot_represent() {
        let processor = BulkFragmentProcessor::new("books");

        let result = processor.encode(&doc! { "_id": 1, "score": { "value": f64::NAN } });

        match result {
            Err(BatchError::Encode(message)) => assert!(message.contains("score")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn decimals_are_rendered_as_plain_strings() {
        let processor = BulkFragmentProcessor::new("books");
        let price: Decimal128 = "1.5".parse().unwrap();

        let fragment = processor.encode(&doc! { "_id": 1, "price": price }).unwrap();

        assert!(fragment.as_bytes().ends_with(b"{\"price\":\"1.5\"}\n"));
    }

    #[test]
    fn rejects_dates_outside_rfc_3339_range() {
        let processor = BulkFragmentProcessor::new("books");

        let result = processor.encode(&doc! {
            "_id": 1,
            "published": DateTime::from_millis(i64::MAX),
        });

        match result {
            Err(BatchError::Encode(message)) => assert!(message.contains("published")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
