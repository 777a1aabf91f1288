use serde::Deserialize;
use serde_json::Value;

/// Reply of the `_bulk` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    /// Time taken in milliseconds.
    #[serde(default)]
    pub took: u64,
    /// Whether at least one item failed.
    pub errors: bool,
    /// Per-item outcomes, in payload order.
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

/// Outcome of one bulk action, keyed by the action name.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkItem {
    Index(BulkItemStatus),
    Create(BulkItemStatus),
    Update(BulkItemStatus),
    Delete(BulkItemStatus),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkItemStatus {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// A document the search engine refused to index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub id: String,
    pub reason: String,
}

impl BulkItem {
    pub fn status(&self) -> &BulkItemStatus {
        match self {
            BulkItem::Index(status)
            | BulkItem::Create(status)
            | BulkItem::Update(status)
            | BulkItem::Delete(status) => status,
        }
    }
}

impl BulkItemStatus {
    /// Describes the item error, `None` when the item succeeded.
    pub fn error_reason(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(reason) if reason.is_empty() => None,
            Value::String(reason) => Some(reason.clone()),
            Value::Object(fields) if fields.is_empty() => None,
            Value::Object(fields) => {
                match (
                    fields.get("type").and_then(Value::as_str),
                    fields.get("reason").and_then(Value::as_str),
                ) {
                    (Some(kind), Some(reason)) => Some(format!("{kind}: {reason}")),
                    (None, Some(reason)) => Some(reason.to_string()),
                    _ => Some(Value::Object(fields.clone()).to_string()),
                }
            }
            other => Some(other.to_string()),
        }
    }
}

impl BulkResponse {
    /// Items carrying an error.
    ///
    /// Always empty when the top-level `errors` flag is false, whatever the
    /// items say.
    pub fn failures(&self) -> Vec<BulkFailure> {
        if !self.errors {
            return Vec::new();
        }

        self.items
            .iter()
            .map(BulkItem::status)
            .filter_map(|status| {
                status.error_reason().map(|reason| BulkFailure {
                    id: status.id.clone().unwrap_or_default(),
                    reason,
                })
            })
            .collect()
    }
}
