use serde::{Deserialize, Serialize};

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// Emitted by the backend after every successful write.
///
/// Watchers only care about the collection; the document id and kind are
/// carried for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub collection: String,
    pub document_id: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(collection: impl Into<String>, document_id: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            collection: collection.into(),
            document_id: document_id.into(),
            kind,
        }
    }

    /// Returns true if this event belongs to the given collection path.
    pub fn touches(&self, collection: &str) -> bool {
        self.collection == collection
    }
}
