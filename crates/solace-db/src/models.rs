//! Database row types, one per SQLite row shape.
//! Callers decode `data` into `solace_types::Document` via `into_document`.

use anyhow::{Context, Result};
use solace_types::Document;

pub struct DocumentRow {
    pub collection: String,
    pub id: String,
    /// JSON object text.
    pub data: String,
}

impl DocumentRow {
    pub fn into_document(self) -> Result<Document> {
        let data = serde_json::from_str(&self.data)
            .with_context(|| format!("corrupt document {}/{}", self.collection, self.id))?;
        Ok(Document::new(self.id, data))
    }
}
