use crate::Database;
use crate::models::DocumentRow;
use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension};
use serde_json::{Map, Value};

impl Database {
    // -- Reads --

    pub fn get_document(&self, collection: &str, id: &str) -> Result<Option<DocumentRow>> {
        self.with_conn(|conn| query_document(conn, collection, id))
    }

    /// Every document of a collection, oldest first.
    pub fn list_documents(&self, collection: &str) -> Result<Vec<DocumentRow>> {
        self.with_conn(|conn| query_collection(conn, collection))
    }

    // -- Writes --

    pub fn insert_document(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<()> {
        let body = serde_json::to_string(data)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)",
                (collection, id, &body),
            )?;
            Ok(())
        })
    }

    /// Create or replace a document. Returns true if it already existed.
    pub fn set_document(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<bool> {
        let body = serde_json::to_string(data)?;
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existed = tx
                .query_row(
                    "SELECT 1 FROM documents WHERE collection = ?1 AND id = ?2",
                    (collection, id),
                    |_| Ok(()),
                )
                .optional()?
                .is_some();

            if existed {
                tx.execute(
                    "UPDATE documents SET data = ?3, updated_at = datetime('now')
                     WHERE collection = ?1 AND id = ?2",
                    (collection, id, &body),
                )?;
            } else {
                tx.execute(
                    "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)",
                    (collection, id, &body),
                )?;
            }

            tx.commit()?;
            Ok(existed)
        })
    }

    /// Merge top-level fields into an existing document.
    /// Fields not named in `fields` are left untouched.
    pub fn merge_document(&self, collection: &str, id: &str, fields: &Map<String, Value>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let row = query_document(&tx, collection, id)?
                .ok_or_else(|| anyhow!("Document not found: {}/{}", collection, id))?;

            let mut data: Map<String, Value> = serde_json::from_str(&row.data)?;
            for (key, value) in fields {
                data.insert(key.clone(), value.clone());
            }

            tx.execute(
                "UPDATE documents SET data = ?3, updated_at = datetime('now')
                 WHERE collection = ?1 AND id = ?2",
                (collection, id, serde_json::to_string(&data)?),
            )?;

            tx.commit()?;
            Ok(())
        })
    }

    /// Returns true if a document was removed.
    pub fn delete_document(&self, collection: &str, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                (collection, id),
            )?;
            Ok(removed > 0)
        })
    }
}

fn document_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        collection: row.get(0)?,
        id: row.get(1)?,
        data: row.get(2)?,
    })
}

fn query_document(conn: &Connection, collection: &str, id: &str) -> Result<Option<DocumentRow>> {
    let mut stmt = conn.prepare("SELECT collection, id, data FROM documents WHERE collection = ?1 AND id = ?2")?;
    let row = stmt.query_row((collection, id), document_row).optional()?;
    Ok(row)
}

fn query_collection(conn: &Connection, collection: &str) -> Result<Vec<DocumentRow>> {
    let mut stmt = conn.prepare(
        "SELECT collection, id, data FROM documents WHERE collection = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;

    let rows = stmt
        .query_map([collection], document_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
