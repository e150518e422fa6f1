//! Durable page and embedding storage
//!
//! Two SQLite relations: `pages` (url, title, text) and `embeddings`
//! (page_id, vector), with cascade delete from pages to embeddings.
//! Vectors are stored as little-endian f32 blobs; similarity search over
//! them lives in the retrieval module, which scans this store.
//!
//! The consistency rule enforced by the ingestion path: a page row exists
//! iff all of its section embeddings were persisted. The store supports
//! that with `delete_page` (cascading) for rollback and a transactional
//! `insert_embeddings`.

use crate::error::Result;
use serde::Serialize;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{FromRow, Row};
use std::path::Path;
use tracing::debug;

/// A stored documentation page
#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct Page {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub text: String,
}

/// A stored embedding row, decoded
#[derive(Debug, Clone)]
pub struct EmbeddingRow {
    pub id: i64,
    pub page_id: i64,
    pub vector: Vec<f32>,
}

/// Handle to the pages + embeddings store
#[derive(Clone)]
pub struct PageStore {
    pool: SqlitePool,
}

impl PageStore {
    /// Open (creating if missing) the store at the given path
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory store, used by tests
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        // a single connection so every query sees the same memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                title TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS embeddings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_id INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
                vector BLOB NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_embeddings_page ON embeddings(page_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a page row and return its id
    pub async fn insert_page(&self, url: &str, title: &str, text: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO pages (url, title, text) VALUES (?1, ?2, ?3)")
            .bind(url)
            .bind(title)
            .bind(text)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Delete a page; cascade removes any embeddings referencing it
    pub async fn delete_page(&self, page_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM pages WHERE id = ?1")
            .bind(page_id)
            .execute(&self.pool)
            .await?;
        debug!("Deleted page {}", page_id);
        Ok(())
    }

    /// Insert one embedding row per vector, in order, within a single
    /// transaction
    pub async fn insert_embeddings(&self, page_id: i64, vectors: &[Vec<f32>]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for vector in vectors {
            sqlx::query("INSERT INTO embeddings (page_id, vector) VALUES (?1, ?2)")
                .bind(page_id)
                .bind(serialize_vector(vector))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// All stored embeddings, decoded, ordered by id
    pub async fn all_embeddings(&self) -> Result<Vec<EmbeddingRow>> {
        let rows = sqlx::query("SELECT id, page_id, vector FROM embeddings ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| EmbeddingRow {
                id: row.get("id"),
                page_id: row.get("page_id"),
                vector: deserialize_vector(row.get("vector")),
            })
            .collect())
    }

    /// Fetch a single page by id
    pub async fn get_page(&self, page_id: i64) -> Result<Option<Page>> {
        let page = sqlx::query_as::<_, Page>("SELECT id, url, title, text FROM pages WHERE id = ?1")
            .bind(page_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(page)
    }

    /// Fetch pages for the given ids, preserving the order of `ids`
    pub async fn pages_by_ids(&self, ids: &[i64]) -> Result<Vec<Page>> {
        let mut pages = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(page) = self.get_page(*id).await? {
                pages.push(page);
            }
        }
        Ok(pages)
    }

    /// Number of page rows stored for a URL
    pub async fn count_pages_for_url(&self, url: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM pages WHERE url = ?1")
            .bind(url)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Number of embedding rows referencing a page
    pub async fn count_embeddings_for_page(&self, page_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM embeddings WHERE page_id = ?1")
            .bind(page_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

/// Encode a vector as a little-endian f32 blob
fn serialize_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a little-endian f32 blob back into a vector
fn deserialize_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_round_trip() {
        let vector = vec![1.0f32, -0.5, 0.25, 3.75];
        assert_eq!(deserialize_vector(&serialize_vector(&vector)), vector);
    }

    #[tokio::test]
    async fn test_insert_and_get_page() {
        let store = PageStore::in_memory().await.unwrap();
        let id = store
            .insert_page("https://x/a", "A", "body text")
            .await
            .unwrap();

        let page = store.get_page(id).await.unwrap().unwrap();
        assert_eq!(page.url, "https://x/a");
        assert_eq!(page.title, "A");
        assert_eq!(page.text, "body text");
    }

    #[tokio::test]
    async fn test_delete_page_cascades_to_embeddings() {
        let store = PageStore::in_memory().await.unwrap();
        let id = store.insert_page("https://x/a", "A", "text").await.unwrap();
        store
            .insert_embeddings(id, &[vec![0.1, 0.2], vec![0.3, 0.4]])
            .await
            .unwrap();
        assert_eq!(store.count_embeddings_for_page(id).await.unwrap(), 2);

        store.delete_page(id).await.unwrap();
        assert_eq!(store.count_pages_for_url("https://x/a").await.unwrap(), 0);
        assert_eq!(store.count_embeddings_for_page(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_all_embeddings_ordered_by_id() {
        let store = PageStore::in_memory().await.unwrap();
        let a = store.insert_page("https://x/a", "A", "t").await.unwrap();
        let b = store.insert_page("https://x/b", "B", "t").await.unwrap();
        store.insert_embeddings(a, &[vec![1.0]]).await.unwrap();
        store.insert_embeddings(b, &[vec![2.0]]).await.unwrap();

        let rows = store.all_embeddings().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].id < rows[1].id);
        assert_eq!(rows[0].page_id, a);
        assert_eq!(rows[1].page_id, b);
    }

    #[tokio::test]
    async fn test_pages_by_ids_preserves_order() {
        let store = PageStore::in_memory().await.unwrap();
        let a = store.insert_page("https://x/a", "A", "t").await.unwrap();
        let b = store.insert_page("https://x/b", "B", "t").await.unwrap();

        let pages = store.pages_by_ids(&[b, a]).await.unwrap();
        assert_eq!(pages[0].id, b);
        assert_eq!(pages[1].id, a);
    }
}
