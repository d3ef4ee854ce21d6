//! SQLite-backed document store.
//!
//! Chunk metadata and embeddings live in SQLite (WAL journal, so readers get a
//! consistent snapshot while ingestion writes); similarity search is
//! brute-force cosine over the rows matching the type filter.

use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::store::{duplicate_document, illegal_transition, unknown_document, DocumentStore};
use super::types::{Chunk, Document, DocumentStatus, DocumentType, ScoredChunk};
use crate::core::config::AppPaths;
use crate::core::errors::RagError;
use crate::vector_math;

const UPSERT_CHUNK_SQL: &str = "INSERT INTO chunks
        (chunk_id, document_id, doc_type, position_index, content, embedding, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT(chunk_id) DO UPDATE SET
        document_id = excluded.document_id,
        doc_type = excluded.doc_type,
        position_index = excluded.position_index,
        content = excluded.content,
        embedding = excluded.embedding,
        created_at = excluded.created_at";

const SELECT_CHUNK_COLUMNS: &str =
    "SELECT chunk_id, document_id, doc_type, position_index, content, embedding, created_at
     FROM chunks";

pub struct SqliteDocumentStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteDocumentStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, RagError> {
        Self::with_path(paths.db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, RagError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        tracing::info!("SQLite document store ready at {}", store.db_path.display());
        Ok(store)
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                doc_type TEXT NOT NULL,
                page_count INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        // `seq` is the insertion rank used to break score ties.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                chunk_id TEXT NOT NULL UNIQUE,
                document_id TEXT NOT NULL,
                doc_type TEXT NOT NULL,
                position_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_doc_type ON chunks(doc_type)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Result<Chunk, RagError> {
        let chunk_id: String = row.try_get("chunk_id")?;
        let document_id: String = row.try_get("document_id")?;
        let doc_type: String = row.try_get("doc_type")?;
        let position_index: i64 = row.try_get("position_index")?;
        let created_at: String = row.try_get("created_at")?;
        let embedding: Option<Vec<u8>> = row.try_get("embedding")?;

        Ok(Chunk {
            id: parse_uuid(&chunk_id)?,
            text: row.try_get("content")?,
            embedding: embedding
                .map(|bytes| Self::deserialize_embedding(&bytes))
                .unwrap_or_default(),
            document_id: parse_uuid(&document_id)?,
            document_type: DocumentType::from_str(&doc_type).map_err(RagError::store)?,
            position_index: u32::try_from(position_index).map_err(RagError::store)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(RagError::store)?
                .with_timezone(&Utc),
        })
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document, RagError> {
        let id: String = row.try_get("id")?;
        let doc_type: String = row.try_get("doc_type")?;
        let page_count: i64 = row.try_get("page_count")?;
        let status: String = row.try_get("status")?;

        Ok(Document {
            id: parse_uuid(&id)?,
            filename: row.try_get("filename")?,
            document_type: DocumentType::from_str(&doc_type).map_err(RagError::store)?,
            page_count: u32::try_from(page_count).map_err(RagError::store)?,
            status: DocumentStatus::from_str(&status)?,
        })
    }
}

fn parse_uuid(value: &str) -> Result<Uuid, RagError> {
    Uuid::parse_str(value).map_err(|e| RagError::Store(format!("invalid id {}: {}", value, e)))
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn upsert(&self, chunk: Chunk) -> Result<(), RagError> {
        sqlx::query(UPSERT_CHUNK_SQL)
            .bind(chunk.id.to_string())
            .bind(chunk.document_id.to_string())
            .bind(chunk.document_type.as_str())
            .bind(i64::from(chunk.position_index))
            .bind(&chunk.text)
            .bind(Self::serialize_embedding(&chunk.embedding))
            .bind(chunk.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn upsert_batch(&self, chunks: Vec<Chunk>) -> Result<(), RagError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for chunk in &chunks {
            sqlx::query(UPSERT_CHUNK_SQL)
                .bind(chunk.id.to_string())
                .bind(chunk.document_id.to_string())
                .bind(chunk.document_type.as_str())
                .bind(i64::from(chunk.position_index))
                .bind(&chunk.text)
                .bind(Self::serialize_embedding(&chunk.embedding))
                .bind(chunk.created_at.to_rfc3339())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        filter: Option<DocumentType>,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!(
            "{} WHERE (?1 IS NULL OR doc_type = ?1) ORDER BY seq ASC",
            SELECT_CHUNK_COLUMNS
        ))
        .bind(filter.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let chunk = Self::row_to_chunk(row)?;
            if chunk.embedding.is_empty() {
                continue;
            }
            let score = vector_math::cosine_similarity(query_embedding, &chunk.embedding)
                .map_err(|e| RagError::Store(format!("chunk {}: {}", chunk.id, e)))?;
            scored.push(ScoredChunk { chunk, score });
        }

        vector_math::sort_scores_descending(&mut scored, |hit| hit.score);
        scored.truncate(k);

        Ok(scored)
    }

    async fn get_chunk(&self, chunk_id: Uuid) -> Result<Option<Chunk>, RagError> {
        let row = sqlx::query(&format!("{} WHERE chunk_id = ?1", SELECT_CHUNK_COLUMNS))
            .bind(chunk_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_chunk).transpose()
    }

    async fn count(&self, filter: Option<DocumentType>) -> Result<usize, RagError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM chunks WHERE (?1 IS NULL OR doc_type = ?1)")
            .bind(filter.map(|t| t.as_str()))
            .fetch_one(&self.pool)
            .await?;

        let n: i64 = row.try_get("n")?;
        Ok(n.max(0) as usize)
    }

    async fn put_document(&self, document: Document) -> Result<(), RagError> {
        let inserted = sqlx::query(
            "INSERT INTO documents (id, filename, doc_type, page_count, status)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(document.id.to_string())
        .bind(&document.filename)
        .bind(document.document_type.as_str())
        .bind(i64::from(document.page_count))
        .bind(document.status.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(duplicate_document(document.id));
        }
        Ok(())
    }

    async fn get_document(&self, document_id: Uuid) -> Result<Option<Document>, RagError> {
        let row = sqlx::query(
            "SELECT id, filename, doc_type, page_count, status FROM documents WHERE id = ?1",
        )
        .bind(document_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn list_documents(&self) -> Result<Vec<Document>, RagError> {
        let rows = sqlx::query(
            "SELECT id, filename, doc_type, page_count, status FROM documents ORDER BY rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_document).collect()
    }

    async fn set_document_status(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
    ) -> Result<(), RagError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT status FROM documents WHERE id = ?1")
            .bind(document_id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| unknown_document(document_id))?;
        let current: String = row.try_get("status")?;
        let current = DocumentStatus::from_str(&current)?;

        if !current.can_transition_to(status) {
            return Err(illegal_transition(document_id, current, status));
        }

        sqlx::query("UPDATE documents SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(document_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_document(&self, document_id: Uuid) -> Result<usize, RagError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM chunks WHERE document_id = ?1")
            .bind(document_id.to_string())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM documents WHERE id = ?1")
            .bind(document_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted as usize)
    }
}
