//! BM25 retriever over text chunks, backed by an in-memory SQLite FTS5 index.

use std::sync::{Mutex, PoisonError};

use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::debug;

use crate::error::ChainError;

/// Default number of chunks returned per query.
pub const DEFAULT_TOP_K: usize = 4;

const SCHEMA: &str = "CREATE VIRTUAL TABLE chunks USING fts5(content, tokenize = 'unicode61');";

// bm25() is lower-is-better; rowid breaks ties in document order.
const SEARCH: &str = "SELECT rowid, -bm25(chunks), content FROM chunks \
                      WHERE chunks MATCH ?1 ORDER BY bm25(chunks), rowid LIMIT ?2";

/// A retrieved chunk with its score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    /// Position of the chunk in the indexed sequence.
    pub index: usize,
    /// BM25 score, higher is better.
    pub score: f64,
    /// Chunk text.
    pub content: String,
}

/// BM25 index over a fixed set of chunks.
pub struct Bm25Retriever {
    conn: Mutex<Connection>,
    len: usize,
}

impl Bm25Retriever {
    /// Indexes `chunks`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Index`] if the index cannot be created or filled.
    pub fn new(chunks: Vec<String>) -> Result<Self, ChainError> {
        let mut conn = Connection::open_in_memory()
            .map_err(|e| ChainError::index(format!("Failed to open index: {e}")))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| ChainError::index(format!("Failed to create index: {e}")))?;

        let tx = conn
            .transaction()
            .map_err(|e| ChainError::index(format!("Failed to start transaction: {e}")))?;
        {
            let mut stmt = tx
                .prepare("INSERT INTO chunks (rowid, content) VALUES (?1, ?2)")
                .map_err(|e| ChainError::index(format!("Failed to prepare insert: {e}")))?;
            for (index, chunk) in chunks.iter().enumerate() {
                let rowid = i64::try_from(index)
                    .map_err(|e| ChainError::index(format!("Chunk index overflow: {e}")))?;
                stmt.execute(params![rowid, chunk])
                    .map_err(|e| ChainError::index(format!("Failed to index chunk {index}: {e}")))?;
            }
        }
        tx.commit()
            .map_err(|e| ChainError::index(format!("Failed to commit index: {e}")))?;

        debug!(chunks = chunks.len(), "built BM25 index");
        Ok(Self {
            conn: Mutex::new(conn),
            len: chunks.len(),
        })
    }

    /// Number of indexed chunks.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing is indexed.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns up to `k` chunks sharing at least one term with `query`,
    /// best first.
    ///
    /// Equal scores keep document order.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Index`] if the search query fails.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, ChainError> {
        let Some(expression) = match_expression(query) else {
            return Ok(Vec::new());
        };
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(k).unwrap_or(i64::MAX);

        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn
            .prepare_cached(SEARCH)
            .map_err(|e| ChainError::index(format!("Failed to prepare search: {e}")))?;
        let rows = stmt
            .query_map(params![expression, limit], |row| {
                Ok(ScoredChunk {
                    index: usize::try_from(row.get::<_, i64>(0)?).unwrap_or_default(),
                    score: row.get(1)?,
                    content: row.get(2)?,
                })
            })
            .map_err(|e| ChainError::index(format!("Failed to search index: {e}")))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| ChainError::index(format!("Failed to read row: {e}")))?);
        }
        Ok(results)
    }
}

impl std::fmt::Debug for Bm25Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bm25Retriever")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Lowercased alphanumeric runs of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// FTS5 query matching any term of `query`, or `None` if it has no terms.
///
/// Terms are quoted so FTS5 operators in user text are taken literally.
fn match_expression(query: &str) -> Option<String> {
    let mut terms = tokenize(query);
    terms.sort_unstable();
    terms.dedup();
    if terms.is_empty() {
        return None;
    }
    Some(
        terms
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}
