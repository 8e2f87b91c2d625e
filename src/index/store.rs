//! SQLite-backed vector index store
//!
//! Vectors live as little-endian f32 BLOBs next to their chunk text, and
//! similarity search is a brute-force cosine scan over the live collection.
//! At the scale of one run (tens of pages per site, at most ten sites) that
//! scan is far below any latency worth optimizing.

use crate::index::embedder::Embedder;
use crate::index::schema::initialize_schema;
use crate::index::{Chunk, IndexError, IndexResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Handle to one built collection
///
/// Returned by [`IndexStore::rebuild`]; queries must present it so a caller
/// holding a handle from a previous run fails with `StaleCollection` instead
/// of silently reading the new run's data.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexCollection {
    id: i64,
    pub created_at: String,
    pub model: String,
    pub dims: usize,
    pub chunk_count: usize,
}

impl IndexCollection {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_count == 0
    }
}

/// A chunk returned from a similarity query, best match first
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// SQLite-backed index store
pub struct IndexStore {
    conn: Connection,
}

impl IndexStore {
    /// Opens or creates the index database at the given path
    pub fn open(path: &Path) -> IndexResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory index (tests, dry runs)
    pub fn open_in_memory() -> IndexResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Replaces the live collection with a freshly embedded one
    ///
    /// Exact-duplicate chunk texts are dropped before embedding (first
    /// occurrence wins). Embedding happens before any write: if the embedder
    /// fails, the previous collection stays fully intact and queryable. The
    /// swap itself is a single transaction, so no reader ever observes a
    /// half-replaced collection.
    pub async fn rebuild(
        &mut self,
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
    ) -> IndexResult<IndexCollection> {
        let mut seen_hashes = HashSet::new();
        let mut unique: Vec<(Chunk, String)> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let hash = text_hash(&chunk.text);
            if seen_hashes.insert(hash.clone()) {
                unique.push((chunk, hash));
            }
        }

        let texts: Vec<String> = unique.iter().map(|(c, _)| c.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != unique.len() {
            return Err(IndexError::Embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                vectors.len(),
                unique.len()
            )));
        }
        for vector in &vectors {
            if vector.len() != embedder.dims() {
                return Err(IndexError::Dimension {
                    expected: embedder.dims(),
                    got: vector.len(),
                });
            }
        }

        let created_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM chunks", [])?;
        tx.execute("DELETE FROM collections", [])?;
        tx.execute(
            "INSERT INTO collections (created_at, model, dims, chunk_count) VALUES (?1, ?2, ?3, ?4)",
            params![created_at, embedder.model_name(), embedder.dims(), unique.len()],
        )?;
        let collection_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks
                 (collection_id, site_name, source_url, sequence_index, text, text_hash, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for ((chunk, hash), vector) in unique.iter().zip(&vectors) {
                stmt.execute(params![
                    collection_id,
                    chunk.site_name,
                    chunk.source_url.as_str(),
                    chunk.sequence_index,
                    chunk.text,
                    hash,
                    vec_to_blob(vector),
                ])?;
            }
        }

        tx.commit()?;

        tracing::info!(
            "Rebuilt index collection {} with {} chunks",
            collection_id,
            unique.len()
        );

        Ok(IndexCollection {
            id: collection_id,
            created_at,
            model: embedder.model_name().to_string(),
            dims: embedder.dims(),
            chunk_count: unique.len(),
        })
    }

    /// Returns the live collection, if any run has been indexed
    pub fn current_collection(&self) -> IndexResult<Option<IndexCollection>> {
        let collection = self
            .conn
            .prepare(
                "SELECT id, created_at, model, dims, chunk_count
                 FROM collections ORDER BY id DESC LIMIT 1",
            )?
            .query_row([], |row| {
                Ok(IndexCollection {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    model: row.get(2)?,
                    dims: row.get(3)?,
                    chunk_count: row.get(4)?,
                })
            })
            .optional()?;
        Ok(collection)
    }

    /// Similarity query over the live collection
    ///
    /// Returns up to `top_k` chunks ordered by descending cosine similarity;
    /// ties break on (site_name, sequence_index) so results are deterministic.
    /// A filter that matches nothing yields an empty Ok, distinct from the
    /// `EmptyIndex` error raised when no chunks exist at all.
    pub async fn query(
        &self,
        collection: &IndexCollection,
        question: &str,
        top_k: usize,
        site_filter: Option<&str>,
        embedder: &dyn Embedder,
    ) -> IndexResult<Vec<ScoredChunk>> {
        let live = self.check_live(collection)?;
        if embedder.dims() != live.dims {
            return Err(IndexError::Dimension {
                expected: live.dims,
                got: embedder.dims(),
            });
        }

        let question_vec = embedder
            .embed(&[question.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| IndexError::Embedding("Embedder returned no vector".to_string()))?;

        let mut scored: Vec<ScoredChunk> = self
            .load_chunks(live.id, site_filter)?
            .into_iter()
            .map(|(chunk, vector)| {
                let score = cosine_similarity(&question_vec, &vector);
                ScoredChunk { chunk, score }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.chunk.site_name.cmp(&b.chunk.site_name))
                .then_with(|| a.chunk.sequence_index.cmp(&b.chunk.sequence_index))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Per-site similarity query: `per_site_k` best chunks from every site
    /// present in the collection, sites in name order
    ///
    /// Keeps a poorly matching site represented in comparison answers instead
    /// of letting one site's pages crowd out the rest.
    pub async fn balanced_query(
        &self,
        collection: &IndexCollection,
        question: &str,
        per_site_k: usize,
        embedder: &dyn Embedder,
    ) -> IndexResult<Vec<ScoredChunk>> {
        let live = self.check_live(collection)?;

        let sites: Vec<String> = self
            .conn
            .prepare(
                "SELECT DISTINCT site_name FROM chunks
                 WHERE collection_id = ?1 ORDER BY site_name",
            )?
            .query_map(params![live.id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = Vec::new();
        for site in &sites {
            results.extend(
                self.query(collection, question, per_site_k, Some(site), embedder)
                    .await?,
            );
        }
        Ok(results)
    }

    /// Validates a collection handle against the live collection
    fn check_live(&self, collection: &IndexCollection) -> IndexResult<IndexCollection> {
        let live = self.current_collection()?.ok_or(IndexError::EmptyIndex)?;
        if live.id != collection.id {
            return Err(IndexError::StaleCollection(collection.id));
        }
        if live.chunk_count == 0 {
            return Err(IndexError::EmptyIndex);
        }
        Ok(live)
    }

    fn load_chunks(
        &self,
        collection_id: i64,
        site_filter: Option<&str>,
    ) -> IndexResult<Vec<(Chunk, Vec<f32>)>> {
        let (sql, filter) = match site_filter {
            Some(site) => (
                "SELECT site_name, source_url, sequence_index, text, embedding
                 FROM chunks WHERE collection_id = ?1 AND site_name = ?2",
                Some(site),
            ),
            None => (
                "SELECT site_name, source_url, sequence_index, text, embedding
                 FROM chunks WHERE collection_id = ?1",
                None,
            ),
        };

        let mut stmt = self.conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            let url_str: String = row.get(1)?;
            let source_url = Url::parse(&url_str).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            let blob: Vec<u8> = row.get(4)?;
            Ok((
                Chunk {
                    site_name: row.get(0)?,
                    source_url,
                    sequence_index: row.get(2)?,
                    text: row.get(3)?,
                },
                blob_to_vec(&blob),
            ))
        };

        let rows = match filter {
            Some(site) => stmt
                .query_map(params![collection_id, site], map_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map(params![collection_id], map_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(rows)
    }
}

/// Hex sha256 of chunk text, the dedup key
fn text_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Serializes a vector as little-endian f32 bytes
fn vec_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        blob.extend_from_slice(&v.to_le_bytes());
    }
    blob
}

/// Deserializes a little-endian f32 blob
fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
