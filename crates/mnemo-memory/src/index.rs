use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::embedding::{cosine_similarity, TextEmbedder};
use crate::parser::ParsedMemory;

/// One owner-scoped nearest-neighbor match returned by a search index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: String,
    pub document: String,
    pub owner: String,
    pub distance: f32,
}

/// Capability contract for semantic similarity search over indexed facts.
///
/// Implementations must restrict candidates to documents tagged with the
/// requested owner and return at most `limit` hits, best match first.
pub trait SearchIndex {
    fn query(&self, text: &str, limit: usize, owner: &str) -> Result<Vec<IndexHit>>;
}

/// Public struct `IndexedDocument` used across Mnemo components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedDocument {
    pub id: String,
    pub owner: String,
    pub document: String,
    pub embedding: Vec<f32>,
}

/// In-memory vector index over embedded memory facts.
///
/// Documents are embedded on insert and persisted as one JSON record per
/// line, so an index built offline can be reloaded at query time.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    embedder: TextEmbedder,
    documents: Vec<IndexedDocument>,
}

impl VectorIndex {
    /// Creates an empty index that embeds documents with `embedder`.
    pub fn new(embedder: TextEmbedder) -> Self {
        Self {
            embedder,
            documents: Vec::new(),
        }
    }

    /// Loads a previously persisted index from `path`.
    ///
    /// A missing file yields an empty index; queries against it return no
    /// hits rather than failing.
    pub fn load(path: &Path, embedder: TextEmbedder) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(embedder));
        }
        let file = fs::File::open(path)
            .with_context(|| format!("failed to open index file {}", path.display()))?;
        let reader = BufReader::new(file);
        let mut documents = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.with_context(|| {
                format!(
                    "failed to read index file {} at line {}",
                    path.display(),
                    index + 1
                )
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let document = serde_json::from_str::<IndexedDocument>(trimmed).with_context(|| {
                format!(
                    "failed to parse index file {} at line {}",
                    path.display(),
                    index + 1
                )
            })?;
            documents.push(document);
        }
        Ok(Self {
            embedder,
            documents,
        })
    }

    /// Persists every indexed document to `path`, one JSON record per line.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create index directory {}", parent.display())
            })?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("failed to open index file {}", path.display()))?;
        for document in &self.documents {
            let encoded =
                serde_json::to_string(document).context("failed to encode index document")?;
            file.write_all(encoded.as_bytes())
                .with_context(|| format!("failed to write index document to {}", path.display()))?;
            file.write_all(b"\n")
                .with_context(|| format!("failed to write newline to {}", path.display()))?;
        }
        file.flush()
            .with_context(|| format!("failed to flush index file {}", path.display()))?;
        Ok(())
    }

    /// Embeds `document` and adds it under `owner` with the given id.
    pub fn add(&mut self, id: String, owner: String, document: String) -> Result<()> {
        let embedding = self.embedder.embed(&document)?;
        self.documents.push(IndexedDocument {
            id,
            owner,
            document,
            embedding,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl SearchIndex for VectorIndex {
    /// Ranks `owner`'s documents by cosine distance to `text`, best first.
    fn query(&self, text: &str, limit: usize, owner: &str) -> Result<Vec<IndexHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedder.embed(text)?;
        if query_embedding.iter().all(|component| *component == 0.0) {
            return Ok(Vec::new());
        }

        let mut hits = self
            .documents
            .iter()
            .filter(|document| document.owner == owner)
            .map(|document| IndexHit {
                id: document.id.clone(),
                document: document.document.clone(),
                owner: document.owner.clone(),
                distance: 1.0 - cosine_similarity(&query_embedding, &document.embedding),
            })
            .collect::<Vec<_>>();
        hits.sort_by(|left, right| {
            left.distance
                .total_cmp(&right.distance)
                .then_with(|| left.id.cmp(&right.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Ingests parsed memories into `index`, assigning stable `mem-<i>` ids.
///
/// One parsed record becomes one indexed document tagged with its owner.
pub fn index_memories(index: &mut VectorIndex, memories: &[ParsedMemory]) -> Result<usize> {
    for (position, memory) in memories.iter().enumerate() {
        index.add(
            format!("mem-{position}"),
            memory.owner.clone(),
            memory.fact.clone(),
        )?;
    }
    tracing::debug!(
        indexed = memories.len(),
        "added parsed memories to the vector index"
    );
    Ok(memories.len())
}
