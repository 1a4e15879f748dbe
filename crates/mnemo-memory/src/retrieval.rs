use anyhow::Result;

use crate::index::SearchIndex;

/// Distance-to-similarity conversion for a search index's native metric.
///
/// The conversion only lands in `[0, 1]` when the index metric matches the
/// chosen variant, so the metric is explicit rather than assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    /// Cosine distance over unit-normalized vectors; similarity is `1 - d`.
    #[default]
    CosineNormalized,
}

impl DistanceMetric {
    /// Converts an index distance into a similarity in `[0, 1]`.
    ///
    /// Out-of-range values from a mismatched metric are clamped rather than
    /// rejected.
    pub fn similarity(self, distance: f32) -> f32 {
        match self {
            DistanceMetric::CosineNormalized => (1.0 - distance).clamp(0.0, 1.0),
        }
    }
}

/// Public struct `RetrievalOptions` used across Mnemo components.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub threshold: f32,
    pub metric: DistanceMetric,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: 3,
            threshold: 0.5,
            metric: DistanceMetric::CosineNormalized,
        }
    }
}

/// One retrieved memory fact with its relevance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedMemory {
    pub memory: String,
    pub similarity: f32,
    pub owner: String,
}

/// Retrieves the most relevant memories for `query`, restricted to `owner`.
///
/// Delegates the nearest-neighbor search to `index`, converts distances to
/// similarities, keeps matches at or above `options.threshold` in the
/// index's ranking order, and caps the result at `options.top_k`. An empty
/// result is not an error; index failures propagate to the caller.
pub fn retrieve_context(
    query: &str,
    index: &dyn SearchIndex,
    owner: &str,
    options: &RetrievalOptions,
) -> Result<Vec<RetrievedMemory>> {
    if options.top_k == 0 {
        return Ok(Vec::new());
    }

    let hits = index.query(query, options.top_k, owner)?;
    let mut relevant = hits
        .into_iter()
        .filter_map(|hit| {
            let similarity = options.metric.similarity(hit.distance);
            (similarity >= options.threshold).then_some(RetrievedMemory {
                memory: hit.document,
                similarity,
                owner: hit.owner,
            })
        })
        .collect::<Vec<_>>();
    // The index already bounds results to top_k; keep the cap even against
    // an implementation that does not honor its limit.
    relevant.truncate(options.top_k);
    tracing::debug!(
        returned = relevant.len(),
        owner,
        "retrieved memory context for query"
    );
    Ok(relevant)
}
