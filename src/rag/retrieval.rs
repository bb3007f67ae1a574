//! Candidate retrieval and the rerank decision.

use super::QueryComplexity;
use crate::config::RerankerSettings;
use crate::embedding::Embedder;
use crate::error::{EngageError, Result};
use crate::rerank::Reranker;
use crate::vector_store::{ChunkPayload, PointFilter, SearchResult, VectorStore};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// A retrieved passage.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub payload: ChunkPayload,
    /// Vector similarity.
    pub score: f32,
    /// Set when the reranker scored this passage.
    pub rerank_score: Option<f32>,
}

impl From<SearchResult> for Candidate {
    fn from(result: SearchResult) -> Self {
        Self {
            payload: result.payload,
            score: result.score,
            rerank_score: None,
        }
    }
}

/// Score thresholds above which vector order is trusted as-is.
#[derive(Debug, Clone, Copy)]
pub struct RerankPolicy {
    /// Skip when the best candidate scores at least this much.
    pub skip_score_threshold: f32,
    /// Skip when the best candidate leads the runner-up by at least this much.
    pub skip_score_margin: f32,
}

impl Default for RerankPolicy {
    fn default() -> Self {
        Self {
            skip_score_threshold: 0.7,
            skip_score_margin: 0.15,
        }
    }
}

impl From<&RerankerSettings> for RerankPolicy {
    fn from(settings: &RerankerSettings) -> Self {
        Self {
            skip_score_threshold: settings.skip_score_threshold,
            skip_score_margin: settings.skip_score_margin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankDecision {
    Rerank,
    Skip(&'static str),
}

/// Decide whether candidates (sorted best first) are worth reranking.
/// Absorbs f32 rounding so that scores exactly on a threshold count as reaching it.
const SCORE_EPSILON: f32 = 1e-6;

pub fn should_rerank(candidates: &[Candidate], policy: &RerankPolicy, available: bool) -> RerankDecision {
    if candidates.len() < 2 {
        return RerankDecision::Skip("too_few_candidates");
    }
    if !available {
        return RerankDecision::Skip("reranker_unavailable");
    }

    let top = candidates[0].score;
    if top >= policy.skip_score_threshold - SCORE_EPSILON {
        return RerankDecision::Skip("high_top_score");
    }
    if top - candidates[1].score >= policy.skip_score_margin - SCORE_EPSILON {
        return RerankDecision::Skip("clear_winner");
    }

    RerankDecision::Rerank
}

/// Outcome of retrieval for one query.
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    /// Passages to ground the answer in, best first.
    pub candidates: Vec<Candidate>,
    /// Candidates requested from the vector store.
    pub candidate_count: usize,
    pub reranked: bool,
    pub skip_reason: Option<&'static str>,
}

/// Fetches knowledge passages for a widget and optionally reranks them.
pub struct Retriever {
    embedder: Option<Arc<dyn Embedder>>,
    vector_store: Arc<dyn VectorStore>,
    reranker: Option<Arc<dyn Reranker>>,
    policy: RerankPolicy,
    min_score: f32,
}

impl Retriever {
    pub fn new(embedder: Option<Arc<dyn Embedder>>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            vector_store,
            reranker: None,
            policy: RerankPolicy::default(),
            min_score: 0.05,
        }
    }

    pub fn with_reranker(mut self, reranker: Option<Arc<dyn Reranker>>, policy: RerankPolicy) -> Self {
        self.reranker = reranker;
        self.policy = policy;
        self
    }

    /// Set the minimum similarity score threshold.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Retrieve up to `max_docs` passages. Embedding and search failures degrade to an
    /// empty result.
    #[instrument(skip(self, query), fields(widget_id = %widget_id, complexity = %complexity))]
    pub async fn retrieve(
        &self,
        query: &str,
        widget_id: &str,
        complexity: QueryComplexity,
        max_docs: usize,
        rerank_enabled: bool,
    ) -> Retrieval {
        let candidate_count = max_docs * complexity.candidate_multiplier();
        if candidate_count == 0 {
            return Retrieval::default();
        }

        let mut candidates = match self.search(query, widget_id, candidate_count).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Retrieval failed, answering without context: {}", e);
                Vec::new()
            }
        };
        debug!("Retrieved {} of {} candidates", candidates.len(), candidate_count);

        let reranker = self.reranker.as_ref().filter(|_| rerank_enabled);
        let decision = should_rerank(&candidates, &self.policy, reranker.is_some());

        let mut reranked = false;
        let mut skip_reason = None;
        match (decision, reranker) {
            (RerankDecision::Rerank, Some(reranker)) => {
                match rerank(reranker.as_ref(), query, &candidates, max_docs).await {
                    Ok(ordered) => {
                        candidates = ordered;
                        reranked = true;
                    }
                    Err(e) => {
                        warn!("Rerank failed, keeping vector order: {}", e);
                        skip_reason = Some("rerank_failed");
                    }
                }
            }
            (RerankDecision::Skip(reason), _) => skip_reason = Some(reason),
            (RerankDecision::Rerank, None) => skip_reason = Some("reranker_unavailable"),
        }

        candidates.truncate(max_docs);

        Retrieval {
            candidates,
            candidate_count,
            reranked,
            skip_reason,
        }
    }

    async fn search(&self, query: &str, widget_id: &str, limit: usize) -> Result<Vec<Candidate>> {
        let embedder = self
            .embedder
            .as_ref()
            .ok_or_else(|| EngageError::Unavailable("embedding provider".to_string()))?;

        let embedding = embedder.embed(query).await?;
        let results = self
            .vector_store
            .search(&embedding, &PointFilter::widget(widget_id), limit, self.min_score)
            .await?;

        Ok(results.into_iter().map(Candidate::from).collect())
    }
}

async fn rerank(
    reranker: &dyn Reranker,
    query: &str,
    candidates: &[Candidate],
    top_k: usize,
) -> Result<Vec<Candidate>> {
    let documents: Vec<String> = candidates.iter().map(|c| c.payload.text.clone()).collect();
    let hits = reranker.rerank(query, &documents, top_k).await?;

    Ok(hits
        .into_iter()
        .filter_map(|hit| {
            candidates.get(hit.index).map(|c| Candidate {
                rerank_score: Some(hit.relevance_score),
                ..c.clone()
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::testing::{CountingEmbedder, StubReranker};
    use crate::vector_store::{test_payload, MemoryVectorStore, Point};

    fn candidates(scores: &[f32]) -> Vec<Candidate> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| Candidate {
                payload: test_payload("w1", &format!("i{}", i), "text"),
                score,
                rerank_score: None,
            })
            .collect()
    }

    #[test]
    fn test_rerank_decision() {
        let policy = RerankPolicy::default();
        assert_eq!(should_rerank(&candidates(&[0.5, 0.45]), &policy, true), RerankDecision::Rerank);
        assert_eq!(
            should_rerank(&candidates(&[0.75, 0.7]), &policy, true),
            RerankDecision::Skip("high_top_score")
        );
        assert_eq!(
            should_rerank(&candidates(&[0.6, 0.4]), &policy, true),
            RerankDecision::Skip("clear_winner")
        );
        assert_eq!(
            should_rerank(&candidates(&[0.5]), &policy, true),
            RerankDecision::Skip("too_few_candidates")
        );
        assert_eq!(
            should_rerank(&candidates(&[0.5, 0.45]), &policy, false),
            RerankDecision::Skip("reranker_unavailable")
        );
    }

    #[test]
    fn test_rerank_decision_boundaries() {
        let policy = RerankPolicy::default();
        assert_eq!(
            should_rerank(&candidates(&[0.7, 0.69]), &policy, true),
            RerankDecision::Skip("high_top_score")
        );
        assert_eq!(should_rerank(&candidates(&[0.69, 0.6]), &policy, true), RerankDecision::Rerank);

        for pair in [[0.65, 0.5], [0.35, 0.2], [0.6, 0.45], [0.55, 0.4], [0.16, 0.01]] {
            assert_eq!(
                should_rerank(&candidates(&pair), &policy, true),
                RerankDecision::Skip("clear_winner"),
                "gap of exactly 0.15 in {:?}",
                pair
            );
        }
        assert_eq!(should_rerank(&candidates(&[0.64, 0.5]), &policy, true), RerankDecision::Rerank);
    }

    /// Store with `n` passages for widget w1, all pointing the same way at varying angles.
    async fn seeded_store(n: usize) -> Arc<MemoryVectorStore> {
        let store = Arc::new(MemoryVectorStore::new());
        let points: Vec<Point> = (0..n)
            .map(|i| {
                let vector = vec![1.0, 0.6 + i as f32 * 0.01, 0.0];
                Point::new(vector, test_payload("w1", &format!("i{}", i), &format!("passage {}", i)))
            })
            .collect();
        store.upsert(&points).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_candidate_count_follows_complexity() {
        let store = seeded_store(20).await;
        let embedder = Arc::new(CountingEmbedder::new(vec![1.0, 0.5, 0.0]));
        let retriever = Retriever::new(Some(embedder.clone()), store);

        for (complexity, expected) in [
            (QueryComplexity::Simple, 3),
            (QueryComplexity::Medium, 6),
            (QueryComplexity::Complex, 6),
        ] {
            let retrieval = retriever.retrieve("query", "w1", complexity, 3, false).await;
            assert_eq!(retrieval.candidate_count, expected);
            assert_eq!(retrieval.candidates.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_greeting_never_searches() {
        let embedder = Arc::new(CountingEmbedder::new(vec![1.0, 0.0, 0.0]));
        let retriever = Retriever::new(Some(embedder.clone()), seeded_store(3).await);

        let retrieval = retriever.retrieve("hi", "w1", QueryComplexity::Greeting, 5, true).await;
        assert!(retrieval.candidates.is_empty());
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_scoped_to_widget() {
        let store = seeded_store(2).await;
        store
            .upsert(&[Point::new(vec![1.0, 0.6, 0.0], test_payload("w2", "other", "elsewhere"))])
            .await
            .unwrap();
        let retriever = Retriever::new(Some(Arc::new(CountingEmbedder::new(vec![1.0, 0.6, 0.0]))), store);

        let retrieval = retriever.retrieve("query", "w1", QueryComplexity::Medium, 5, false).await;
        assert_eq!(retrieval.candidates.len(), 2);
        assert!(retrieval.candidates.iter().all(|c| c.payload.widget_id == "w1"));
    }

    #[tokio::test]
    async fn test_reranks_close_candidates() {
        // Query is orthogonal-ish to all passages so scores stay below the skip threshold.
        let store = seeded_store(4).await;
        let embedder = Arc::new(CountingEmbedder::new(vec![0.3, 0.0, 1.0]));
        let reranker = Arc::new(StubReranker::reversing());
        let retriever = Retriever::new(Some(embedder), store)
            .with_reranker(Some(reranker.clone()), RerankPolicy::default());

        let retrieval = retriever.retrieve("query", "w1", QueryComplexity::Medium, 2, true).await;
        assert!(retrieval.reranked, "skipped: {:?}", retrieval.skip_reason);
        assert_eq!(retrieval.candidates.len(), 2);
        assert!(retrieval.candidates.iter().all(|c| c.rerank_score.is_some()));
        assert_eq!(reranker.calls(), 1);
    }

    #[tokio::test]
    async fn test_rerank_failure_keeps_order() {
        let store = seeded_store(4).await;
        let embedder = Arc::new(CountingEmbedder::new(vec![0.3, 0.0, 1.0]));
        let retriever = Retriever::new(Some(embedder), store)
            .with_reranker(Some(Arc::new(StubReranker::failing())), RerankPolicy::default());

        let retrieval = retriever.retrieve("query", "w1", QueryComplexity::Medium, 3, true).await;
        assert!(!retrieval.reranked);
        assert_eq!(retrieval.skip_reason, Some("rerank_failed"));
        assert_eq!(retrieval.candidates.len(), 3);
        assert!(retrieval.candidates.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_disabled_reranker_not_called() {
        let store = seeded_store(4).await;
        let reranker = Arc::new(StubReranker::reversing());
        let retriever = Retriever::new(Some(Arc::new(CountingEmbedder::new(vec![0.3, 0.0, 1.0]))), store)
            .with_reranker(Some(reranker.clone()), RerankPolicy::default());

        retriever.retrieve("query", "w1", QueryComplexity::Medium, 2, false).await;
        assert_eq!(reranker.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_embedder_degrades() {
        let retriever = Retriever::new(None, seeded_store(3).await);
        let retrieval = retriever.retrieve("query", "w1", QueryComplexity::Medium, 5, true).await;
        assert!(retrieval.candidates.is_empty());
    }
}
