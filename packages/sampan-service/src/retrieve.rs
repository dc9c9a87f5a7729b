use sampan_config::Config;
use sampan_domain::planner::ActivityCandidate;
use sampan_index::models::{KnowledgeChunk, KnowledgeHit, decode_activity, decode_chunk};

use crate::{Error, Providers, Result};

/// Grounding fragments for chat and recommendations, best first. Hits below
/// the configured relevance floor are dropped even when inside top_k, so
/// answers are never anchored in noise.
pub(crate) async fn retrieve_chunks(
	cfg: &Config,
	providers: &Providers,
	query: &str,
	top_k: u32,
) -> Result<Vec<KnowledgeChunk>> {
	let hits = search_hits(cfg, providers, query, top_k).await?;
	let mut chunks: Vec<KnowledgeChunk> = hits
		.iter()
		.filter(|hit| hit.score >= cfg.retrieval.min_score)
		.filter_map(decode_chunk)
		.collect();

	chunks.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

	Ok(chunks)
}

/// The planner's candidate pool. Only hits carrying activity metadata count.
pub(crate) async fn retrieve_activities(
	cfg: &Config,
	providers: &Providers,
	query: &str,
) -> Result<Vec<ActivityCandidate>> {
	let hits = search_hits(cfg, providers, query, cfg.retrieval.candidate_k).await?;

	Ok(hits
		.iter()
		.filter(|hit| hit.score >= cfg.retrieval.min_score)
		.filter_map(decode_activity)
		.collect())
}

async fn search_hits(
	cfg: &Config,
	providers: &Providers,
	query: &str,
	limit: u32,
) -> Result<Vec<KnowledgeHit>> {
	let vectors = providers
		.embedding
		.embed(&cfg.providers.embedding, &[query.to_string()])
		.await
		.map_err(|err| Error::RetrievalUnavailable {
			message: format!("Query embedding failed: {err}"),
		})?;
	let Some(vector) = vectors.into_iter().next() else {
		return Err(Error::RetrievalUnavailable {
			message: "Embedding provider returned no vectors.".to_string(),
		});
	};

	providers
		.index
		.search(vector, limit as u64)
		.await
		.map_err(|err| Error::RetrievalUnavailable { message: err.to_string() })
}
