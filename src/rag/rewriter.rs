//! Query reformulation between retrieval attempts.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use super::context_builder::ContextBuilder;
use super::text;
use super::types::Chunk;
use crate::core::errors::RagError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

/// Produces a new query conditioned on what retrieval found so far.
///
/// A rewrite never equals `current_query` (after whitespace normalization,
/// case-insensitive). When no distinct rewrite exists the call fails with
/// `RagError::RewriteExhausted`.
#[async_trait]
pub trait QueryRewriter: Send + Sync {
    async fn rewrite(
        &self,
        original_query: &str,
        current_query: &str,
        chunks: &[Chunk],
    ) -> Result<String, RagError>;
}

/// Energy-sector vocabulary: a query term and phrases that documents
/// commonly use for the same thing.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("battery", &["energy storage"]),
    ("carbon", &["greenhouse gas"]),
    ("consumption", &["energy demand", "load profile"]),
    ("cost", &["levelized cost", "tariff"]),
    ("efficiency", &["conversion efficiency", "performance ratio"]),
    ("emission", &["greenhouse gas", "pollutant limit"]),
    ("grid", &["interconnection", "transmission network"]),
    ("inverter", &["power conversion"]),
    ("maximum", &["peak", "rated"]),
    ("panel", &["photovoltaic module"]),
    ("permit", &["licence", "authorization"]),
    ("policy", &["regulation", "incentive"]),
    ("power", &["capacity rating", "rated output"]),
    ("price", &["tariff", "market price"]),
    ("regulation", &["compliance requirement", "directive"]),
    ("renewable", &["clean energy"]),
    ("solar", &["photovoltaic"]),
    ("storage", &["battery"]),
    ("turbine", &["wind generator"]),
    ("wind", &["wind turbine"]),
];

const MIN_SALIENT_TERM_LEN: usize = 3;

/// Deterministic rewriter: appends up to `max_new_terms` fresh terms to the
/// current query, taken first from domain synonyms of the original query and
/// then from the most frequent content terms of the retrieved chunks.
#[derive(Debug, Clone)]
pub struct KeywordRewriter {
    max_new_terms: usize,
}

impl KeywordRewriter {
    pub fn new() -> Self {
        Self { max_new_terms: 3 }
    }

    pub fn with_max_new_terms(max_new_terms: usize) -> Self {
        Self {
            max_new_terms: max_new_terms.max(1),
        }
    }

    fn synonym_candidates(original_query: &str) -> Vec<&'static str> {
        let mut candidates = Vec::new();
        for token in text::tokens(original_query) {
            let term = text::stem(&token);
            if let Ok(idx) = SYNONYMS.binary_search_by(|(k, _)| k.cmp(&term.as_str())) {
                candidates.extend_from_slice(SYNONYMS[idx].1);
            }
        }
        candidates
    }

    /// Chunk content terms ordered by how many chunks mention them, ties by
    /// first appearance.
    fn salient_terms(chunks: &[Chunk]) -> Vec<String> {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let mut next_rank = 0;
        for chunk in chunks {
            for term in text::content_terms(&chunk.text) {
                if term.chars().count() < MIN_SALIENT_TERM_LEN
                    || term.chars().all(|c| c.is_ascii_digit())
                {
                    continue;
                }
                let entry = counts.entry(term).or_insert_with(|| {
                    next_rank += 1;
                    (0, next_rank)
                });
                entry.0 += 1;
            }
        }

        let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
        ranked.into_iter().map(|(term, _)| term).collect()
    }
}

impl Default for KeywordRewriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryRewriter for KeywordRewriter {
    async fn rewrite(
        &self,
        original_query: &str,
        current_query: &str,
        chunks: &[Chunk],
    ) -> Result<String, RagError> {
        let mut known: BTreeSet<String> = text::content_terms(current_query);
        let mut fresh: Vec<String> = Vec::new();

        let synonyms = Self::synonym_candidates(original_query)
            .into_iter()
            .map(str::to_string);
        let candidates = synonyms.chain(Self::salient_terms(chunks));

        for candidate in candidates {
            if fresh.len() >= self.max_new_terms {
                break;
            }
            let terms = text::content_terms(&candidate);
            if terms.is_empty() || terms.is_subset(&known) {
                continue;
            }
            known.extend(terms);
            fresh.push(candidate);
        }

        if fresh.is_empty() {
            return Err(RagError::RewriteExhausted(current_query.to_string()));
        }

        let base = current_query.split_whitespace().collect::<Vec<_>>().join(" ");
        let rewritten = if base.is_empty() {
            fresh.join(" ")
        } else {
            format!("{} {}", base, fresh.join(" "))
        };

        ensure_distinct(current_query, rewritten)
    }
}

fn ensure_distinct(current_query: &str, rewritten: String) -> Result<String, RagError> {
    if rewritten.trim().is_empty()
        || text::normalize_query(&rewritten) == text::normalize_query(current_query)
    {
        return Err(RagError::RewriteExhausted(current_query.to_string()));
    }
    Ok(rewritten)
}

const REWRITE_PROMPT: &str = "You improve search queries for a vector index of energy-sector \
documents (regulations, technical datasheets, environmental reports, grid codes, market and \
policy papers). Given the user's original question, the last query that was tried and the \
passages it found, write ONE new search query that is more likely to find passages answering \
the original question. Use domain terminology. Reply with the query only.";

const REPLY_PREFIXES: &[&str] = &["rewritten query:", "new query:", "search query:", "query:"];

/// Asks the chat model for a reformulation.
pub struct LlmRewriter {
    provider: Arc<dyn LlmProvider>,
    model_id: String,
    temperature: f64,
    context_builder: ContextBuilder,
}

impl LlmRewriter {
    pub fn new(provider: Arc<dyn LlmProvider>, model_id: impl Into<String>, temperature: f64) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            temperature,
            context_builder: ContextBuilder::default(),
        }
    }
}

#[async_trait]
impl QueryRewriter for LlmRewriter {
    async fn rewrite(
        &self,
        original_query: &str,
        current_query: &str,
        chunks: &[Chunk],
    ) -> Result<String, RagError> {
        let context = self.context_builder.render(chunks);
        let passages = if context.is_empty() {
            "(nothing was found)".to_string()
        } else {
            context.text
        };

        let request = ChatRequest::new(vec![
            ChatMessage::system(REWRITE_PROMPT),
            ChatMessage::user(format!(
                "Original question: {}\nLast query: {}\n\nPassages found:\n{}\n\nNew query:",
                original_query, current_query, passages
            )),
        ])
        .with_temperature(self.temperature)
        .with_max_tokens(64);

        let reply = self
            .provider
            .chat(request, &self.model_id)
            .await
            .map_err(|e| match e {
                RagError::Llm(_) => e,
                other => RagError::Llm(other.to_string()),
            })?;

        ensure_distinct(current_query, clean_reply(&reply))
    }
}

/// First non-empty line of the reply without a "Query:" style prefix or
/// surrounding quotes.
fn clean_reply(reply: &str) -> String {
    let line = reply
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();

    let lower = line.to_lowercase();
    let without_prefix = REPLY_PREFIXES
        .iter()
        .find(|prefix| lower.starts_with(*prefix))
        .and_then(|prefix| line.get(prefix.len()..))
        .unwrap_or(line);

    without_prefix
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '“' | '”'))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::types::DocumentType;
    use uuid::Uuid;

    fn chunk(text: &str) -> Chunk {
        Chunk::new(text, Vec::new(), Uuid::new_v4(), DocumentType::Technical, 0)
    }

    struct FixedReply(Result<String, RagError>);

    #[async_trait]
    impl LlmProvider for FixedReply {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn health_check(&self) -> Result<bool, RagError> {
            Ok(true)
        }

        async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, RagError> {
            self.0.clone()
        }

        async fn embed(&self, _inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn synonym_table_is_sorted() {
        assert!(SYNONYMS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[tokio::test]
    async fn keyword_rewriter_expands_with_domain_synonyms() {
        let rewriter = KeywordRewriter::new();
        let query = "What are the emissions limits?";
        let rewritten = rewriter.rewrite(query, query, &[]).await.unwrap();
        assert!(rewritten.starts_with(query));
        assert!(rewritten.contains("greenhouse gas"));
    }

    #[tokio::test]
    async fn keyword_rewriter_uses_chunk_terms_when_no_synonyms() {
        let rewriter = KeywordRewriter::new();
        let chunks = vec![
            chunk("Reactive compensation for substations"),
            chunk("Substations require reactive support"),
        ];
        let rewritten = rewriter.rewrite("xyz", "xyz", &chunks).await.unwrap();
        assert_eq!(rewritten, "xyz reactive substation compensation");
    }

    #[tokio::test]
    async fn keyword_rewriter_never_repeats_terms_already_tried() {
        let rewriter = KeywordRewriter::new();
        let first = rewriter.rewrite("solar", "solar", &[]).await.unwrap();
        assert_eq!(first, "solar photovoltaic");

        let err = rewriter.rewrite("solar", &first, &[]).await.unwrap_err();
        assert!(matches!(err, RagError::RewriteExhausted(_)));
    }

    #[tokio::test]
    async fn llm_rewriter_cleans_reply() {
        let rewriter = LlmRewriter::new(
            Arc::new(FixedReply(Ok("Rewritten query: \"PV module rated output\"\n".to_string()))),
            "m",
            0.0,
        );
        let rewritten = rewriter.rewrite("power?", "power?", &[]).await.unwrap();
        assert_eq!(rewritten, "PV module rated output");
    }

    #[tokio::test]
    async fn llm_rewriter_identical_or_empty_reply_is_exhausted() {
        let same = LlmRewriter::new(Arc::new(FixedReply(Ok("  Max   POWER ".to_string()))), "m", 0.0);
        let err = same.rewrite("max power", "max power", &[]).await.unwrap_err();
        assert!(matches!(err, RagError::RewriteExhausted(_)));

        let empty = LlmRewriter::new(Arc::new(FixedReply(Ok("\"\"".to_string()))), "m", 0.0);
        let err = empty.rewrite("max power", "max power", &[]).await.unwrap_err();
        assert!(matches!(err, RagError::RewriteExhausted(_)));
    }

    #[tokio::test]
    async fn llm_rewriter_call_failure_is_hard_error() {
        let failing = LlmRewriter::new(
            Arc::new(FixedReply(Err(RagError::Internal("socket closed".to_string())))),
            "m",
            0.0,
        );
        let err = failing.rewrite("q", "q", &[]).await.unwrap_err();
        assert!(matches!(err, RagError::Llm(_)));
    }
}
