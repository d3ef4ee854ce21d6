//! Answer generation with chunk citations.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::context_builder::ContextBuilder;
use super::text;
use super::types::{Chunk, ChunkReference};
use crate::core::errors::RagError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

pub const NO_SUPPORTING_DOCUMENTS: &str =
    "No supporting documents were found for this question, so it cannot be answered from the indexed corpus.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub citations: Vec<ChunkReference>,
}

impl GeneratedAnswer {
    pub fn unsupported() -> Self {
        Self {
            answer: NO_SUPPORTING_DOCUMENTS.to_string(),
            citations: Vec::new(),
        }
    }
}

/// Produces the final answer from the selected context.
///
/// When `chunks` is non-empty the answer cites at least one of them.
/// External-call failures surface as `RagError::Generation`.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, query: &str, chunks: &[Chunk]) -> Result<GeneratedAnswer, RagError>;
}

const ANSWER_PROMPT: &str = "You answer questions about energy-sector documents using only the \
numbered context passages provided. Cite every claim with the passage marker in square brackets, \
for example [1] or [2]. If the passages do not contain the answer, say so and cite the closest \
passage.";

/// Chat-model generator. Only the leading chunks that fit the context
/// builder's window (`llm.max_context_chars`) are shown to the model and can
/// be cited.
pub struct LlmAnswerGenerator {
    provider: Arc<dyn LlmProvider>,
    model_id: String,
    temperature: f64,
    context_builder: ContextBuilder,
}

impl LlmAnswerGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, model_id: impl Into<String>, temperature: f64) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            temperature,
            context_builder: ContextBuilder::default(),
        }
    }

    pub fn with_context_builder(mut self, context_builder: ContextBuilder) -> Self {
        self.context_builder = context_builder;
        self
    }
}

#[async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn generate(&self, query: &str, chunks: &[Chunk]) -> Result<GeneratedAnswer, RagError> {
        if chunks.is_empty() {
            return Ok(GeneratedAnswer::unsupported());
        }

        let context = self.context_builder.render(chunks);
        let request = ChatRequest::new(vec![
            ChatMessage::system(ANSWER_PROMPT),
            ChatMessage::user(format!("Context:\n{}\n\nQuestion: {}", context.text, query)),
        ])
        .with_temperature(self.temperature);

        let answer = self
            .provider
            .chat(request, &self.model_id)
            .await
            .map_err(|e| RagError::Generation(e.to_string()))?;

        let visible = &chunks[..context.included];
        let mut citations = parse_citations(&answer, visible);
        if citations.is_empty() {
            tracing::warn!("Answer carried no valid citation marker; citing top-ranked chunk");
            citations.push(chunks[0].reference(1));
        }

        Ok(GeneratedAnswer {
            answer: answer.trim().to_string(),
            citations,
        })
    }
}

static CITATION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]").ok());

/// Distinct `[n]` markers in order of first appearance, mapped to the chunk
/// at 1-based position `n`. Out-of-range markers are dropped.
pub fn parse_citations(answer: &str, chunks: &[Chunk]) -> Vec<ChunkReference> {
    let Some(pattern) = CITATION_PATTERN.as_ref() else {
        return Vec::new();
    };

    let mut seen = BTreeSet::new();
    let mut citations = Vec::new();
    for captures in pattern.captures_iter(answer) {
        let Some(marker) = captures.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else {
            continue;
        };
        if marker == 0 || marker > chunks.len() || !seen.insert(marker) {
            continue;
        }
        citations.push(chunks[marker - 1].reference(marker));
    }
    citations
}

/// Offline generator: picks the sentences that best cover the query's
/// concept terms and cites the chunk each came from.
#[derive(Debug, Clone)]
pub struct ExtractiveGenerator {
    max_sentences: usize,
}

impl ExtractiveGenerator {
    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
        }
    }
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self::new(2)
    }
}

struct Candidate {
    marker: usize,
    sentence: String,
    score: f32,
}

#[async_trait]
impl AnswerGenerator for ExtractiveGenerator {
    async fn generate(&self, query: &str, chunks: &[Chunk]) -> Result<GeneratedAnswer, RagError> {
        if chunks.is_empty() {
            return Ok(GeneratedAnswer::unsupported());
        }

        let query_terms = text::concept_terms(query);
        let mut candidates = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            for sentence in text::sentences(&chunk.text) {
                let score = text::coverage(&query_terms, &text::concept_terms(&sentence));
                candidates.push(Candidate {
                    marker: idx + 1,
                    sentence,
                    score,
                });
            }
        }

        crate::vector_math::sort_scores_descending(&mut candidates, |c| c.score);
        let mut picked: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| c.score > 0.0)
            .take(self.max_sentences)
            .collect();

        if picked.is_empty() {
            let lead = text::sentences(&chunks[0].text)
                .into_iter()
                .next()
                .unwrap_or_else(|| chunks[0].text.trim().to_string());
            picked.push(Candidate {
                marker: 1,
                sentence: lead,
                score: 0.0,
            });
        }

        let mut answer_parts = Vec::with_capacity(picked.len());
        let mut citations: Vec<ChunkReference> = Vec::new();
        for candidate in &picked {
            answer_parts.push(format!("{} [{}]", candidate.sentence, candidate.marker));
            if !citations.iter().any(|c| c.marker == candidate.marker) {
                citations.push(chunks[candidate.marker - 1].reference(candidate.marker));
            }
        }

        Ok(GeneratedAnswer {
            answer: answer_parts.join(" "),
            citations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::context_builder::ContextBuilderConfig;
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
    fn citations_are_deduplicated_and_range_checked() {
        let chunks = vec![chunk("a"), chunk("b")];
        let refs = parse_citations("See [2], also [1] and [2] and [7] and [0].", &chunks);
        let markers: Vec<usize> = refs.iter().map(|r| r.marker).collect();
        assert_eq!(markers, vec![2, 1]);
        assert_eq!(refs[0].chunk_id, chunks[1].id);
    }

    #[tokio::test]
    async fn llm_generator_parses_markers() {
        let chunks = vec![chunk("Max power: 400W"), chunk("Efficiency: 21%")];
        let generator = LlmAnswerGenerator::new(
            Arc::new(FixedReply(Ok("The panel peaks at 400W [1].".to_string()))),
            "m",
            0.0,
        );
        let answer = generator.generate("max power?", &chunks).await.unwrap();
        assert_eq!(answer.answer, "The panel peaks at 400W [1].");
        assert_eq!(answer.citations, vec![chunks[0].reference(1)]);
    }

    #[tokio::test]
    async fn llm_generator_falls_back_to_top_chunk() {
        let chunks = vec![chunk("Max power: 400W")];
        let generator =
            LlmAnswerGenerator::new(Arc::new(FixedReply(Ok("400W [9]".to_string()))), "m", 0.0);
        let answer = generator.generate("max power?", &chunks).await.unwrap();
        assert_eq!(answer.citations, vec![chunks[0].reference(1)]);
    }

    #[tokio::test]
    async fn markers_past_the_window_are_not_cited() {
        let chunks = vec![chunk("Max power: 400W"), chunk("Efficiency: 21%")];
        let generator = LlmAnswerGenerator::new(
            Arc::new(FixedReply(Ok("Efficiency is 21% [2].".to_string()))),
            "m",
            0.0,
        )
        .with_context_builder(ContextBuilder::new(ContextBuilderConfig {
            max_context_length: 24,
            include_metadata: false,
        }));

        let answer = generator.generate("efficiency?", &chunks).await.unwrap();
        assert_eq!(answer.citations, vec![chunks[0].reference(1)]);
    }

    #[tokio::test]
    async fn llm_generator_without_chunks_does_not_call_model() {
        let generator = LlmAnswerGenerator::new(
            Arc::new(FixedReply(Err(RagError::Llm("must not be called".to_string())))),
            "m",
            0.0,
        );
        let answer = generator.generate("anything", &[]).await.unwrap();
        assert_eq!(answer, GeneratedAnswer::unsupported());
    }

    #[tokio::test]
    async fn llm_failure_is_generation_error() {
        let generator =
            LlmAnswerGenerator::new(Arc::new(FixedReply(Err(RagError::Llm("502".to_string())))), "m", 0.0);
        let err = generator.generate("q", &[chunk("x")]).await.unwrap_err();
        assert!(matches!(err, RagError::Generation(_)));
    }

    #[tokio::test]
    async fn extractive_picks_answering_sentence() {
        let chunks = vec![
            chunk("Operating temperature: -40 to 85 C."),
            chunk("Module datasheet. Max power: 400W. Weight: 21 kg."),
        ];
        let answer = ExtractiveGenerator::default()
            .generate("What is the maximum power output?", &chunks)
            .await
            .unwrap();
        assert!(answer.answer.contains("400W"));
        assert_eq!(answer.citations, vec![chunks[1].reference(2)]);
    }

    #[tokio::test]
    async fn extractive_always_cites_when_chunks_exist() {
        let chunks = vec![chunk("Unrelated tariff schedule")];
        let answer = ExtractiveGenerator::default()
            .generate("wind turbine noise", &chunks)
            .await
            .unwrap();
        assert_eq!(answer.citations.len(), 1);
        assert!(answer.answer.contains("[1]"));
    }
}
