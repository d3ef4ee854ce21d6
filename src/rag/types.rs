//! Core records of the document store: documents, chunks and search hits.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::errors::RagError;

/// Closed set of energy-sector document categories used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Regulatory,
    Technical,
    Environmental,
    Grid,
    Renewable,
    Efficiency,
    Market,
    Policy,
}

impl DocumentType {
    pub const ALL: [DocumentType; 8] = [
        DocumentType::Regulatory,
        DocumentType::Technical,
        DocumentType::Environmental,
        DocumentType::Grid,
        DocumentType::Renewable,
        DocumentType::Efficiency,
        DocumentType::Market,
        DocumentType::Policy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Regulatory => "regulatory",
            DocumentType::Technical => "technical",
            DocumentType::Environmental => "environmental",
            DocumentType::Grid => "grid",
            DocumentType::Renewable => "renewable",
            DocumentType::Efficiency => "efficiency",
            DocumentType::Market => "market",
            DocumentType::Policy => "policy",
        }
    }

    /// `None` matches every type.
    pub fn matches(filter: Option<DocumentType>, candidate: DocumentType) -> bool {
        filter.map_or(true, |wanted| wanted == candidate)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| RagError::InvalidInput(format!("unknown document type: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Indexed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Indexed => "indexed",
            DocumentStatus::Failed => "failed",
        }
    }

    /// Only `processing -> indexed` and `processing -> failed` are legal.
    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Processing, DocumentStatus::Indexed)
                | (DocumentStatus::Processing, DocumentStatus::Failed)
        )
    }
}

impl FromStr for DocumentStatus {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "processing" => Ok(DocumentStatus::Processing),
            "indexed" => Ok(DocumentStatus::Indexed),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(RagError::Store(format!("unknown document status: {}", other))),
        }
    }
}

/// An uploaded source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    pub page_count: u32,
    pub status: DocumentStatus,
}

impl Document {
    /// A freshly uploaded document, still `processing`.
    pub fn new(filename: impl Into<String>, document_type: DocumentType, page_count: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            document_type,
            page_count,
            status: DocumentStatus::Processing,
        }
    }
}

/// A unit of indexed text. Immutable once written to a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    pub document_id: Uuid,
    pub document_type: DocumentType,
    pub position_index: u32,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(
        text: impl Into<String>,
        embedding: Vec<f32>,
        document_id: Uuid,
        document_type: DocumentType,
        position_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            embedding,
            document_id,
            document_type,
            position_index,
            created_at: Utc::now(),
        }
    }

    pub fn reference(&self, marker: usize) -> ChunkReference {
        ChunkReference {
            chunk_id: self.id,
            document_id: self.document_id,
            position_index: self.position_index,
            marker,
        }
    }
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

/// Citation pointing at a chunk. `marker` is the 1-based position of the
/// chunk in the context block the answer was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkReference {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub position_index: u32,
    pub marker: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_parses_case_insensitively() {
        assert_eq!("Technical".parse::<DocumentType>().unwrap(), DocumentType::Technical);
        assert_eq!(" grid ".parse::<DocumentType>().unwrap(), DocumentType::Grid);
        assert!("nuclear".parse::<DocumentType>().is_err());
    }

    #[test]
    fn document_type_as_str_roundtrip() {
        for t in DocumentType::ALL {
            assert_eq!(t.as_str().parse::<DocumentType>().unwrap(), t);
        }
    }

    #[test]
    fn filter_none_matches_everything() {
        assert!(DocumentType::matches(None, DocumentType::Market));
        assert!(DocumentType::matches(Some(DocumentType::Market), DocumentType::Market));
        assert!(!DocumentType::matches(Some(DocumentType::Grid), DocumentType::Market));
    }

    #[test]
    fn status_transitions_only_leave_processing() {
        use DocumentStatus::*;
        assert!(Processing.can_transition_to(Indexed));
        assert!(Processing.can_transition_to(Failed));
        assert!(!Indexed.can_transition_to(Processing));
        assert!(!Indexed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Indexed));
        assert!(!Processing.can_transition_to(Processing));
    }

    #[test]
    fn document_serializes_type_field() {
        let doc = Document::new("inverter.pdf", DocumentType::Technical, 12);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["type"], "technical");
        assert_eq!(json["status"], "processing");
    }

    #[test]
    fn chunk_serialization_omits_empty_embedding() {
        let chunk = Chunk::new("Max power: 400W", Vec::new(), Uuid::new_v4(), DocumentType::Technical, 0);
        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json.get("embedding").is_none());
        assert_eq!(json["document_type"], "technical");
    }
}
