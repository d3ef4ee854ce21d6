use serde_json::{Map, Value};

use crate::core::errors::RagError;

const COMPONENT_KINDS: [(&str, &[&str]); 3] = [
    ("evaluator", &["lexical", "llm"]),
    ("rewriter", &["keyword", "llm"]),
    ("generator", &["extractive", "llm"]),
];

pub fn validate_config(config: &Value) -> Result<(), RagError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(workflow) = expect_optional_object(root, "workflow")? {
        validate_f64_field(
            workflow,
            "workflow.relevance_threshold",
            "relevance_threshold",
            0.0,
            1.0,
        )?;
        validate_u64_field(
            workflow,
            "workflow.max_iterations",
            "max_iterations",
            0,
            20,
        )?;
        validate_u64_field(workflow, "workflow.top_k", "top_k", 1, 200)?;
        for (key, allowed) in COMPONENT_KINDS {
            validate_enum_field(workflow, &format!("workflow.{}", key), key, allowed)?;
        }
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_f64_field(retrieval, "retrieval.min_score", "min_score", -1.0, 1.0)?;
    }

    if let Some(ingestion) = expect_optional_object(root, "ingestion")? {
        validate_u64_field(
            ingestion,
            "ingestion.chunk_size",
            "chunk_size",
            50,
            100_000,
        )?;
        validate_u64_field(
            ingestion,
            "ingestion.chunk_overlap",
            "chunk_overlap",
            0,
            50_000,
        )?;
        validate_u64_field(
            ingestion,
            "ingestion.embed_batch_size",
            "embed_batch_size",
            1,
            2048,
        )?;

        let size = ingestion.get("chunk_size").and_then(Value::as_u64);
        let overlap = ingestion.get("chunk_overlap").and_then(Value::as_u64);
        if let (Some(size), Some(overlap)) = (size, overlap) {
            if overlap >= size {
                return Err(RagError::Config(
                    "Invalid config at 'ingestion.chunk_overlap': must be smaller than chunk_size"
                        .to_string(),
                ));
            }
        }
    }

    if let Some(store) = expect_optional_object(root, "store")? {
        validate_enum_field(store, "store.backend", "backend", &["memory", "sqlite"])?;
        validate_optional_string_field(store, "store.sqlite_path", "sqlite_path")?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.chat_model", "chat_model")?;
        validate_optional_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_u64_field(
            llm,
            "llm.embedding_dimensions",
            "embedding_dimensions",
            1,
            65_536,
        )?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 3_600)?;
        validate_u64_field(
            llm,
            "llm.max_context_chars",
            "max_context_chars",
            500,
            1_000_000,
        )?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_enum_field(
            embedding,
            "embedding.provider",
            "provider",
            &["llm", "hashed"],
        )?;
        validate_u64_field(
            embedding,
            "embedding.hashed_dimensions",
            "hashed_dimensions",
            8,
            65_536,
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, RagError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !(min..=max).contains(&number) {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    match section.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(config_type_error(path, "string")),
    }
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': expected one of {}",
            path,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> RagError {
    RagError::Config(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
