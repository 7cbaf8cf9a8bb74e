use serde_json::{Map, Value};

use crate::core::errors::ApiError;

const LLM_TASKS: [&str; 10] = [
    "expansion",
    "strategy",
    "relevance",
    "reasoning",
    "sufficiency",
    "sub_queries",
    "synthesis",
    "validation",
    "scoring",
    "refinement",
];

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 3_600)?;

        if let Some(tasks) = expect_optional_object(llm, "tasks")? {
            for (task, value) in tasks {
                let path_prefix = format!("llm.tasks.{}", task);
                if !LLM_TASKS.contains(&task.as_str()) {
                    return Err(ApiError::BadRequest(format!(
                        "Invalid config at '{}': unknown task",
                        path_prefix
                    )));
                }
                let entry = value
                    .as_object()
                    .ok_or_else(|| config_type_error(&path_prefix, "object"))?;
                validate_optional_string_field(entry, &format!("{}.model", path_prefix), "model")?;
                validate_f64_field(
                    entry,
                    &format!("{}.temperature", path_prefix),
                    "temperature",
                    0.0,
                    2.0,
                )?;
                validate_u64_field(
                    entry,
                    &format!("{}.max_tokens", path_prefix),
                    "max_tokens",
                    1,
                    32_768,
                )?;
            }
        }
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_optional_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_optional_string_field(embedding, "embedding.model", "model")?;
        validate_optional_string_field(embedding, "embedding.api_key", "api_key")?;
        validate_u64_field(embedding, "embedding.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(search) = expect_optional_object(root, "search")? {
        validate_enum_field(
            search,
            "search.provider",
            "provider",
            &["duckduckgo", "brave", "bing", "google"],
        )?;
        for key in [
            "brave_api_key",
            "bing_api_key",
            "google_api_key",
            "google_engine_id",
        ] {
            validate_optional_string_field(search, &format!("search.{}", key), key)?;
        }
        validate_u64_field(search, "search.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(store) = expect_optional_object(root, "vector_store")? {
        validate_enum_field(store, "vector_store.backend", "backend", &["sqlite", "memory"])?;
        validate_optional_string_field(
            store,
            "vector_store.documents_namespace",
            "documents_namespace",
        )?;
        validate_optional_string_field(
            store,
            "vector_store.interactions_namespace",
            "interactions_namespace",
        )?;
    }

    if let Some(pipeline) = expect_optional_object(root, "pipeline")? {
        validate_enum_field(
            pipeline,
            "pipeline.strategy",
            "strategy",
            &["adaptive", "local_first", "web_first", "hybrid"],
        )?;
        validate_enum_field(
            pipeline,
            "pipeline.quality_policy",
            "quality_policy",
            &["scored_refinement", "binary_validation"],
        )?;
        validate_bool_field(pipeline, "pipeline.reasoning", "reasoning")?;
        validate_bool_field(pipeline, "pipeline.sufficiency_check", "sufficiency_check")?;
        validate_u64_field(pipeline, "pipeline.top_k", "top_k", 1, 100)?;
        validate_u64_field(pipeline, "pipeline.sub_query_top_k", "sub_query_top_k", 1, 100)?;
        validate_u64_field(pipeline, "pipeline.web_max_results", "web_max_results", 1, 50)?;
        validate_u64_field(
            pipeline,
            "pipeline.hybrid_web_max_results",
            "hybrid_web_max_results",
            1,
            50,
        )?;
        validate_u64_field(
            pipeline,
            "pipeline.thin_context_chars",
            "thin_context_chars",
            0,
            100_000,
        )?;
        validate_u64_field(pipeline, "pipeline.refine_threshold", "refine_threshold", 1, 10)?;
        validate_u64_field(
            pipeline,
            "pipeline.max_context_chars",
            "max_context_chars",
            100,
            1_000_000,
        )?;
    }

    if let Some(ingest) = expect_optional_object(root, "ingest")? {
        validate_u64_field(ingest, "ingest.chunk_words", "chunk_words", 1, 10_000)?;
        validate_u64_field(
            ingest,
            "ingest.chunk_overlap_words",
            "chunk_overlap_words",
            0,
            10_000,
        )?;
        validate_u64_field(
            ingest,
            "ingest.fetch_timeout_secs",
            "fetch_timeout_secs",
            1,
            3_600,
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
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
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
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
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': expected one of {}",
            path,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
