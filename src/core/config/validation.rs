use serde_json::{Map, Value};
use url::Url;

use crate::core::errors::RagError;
use crate::graph::min_steps_for;

const MODEL_ROLES: [&str; 5] = ["chat", "agent", "grader", "rewriter", "generator"];

pub fn validate_config(config: &Value) -> Result<(), RagError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(llm) = expect_optional_object(root, "llm")? {
        if let Some(provider) = llm.get("provider") {
            match provider.as_str() {
                Some("ollama" | "lmstudio") => {}
                Some(other) => {
                    return Err(RagError::Config(format!(
                        "Invalid config at 'llm.provider': unknown provider '{}' (expected ollama or lmstudio)",
                        other
                    )))
                }
                None => return Err(config_type_error("llm.provider", "string")),
            }
        }
        validate_url_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_u64_field(
            llm,
            "llm.request_timeout_secs",
            "request_timeout_secs",
            1,
            86_400,
        )?;
    }

    if let Some(models) = expect_optional_object(root, "models")? {
        validate_required_string_field(models, "models.embedding", "embedding")?;
        for role in MODEL_ROLES {
            let path_prefix = format!("models.{}", role);
            let Some(value) = models.get(role) else {
                continue;
            };
            let entry = value
                .as_object()
                .ok_or_else(|| config_type_error(&path_prefix, "object"))?;
            validate_required_string_field(entry, &format!("{}.name", path_prefix), "name")?;
            validate_f64_field(
                entry,
                &format!("{}.temperature", path_prefix),
                "temperature",
                0.0,
                2.0,
            )?;
            validate_f64_field(entry, &format!("{}.top_p", path_prefix), "top_p", 0.0, 1.0)?;
            validate_u64_field(
                entry,
                &format!("{}.max_tokens", path_prefix),
                "max_tokens",
                1,
                1_000_000,
            )?;
        }
    }

    if let Some(index) = expect_optional_object(root, "index")? {
        validate_optional_string_field(index, "index.path", "path")?;
    }

    if let Some(ingest) = expect_optional_object(root, "ingest")? {
        validate_url_array_field(ingest, "ingest.urls", "urls")?;
        validate_u64_field(ingest, "ingest.chunk_size", "chunk_size", 0, 1_000_000)?;
        validate_u64_field(ingest, "ingest.chunk_overlap", "chunk_overlap", 0, 1_000_000)?;
        validate_u64_field(
            ingest,
            "ingest.max_chunks_per_source",
            "max_chunks_per_source",
            1,
            1_000_000,
        )?;
        validate_u64_field(
            ingest,
            "ingest.web_timeout_secs",
            "web_timeout_secs",
            1,
            86_400,
        )?;

        let chunk_size = ingest.get("chunk_size").and_then(|v| v.as_u64()).unwrap_or(0);
        let overlap = ingest.get("chunk_overlap").and_then(|v| v.as_u64()).unwrap_or(0);
        if chunk_size > 0 && overlap >= chunk_size {
            return Err(RagError::Config(
                "Invalid config at 'ingest.chunk_overlap': must be smaller than chunk_size"
                    .to_string(),
            ));
        }
    }

    if let Some(graph) = expect_optional_object(root, "graph")? {
        validate_u64_field(graph, "graph.max_rewrites", "max_rewrites", 0, 100)?;
        validate_u64_field(graph, "graph.max_steps", "max_steps", 1, 10_000)?;
        validate_optional_string_field(graph, "graph.tool_description", "tool_description")?;

        let max_rewrites = graph.get("max_rewrites").and_then(|v| v.as_u64());
        let max_steps = graph.get("max_steps").and_then(|v| v.as_u64());
        if let (Some(max_rewrites), Some(max_steps)) = (max_rewrites, max_steps) {
            let needed = min_steps_for(max_rewrites as usize) as u64;
            if max_steps < needed {
                return Err(RagError::Config(format!(
                    "Invalid config at 'graph.max_steps': must be at least {} to allow {} rewrites",
                    needed, max_rewrites
                )));
            }
        }
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
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_required_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let value = section.get(key).ok_or_else(|| {
        RagError::Config(format!("Invalid config at '{}': value is required", path))
    })?;
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_url_field(section: &Map<String, Value>, path: &str, key: &str) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    check_http_url(path, text)
}

fn validate_url_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, index);
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&item_path, "string"));
        };
        check_http_url(&item_path, text)?;
    }
    Ok(())
}

pub(crate) fn check_http_url(path: &str, text: &str) -> Result<(), RagError> {
    let parsed = Url::parse(text.trim()).map_err(|e| {
        RagError::Config(format!("Invalid config at '{}': invalid URL: {}", path, e))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': URL must use http or https",
            path
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
