use serde_json::{json, Value};

pub const DEFAULT_SOURCE_URLS: [&str; 3] = [
    "https://deno.com/blog/not-using-npm-specifiers-doing-it-wrong",
    "https://deno.com/blog/build-database-app-drizzle",
    "https://deno.com/blog/v2.1",
];

/// Built-in configuration; `config.yml` and `secrets.yaml` are merged on top.
pub fn default_config() -> Value {
    json!({
        "llm": {
            "provider": "ollama",
            "base_url": "http://localhost:11434",
            "api_key": null,
            "request_timeout_secs": 120
        },
        "models": {
            "embedding": "mxbai-embed-large",
            "chat": { "name": "llama3.2" },
            "agent": { "name": "llama3.2:3b", "temperature": 0.0 },
            "grader": { "name": "llama3.2:3b", "temperature": 0.0 },
            "rewriter": { "name": "deepseek-r1:1.5b", "temperature": 0.0 },
            "generator": { "name": "deepseek-r1:1.5b", "temperature": 0.0 }
        },
        "index": {
            "path": null
        },
        "ingest": {
            "urls": DEFAULT_SOURCE_URLS,
            "chunk_size": 500,
            "chunk_overlap": 50,
            "max_chunks_per_source": 200,
            "web_timeout_secs": 30
        },
        "graph": {
            "max_rewrites": 3,
            "max_steps": 25,
            "tool_description": "Search and return information about Deno from various blog posts."
        }
    })
}
