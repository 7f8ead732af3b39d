mod common;

use std::fs;
use std::sync::Arc;

use common::{two_doc_index, ScriptedProvider};
use ragloop::core::config::{AppPaths, ConfigService};
use ragloop::llm::{ChatMessage, Role};
use ragloop::rag::DocumentIndex;
use ragloop::state::AppState;
use ragloop::RagError;

fn app_state(dir: &std::path::Path, provider: Arc<ScriptedProvider>) -> AppState {
    let paths = Arc::new(AppPaths::with_data_dir(dir.to_path_buf(), dir.join("data")));
    let service = ConfigService::new(paths.clone()).with_config_path(Some(dir.join("config.yml")));
    let config = service.load_config().unwrap();
    AppState::with_provider(paths, service, config, provider)
}

#[tokio::test]
async fn closest_document_answers_the_question() {
    let tmp = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(
        vec![0.9, 0.1],
        vec![Ok(ChatMessage::assistant("Use the A approach."))],
    );
    let state = app_state(tmp.path(), provider.clone());
    two_doc_index().save(&state.index_path()).unwrap();

    let index = state.load_index().unwrap();
    assert_eq!(index.len(), 2);

    let outcome = state.pipeline(index).ask("How to use drizzle?").await.unwrap();

    assert_eq!(outcome.context.text, "A");
    assert_eq!(outcome.context.source, "u1");
    assert_eq!(outcome.answer, "Use the A approach.");
    assert_eq!(outcome.conversation.len(), 2);
    assert_eq!(outcome.conversation.last().unwrap().role, Role::Assistant);
    assert!(outcome.conversation.first().unwrap().content.starts_with("How to use drizzle?"));
    assert!(outcome.conversation.first().unwrap().content.ends_with("A"));

    assert_eq!(provider.chat_models(), vec!["llama3.2"]);
    assert_eq!(provider.embed_calls(), 1);
}

#[tokio::test]
async fn empty_index_fails_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![1.0, 0.0], vec![Ok(ChatMessage::assistant("x"))]);
    let state = app_state(tmp.path(), provider.clone());
    fs::write(state.index_path(), "[]").unwrap();

    let index = state.load_index().unwrap();
    let err = state.pipeline(index).ask("q").await.unwrap_err();

    assert!(matches!(err, RagError::EmptyIndex));
    assert!(provider.chat_models().is_empty());
}

#[tokio::test]
async fn mismatched_index_is_rejected_on_load() {
    let tmp = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![1.0, 0.0], Vec::new());
    let state = app_state(tmp.path(), provider);
    fs::write(
        state.index_path(),
        r#"[{"embedding":[1,0],"text":"A","source":"u1"},{"embedding":[1,0,0],"text":"B","source":"u2"}]"#,
    )
    .unwrap();

    let err = state.load_index().unwrap_err();
    assert!(matches!(
        err,
        RagError::DimensionMismatch {
            expected: 2,
            actual: 3
        }
    ));
}

#[tokio::test]
async fn query_dimension_must_match_index() {
    let tmp = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![1.0, 0.0, 0.0], Vec::new());
    let state = app_state(tmp.path(), provider);
    let index = Arc::new(two_doc_index());

    let err = state.retriever(index).retrieve("q").await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { .. }));
}

#[test]
fn saved_index_round_trips_through_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("embeddings.json");
    two_doc_index().save(&path).unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw[0]["text"], "A");
    assert_eq!(raw[1]["source"], "u2");

    let loaded = DocumentIndex::load(&path).unwrap();
    assert_eq!(loaded.nearest(&[0.2, 0.8]).unwrap().document.source, "u2");
}
