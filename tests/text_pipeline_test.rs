mod common;

use std::sync::Arc;

use apk_harvest::config::Config;
use apk_harvest::infrastructure::FsDocumentStore;
use apk_harvest::models::PipelineResult;
use apk_harvest::orchestrator::PromptStats;
use apk_harvest::services::{PromptAssembler, PromptBuilder, ResponseValidator, ResultPersister};
use apk_harvest::store::{MemoryConnector, MemoryStore, RecordStore, SqliteStore};
use apk_harvest::{PromptBatchDriver, TextBatchDriver, TextFlow};
use chrono::Utc;
use common::*;
use tokio_test::{assert_err, assert_ok};

const GOOD: &str = r#"{"com.app:id/user": "alice", "com.app:id/pwd": "s3cret!"}"#;

fn ids() -> Vec<String> {
    vec!["com.app:id/user".to_string(), "com.app:id/pwd".to_string()]
}

fn text_flow(config: &Config, generator: Arc<ScriptedGenerator>, doc_dir: &std::path::Path) -> TextFlow {
    TextFlow::new(
        config,
        PromptAssembler::new(Arc::new(FsDocumentStore::with_root(doc_dir))),
        ResponseValidator::with_attempts(generator, 5),
        ResultPersister::with_retries(5),
    )
}

fn single_model_config() -> Config {
    Config {
        models: vec!["gpt-4o".to_string()],
        sequences_per_structure: 1,
        ..Config::default()
    }
}

#[tokio::test]
async fn test_validator_returns_fifth_attempt_and_stops() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Answer::Text("no fence at all".to_string()),
        fenced("{broken"),
        fenced(r#"{"com.app:id/user": "alice"}"#),
        Answer::Text(format!("```\n{}\n```", GOOD)),
        fenced(GOOD),
        fenced(r#"{"never": "reached"}"#),
    ]));
    let validator = ResponseValidator::with_attempts(generator.clone(), 5);

    let answer = assert_ok!(validator.extract_text_input("gpt-4o", &ids(), "prompt").await);

    let map = answer.unwrap();
    assert_eq!(map["com.app:id/user"], "alice");
    assert_eq!(generator.call_count(), 5);
}

#[tokio::test]
async fn test_validator_exhaustion_after_exactly_five_calls() {
    let generator = Arc::new(ScriptedGenerator::always(fenced(r#"{"other": 1}"#)));
    let validator = ResponseValidator::with_attempts(generator.clone(), 5);

    let answer = assert_ok!(validator.extract_text_input("gpt-4o", &ids(), "prompt").await);

    assert!(answer.is_none());
    assert_eq!(generator.call_count(), 5);
}

#[tokio::test]
async fn test_validator_propagates_transport_failure() {
    let generator = Arc::new(ScriptedGenerator::always(Answer::TransportError));
    let validator = ResponseValidator::with_attempts(generator.clone(), 5);

    assert_err!(validator.extract_text_input("gpt-4o", &ids(), "prompt").await);
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn test_text_flow_skips_existing_tuples_and_missing_documents() {
    let docs = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    store.upsert_prompt_bundle(&bundle("x.y.z")).await.unwrap();
    store
        .upsert_result(&PipelineResult {
            app_id: "x.y.z".to_string(),
            model: "gpt-4o".to_string(),
            prompt_structure: 0,
            seq: 1,
            update_date: Utc::now(),
            texts: "{\"kept\": true}".to_string(),
            val: None,
        })
        .await
        .unwrap();
    let generator = Arc::new(ScriptedGenerator::always(fenced(GOOD)));
    let flow = text_flow(&single_model_config(), generator.clone(), docs.path());

    let stats = assert_ok!(flow.run(&store, "x.y.z").await);

    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.no_prompt, 1);
    assert_eq!(stats.generated, 4);
    assert_eq!(generator.call_count(), 4);

    let results = store.list_results("x.y.z").await.unwrap();
    assert_eq!(results.len(), 5);
    let kept = results.iter().find(|r| r.prompt_structure == 0).unwrap();
    assert_eq!(kept.texts, "{\"kept\": true}");
    assert!(results.iter().all(|r| r.prompt_structure != 5));
}

#[tokio::test]
async fn test_text_flow_uses_hierarchy_document_for_structure_five() {
    let docs = tempfile::tempdir().unwrap();
    std::fs::write(docs.path().join("hierarchy_x.y.z.xml"), "<hierarchy/>").unwrap();
    let store = MemoryStore::new();
    store.upsert_prompt_bundle(&bundle("x.y.z")).await.unwrap();
    let generator = Arc::new(ScriptedGenerator::always(fenced(GOOD)));
    let flow = text_flow(&single_model_config(), generator.clone(), docs.path());

    let stats = assert_ok!(flow.run(&store, "x.y.z").await);

    assert_eq!(stats.generated, 6);
    assert_eq!(stats.no_prompt, 0);
    assert_eq!(store.results().len(), 6);
}

#[tokio::test]
async fn test_exhaustion_persists_empty_token_and_transport_errors_persist_nothing() {
    let docs = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    store.upsert_prompt_bundle(&bundle("x.y.z")).await.unwrap();

    let exhausted = Arc::new(ScriptedGenerator::always(Answer::Text("sorry".to_string())));
    let stats = text_flow(&single_model_config(), exhausted.clone(), docs.path())
        .run(&store, "x.y.z")
        .await
        .unwrap();
    assert_eq!(stats.exhausted, 5);
    assert_eq!(exhausted.call_count(), 25);
    assert!(store.results().iter().all(|r| r.is_empty_texts()));

    let other = MemoryStore::new();
    other.upsert_prompt_bundle(&bundle("x.y.z")).await.unwrap();
    let broken = Arc::new(ScriptedGenerator::always(Answer::TransportError));
    let stats = text_flow(&single_model_config(), broken, docs.path())
        .run(&other, "x.y.z")
        .await
        .unwrap();
    assert_eq!(stats.failed, 5);
    assert!(other.results().is_empty());
}

#[tokio::test]
async fn test_batch_driver_uses_configured_apps_and_skips_missing_bundles() {
    let docs = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    store.upsert_prompt_bundle(&bundle("a.b.c")).await.unwrap();
    let config = Config {
        app_ids: vec!["a.b.c".to_string(), "no.bundle".to_string()],
        structure_doc_dir: docs.path().display().to_string(),
        ..single_model_config()
    };
    let generator = Arc::new(ScriptedGenerator::always(fenced(GOOD)));
    let flow = text_flow(&config, generator, docs.path());

    let stats = assert_ok!(
        TextBatchDriver::new(&config, Arc::new(MemoryConnector::new(store.clone())), flow)
            .run()
            .await
    );

    assert_eq!(stats.generated, 5);
    assert!(store.results().iter().all(|r| r.app_id == "a.b.c"));
}

#[tokio::test]
async fn test_sqlite_result_upsert_is_idempotent() {
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    let mut result = PipelineResult {
        app_id: "x.y.z".to_string(),
        model: "GLM-4P".to_string(),
        prompt_structure: 3,
        seq: 2,
        update_date: Utc::now(),
        texts: "{}".to_string(),
        val: None,
    };
    let persister = ResultPersister::with_retries(5);

    assert!(persister.persist(&store, &result).await);
    result.texts = GOOD.to_string();
    assert!(persister.persist(&store, &result).await);

    let rows = store.list_results("x.y.z").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].texts, GOOD);
}

const LOGIN_CONTEXT: &str = r#"{
    "global": {"app_name": "App", "package_name": "x.y.z", "input_count": 2,
               "activity": "x.y.z.LoginActivity"},
    "component": [
        {"type": "android.widget.EditText", "resource_id": "com.app:id/user",
         "hint": "User", "resource_id_combined": "com.app:id/user"},
        {"type": "android.widget.EditText", "resource_id": "com.app:id/pwd",
         "hint": "Password", "resource_id_combined": "com.app:id/pwd"}
    ],
    "adjacent": {"com.app:id/user": {"top": {"text": "Welcome", "distance": 12.0}}}
}"#;

#[tokio::test]
async fn test_prompt_batch_saves_bundles_that_drive_text_generation() {
    let contexts = tempfile::tempdir().unwrap();
    std::fs::write(contexts.path().join("context_x.y.z.json"), LOGIN_CONTEXT).unwrap();
    std::fs::write(contexts.path().join("context_bad.json"), "{not json").unwrap();
    let store = MemoryStore::new();
    let config = Config {
        app_ids: vec!["x.y.z".to_string(), "no.context".to_string(), "bad".to_string()],
        ..single_model_config()
    };

    let stats = assert_ok!(
        PromptBatchDriver::new(
            &config,
            Arc::new(MemoryConnector::new(store.clone())),
            Arc::new(FsDocumentStore::with_root(contexts.path())),
            PromptBuilder::new(&config),
        )
        .run()
        .await
    );
    assert_eq!(stats, PromptStats { saved: 1, missing: 1, failed: 1 });

    let saved = store.get_prompt_bundle("x.y.z").await.unwrap().unwrap();
    assert!(saved.adjacent.contains("Welcome"));

    // 回答缺少组件时不被接受，说明组件 ID 来自入库的子提示
    let generator = Arc::new(ScriptedGenerator::new(vec![
        fenced(r#"{"com.app:id/user": "alice"}"#),
        fenced(GOOD),
    ]));
    let stats = text_flow(&single_model_config(), generator.clone(), contexts.path())
        .run(&store, "x.y.z")
        .await
        .unwrap();
    assert_eq!(stats.generated, 5);
    assert_eq!(generator.call_count(), 6);
}
