use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{AppError, AppResult, StoreError};
use crate::models::{ApkRecord, PipelineResult, PromptBundle, ResultKey};
use crate::store::{RecordStore, StoreConnector};

#[derive(Debug, Default)]
struct MemoryState {
    records: BTreeMap<String, ApkRecord>,
    results: BTreeMap<ResultKey, PipelineResult>,
    bundles: HashMap<String, PromptBundle>,
}

/// 进程内存储，语义与 SQLite 实现一致
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以待处理状态加入一组应用
    pub fn with_pending(app_ids: &[&str]) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.lock() {
            for app_id in app_ids {
                state
                    .records
                    .insert(app_id.to_string(), ApkRecord::new(*app_id));
            }
        }
        store
    }

    pub fn record(&self, app_id: &str) -> Option<ApkRecord> {
        self.lock().ok()?.records.get(app_id).cloned()
    }

    pub fn records(&self) -> Vec<ApkRecord> {
        self.lock()
            .map(|s| s.records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn results(&self) -> Vec<PipelineResult> {
        self.lock()
            .map(|s| s.results.values().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| AppError::Store(StoreError::Rejected(e.to_string())))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn claim_next_pending(&self) -> AppResult<Option<ApkRecord>> {
        let state = self.lock()?;
        Ok(state.records.values().find(|r| r.is_pending()).cloned())
    }

    async fn upsert_record(&self, record: &ApkRecord) -> AppResult<()> {
        let mut state = self.lock()?;
        state.records.insert(record.app_id.clone(), record.clone());
        Ok(())
    }

    async fn upsert_result(&self, result: &PipelineResult) -> AppResult<()> {
        let mut state = self.lock()?;
        state.results.insert(result.key(), result.clone());
        Ok(())
    }

    async fn list_results(&self, app_id: &str) -> AppResult<Vec<PipelineResult>> {
        let state = self.lock()?;
        Ok(state
            .results
            .values()
            .filter(|r| r.app_id == app_id)
            .cloned()
            .collect())
    }

    async fn get_prompt_bundle(&self, app_id: &str) -> AppResult<Option<PromptBundle>> {
        let state = self.lock()?;
        Ok(state.bundles.get(app_id).cloned())
    }

    async fn upsert_prompt_bundle(&self, bundle: &PromptBundle) -> AppResult<()> {
        let mut state = self.lock()?;
        state.bundles.insert(bundle.app_id.clone(), bundle.clone());
        Ok(())
    }

    async fn list_app_ids(&self) -> AppResult<Vec<String>> {
        let state = self.lock()?;
        Ok(state
            .records
            .values()
            .filter(|r| r.apk_name.is_some())
            .map(|r| r.app_id.clone())
            .collect())
    }
}

/// 每次打开都返回同一份内存数据
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    store: MemoryStore,
}

impl MemoryConnector {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn open(&self) -> AppResult<Arc<dyn RecordStore>> {
        Ok(Arc::new(self.store.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(seq: i64, texts: &str) -> PipelineResult {
        PipelineResult {
            app_id: "x.y.z".to_string(),
            model: "gpt-4o".to_string(),
            prompt_structure: 0,
            seq,
            update_date: Utc::now(),
            texts: texts.to_string(),
            val: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_result_is_idempotent_and_last_write_wins() {
        let store = MemoryStore::new();
        store.upsert_result(&result(1, "{\"a\":\"1\"}")).await.unwrap();
        store.upsert_result(&result(1, "{\"a\":\"2\"}")).await.unwrap();
        store.upsert_result(&result(2, "{}")).await.unwrap();

        let rows = store.list_results("x.y.z").await.unwrap();
        assert_eq!(rows.len(), 2);
        let first = rows.iter().find(|r| r.seq == 1).unwrap();
        assert_eq!(first.texts, "{\"a\":\"2\"}");
    }

    #[tokio::test]
    async fn test_claim_skips_records_with_version() {
        let store = MemoryStore::with_pending(&["a.a", "b.b"]);
        let mut first = store.claim_next_pending().await.unwrap().unwrap();
        assert_eq!(first.app_id, "a.a");

        first.version = Some("1.0".to_string());
        store.upsert_record(&first).await.unwrap();

        let next = store.claim_next_pending().await.unwrap().unwrap();
        assert_eq!(next.app_id, "b.b");
    }
}
