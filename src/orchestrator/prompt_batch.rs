//! 子提示批处理 - 编排层
//!
//! 逐个应用读取 `context_{app_id}.json`，生成子提示并入库

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{context_document_id, DocumentStore};
use crate::models::UiContext;
use crate::services::PromptBuilder;
use crate::store::{RecordStore, StoreConnector};

/// 子提示统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PromptStats {
    pub saved: usize,
    /// 没有 UI 上下文文件
    pub missing: usize,
    pub failed: usize,
}

pub struct PromptBatchDriver {
    connector: Arc<dyn StoreConnector>,
    documents: Arc<dyn DocumentStore>,
    builder: PromptBuilder,
    app_ids: Vec<String>,
}

impl PromptBatchDriver {
    pub fn new(
        config: &Config,
        connector: Arc<dyn StoreConnector>,
        documents: Arc<dyn DocumentStore>,
        builder: PromptBuilder,
    ) -> Self {
        Self {
            connector,
            documents,
            builder,
            app_ids: config.app_ids.clone(),
        }
    }

    pub async fn run(&self) -> AppResult<PromptStats> {
        let store = self.connector.open().await?;
        let result = self.run_apps(store.as_ref()).await;
        store.close().await;
        result
    }

    async fn run_apps(&self, store: &dyn RecordStore) -> AppResult<PromptStats> {
        let apps = if self.app_ids.is_empty() {
            store.list_app_ids().await?
        } else {
            self.app_ids.clone()
        };
        info!("📋 共 {} 个应用需要生成子提示", apps.len());

        let mut stats = PromptStats::default();
        for app_id in &apps {
            match self.save_bundle(store, app_id).await {
                Ok(true) => stats.saved += 1,
                Ok(false) => stats.missing += 1,
                Err(e) => {
                    error!("❌ {} 子提示生成失败: {}", app_id, e);
                    stats.failed += 1;
                }
            }
        }
        Ok(stats)
    }

    /// 返回 `false` 表示没有 UI 上下文文件
    async fn save_bundle(&self, store: &dyn RecordStore, app_id: &str) -> AppResult<bool> {
        let Some(raw) = self.documents.read_text(&context_document_id(app_id)).await? else {
            warn!("⚠️ {} 没有 UI 上下文，跳过", app_id);
            return Ok(false);
        };
        let context: UiContext = serde_json::from_str(&raw)?;
        let bundle = self.builder.build(&context)?;
        if bundle.app_id != app_id {
            return Err(AppError::Parse(format!(
                "UI 上下文属于 {}，不是 {}",
                bundle.app_id, app_id
            )));
        }
        store.upsert_prompt_bundle(&bundle).await?;
        Ok(true)
    }
}
