//! 文本生成批处理 - 编排层
//!
//! 逐个应用调用 [`TextFlow`]，单个应用失败不影响其他应用

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::store::{RecordStore, StoreConnector};
use crate::workflow::{TextFlow, TextStats};

pub struct TextBatchDriver {
    connector: Arc<dyn StoreConnector>,
    flow: TextFlow,
    app_ids: Vec<String>,
}

impl TextBatchDriver {
    pub fn new(config: &Config, connector: Arc<dyn StoreConnector>, flow: TextFlow) -> Self {
        Self {
            connector,
            flow,
            app_ids: config.app_ids.clone(),
        }
    }

    pub async fn run(&self) -> AppResult<TextStats> {
        let store = self.connector.open().await?;
        let result = self.run_apps(store.as_ref()).await;
        store.close().await;
        result
    }

    async fn run_apps(&self, store: &dyn RecordStore) -> AppResult<TextStats> {
        let apps = if self.app_ids.is_empty() {
            store.list_app_ids().await?
        } else {
            self.app_ids.clone()
        };

        if apps.is_empty() {
            warn!("⚠️ 没有需要生成文本的应用");
            return Ok(TextStats::default());
        }
        info!("📋 共 {} 个应用", apps.len());

        let mut total = TextStats::default();
        for (idx, app_id) in apps.iter().enumerate() {
            info!("[{}/{}] {}", idx + 1, apps.len(), app_id);
            match self.flow.run(store, app_id).await {
                Ok(stats) => total.add(stats),
                Err(e) => error!("❌ {} 处理失败: {}", app_id, e),
            }
        }
        Ok(total)
    }
}
