//! 结果写入 - 业务能力层
//!
//! 幂等写入，失败立即重试，超过次数后记录日志并放弃

use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::PipelineResult;
use crate::store::RecordStore;

pub struct ResultPersister {
    max_retries: u32,
}

impl ResultPersister {
    pub fn new(config: &Config) -> Self {
        Self::with_retries(config.persist_retries)
    }

    pub fn with_retries(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// 写入结果；返回是否成功，失败不会中断调用方
    pub async fn persist(&self, store: &dyn RecordStore, result: &PipelineResult) -> bool {
        for attempt in 1..=self.max_retries {
            match store.upsert_result(result).await {
                Ok(()) => {
                    info!(
                        "写入数据库成功: appId={}, model={}, promptStructure={}, seq={}",
                        result.app_id, result.model, result.prompt_structure, result.seq
                    );
                    return true;
                }
                Err(e) => warn!(
                    "写入数据库失败（第{}次）: appId={}, model={}, promptStructure={}, seq={}: {}",
                    attempt, result.app_id, result.model, result.prompt_structure, result.seq, e
                ),
            }
        }

        error!(
            "超过最大重试次数，放弃写入: appId={}, model={}, promptStructure={}, seq={}",
            result.app_id, result.model, result.prompt_structure, result.seq
        );
        false
    }
}
