//! 持久化 - 基础设施层
//!
//! 只暴露"认领 / 写入 / 查询"能力，驱动器不关心具体数据库

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{ApkRecord, PipelineResult, PromptBundle};

pub use memory::{MemoryConnector, MemoryStore};
pub use sqlite::{SqliteConnector, SqliteStore};

/// 记录存储
///
/// 待处理的定义：版本号字段为空。
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 认领一条待处理记录，没有时返回 `None`
    async fn claim_next_pending(&self) -> AppResult<Option<ApkRecord>>;

    /// 按应用 ID 幂等写入
    async fn upsert_record(&self, record: &ApkRecord) -> AppResult<()>;

    /// 按 (应用, 模型, 结构, 序号) 幂等写入
    async fn upsert_result(&self, result: &PipelineResult) -> AppResult<()>;

    async fn list_results(&self, app_id: &str) -> AppResult<Vec<PipelineResult>>;

    async fn get_prompt_bundle(&self, app_id: &str) -> AppResult<Option<PromptBundle>>;

    async fn upsert_prompt_bundle(&self, bundle: &PromptBundle) -> AppResult<()>;

    /// 已下载安装包的应用
    async fn list_app_ids(&self) -> AppResult<Vec<String>>;

    /// 结束会话
    async fn close(&self) {}
}

/// 打开存储会话
///
/// 每轮外层循环打开一次，连接层失败后重新打开。
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn open(&self) -> AppResult<Arc<dyn RecordStore>>;
}
