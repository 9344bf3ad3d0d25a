use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 生成失败时写入的占位文本
pub const EMPTY_TEXTS: &str = "{}";

/// 应用的五段子提示
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PromptBundle {
    pub app_id: String,
    pub global: String,
    pub component: String,
    pub adjacent: String,
    pub restrictive: String,
    pub guiding: String,
    pub update_date: Option<DateTime<Utc>>,
}

/// 结果主键: (应用, 模型, 提示结构, 序号)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultKey {
    pub app_id: String,
    pub model: String,
    pub prompt_structure: i64,
    pub seq: i64,
}

/// 一次生成的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PipelineResult {
    pub app_id: String,
    pub model: String,
    pub prompt_structure: i64,
    pub seq: i64,
    pub update_date: DateTime<Utc>,
    /// JSON 文本，生成失败时为 `{}`
    pub texts: String,
    /// 预留的评分字段
    pub val: Option<i64>,
}

impl PipelineResult {
    pub fn key(&self) -> ResultKey {
        ResultKey {
            app_id: self.app_id.clone(),
            model: self.model.clone(),
            prompt_structure: self.prompt_structure,
            seq: self.seq,
        }
    }

    pub fn is_empty_texts(&self) -> bool {
        self.texts == EMPTY_TEXTS
    }
}
