//! LLM 接入
//!
//! 驱动器只依赖 [`AnswerGenerator`]，具体接入方式由配置决定

pub mod gateway_client;
pub mod openai_client;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, LlmBackend};
use crate::error::AppResult;

pub use gateway_client::GatewayClient;
pub use openai_client::OpenAiClient;

/// 回答生成器：一次同步的请求 / 响应调用，不使用流式输出
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// 返回原始回答文本；网络层失败返回错误
    async fn complete(&self, model: &str, prompt: &str) -> AppResult<String>;
}

/// 按配置创建回答生成器
pub fn build_generator(config: &Config) -> AppResult<Arc<dyn AnswerGenerator>> {
    let generator: Arc<dyn AnswerGenerator> = match config.llm_backend {
        LlmBackend::Gateway => Arc::new(GatewayClient::new(config)?),
        LlmBackend::OpenAi => Arc::new(OpenAiClient::new(config)),
    };
    Ok(generator)
}
