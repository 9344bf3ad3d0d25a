//! 兼容 OpenAI API 的服务（OpenAI, Azure, Doubao 等）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::AnswerGenerator;
use crate::config::Config;
use crate::error::{AppError, AppResult};

pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
        }
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiClient {
    async fn complete(&self, model: &str, prompt: &str) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", model);

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| AppError::llm_api_failed(model, e))?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .build()
            .map_err(|e| AppError::llm_api_failed(model, e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(model, e)
        })?;

        Ok(answer_text(model, &response))
    }
}

/// 取第一个候选的文本；没有内容按空回答处理，由校验器计为一次失败尝试
fn answer_text(model: &str, response: &CreateChatCompletionResponse) -> String {
    match response
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_deref())
    {
        Some(content) => content.trim().to_string(),
        None => {
            warn!("{} 返回了空回答", model);
            String::new()
        }
    }
}
