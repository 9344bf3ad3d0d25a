//! 聊天网关客户端
//!
//! 请求体为 `{modelType, sessionId, message}`，响应为 `{success, data: {chat}}`

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::AnswerGenerator;
use crate::config::Config;
use crate::error::{AppError, AppResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    model_type: &'a str,
    session_id: &'a str,
    message: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ChatReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ChatData>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatData {
    #[serde(default)]
    chat: String,
}

impl ChatReply {
    /// 不成功的响应视为空回答
    fn into_answer(self) -> String {
        if !self.success {
            return String::new();
        }
        self.data.map(|d| d.chat).unwrap_or_default()
    }
}

pub struct GatewayClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl GatewayClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            url: config.llm_gateway_url.clone(),
            api_key: config.llm_api_key.clone(),
        })
    }
}

#[async_trait]
impl AnswerGenerator for GatewayClient {
    async fn complete(&self, model: &str, prompt: &str) -> AppResult<String> {
        debug!("调用聊天网关，模型: {}, 提示长度: {} 字符", model, prompt.len());

        let body = ChatRequest {
            model_type: model,
            session_id: "",
            message: prompt,
        };
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!("聊天网关调用失败: {}", e);
                AppError::llm_api_failed(model, e)
            })?;

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| AppError::llm_api_failed(model, e))?;
        if !reply.success {
            warn!("聊天网关返回失败标记 (模型: {})", model);
        }
        Ok(reply.into_answer())
    }
}
