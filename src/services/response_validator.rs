//! 回答校验 - 业务能力层
//!
//! 反复调用 LLM，直到回答中的 ```json 代码块包含全部组件 ID

use std::sync::Arc;

use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::clients::AnswerGenerator;
use crate::config::Config;
use crate::error::AppResult;
use crate::utils::logging::truncate_text;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// 取出第一个 ```json 代码块的内容（到下一个 ``` 为止）
pub fn extract_json_block(answer: &str) -> Option<&str> {
    let (_, rest) = answer.split_once(JSON_FENCE)?;
    let (block, _) = rest.split_once(FENCE)?;
    Some(block.trim())
}

/// 解析回答；代码块缺失、不是对象或缺少组件时返回 `None`
pub fn parse_answer(answer: &str, component_ids: &[String]) -> Option<Map<String, JsonValue>> {
    let block = extract_json_block(answer)?;
    let parsed: Map<String, JsonValue> = match serde_json::from_str(block) {
        Ok(map) => map,
        Err(e) => {
            debug!("Parsing error: {}", e);
            return None;
        }
    };

    let missing: Vec<&str> = component_ids
        .iter()
        .filter(|id| !parsed.contains_key(id.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        debug!("Missing components: {}", missing.join(", "));
        return None;
    }
    Some(parsed)
}

/// 从限制性子提示的示例 JSON 中取出组件 ID
pub fn extract_component_ids(restrictive: &str) -> AppResult<Vec<String>> {
    let re = Regex::new(r"(?s)```json\s*(\{.*?\})\s*```")?;
    let Some(captures) = re.captures(restrictive) else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Map<String, JsonValue>>(&captures[1]) {
        Ok(map) => Ok(map.keys().cloned().collect()),
        Err(e) => {
            warn!("限制性提示中的示例 JSON 无法解析: {}", e);
            Ok(Vec::new())
        }
    }
}

/// 回答校验器
pub struct ResponseValidator {
    generator: Arc<dyn AnswerGenerator>,
    max_attempts: u32,
}

impl ResponseValidator {
    pub fn new(generator: Arc<dyn AnswerGenerator>, config: &Config) -> Self {
        Self::with_attempts(generator, config.answer_attempts)
    }

    pub fn with_attempts(generator: Arc<dyn AnswerGenerator>, max_attempts: u32) -> Self {
        Self {
            generator,
            max_attempts,
        }
    }

    /// 最多调用 `max_attempts` 次；返回 `Ok(None)` 表示没有合格的回答
    ///
    /// 调用本身失败（网络等）直接返回错误，不计为一次不合格回答。
    pub async fn extract_text_input(
        &self,
        model: &str,
        component_ids: &[String],
        prompt: &str,
    ) -> AppResult<Option<Map<String, JsonValue>>> {
        for attempt in 1..=self.max_attempts {
            let answer = self.generator.complete(model, prompt).await?;
            debug!("{} 结果: {}", model, truncate_text(&answer, 200));

            match parse_answer(&answer, component_ids) {
                Some(parsed) => {
                    info!(
                        "{} 测试文本提取成功 (第 {}/{} 次尝试)",
                        model, attempt, self.max_attempts
                    );
                    return Ok(Some(parsed));
                }
                None => warn!(
                    "{} 解析结果不满足条件 (第 {}/{} 次尝试)",
                    model, attempt, self.max_attempts
                ),
            }
        }
        Ok(None)
    }
}
