//! 单个应用的文本生成流程 - 流程层
//!
//! 遍历 模型 × 结构 × 序号，跳过已有结果，生成、校验并写入

use std::collections::HashSet;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{PipelineResult, EMPTY_TEXTS};
use crate::services::{
    extract_component_ids, PromptAssembler, ResponseValidator, ResultPersister,
    MAX_PROMPT_STRUCTURE,
};
use crate::store::RecordStore;

/// 一个应用的处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TextStats {
    /// 写入了合格回答
    pub generated: usize,
    /// 重试耗尽，写入了空结果
    pub exhausted: usize,
    /// 已存在，跳过
    pub skipped: usize,
    /// 无法生成提示
    pub no_prompt: usize,
    /// 调用或写入失败，下次运行会重试
    pub failed: usize,
}

impl TextStats {
    pub fn add(&mut self, other: TextStats) {
        self.generated += other.generated;
        self.exhausted += other.exhausted;
        self.skipped += other.skipped;
        self.no_prompt += other.no_prompt;
        self.failed += other.failed;
    }
}

pub struct TextFlow {
    assembler: PromptAssembler,
    validator: ResponseValidator,
    persister: ResultPersister,
    models: Vec<String>,
    sequences: u32,
}

impl TextFlow {
    pub fn new(
        config: &Config,
        assembler: PromptAssembler,
        validator: ResponseValidator,
        persister: ResultPersister,
    ) -> Self {
        Self {
            assembler,
            validator,
            persister,
            models: config.models.clone(),
            sequences: config.sequences_per_structure,
        }
    }

    pub async fn run(&self, store: &dyn RecordStore, app_id: &str) -> AppResult<TextStats> {
        let mut stats = TextStats::default();

        let existing: HashSet<(String, i64, i64)> = store
            .list_results(app_id)
            .await?
            .into_iter()
            .map(|r| (r.model, r.prompt_structure, r.seq))
            .collect();

        let Some(bundle) = store.get_prompt_bundle(app_id).await? else {
            warn!("⚠️ {} 没有提示数据，跳过", app_id);
            return Ok(stats);
        };
        let component_ids = extract_component_ids(&bundle.restrictive)?;
        info!(
            "📝 {} 开始生成，组件 {} 个，已有结果 {} 条",
            app_id,
            component_ids.len(),
            existing.len()
        );

        let mut prompts = Vec::new();
        for structure in 0..=MAX_PROMPT_STRUCTURE {
            prompts.push(self.assembler.assemble(&bundle, structure).await?);
        }

        for model in &self.models {
            for (structure, prompt) in prompts.iter().enumerate() {
                let structure = structure as i64;
                for seq in 1..=i64::from(self.sequences) {
                    if existing.contains(&(model.clone(), structure, seq)) {
                        stats.skipped += 1;
                        continue;
                    }
                    let Some(prompt) = prompt else {
                        stats.no_prompt += 1;
                        continue;
                    };

                    let answer = match self
                        .validator
                        .extract_text_input(model, &component_ids, prompt)
                        .await
                    {
                        Ok(answer) => answer,
                        Err(e) => {
                            warn!(
                                "❌ {} / {} / 结构 {} / 序号 {} 调用失败: {}",
                                app_id, model, structure, seq, e
                            );
                            stats.failed += 1;
                            continue;
                        }
                    };

                    let texts = match &answer {
                        Some(map) => serde_json::to_string(map)?,
                        None => EMPTY_TEXTS.to_string(),
                    };
                    let result = PipelineResult {
                        app_id: app_id.to_string(),
                        model: model.clone(),
                        prompt_structure: structure,
                        seq,
                        update_date: Utc::now(),
                        texts,
                        val: None,
                    };

                    if !self.persister.persist(store, &result).await {
                        stats.failed += 1;
                    } else if answer.is_some() {
                        stats.generated += 1;
                    } else {
                        stats.exhausted += 1;
                    }
                }
            }
        }

        info!(
            "✓ {} 完成: 生成 {}, 空结果 {}, 跳过 {}, 无提示 {}, 失败 {}",
            app_id, stats.generated, stats.exhausted, stats.skipped, stats.no_prompt, stats.failed
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_add() {
        let mut total = TextStats::default();
        total.add(TextStats {
            generated: 2,
            exhausted: 1,
            skipped: 3,
            no_prompt: 0,
            failed: 1,
        });
        total.add(TextStats {
            generated: 1,
            ..Default::default()
        });
        assert_eq!(total.generated, 3);
        assert_eq!(total.skipped, 3);
        assert_eq!(total.failed, 1);
    }
}
