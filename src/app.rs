use std::sync::Arc;

use anyhow::Result;

use crate::clients::build_generator;
use crate::config::{Config, PipelineStage};
use crate::infrastructure::{ChromeRenderer, FsDocumentStore};
use crate::orchestrator::{PromptBatchDriver, TextBatchDriver, WorkQueueDriver};
use crate::services::{PromptAssembler, PromptBuilder, ResponseValidator, ResultPersister};
use crate::store::{SqliteConnector, StoreConnector};
use crate::utils::logging::{init_log_file, log_startup, print_final_stats};
use crate::workflow::{ApkFlow, TextFlow};

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file, stage_title(config.stage))?;
        log_startup(stage_title(config.stage), &config.database_url);
        Ok(Self { config })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let connector: Arc<dyn StoreConnector> =
            Arc::new(SqliteConnector::new(&self.config.database_url));

        match self.config.stage {
            PipelineStage::Apk => self.run_apk(connector).await,
            PipelineStage::Prompts => self.run_prompts(connector).await,
            PipelineStage::Texts => self.run_texts(connector).await,
        }
    }

    async fn run_apk(&self, connector: Arc<dyn StoreConnector>) -> Result<()> {
        let renderer = Arc::new(ChromeRenderer::new(&self.config));
        let flow = ApkFlow::new(&self.config, renderer)?;
        let stats = WorkQueueDriver::new(&self.config, connector, flow).run().await;

        print_final_stats(
            stage_title(PipelineStage::Apk),
            &[
                ("📦 处理记录", stats.processed),
                ("✅ 下载完成", stats.downloaded),
                ("⏰ 下载超时", stats.timed_out),
                ("🔀 无目标架构", stats.unmatched),
                ("🔍 无搜索结果 (-)", stats.no_search_result),
                ("📄 无详情页 (--)", stats.no_detail),
                ("❌ 处理异常 (---)", stats.stage_errors),
                ("🗄️ 会话失败", stats.session_errors),
            ],
            &self.config.output_log_file,
        );
        Ok(())
    }

    async fn run_prompts(&self, connector: Arc<dyn StoreConnector>) -> Result<()> {
        let documents = Arc::new(FsDocumentStore::with_root(&self.config.context_dir));
        let stats = PromptBatchDriver::new(
            &self.config,
            connector,
            documents,
            PromptBuilder::new(&self.config),
        )
        .run()
        .await?;

        print_final_stats(
            stage_title(PipelineStage::Prompts),
            &[
                ("✅ 已入库", stats.saved),
                ("📄 无上下文", stats.missing),
                ("❌ 失败", stats.failed),
            ],
            &self.config.output_log_file,
        );
        Ok(())
    }

    async fn run_texts(&self, connector: Arc<dyn StoreConnector>) -> Result<()> {
        let documents = Arc::new(FsDocumentStore::new(&self.config));
        let generator = build_generator(&self.config)?;
        let flow = TextFlow::new(
            &self.config,
            PromptAssembler::new(documents),
            ResponseValidator::new(generator, &self.config),
            ResultPersister::new(&self.config),
        );
        let stats = TextBatchDriver::new(&self.config, connector, flow)
            .run()
            .await?;

        print_final_stats(
            stage_title(PipelineStage::Texts),
            &[
                ("✅ 生成成功", stats.generated),
                ("⭕ 空结果", stats.exhausted),
                ("⏭️ 已存在", stats.skipped),
                ("📄 无提示", stats.no_prompt),
                ("❌ 失败", stats.failed),
            ],
            &self.config.output_log_file,
        );
        Ok(())
    }
}

fn stage_title(stage: PipelineStage) -> &'static str {
    match stage {
        PipelineStage::Apk => "APK 抓取",
        PipelineStage::Prompts => "子提示生成",
        PipelineStage::Texts => "测试文本生成",
    }
}
