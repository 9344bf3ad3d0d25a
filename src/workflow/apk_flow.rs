//! 单条记录处理流程 - 流程层
//!
//! 状态阶梯：
//! `Pending → Searched → VersionPicked → DetailLoaded → VariantsParsed
//!  → Matched → Downloading → {Downloaded | DownloadTimedOut}`
//!
//! 任一步都可能进入 `Unmatched` 或 `Failed(哨兵)`。每一步之后都会写回记录。
//! 浏览器下载会话只存在于 `Downloading` 的下一步之内，写回时从不持有。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::PageRenderer;
use crate::models::{ApkRecord, Sentinel, VariantInfo, VersionLink, VersionSummary};
use crate::services::{
    parse_size_to_bytes, CatalogSearchExtractor, DirSnapshot, DownloadCompletionDetector,
    VariantExtractor,
};
use crate::store::RecordStore;

/// 记录在状态阶梯上的位置，携带进入下一步所需的数据
#[derive(Debug)]
pub enum ApkStage {
    Pending,
    Searched(VersionSummary),
    VersionPicked(VersionLink),
    DetailLoaded(String),
    VariantsParsed(Vec<VariantInfo>),
    Matched(VariantInfo),
    /// 已记录下载目录快照，等待触发下载
    Downloading {
        variant: VariantInfo,
        before: DirSnapshot,
    },
    Downloaded(String),
    DownloadTimedOut,
    /// 没有目标架构，记录为 `--`
    Unmatched,
    Failed(Sentinel),
}

impl ApkStage {
    fn name(&self) -> &'static str {
        match self {
            ApkStage::Pending => "PENDING",
            ApkStage::Searched(_) => "SEARCHED",
            ApkStage::VersionPicked(_) => "VERSION_PICKED",
            ApkStage::DetailLoaded(_) => "DETAIL_LOADED",
            ApkStage::VariantsParsed(_) => "VARIANTS_PARSED",
            ApkStage::Matched(_) => "MATCHED",
            ApkStage::Downloading { .. } => "DOWNLOADING",
            ApkStage::Downloaded(_) => "DOWNLOADED",
            ApkStage::DownloadTimedOut => "DOWNLOAD_TIMED_OUT",
            ApkStage::Unmatched => "UNMATCHED",
            ApkStage::Failed(_) => "FAILED",
        }
    }
}

/// 一条记录的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApkOutcome {
    Downloaded(String),
    DownloadTimedOut,
    Unmatched,
    /// 哨兵失败；`ProcessingError` 表示阶段异常
    Failed(Sentinel),
}

impl ApkOutcome {
    pub fn is_stage_exception(&self) -> bool {
        matches!(self, ApkOutcome::Failed(Sentinel::ProcessingError))
    }
}

/// APK 抓取流程
///
/// - 不持有数据库会话，由调用方传入
/// - 每次页面渲染、每次下载都由渲染器自行获取和释放浏览器
pub struct ApkFlow {
    renderer: Arc<dyn PageRenderer>,
    search: CatalogSearchExtractor,
    variants: VariantExtractor,
    detector: DownloadCompletionDetector,
    target_arch: String,
    detail_wait_selector: String,
    download_dir: PathBuf,
    download_timeout: Duration,
}

impl ApkFlow {
    pub fn new(config: &Config, renderer: Arc<dyn PageRenderer>) -> AppResult<Self> {
        Ok(Self {
            renderer,
            search: CatalogSearchExtractor::new(config)?,
            variants: VariantExtractor::new()?,
            detector: DownloadCompletionDetector::new(config),
            target_arch: config.target_arch.clone(),
            detail_wait_selector: config.detail_wait_selector.clone(),
            download_dir: PathBuf::from(&config.download_dir),
            download_timeout: config.download_timeout(),
        })
    }

    /// 处理一条记录
    ///
    /// 阶段内的错误在这里被捕获并记录为 `---`；只有最后一次写回也失败时才返回错误。
    pub async fn run(&self, store: &dyn RecordStore, mut record: ApkRecord) -> AppResult<ApkOutcome> {
        info!("📦 开始处理: {}", record.app_id);

        match self.drive(store, &mut record).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("❌ {} 处理异常: {}", record.app_id, e);
                record.mark(Sentinel::ProcessingError);
                store.upsert_record(&record).await?;
                Ok(ApkOutcome::Failed(Sentinel::ProcessingError))
            }
        }
    }

    async fn drive(&self, store: &dyn RecordStore, record: &mut ApkRecord) -> AppResult<ApkOutcome> {
        let mut stage = ApkStage::Pending;
        loop {
            stage = self.advance(record, stage).await?;
            debug!("{} → {}", record.app_id, stage.name());
            store.upsert_record(record).await?;

            let outcome = match stage {
                ApkStage::Downloaded(name) => ApkOutcome::Downloaded(name),
                ApkStage::DownloadTimedOut => ApkOutcome::DownloadTimedOut,
                ApkStage::Unmatched => ApkOutcome::Unmatched,
                ApkStage::Failed(sentinel) => ApkOutcome::Failed(sentinel),
                next => {
                    stage = next;
                    continue;
                }
            };
            return Ok(outcome);
        }
    }

    /// 推进一步；返回的状态已经反映在 `record` 上
    pub async fn advance(&self, record: &mut ApkRecord, stage: ApkStage) -> AppResult<ApkStage> {
        let next = match stage {
            ApkStage::Pending => self.search_step(record).await?,
            ApkStage::Searched(summary) => pick_version(record, summary),
            ApkStage::VersionPicked(link) => self.load_detail(record, &link).await,
            ApkStage::DetailLoaded(html) => ApkStage::VariantsParsed(self.variants.parse(&html)),
            ApkStage::VariantsParsed(variants) => self.select_arch(record, variants),
            ApkStage::Matched(variant) => ApkStage::Downloading {
                before: self.detector.snapshot(&self.download_dir).await?,
                variant,
            },
            ApkStage::Downloading { variant, before } => {
                self.download(record, &variant, &before).await?
            }
            terminal => terminal,
        };

        match &next {
            ApkStage::Failed(sentinel) => record.mark(*sentinel),
            ApkStage::Unmatched => record.mark(Sentinel::NoDetail),
            _ => {}
        }
        Ok(next)
    }

    async fn search_step(&self, record: &mut ApkRecord) -> AppResult<ApkStage> {
        let url = self.search.search_url(&record.app_id)?;
        let html = self.renderer.render(&url, None).await?;

        match self.search.extract(&html) {
            Some(summary) => {
                info!(
                    "🔍 {} 搜索到版本 {}，共 {} 个版本入口",
                    record.app_id,
                    summary.version_name,
                    summary.links.len()
                );
                record.version = Some(summary.version_name.clone());
                Ok(ApkStage::Searched(summary))
            }
            None => {
                warn!("⚠️ {} 没有搜索结果", record.app_id);
                Ok(ApkStage::Failed(Sentinel::NoSearchResult))
            }
        }
    }

    async fn load_detail(&self, record: &ApkRecord, link: &VersionLink) -> ApkStage {
        match self
            .renderer
            .render(&link.url, Some(&self.detail_wait_selector))
            .await
        {
            Ok(html) if !html.trim().is_empty() => ApkStage::DetailLoaded(html),
            Ok(_) => {
                warn!("⚠️ {} 详情页为空: {}", record.app_id, link.url);
                ApkStage::Failed(Sentinel::NoDetail)
            }
            Err(e) => {
                warn!("⚠️ {} 详情页加载失败: {}", record.app_id, e);
                ApkStage::Failed(Sentinel::NoDetail)
            }
        }
    }

    fn select_arch(&self, record: &mut ApkRecord, variants: Vec<VariantInfo>) -> ApkStage {
        let matched = variants
            .into_iter()
            .find(|v| v.arch.eq_ignore_ascii_case(&self.target_arch));

        match matched {
            Some(variant) => {
                info!(
                    "✓ {} 匹配到 {} {} ({})",
                    record.app_id, variant.arch, variant.artifact_type, variant.size
                );
                record.apk_flag = Some(variant.is_apk());
                record.download_url = Some(variant.download_url.clone());
                record.apk_download_date = Some(Utc::now());
                ApkStage::Matched(variant)
            }
            None => {
                warn!("⚠️ {} 没有 {} 架构", record.app_id, self.target_arch);
                ApkStage::Unmatched
            }
        }
    }

    /// 触发下载并等待文件落盘；会话在返回前关闭
    async fn download(
        &self,
        record: &mut ApkRecord,
        variant: &VariantInfo,
        before: &DirSnapshot,
    ) -> AppResult<ApkStage> {
        let session = self
            .renderer
            .trigger_download(&variant.download_url, &self.download_dir)
            .await?;
        let expected = parse_size_to_bytes(&variant.size);
        let found = self
            .detector
            .wait_for_file(&self.download_dir, before, expected, self.download_timeout)
            .await;
        session.close().await;

        let Some(path) = found else {
            warn!("⏰ {} 下载超时", record.app_id);
            return Ok(ApkStage::DownloadTimedOut);
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        record.apk_name = Some(name.clone());
        Ok(ApkStage::Downloaded(name))
    }
}

fn pick_version(record: &mut ApkRecord, summary: VersionSummary) -> ApkStage {
    match summary.links.into_iter().next() {
        Some(link) => {
            record.update_date = link.update_date;
            record.min_platform = link.min_platform.clone();
            ApkStage::VersionPicked(link)
        }
        None => {
            warn!("⚠️ {} 没有可用的版本入口", record.app_id);
            ApkStage::Failed(Sentinel::NoSearchResult)
        }
    }
}
