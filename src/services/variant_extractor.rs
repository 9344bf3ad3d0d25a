//! 版本详情页解析 - 业务能力层
//!
//! 只负责把详情页解析为扁平的变体列表

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::AppResult;
use crate::models::VariantInfo;
use crate::services::html::{element_text, first_text, selector};

/// 依次扫描的两个标签页：推荐变体、全部变体
const VARIANT_TABS: [&str; 2] = ["#best-variant-tab", "#variants-tab"];

const UNKNOWN_ARCH: &str = "unknown";

/// 详情页解析器
pub struct VariantExtractor {
    tabs: Vec<Selector>,
    arch_group: Selector,
    arch_label: Selector,
    entry: Selector,
    version_name: Selector,
    version_code: Selector,
    artifact_type: Selector,
    spec: Selector,
}

impl VariantExtractor {
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            tabs: VARIANT_TABS
                .iter()
                .map(|css| selector(css))
                .collect::<AppResult<Vec<_>>>()?,
            arch_group: selector("div.tree > ul > li")?,
            arch_label: selector("code")?,
            entry: selector("ul.file-list > li > a.variant")?,
            version_name: selector("span.vername")?,
            version_code: selector("span.vercode")?,
            artifact_type: selector("span.vtype span")?,
            spec: selector("div.description span.spec")?,
        })
    }

    /// 解析详情页；两个标签页的结果直接拼接，不去重
    pub fn parse(&self, html: &str) -> Vec<VariantInfo> {
        let doc = Html::parse_document(html);
        let mut variants = Vec::new();

        for tab_selector in &self.tabs {
            let Some(tab) = doc.select(tab_selector).next() else {
                continue;
            };
            for group in tab.select(&self.arch_group) {
                self.collect_group(group, &mut variants);
            }
        }

        debug!("详情页解析完成: {} 个变体", variants.len());
        variants
    }

    /// 一个架构分组：每个下载项按架构列表展开
    fn collect_group(&self, group: ElementRef<'_>, out: &mut Vec<VariantInfo>) {
        let label = first_text(group, &self.arch_label).unwrap_or_else(|| UNKNOWN_ARCH.to_string());
        let archs = split_archs(&label);

        for entry in group.select(&self.entry) {
            let template = self.parse_entry(entry);
            for arch in &archs {
                out.push(VariantInfo {
                    arch: arch.clone(),
                    ..template.clone()
                });
            }
        }
    }

    fn parse_entry(&self, entry: ElementRef<'_>) -> VariantInfo {
        let download_url = entry
            .value()
            .attr("href")
            .map(|href| href.replace("&amp;", "&"))
            .unwrap_or_default();

        let specs: Vec<String> = entry.select(&self.spec).map(element_text).collect();
        let (size, min_platform, dpi) = classify_specs(&specs);

        VariantInfo {
            arch: String::new(),
            version_name: first_text(entry, &self.version_name).unwrap_or_default(),
            version_code: first_text(entry, &self.version_code).unwrap_or_default(),
            artifact_type: first_text(entry, &self.artifact_type).unwrap_or_default(),
            size,
            min_platform,
            dpi,
            download_url,
        }
    }
}

/// "arm64-v8a, armeabi-v7a" -> ["arm64-v8a", "armeabi-v7a"]
fn split_archs(label: &str) -> Vec<String> {
    label.split(',').map(|a| a.trim().to_string()).collect()
}

/// 按子串区分 大小 / 最低系统 / DPI；与顺序无关，每类取第一个
fn classify_specs(specs: &[String]) -> (String, String, String) {
    let mut size: Option<&str> = None;
    let mut min_platform: Option<&str> = None;
    let mut dpi: Option<&str> = None;

    for spec in specs {
        let text = spec.trim();
        if text.contains("MB") || text.contains("GB") {
            size.get_or_insert(text);
        } else if text.contains("Android") {
            min_platform.get_or_insert(text);
        } else if text.contains("dpi") {
            dpi.get_or_insert(text);
        }
    }

    (
        size.unwrap_or_default().to_string(),
        min_platform.unwrap_or_default().to_string(),
        dpi.unwrap_or_default().to_string(),
    )
}
