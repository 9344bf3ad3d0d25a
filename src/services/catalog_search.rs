//! 应用市场搜索页解析 - 业务能力层
//!
//! 只负责把渲染后的搜索页解析为版本摘要，不关心浏览器和数据库

use chrono::NaiveDate;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{VersionLink, VersionSummary};
use crate::services::html::{element_text, first_attr, first_text, selector};

/// 信息表中可识别的字段
#[derive(Debug, Clone, Copy)]
enum SummaryField {
    VersionName,
    UpdateText,
    Developer,
    Category,
    CatalogId,
    InstallCount,
}

static SUMMARY_FIELDS: phf::Map<&'static str, SummaryField> = phf::phf_map! {
    "版本" => SummaryField::VersionName,
    "更新" => SummaryField::UpdateText,
    "开发者" => SummaryField::Developer,
    "分类" => SummaryField::Category,
    "Google Play ID" => SummaryField::CatalogId,
    "安装次数" => SummaryField::InstallCount,
};

/// 描述中日期与系统要求的分隔符
const DESCRIPTION_SEPARATOR: char = '·';

/// 本地化日期格式，例如 "2025年4月1日"
const DATE_FORMAT: &str = "%Y年%m月%d日";

/// 搜索页解析器
pub struct CatalogSearchExtractor {
    base_url: Url,
    search_path: String,
    info_item: Selector,
    info_name: Selector,
    info_value: Selector,
    version_item: Selector,
    version_link: Selector,
    version_name: Selector,
    version_type: Selector,
    version_description: Selector,
}

impl CatalogSearchExtractor {
    pub fn new(config: &Config) -> AppResult<Self> {
        Self::with_base_url(&config.catalog_base_url, &config.catalog_search_path)
    }

    pub fn with_base_url(base_url: &str, search_path: &str) -> AppResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Parse(format!("无效的应用市场地址 {}: {}", base_url, e)))?;
        Ok(Self {
            base_url,
            search_path: search_path.to_string(),
            info_item: selector("div.information-table > div.item")?,
            info_name: selector("div.name")?,
            info_value: selector("div.value")?,
            version_item: selector("ul.list-versions li")?,
            version_link: selector("a.ver-item")?,
            version_name: selector("span.vername")?,
            version_type: selector("span.vtype span")?,
            version_description: selector("div.description")?,
        })
    }

    /// 构建搜索地址，应用 ID 会做 URL 编码
    pub fn search_url(&self, app_id: &str) -> AppResult<String> {
        let mut url = self
            .base_url
            .join(&self.search_path)
            .map_err(|e| AppError::Parse(format!("无效的搜索路径 {}: {}", self.search_path, e)))?;
        url.query_pairs_mut().append_pair("q", app_id);
        Ok(url.to_string())
    }

    /// 解析搜索页；页面上什么都没有时返回 `None`
    pub fn extract(&self, html: &str) -> Option<VersionSummary> {
        let summary = self.parse(html);
        if summary.is_empty() {
            None
        } else {
            Some(summary)
        }
    }

    /// 解析搜索页，缺失的元素一律按空字符串处理
    pub fn parse(&self, html: &str) -> VersionSummary {
        let doc = Html::parse_document(html);
        let mut summary = VersionSummary::default();

        for item in doc.select(&self.info_item) {
            let name = first_text(item, &self.info_name).unwrap_or_default();
            let value = first_text(item, &self.info_value).unwrap_or_default();
            match SUMMARY_FIELDS.get(name.as_str()) {
                Some(SummaryField::VersionName) => summary.version_name = value,
                Some(SummaryField::UpdateText) => summary.update_text = value,
                Some(SummaryField::Developer) => summary.developer = value,
                Some(SummaryField::Category) => summary.category = value,
                Some(SummaryField::CatalogId) => summary.catalog_id = value,
                Some(SummaryField::InstallCount) => summary.install_count = value,
                None => debug!("忽略未知字段: {}", name),
            }
        }

        for item in doc.select(&self.version_item) {
            let description = first_text(item, &self.version_description).unwrap_or_default();
            let (update_date, min_platform) = split_description(&description);
            summary.links.push(VersionLink {
                url: first_attr(item, &self.version_link, "href")
                    .map(|href| self.absolute_url(&href))
                    .unwrap_or_default(),
                version_name: first_text(item, &self.version_name).unwrap_or_default(),
                version_type: first_text(item, &self.version_type).unwrap_or_default(),
                description,
                update_date,
                min_platform,
            });
        }

        debug!(
            "搜索页解析完成: 版本 {:?}, {} 个版本入口",
            summary.version_name,
            summary.links.len()
        );
        summary
    }

    fn absolute_url(&self, href: &str) -> String {
        match self.base_url.join(href) {
            Ok(url) => url.to_string(),
            Err(_) => href.to_string(),
        }
    }
}

/// 拆分 "2025年4月1日 · Android 6.0+"；不是恰好两段时都不设置
fn split_description(description: &str) -> (Option<NaiveDate>, Option<String>) {
    let parts: Vec<&str> = description.split(DESCRIPTION_SEPARATOR).collect();
    if parts.len() != 2 {
        return (None, None);
    }
    let date = parse_localized_date(parts[0].trim());
    (date, Some(parts[1].trim().to_string()))
}

/// 解析本地化日期，失败返回 `None`
pub fn parse_localized_date(text: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(text, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            debug!("无法解析日期 {:?}: {}", text, e);
            None
        }
    }
}
