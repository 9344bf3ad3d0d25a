use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 搜索结果中的单个版本入口
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionLink {
    pub url: String,
    pub version_name: String,
    /// APK / XAPK
    pub version_type: String,
    /// 原始描述，例如 "2025年4月1日 · Android 6.0+"
    pub description: String,
    pub update_date: Option<NaiveDate>,
    pub min_platform: Option<String>,
}

/// 搜索结果页摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub version_name: String,
    pub update_text: String,
    pub developer: String,
    pub category: String,
    pub catalog_id: String,
    pub install_count: String,
    pub links: Vec<VersionLink>,
}

impl VersionSummary {
    /// 页面上既没有信息表也没有版本列表
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
            && self.version_name.is_empty()
            && self.update_text.is_empty()
            && self.developer.is_empty()
            && self.category.is_empty()
            && self.catalog_id.is_empty()
            && self.install_count.is_empty()
    }
}

/// 详情页中的单个下载变体（架构 × 类型 × 大小）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantInfo {
    /// 架构: arm64-v8a / armeabi-v7a
    pub arch: String,
    pub version_name: String,
    pub version_code: String,
    /// 类型: APK / XAPK
    pub artifact_type: String,
    /// 大小: 145 MB
    pub size: String,
    /// 最低系统: Android 6.0+
    pub min_platform: String,
    /// DPI 范围: 120 - 65534dpi
    pub dpi: String,
    pub download_url: String,
}

impl VariantInfo {
    pub fn is_apk(&self) -> bool {
        self.artifact_type.eq_ignore_ascii_case("APK")
    }
}
