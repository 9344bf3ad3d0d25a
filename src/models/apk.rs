use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 失败哨兵
///
/// 失败时写入版本号字段，代替真实版本号记录失败原因。
/// 三个字面量只由 `-` 组成，应用市场的版本号总是包含数字，因此不会与真实版本冲突。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentinel {
    /// 搜索无结果或没有可用版本
    NoSearchResult,
    /// 详情页加载失败或没有匹配的架构
    NoDetail,
    /// 处理过程中发生异常
    ProcessingError,
}

impl Sentinel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Sentinel::NoSearchResult => "-",
            Sentinel::NoDetail => "--",
            Sentinel::ProcessingError => "---",
        }
    }

    /// 从版本号字段识别哨兵
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "-" => Some(Sentinel::NoSearchResult),
            "--" => Some(Sentinel::NoDetail),
            "---" => Some(Sentinel::ProcessingError),
            _ => None,
        }
    }
}

impl std::fmt::Display for Sentinel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 从版本号字段读出的记录状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    /// 尚未处理
    Pending,
    /// 已记录失败原因
    Failed(Sentinel),
    /// 已获取到真实版本号
    Versioned(String),
}

/// 待抓取的应用记录，以应用市场 ID 为主键
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ApkRecord {
    pub app_id: String,
    /// 显示版本号；失败时存放哨兵；为空表示待处理
    pub version: Option<String>,
    pub update_date: Option<NaiveDate>,
    pub min_platform: Option<String>,
    /// 是否为单一 APK（否则为 XAPK 等拆分包）
    pub apk_flag: Option<bool>,
    pub download_url: Option<String>,
    pub apk_name: Option<String>,
    /// 开始下载的时间
    pub apk_download_date: Option<DateTime<Utc>>,
}

impl ApkRecord {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            ..Default::default()
        }
    }

    pub fn status(&self) -> RecordStatus {
        match self.version.as_deref() {
            None => RecordStatus::Pending,
            Some(v) => match Sentinel::parse(v) {
                Some(sentinel) => RecordStatus::Failed(sentinel),
                None => RecordStatus::Versioned(v.to_string()),
            },
        }
    }

    pub fn is_pending(&self) -> bool {
        self.version.is_none()
    }

    /// 写入哨兵，会覆盖之前的版本号或哨兵
    pub fn mark(&mut self, sentinel: Sentinel) {
        self.version = Some(sentinel.as_str().to_string());
    }
}
