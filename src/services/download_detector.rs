//! 下载完成检测 - 业务能力层
//!
//! 浏览器没有下载完成回调，只能轮询下载目录：
//! 出现新文件（或已有文件大小变化）、不是临时文件、且大小接近预期，即视为完成

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// 触发下载前的目录快照：文件名 -> 字节数
pub type DirSnapshot = HashMap<String, u64>;

/// 解析 "145 MB" 之类的大小文本（1024 进制）；无法解析时返回 0
pub fn parse_size_to_bytes(size_text: &str) -> u64 {
    let text = size_text.trim().to_uppercase();
    let units: [(&str, f64); 3] = [
        ("KB", 1024.0),
        ("MB", 1024.0 * 1024.0),
        ("GB", 1024.0 * 1024.0 * 1024.0),
    ];

    for (unit, multiplier) in units {
        if let Some(number) = text.strip_suffix(unit) {
            return match number.trim().parse::<f64>() {
                Ok(value) if value.is_finite() && value >= 0.0 => (value * multiplier) as u64,
                _ => 0,
            };
        }
    }
    0
}

/// 下载完成检测器
#[derive(Debug, Clone)]
pub struct DownloadCompletionDetector {
    poll_interval: Duration,
    partial_suffixes: Vec<String>,
    size_tolerance: f64,
}

impl DownloadCompletionDetector {
    pub fn new(config: &Config) -> Self {
        Self::with_options(
            config.download_poll_interval(),
            config.partial_suffixes.clone(),
            config.size_tolerance,
        )
    }

    pub fn with_options(
        poll_interval: Duration,
        partial_suffixes: Vec<String>,
        size_tolerance: f64,
    ) -> Self {
        Self {
            poll_interval,
            partial_suffixes,
            size_tolerance,
        }
    }

    /// 记录目录当前内容；目录不存在时先创建
    pub async fn snapshot(&self, dir: &Path) -> AppResult<DirSnapshot> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::file_read_failed(dir.display().to_string(), e))?;
        list_files(dir).await
    }

    /// 轮询直到出现符合条件的文件，超时返回 `None`
    pub async fn wait_for_file(
        &self,
        dir: &Path,
        before: &DirSnapshot,
        expected_bytes: u64,
        timeout: Duration,
    ) -> Option<PathBuf> {
        let deadline = Instant::now() + timeout;
        debug!(
            "开始检测下载: 目录 {}, 预期 {} 字节, 超时 {:?}",
            dir.display(),
            expected_bytes,
            timeout
        );

        loop {
            match list_files(dir).await {
                Ok(current) => {
                    if let Some(name) = self.find_completed(before, &current, expected_bytes) {
                        let path = dir.join(&name);
                        info!("✅ 下载完成: {}", path.display());
                        return Some(path);
                    }
                }
                Err(e) => warn!("读取下载目录失败: {}", e),
            }

            if Instant::now() >= deadline {
                warn!("❌ 下载超时，未检测到符合大小的文件");
                return None;
            }
            sleep(self.poll_interval).await;
        }
    }

    /// 在一次目录列表中找出已完成的文件
    pub fn find_completed(
        &self,
        before: &DirSnapshot,
        current: &DirSnapshot,
        expected_bytes: u64,
    ) -> Option<String> {
        let threshold = expected_bytes as f64 * self.size_tolerance;
        let mut names: Vec<&String> = current.keys().collect();
        names.sort();

        names.into_iter().find_map(|name| {
            let len = current[name];
            let is_new = before.get(name) != Some(&len);
            let is_partial = self.is_partial(name);
            (is_new && !is_partial && len as f64 >= threshold).then(|| name.clone())
        })
    }

    fn is_partial(&self, name: &str) -> bool {
        self.partial_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
    }
}

async fn list_files(dir: &Path) -> AppResult<DirSnapshot> {
    let mut files = DirSnapshot::new();
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| AppError::file_read_failed(dir.display().to_string(), e))?;

    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if metadata.is_file() {
            files.insert(entry.file_name().to_string_lossy().to_string(), metadata.len());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> DownloadCompletionDetector {
        DownloadCompletionDetector::with_options(
            Duration::from_millis(20),
            vec![".crdownload".to_string()],
            0.95,
        )
    }

    fn snapshot(entries: &[(&str, u64)]) -> DirSnapshot {
        entries.iter().map(|(n, l)| (n.to_string(), *l)).collect()
    }

    #[test]
    fn test_parse_size_to_bytes() {
        assert_eq!(parse_size_to_bytes("145 MB"), 145 * 1024 * 1024);
        assert_eq!(parse_size_to_bytes("2 GB"), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size_to_bytes("512 kb"), 512 * 1024);
        assert_eq!(parse_size_to_bytes(" 1.5 MB "), 1572864);
        assert_eq!(parse_size_to_bytes("unit-less"), 0);
        assert_eq!(parse_size_to_bytes("145"), 0);
        assert_eq!(parse_size_to_bytes("abc MB"), 0);
        assert_eq!(parse_size_to_bytes(""), 0);
    }

    #[test]
    fn test_new_file_over_threshold_qualifies() {
        let found = detector().find_completed(&snapshot(&[]), &snapshot(&[("a.apk", 95)]), 100);
        assert_eq!(found.as_deref(), Some("a.apk"));
    }

    #[test]
    fn test_small_file_does_not_qualify() {
        let found = detector().find_completed(&snapshot(&[]), &snapshot(&[("a.apk", 94)]), 100);
        assert_eq!(found, None);
    }

    #[test]
    fn test_partial_suffix_never_qualifies() {
        let found = detector().find_completed(
            &snapshot(&[]),
            &snapshot(&[("a.apk.crdownload", 1000)]),
            100,
        );
        assert_eq!(found, None);
    }

    #[test]
    fn test_existing_file_qualifies_only_after_size_change() {
        let before = snapshot(&[("a.apk", 10)]);
        assert_eq!(
            detector().find_completed(&before, &snapshot(&[("a.apk", 10)]), 0),
            None
        );
        assert_eq!(
            detector()
                .find_completed(&before, &snapshot(&[("a.apk", 200)]), 100)
                .as_deref(),
            Some("a.apk")
        );
    }

    #[test]
    fn test_zero_expected_accepts_any_complete_file() {
        let found = detector().find_completed(&snapshot(&[]), &snapshot(&[("b.xapk", 0)]), 0);
        assert_eq!(found.as_deref(), Some("b.xapk"));
    }

    #[tokio::test]
    async fn test_wait_for_file_detects_late_download() {
        let dir = tempfile::tempdir().unwrap();
        let detector = detector();
        let before = detector.snapshot(dir.path()).await.unwrap();
        assert!(before.is_empty());

        let target = dir.path().to_path_buf();
        let writer = tokio::spawn(async move {
            sleep(Duration::from_millis(60)).await;
            fs::write(target.join("app.apk.crdownload"), vec![0u8; 1000])
                .await
                .unwrap();
            sleep(Duration::from_millis(60)).await;
            fs::write(target.join("app.apk"), vec![0u8; 980]).await.unwrap();
        });

        let found = detector
            .wait_for_file(dir.path(), &before, 1000, Duration::from_secs(5))
            .await;
        writer.await.unwrap();
        assert_eq!(found, Some(dir.path().join("app.apk")));
    }

    #[tokio::test]
    async fn test_wait_for_file_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let detector = detector();
        let before = detector.snapshot(dir.path()).await.unwrap();
        fs::write(dir.path().join("x.apk.crdownload"), vec![0u8; 50])
            .await
            .unwrap();

        let found = detector
            .wait_for_file(dir.path(), &before, 10, Duration::from_millis(100))
            .await;
        assert_eq!(found, None);
    }
}
