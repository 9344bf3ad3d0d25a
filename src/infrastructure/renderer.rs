//! 页面渲染 - 基础设施层
//!
//! 每次调用启动一个浏览器，并在所有返回路径上关闭它

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use super::browser_session::{BrowserSession, LaunchOptions};
use crate::config::Config;
use crate::error::AppResult;

/// 进行中的下载
///
/// 持有下载所需的资源，检测结束后由调用方 [`close`](Self::close)。
pub struct DownloadSession {
    release: Option<BoxFuture<'static, ()>>,
}

impl DownloadSession {
    pub fn new<F>(release: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            release: Some(release.boxed()),
        }
    }

    /// 没有需要释放的资源
    pub fn detached() -> Self {
        Self { release: None }
    }

    pub async fn close(mut self) {
        if let Some(release) = self.release.take() {
            release.await;
        }
    }
}

impl fmt::Debug for DownloadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadSession")
            .field("attached", &self.release.is_some())
            .finish()
    }
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// 渲染页面并返回 HTML
    async fn render(&self, url: &str, wait_selector: Option<&str>) -> AppResult<String>;

    /// 触发下载，完成情况由调用方轮询目录确认
    async fn trigger_download(&self, url: &str, dir: &Path) -> AppResult<DownloadSession>;
}

/// 基于 Chromium 的渲染器
pub struct ChromeRenderer {
    options: LaunchOptions,
    wait_timeout: Duration,
    settle: Duration,
}

impl ChromeRenderer {
    pub fn new(config: &Config) -> Self {
        Self {
            options: LaunchOptions::new(config),
            wait_timeout: config.detail_wait_timeout(),
            settle: config.search_settle(),
        }
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str, wait_selector: Option<&str>) -> AppResult<String> {
        let session = BrowserSession::launch(&self.options).await?;
        let html = session
            .render(url, wait_selector, self.wait_timeout, self.settle)
            .await;
        session.close().await;
        html
    }

    async fn trigger_download(&self, url: &str, dir: &Path) -> AppResult<DownloadSession> {
        let session = BrowserSession::launch(&self.options).await?;
        if let Err(e) = session.start_download(url, dir).await {
            session.close().await;
            return Err(e);
        }
        Ok(DownloadSession::new(session.close()))
    }
}
