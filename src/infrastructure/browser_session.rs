//! 浏览器会话 - 基础设施层
//!
//! 一个会话对应一个浏览器进程，由调用方负责 [`BrowserSession::close`]

use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, BrowserError};

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 启动参数
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub lang: String,
    pub user_agent: String,
}

impl LaunchOptions {
    pub fn new(config: &Config) -> Self {
        Self {
            executable: config.chrome_executable.as_ref().map(PathBuf::from),
            headless: config.headless,
            lang: config.browser_lang.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    fn browser_config(&self) -> AppResult<BrowserConfig> {
        let builder = BrowserConfig::builder();
        let mut builder = if self.headless {
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder
            .args(vec![
                "--disable-gpu".to_string(),
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                format!("--lang={}", self.lang),
            ])
            .build()
            .map_err(|reason| {
                error!("配置浏览器失败: {}", reason);
                AppError::Browser(BrowserError::LaunchFailed { reason })
            })
    }
}

/// 持有浏览器进程与事件处理任务
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    user_agent: String,
}

impl BrowserSession {
    pub async fn launch(options: &LaunchOptions) -> AppResult<Self> {
        debug!("🚀 启动浏览器...");
        let config = options.browser_config()?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            error!("启动浏览器失败: {}", e);
            AppError::Browser(BrowserError::LaunchFailed {
                reason: e.to_string(),
            })
        })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            user_agent: options.user_agent.clone(),
        })
    }

    async fn open_page(&self, url: &str) -> AppResult<Page> {
        let page = self.browser.new_page("about:blank").await?;
        page.set_user_agent(self.user_agent.as_str()).await?;
        page.goto(url)
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        Ok(page)
    }

    /// 打开页面并返回渲染后的 HTML
    ///
    /// 指定 `wait_selector` 时轮询该元素直到超时，否则固定等待 `settle`。
    pub async fn render(
        &self,
        url: &str,
        wait_selector: Option<&str>,
        wait_timeout: Duration,
        settle: Duration,
    ) -> AppResult<String> {
        let page = self.open_page(url).await?;

        match wait_selector {
            Some(selector) => wait_for_selector(&page, selector, wait_timeout).await?,
            None => sleep(settle).await,
        }

        let html = page.content().await?;
        debug!("页面渲染完成: {} ({} 字符)", url, html.len());
        Ok(html)
    }

    /// 允许下载到 `dir`，然后导航到下载地址
    pub async fn start_download(&self, url: &str, dir: &Path) -> AppResult<()> {
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(dir.display().to_string())
            .build()
            .map_err(|reason| AppError::Browser(BrowserError::LaunchFailed { reason }))?;
        self.browser.execute(params).await?;

        let page = self.browser.new_page("about:blank").await?;
        page.set_user_agent(self.user_agent.as_str()).await?;
        // 下载会中断导航，这里的错误不代表下载失败
        if let Err(e) = page.goto(url).await {
            debug!("下载导航已中断: {}", e);
        }
        info!("⬇️ 已开始下载: {}", url);
        Ok(())
    }

    /// 关闭浏览器；失败只记录日志
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("关闭浏览器失败: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("等待浏览器退出失败: {}", e);
        }
        self.handler.abort();
        debug!("浏览器已关闭");
    }
}

async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> AppResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if page.find_element(selector).await.is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(AppError::Browser(BrowserError::SelectorTimeout {
                selector: selector.to_string(),
                timeout_secs: timeout.as_secs(),
            }));
        }
        sleep(SELECTOR_POLL_INTERVAL).await;
    }
}
