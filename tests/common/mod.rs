//! 集成测试共用的替身实现
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use apk_harvest::clients::AnswerGenerator;
use apk_harvest::config::Config;
use apk_harvest::error::{AppError, AppResult, BrowserError, StoreError};
use apk_harvest::infrastructure::{DownloadSession, PageRenderer};
use apk_harvest::models::{ApkRecord, PipelineResult, PromptBundle};
use apk_harvest::store::{MemoryConnector, MemoryStore, RecordStore, StoreConnector};
use async_trait::async_trait;

pub const CATALOG: &str = "https://catalog.test";

/// 测试配置：无冷却，下载快速超时
pub fn test_config(download_dir: &Path) -> Config {
    Config {
        catalog_base_url: CATALOG.to_string(),
        catalog_search_path: "/zh/search".to_string(),
        download_dir: download_dir.display().to_string(),
        download_timeout_secs: 1,
        download_poll_millis: 50,
        record_cooldown_millis: 0,
        connection_cooldown_millis: 0,
        ..Config::default()
    }
}

pub fn search_page(version: &str, hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .map(|href| {
            format!(
                r#"<li><a class="ver-item" href="{href}">
                    <span class="vername">App {version}</span>
                    <span class="vtype"><span>APK</span></span>
                    <div class="description">2025年4月1日 · Android 6.0+</div>
                </a></li>"#
            )
        })
        .collect();
    format!(
        r#"<html><body>
        <div class="information-table">
            <div class="item"><div class="name">版本</div><div class="value">{version}</div></div>
            <div class="item"><div class="name">开发者</div><div class="value">Example Inc.</div></div>
        </div>
        <ul class="list-versions">{items}</ul>
        </body></html>"#
    )
}

pub fn detail_page(arch: &str, artifact_type: &str, size: &str, href: &str) -> String {
    format!(
        r#"<html><body><div id="download-tab">
        <div id="best-variant-tab"><div class="tree"><ul>
            <li><code>{arch}</code>
                <ul class="file-list"><li><a class="variant" href="{href}">
                    <span class="vername">App 1.0</span>
                    <span class="vercode">(100)</span>
                    <span class="vtype"><span>{artifact_type}</span></span>
                    <div class="description">
                        <span class="spec">{size}</span>
                        <span class="spec">Android 6.0+</span>
                        <span class="spec">nodpi</span>
                    </div>
                </a></li></ul>
            </li>
        </ul></div></div>
        </div></body></html>"#
    )
}

#[derive(Debug, Clone)]
pub enum Reply {
    Html(String),
    Fail,
}

/// 按地址片段返回预设页面；下载时向目录写入一个文件
#[derive(Default)]
pub struct ScriptedRenderer {
    pages: Vec<(String, Reply)>,
    download_file: Option<(String, usize)>,
    pub rendered: Mutex<Vec<String>>,
    pub downloads: Mutex<Vec<String>>,
    pub closed_sessions: Arc<AtomicUsize>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url_fragment: &str, reply: Reply) -> Self {
        self.pages.push((url_fragment.to_string(), reply));
        self
    }

    pub fn writes_on_download(mut self, name: &str, bytes: usize) -> Self {
        self.download_file = Some((name.to_string(), bytes));
        self
    }

    pub fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }
}

#[async_trait]
impl PageRenderer for ScriptedRenderer {
    async fn render(&self, url: &str, _wait_selector: Option<&str>) -> AppResult<String> {
        self.rendered.lock().unwrap().push(url.to_string());
        let reply = self
            .pages
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone());
        match reply {
            Some(Reply::Html(html)) => Ok(html),
            Some(Reply::Fail) => Err(AppError::Browser(BrowserError::LaunchFailed {
                reason: "scripted failure".to_string(),
            })),
            None => Ok(String::new()),
        }
    }

    async fn trigger_download(&self, url: &str, dir: &Path) -> AppResult<DownloadSession> {
        self.downloads.lock().unwrap().push(url.to_string());
        if let Some((name, bytes)) = &self.download_file {
            std::fs::write(dir.join(name), vec![0u8; *bytes])?;
        }
        let closed = self.closed_sessions.clone();
        Ok(DownloadSession::new(async move {
            closed.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

/// 前 `failures` 次打开会话失败
pub struct FlakyConnector {
    inner: MemoryConnector,
    failures: AtomicUsize,
    pub opens: AtomicUsize,
}

impl FlakyConnector {
    pub fn new(store: MemoryStore, failures: usize) -> Self {
        Self {
            inner: MemoryConnector::new(store),
            failures: AtomicUsize::new(failures),
            opens: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl StoreConnector for FlakyConnector {
    async fn open(&self) -> AppResult<Arc<dyn RecordStore>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AppError::Store(StoreError::Rejected(
                "connection refused".to_string(),
            )));
        }
        self.inner.open().await
    }
}

/// 拒绝第一次写入指定版本号的记录
pub struct RejectVersionOnce {
    pub inner: MemoryStore,
    version: String,
    rejected: AtomicUsize,
}

impl RejectVersionOnce {
    pub fn new(inner: MemoryStore, version: &str) -> Self {
        Self {
            inner,
            version: version.to_string(),
            rejected: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RecordStore for RejectVersionOnce {
    async fn claim_next_pending(&self) -> AppResult<Option<ApkRecord>> {
        self.inner.claim_next_pending().await
    }
    async fn upsert_record(&self, record: &ApkRecord) -> AppResult<()> {
        if record.version.as_deref() == Some(self.version.as_str())
            && self.rejected.fetch_add(1, Ordering::SeqCst) == 0
        {
            return Err(AppError::Store(StoreError::Rejected("disk full".to_string())));
        }
        self.inner.upsert_record(record).await
    }
    async fn upsert_result(&self, result: &PipelineResult) -> AppResult<()> {
        self.inner.upsert_result(result).await
    }
    async fn list_results(&self, app_id: &str) -> AppResult<Vec<PipelineResult>> {
        self.inner.list_results(app_id).await
    }
    async fn get_prompt_bundle(&self, app_id: &str) -> AppResult<Option<PromptBundle>> {
        self.inner.get_prompt_bundle(app_id).await
    }
    async fn upsert_prompt_bundle(&self, bundle: &PromptBundle) -> AppResult<()> {
        self.inner.upsert_prompt_bundle(bundle).await
    }
    async fn list_app_ids(&self) -> AppResult<Vec<String>> {
        self.inner.list_app_ids().await
    }
}

/// 第 `n` 次写回记录时失败，其余调用照常转发
pub struct FailNthUpsert {
    pub inner: MemoryStore,
    n: usize,
    upserts: AtomicUsize,
}

impl FailNthUpsert {
    pub fn new(inner: MemoryStore, n: usize) -> Self {
        Self {
            inner,
            n,
            upserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RecordStore for FailNthUpsert {
    async fn claim_next_pending(&self) -> AppResult<Option<ApkRecord>> {
        self.inner.claim_next_pending().await
    }
    async fn upsert_record(&self, record: &ApkRecord) -> AppResult<()> {
        if self.upserts.fetch_add(1, Ordering::SeqCst) + 1 == self.n {
            return Err(AppError::Store(StoreError::Rejected("connection reset".to_string())));
        }
        self.inner.upsert_record(record).await
    }
    async fn upsert_result(&self, result: &PipelineResult) -> AppResult<()> {
        self.inner.upsert_result(result).await
    }
    async fn list_results(&self, app_id: &str) -> AppResult<Vec<PipelineResult>> {
        self.inner.list_results(app_id).await
    }
    async fn get_prompt_bundle(&self, app_id: &str) -> AppResult<Option<PromptBundle>> {
        self.inner.get_prompt_bundle(app_id).await
    }
    async fn upsert_prompt_bundle(&self, bundle: &PromptBundle) -> AppResult<()> {
        self.inner.upsert_prompt_bundle(bundle).await
    }
    async fn list_app_ids(&self) -> AppResult<Vec<String>> {
        self.inner.list_app_ids().await
    }
}

#[derive(Debug, Clone)]
pub enum Answer {
    Text(String),
    TransportError,
}

/// 依次返回预设回答，用完后重复最后一个
pub struct ScriptedGenerator {
    answers: Mutex<VecDeque<Answer>>,
    last: Mutex<Option<Answer>>,
    pub calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(answer: Answer) -> Self {
        Self::new(vec![answer])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnswerGenerator for ScriptedGenerator {
    async fn complete(&self, model: &str, _prompt: &str) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.answers.lock().unwrap().pop_front();
        let answer = match next {
            Some(answer) => {
                *self.last.lock().unwrap() = Some(answer.clone());
                answer
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or(Answer::Text(String::new())),
        };
        match answer {
            Answer::Text(text) => Ok(text),
            Answer::TransportError => Err(AppError::llm_api_failed(
                model,
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "gateway unreachable"),
            )),
        }
    }
}

pub fn fenced(json: &str) -> Answer {
    Answer::Text(format!("Here you go:\n```json\n{}\n```\n", json))
}

pub fn bundle(app_id: &str) -> PromptBundle {
    PromptBundle {
        app_id: app_id.to_string(),
        global: "You are testing an Android app.".to_string(),
        component: "Components: user, pwd.".to_string(),
        adjacent: "Adjacent: login button.".to_string(),
        restrictive: "Answer with:\n```json\n{\"com.app:id/user\": \"generated_value\", \"com.app:id/pwd\": \"generated_value\"}\n```".to_string(),
        guiding: "Be realistic.".to_string(),
        update_date: None,
    }
}
