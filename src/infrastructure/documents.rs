//! 外部文件存储 - 基础设施层
//!
//! 按标识读取文本文件（结构 5 所需的 UI 层级 XML、子提示所需的 UI 上下文 JSON）

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 读取文本；不存在时返回 `None`
    async fn read_text(&self, identifier: &str) -> AppResult<Option<String>>;
}

/// UI 层级文件的标识
pub fn hierarchy_document_id(app_id: &str) -> String {
    format!("hierarchy_{}.xml", app_id)
}

/// UI 上下文文件的标识
pub fn context_document_id(app_id: &str) -> String {
    format!("context_{}.json", app_id)
}

/// 本地目录中的文件
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(config: &Config) -> Self {
        Self::with_root(&config.structure_doc_dir)
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn read_text(&self, identifier: &str) -> AppResult<Option<String>> {
        let path = self.root.join(identifier);
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} 文件不存在", path.display());
                Ok(None)
            }
            Err(e) => Err(AppError::file_read_failed(path.display().to_string(), e)),
        }
    }
}
