//! 基础设施层
//!
//! 持有稀缺资源（浏览器进程、文件目录），只暴露能力

pub mod browser_session;
pub mod documents;
pub mod renderer;

pub use browser_session::{BrowserSession, LaunchOptions};
pub use documents::{context_document_id, hierarchy_document_id, DocumentStore, FsDocumentStore};
pub use renderer::{ChromeRenderer, DownloadSession, PageRenderer};
