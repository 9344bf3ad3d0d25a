//! # APK Harvest
//!
//! 从应用市场抓取 APK 元数据与安装包，并驱动 LLM 生成测试文本
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `PageRenderer` - 渲染页面、触发下载，每次调用都释放浏览器
//! - `DocumentStore` - 读取 UI 层级文件
//! - `store/` - 记录存储（SQLite / 内存）
//! - `clients/` - LLM 接入（聊天网关 / OpenAI 兼容服务）
//!
//! ### ② 业务能力层（Services）
//! - `CatalogSearchExtractor` / `VariantExtractor` - 页面解析
//! - `DownloadCompletionDetector` - 按文件大小判断下载完成
//! - `PromptBuilder` - 由 UI 上下文生成子提示
//! - `PromptAssembler` / `ResponseValidator` / `ResultPersister` - 文本生成
//!
//! ### ③ 流程层（Workflow）
//! - `ApkFlow` - 一条记录的状态阶梯，每一步写回
//! - `TextFlow` - 一个应用的 模型 × 结构 × 序号 遍历
//!
//! ### ④ 编排层（Orchestration）
//! - `WorkQueueDriver` - 认领循环、冷却、会话重开
//! - `PromptBatchDriver` / `TextBatchDriver` - 应用列表遍历

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod store;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{ApkRecord, PipelineResult, PromptBundle, Sentinel};
pub use orchestrator::{PromptBatchDriver, TextBatchDriver, WorkQueueDriver};
pub use workflow::{ApkFlow, ApkOutcome, TextFlow};
