//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `apk_queue` - APK 抓取队列
//! - 认领待处理记录，逐条交给 `ApkFlow`
//! - 管理数据库会话的打开、关闭与重开
//! - 冷却与统计
//!
//! ### `prompt_batch` - 子提示批处理
//! - 读取每个应用的 UI 上下文，生成子提示并入库
//!
//! ### `text_batch` - 文本生成批处理
//! - 确定应用列表（配置优先，否则读取数据库）
//! - 逐个应用交给 `TextFlow`
//!
//! ## 层次关系
//!
//! ```text
//! apk_queue / prompt_batch / text_batch
//!     ↓
//! workflow::ApkFlow / workflow::TextFlow
//!     ↓
//! services (提取 / 检测 / 拼装 / 校验 / 写入)
//!     ↓
//! infrastructure + store (浏览器、文件、数据库)
//! ```

pub mod apk_queue;
pub mod prompt_batch;
pub mod text_batch;

pub use apk_queue::{QueueStats, WorkQueueDriver};
pub use prompt_batch::{PromptBatchDriver, PromptStats};
pub use text_batch::TextBatchDriver;
