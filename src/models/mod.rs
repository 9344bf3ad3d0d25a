pub mod apk;
pub mod catalog;
pub mod context;
pub mod prompt;

pub use apk::{ApkRecord, RecordStatus, Sentinel};
pub use catalog::{VariantInfo, VersionLink, VersionSummary};
pub use context::{AdjacentText, ComponentContext, GlobalContext, UiContext};
pub use prompt::{PipelineResult, PromptBundle, ResultKey, EMPTY_TEXTS};
