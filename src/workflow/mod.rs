pub mod apk_flow;
pub mod text_flow;

pub use apk_flow::{ApkFlow, ApkOutcome, ApkStage};
pub use text_flow::{TextFlow, TextStats};
