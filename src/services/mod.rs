//! 业务能力层
//!
//! 每个服务只处理一个页面、一个目录或一次回答，不关心流程顺序

pub mod catalog_search;
pub mod download_detector;
pub(crate) mod html;
pub mod prompt_assembler;
pub mod prompt_builder;
pub mod response_validator;
pub mod result_persister;
pub mod variant_extractor;

pub use catalog_search::CatalogSearchExtractor;
pub use download_detector::{parse_size_to_bytes, DirSnapshot, DownloadCompletionDetector};
pub use prompt_assembler::{PromptAssembler, MAX_PROMPT_STRUCTURE};
pub use prompt_builder::PromptBuilder;
pub use response_validator::{extract_component_ids, ResponseValidator};
pub use result_persister::ResultPersister;
pub use variant_extractor::VariantExtractor;
