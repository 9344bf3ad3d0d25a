//! 提示拼装 - 业务能力层
//!
//! promptStructure 含义：
//! - 0: global + component + adjacent + restrictive + guiding
//! - 1: component + adjacent + restrictive + guiding
//! - 2: global + adjacent + restrictive + guiding
//! - 3: global + component + restrictive + guiding
//! - 4: global + component + adjacent + restrictive
//! - 5: global + UI 层级说明 + UI 层级 XML + restrictive + guiding

use std::sync::Arc;

use tracing::warn;

use crate::error::AppResult;
use crate::infrastructure::documents::{hierarchy_document_id, DocumentStore};
use crate::models::PromptBundle;

/// 最大的结构编号
pub const MAX_PROMPT_STRUCTURE: u8 = 5;

const HIERARCHY_INTRO: &str =
    "Here is the detailed hierarchy structure of the UI that contains those text-input components:\n";

#[derive(Debug, Clone, Copy)]
enum Fragment {
    Global,
    Component,
    Adjacent,
    Restrictive,
    Guiding,
}

use Fragment::*;

const STRUCTURES: [&[Fragment]; 5] = [
    &[Global, Component, Adjacent, Restrictive, Guiding],
    &[Component, Adjacent, Restrictive, Guiding],
    &[Global, Adjacent, Restrictive, Guiding],
    &[Global, Component, Restrictive, Guiding],
    &[Global, Component, Adjacent, Restrictive],
];

fn fragment<'a>(bundle: &'a PromptBundle, which: Fragment) -> &'a str {
    match which {
        Global => &bundle.global,
        Component => &bundle.component,
        Adjacent => &bundle.adjacent,
        Restrictive => &bundle.restrictive,
        Guiding => &bundle.guiding,
    }
}

/// 按结构编号拼装提示；结构 5 需要 UI 层级文本，缺失或空白时不生成提示
pub fn compose(bundle: &PromptBundle, structure: u8, hierarchy: Option<&str>) -> Option<String> {
    match structure {
        0..=4 => {
            let parts: Vec<&str> = STRUCTURES[structure as usize]
                .iter()
                .map(|f| fragment(bundle, *f))
                .collect();
            Some(parts.join(" "))
        }
        5 => {
            let xml = hierarchy.filter(|text| !text.trim().is_empty())?;
            let parts = [
                format!("{}\n", bundle.global),
                HIERARCHY_INTRO.to_string(),
                format!("{}\n\n", xml),
                format!("{}\n", bundle.restrictive),
                bundle.guiding.clone(),
            ];
            Some(parts.join(" "))
        }
        _ => None,
    }
}

/// 提示拼装器
pub struct PromptAssembler {
    documents: Arc<dyn DocumentStore>,
}

impl PromptAssembler {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// 拼装提示；返回 `None` 表示该结构无法生成提示
    pub async fn assemble(&self, bundle: &PromptBundle, structure: u8) -> AppResult<Option<String>> {
        if structure != MAX_PROMPT_STRUCTURE {
            return Ok(compose(bundle, structure, None));
        }

        let identifier = hierarchy_document_id(&bundle.app_id);
        let hierarchy = self.documents.read_text(&identifier).await?;
        let prompt = compose(bundle, structure, hierarchy.as_deref());
        if prompt.is_none() {
            warn!("{} 缺少 UI 层级文件，跳过结构 {}", bundle.app_id, structure);
        }
        Ok(prompt)
    }
}
