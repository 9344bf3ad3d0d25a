use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 目标页面的 UI 上下文，由设备端提取后以 JSON 保存
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiContext {
    pub global: GlobalContext,
    #[serde(default)]
    pub component: Vec<ComponentContext>,
    /// 组件 ID → 方向 → 最近的文本
    #[serde(default)]
    pub adjacent: BTreeMap<String, BTreeMap<String, Option<AdjacentText>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalContext {
    pub app_name: String,
    pub package_name: String,
    #[serde(default)]
    pub input_count: usize,
    #[serde(default)]
    pub activity: String,
}

/// 一个文本输入组件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentContext {
    /// 控件类名，如 `android.widget.EditText`
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// 去重后的组件 ID，回答 JSON 的键
    #[serde(default)]
    pub resource_id_combined: String,
}

impl ComponentContext {
    /// 回答 JSON 中使用的键；没有去重 ID 时退回原始资源 ID
    pub fn answer_key(&self) -> &str {
        if self.resource_id_combined.is_empty() {
            &self.resource_id
        } else {
            &self.resource_id_combined
        }
    }

    /// 类名的最后一段，如 `EditText`
    pub fn short_type(&self) -> &str {
        short_name(&self.component_type)
    }
}

impl GlobalContext {
    pub fn short_activity(&self) -> &str {
        short_name(&self.activity)
    }
}

fn short_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjacentText {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub distance: f64,
}
