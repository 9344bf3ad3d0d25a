//! 子提示生成 - 业务能力层
//!
//! 由 UI 上下文生成五段子提示：
//! - global: 应用名、页面、输入组件数量与类型
//! - component: 每个输入组件一句
//! - adjacent: 每个组件在各方向上最近的文本
//! - restrictive: 组件列表 + ```json 回答示例
//! - guiding: 固定的指导语

use std::collections::BTreeSet;

use serde_json::{Map, Value as JsonValue};
use tracing::info;

use crate::config::{Config, PromptTemplates};
use crate::error::{AppError, AppResult};
use crate::models::{PromptBundle, UiContext};

/// 示例 JSON 中每个组件的占位值
const EXAMPLE_VALUE: &str = "generated_value";

/// 序数词: 1st, 2nd, 3rd, 11th ...
pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// 替换模板中的 `{name}` 占位符
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}

/// 子提示生成器
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    templates: PromptTemplates,
}

impl PromptBuilder {
    pub fn new(config: &Config) -> Self {
        Self::with_templates(config.prompt_templates.clone())
    }

    pub fn with_templates(templates: PromptTemplates) -> Self {
        Self { templates }
    }

    /// 生成一个应用的子提示；`package_name` 为空时无法入库，返回错误
    pub fn build(&self, context: &UiContext) -> AppResult<PromptBundle> {
        let app_id = context.global.package_name.trim();
        if app_id.is_empty() {
            return Err(AppError::Parse("UI 上下文缺少 package_name".to_string()));
        }

        let bundle = PromptBundle {
            app_id: app_id.to_string(),
            global: self.global(context),
            component: self.components(context).join(" "),
            adjacent: self.adjacent(context).join(" "),
            restrictive: self.restrictive(context)?,
            guiding: self.templates.guiding.clone(),
            update_date: None,
        };
        info!(
            "📒 {} 子提示生成完成（{} 个输入组件）",
            bundle.app_id,
            context.component.len()
        );
        Ok(bundle)
    }

    fn global(&self, context: &UiContext) -> String {
        let types: BTreeSet<&str> = context.component.iter().map(|c| c.short_type()).collect();
        let types = types.into_iter().collect::<Vec<_>>().join(", ");
        let input_count = context.global.input_count.to_string();
        fill(
            &self.templates.global,
            &[
                ("app_name", context.global.app_name.as_str()),
                ("input_count", input_count.as_str()),
                ("activity", context.global.short_activity()),
                ("component_types", types.as_str()),
            ],
        )
    }

    fn components(&self, context: &UiContext) -> Vec<String> {
        context
            .component
            .iter()
            .enumerate()
            .map(|(idx, component)| {
                let order = ordinal(idx + 1);
                fill(
                    &self.templates.component,
                    &[
                        ("component_order", order.as_str()),
                        ("component_type", component.short_type()),
                        ("resource_id", component.resource_id.as_str()),
                        ("hint_text", component.hint.as_deref().unwrap_or_default()),
                        ("current_text", component.text.as_deref().unwrap_or_default()),
                    ],
                )
            })
            .collect()
    }

    /// 没有文本的方向不生成句子
    fn adjacent(&self, context: &UiContext) -> Vec<String> {
        let mut sentences = Vec::new();
        for (component_id, directions) in &context.adjacent {
            for (direction, neighbour) in directions {
                let Some(neighbour) = neighbour.as_ref().filter(|n| !n.text.is_empty()) else {
                    continue;
                };
                let distance = format!("{:.2}", neighbour.distance);
                sentences.push(fill(
                    &self.templates.adjacent,
                    &[
                        ("direction", direction.as_str()),
                        ("component_id", component_id.as_str()),
                        ("text", neighbour.text.as_str()),
                        ("distance", distance.as_str()),
                    ],
                ));
            }
        }
        sentences
    }

    fn restrictive(&self, context: &UiContext) -> AppResult<String> {
        let keys: Vec<&str> = context.component.iter().map(|c| c.answer_key()).collect();
        let example: Map<String, JsonValue> = keys
            .iter()
            .map(|key| (key.to_string(), JsonValue::from(EXAMPLE_VALUE)))
            .collect();
        let example_json = serde_json::to_string_pretty(&example)?;
        Ok(fill(
            &self.templates.restrictive,
            &[
                ("component_list", keys.join(", ").as_str()),
                ("example_json", example_json.as_str()),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extract_component_ids;

    fn context() -> UiContext {
        serde_json::from_str(
            r#"{
                "global": {
                    "app_name": "Mail",
                    "package_name": "com.example.mail",
                    "input_count": 2,
                    "activity": "com.example.mail.ui.LoginActivity"
                },
                "component": [
                    {"type": "android.widget.EditText", "resource_id": "com.example.mail:id/user",
                     "hint": "Email", "text": "", "resource_id_combined": "com.example.mail:id/user"},
                    {"type": "android.widget.EditText", "resource_id": "com.example.mail:id/pwd",
                     "hint": null, "resource_id_combined": ""}
                ],
                "adjacent": {
                    "com.example.mail:id/user": {
                        "top": {"text": "Sign in", "distance": 42.5},
                        "left": null,
                        "right": {"text": "", "distance": 3}
                    }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ordinal_suffixes() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(22), "22nd");
        assert_eq!(ordinal(113), "113th");
    }

    #[test]
    fn test_restrictive_fragment_round_trips_component_ids() {
        let bundle = PromptBuilder::default().build(&context()).unwrap();

        let mut ids = extract_component_ids(&bundle.restrictive).unwrap();
        ids.sort();
        assert_eq!(ids, vec!["com.example.mail:id/pwd", "com.example.mail:id/user"]);
        assert!(bundle
            .restrictive
            .contains("com.example.mail:id/user, com.example.mail:id/pwd"));
    }

    #[test]
    fn test_fragments_use_short_names_and_skip_empty_neighbours() {
        let bundle = PromptBuilder::default().build(&context()).unwrap();

        assert_eq!(bundle.app_id, "com.example.mail");
        assert!(bundle.global.contains("(LoginActivity)"));
        assert!(bundle.global.contains("2 text input components of type EditText."));
        assert!(bundle.component.starts_with("The 1st component is a EditText"));
        assert!(bundle.component.contains("The 2nd component"));
        assert!(bundle.component.contains("hint \"\""));
        assert_eq!(
            bundle.adjacent,
            "To the top of component \"com.example.mail:id/user\" there is the text \"Sign in\" at a distance of 42.50 pixels."
        );
        assert_eq!(bundle.guiding, PromptTemplates::default().guiding);
    }

    #[test]
    fn test_custom_templates() {
        let templates = PromptTemplates {
            global: "{app_name}/{activity}".to_string(),
            guiding: "Go.".to_string(),
            ..PromptTemplates::default()
        };
        let bundle = PromptBuilder::with_templates(templates).build(&context()).unwrap();
        assert_eq!(bundle.global, "Mail/LoginActivity");
        assert_eq!(bundle.guiding, "Go.");
    }

    #[test]
    fn test_missing_package_name_is_rejected() {
        let mut ctx = context();
        ctx.global.package_name = "  ".to_string();
        assert!(PromptBuilder::default().build(&ctx).is_err());
    }
}
