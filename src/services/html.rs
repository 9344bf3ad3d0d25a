//! 页面解析的共用小工具
//!
//! 所有可选子元素都通过 `Option` 访问，由调用方决定默认值

use scraper::{ElementRef, Selector};

use crate::error::{AppError, AppResult};

/// 编译 CSS 选择器
pub(crate) fn selector(css: &str) -> AppResult<Selector> {
    Selector::parse(css).map_err(|e| AppError::Parse(format!("无效的选择器 {}: {}", css, e)))
}

/// 元素文本，合并空白并去掉首尾空格
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 第一个匹配子元素的文本
pub(crate) fn first_text(parent: ElementRef<'_>, selector: &Selector) -> Option<String> {
    parent.select(selector).next().map(element_text)
}

/// 第一个匹配子元素的属性
pub(crate) fn first_attr(
    parent: ElementRef<'_>,
    selector: &Selector,
    attr: &str,
) -> Option<String> {
    parent
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
}
