//! 题目提取 - 业务能力层
//!
//! 只负责"从（解码后的）HTML 里取出人类可读的题目文本"能力，纯函数，无 I/O
//!
//! 按固定顺序回退：`#result` 元素 → 第一个 `<pre>` → `<body>`。
//! 空结果是合法输出（入口页没有题目），与错误严格区分。

use scraper::{ElementRef, Html, Selector};

/// 候选选择器，按优先级排列
const CANDIDATE_SELECTORS: [&str; 3] = ["#result", "pre", "body"];

/// 从 HTML 中提取题目文本
///
/// # 参数
/// - `html`: 有效正文（解码结果或原始响应体）
///
/// # 返回
/// 扁平化后的题目文本；三个候选都不存在时返回修剪过的原始输入兜底。
/// 返回空字符串表示"本页没有题目"，不是错误。
pub fn extract(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector in CANDIDATE_SELECTORS {
        let parsed = match Selector::parse(selector) {
            Ok(s) => s,
            Err(_) => continue,
        };
        if let Some(element) = document.select(&parsed).next() {
            return flatten_text(element);
        }
    }

    html.trim().to_string()
}

/// 扁平化元素文本：块级边界之间保留换行，去除首尾空白
fn flatten_text(element: ElementRef) -> String {
    let chunks: Vec<&str> = element
        .text()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect();

    chunks.join("\n")
}
