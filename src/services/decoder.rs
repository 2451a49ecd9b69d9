//! 混淆解码 - 业务能力层
//!
//! 只负责"识别并解码页面里的 base64 混淆"能力，纯函数，无 I/O
//!
//! 题目页面有时把真正的 HTML 藏在内联脚本的 `atob("...")` 调用里。
//! 本模块找到第一处这样的调用，解码其参数并返回文本。
//! 结果是建议性的：返回 None 时调用方必须回退到原始响应体。

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;

/// 解码调用的匹配模式：大小写敏感的字面调用，参数为带引号的字符串
const DECODE_CALL_PATTERN: &str = r#"atob\("([^"]*)"\)"#;

/// 检测并解码页面中的 base64 混淆正文
///
/// # 参数
/// - `body`: 页面原始响应体
///
/// # 返回
/// 解码出的文本；模式不存在、解码失败或解码结果无可用文本时返回 None。
/// 每页只认第一处匹配，不期望混淆重复出现。
pub fn decode(body: &str) -> Option<String> {
    let re = Regex::new(DECODE_CALL_PATTERN).ok()?;
    let payload = re.captures(body)?.get(1)?.as_str();

    let bytes = STANDARD.decode(payload).ok()?;

    // 宽松的 UTF-8 处理：无效字节替换为占位符，绝不报错
    let text = String::from_utf8_lossy(&bytes).into_owned();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
