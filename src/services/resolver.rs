//! 提交地址解析 - 业务能力层
//!
//! 只负责"在任意/残缺 HTML 里定位答案提交地址"能力，纯函数，无 I/O
//!
//! 刻意使用分层的正则匹配而不是结构化解析：输入是对抗性的、常常残缺，
//! 严格解析器会拒绝"不规范但有效"的页面。三条启发式各自独立，按严格
//! 优先级组合，首个命中即返回：
//!
//! 1. 以 `/submit` 路径段收尾的绝对 URL 字面量（最无歧义）
//! 2. JSON 风格的 `"url": "<值>"` 字段（绝对地址或根相对路径）
//! 3. 游离的 `/submit...` 路径片段（最宽松，放在最后以减少误报）

use regex::Regex;
use url::Url;

/// 解析答案提交地址
///
/// # 参数
/// - `html`: 有效正文（解码结果或原始响应体）
/// - `base_url`: 当前页面 URL，用于相对路径解析
///
/// # 返回
/// 绝对提交地址；三条启发式都未命中时返回 None（当轮迭代的致命条件）。
pub fn resolve(html: &str, base_url: &Url) -> Option<Url> {
    absolute_submit_url(html)
        .or_else(|| json_url_field(html, base_url))
        .or_else(|| bare_submit_path(html, base_url))
}

/// 启发式 1：内容中以 /submit 路径段收尾的绝对 URL 字面量
fn absolute_submit_url(html: &str) -> Option<Url> {
    let re = Regex::new(r#"https?://[^\s"'<>]+/submit\b[^\s"'<>]*"#).ok()?;
    let matched = re.find(html)?;
    Url::parse(matched.as_str()).ok()
}

/// 启发式 2：JSON 风格的 "url": "<值>" 字段
///
/// 值本身是绝对 URL 时直接采用；以 `/` 开头的根相对路径按标准
/// 相对地址解析规则挂到 base_url 上；其余形态不算命中。
fn json_url_field(html: &str, base_url: &Url) -> Option<Url> {
    let re = Regex::new(r#""url"\s*:\s*"([^"]+)""#).ok()?;
    let value = re.captures(html)?.get(1)?.as_str();

    if value.starts_with("http://") || value.starts_with("https://") {
        Url::parse(value).ok()
    } else if value.starts_with('/') {
        base_url.join(value).ok()
    } else {
        None
    }
}

/// 启发式 3：未被标记定界符包住的游离 /submit 路径片段
fn bare_submit_path(html: &str, base_url: &Url) -> Option<Url> {
    let re = Regex::new(r#"/submit[^\s"'<>]*"#).ok()?;

    for matched in re.find_iter(html) {
        // 紧挨在 `<` 后面的是标签名，不是路径
        let preceded_by_tag = html[..matched.start()].chars().next_back() == Some('<');
        if preceded_by_tag {
            continue;
        }
        if let Ok(resolved) = base_url.join(matched.as_str()) {
            return Some(resolved);
        }
    }

    None
}
