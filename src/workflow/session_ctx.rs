//! 会话处理上下文
//!
//! 封装"我正在跑第几个会话、从哪里开始"这一信息

use std::fmt::Display;

/// 会话处理上下文
///
/// 包含处理单个会话所需的日志上下文信息
#[derive(Debug, Clone)]
pub struct SessionCtx {
    /// 会话索引（仅用于日志显示）
    pub session_index: usize,

    /// 链条的起始 URL
    pub start_url: String,
}

impl SessionCtx {
    /// 创建新的会话上下文
    pub fn new(session_index: usize, start_url: String) -> Self {
        Self {
            session_index,
            start_url,
        }
    }
}

impl Display for SessionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[会话 #{} 起点 {}]", self.session_index, self.start_url)
    }
}
