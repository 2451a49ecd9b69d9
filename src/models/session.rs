//! 会话数据模型
//!
//! 一个会话对应一个已接受的任务，由 ChainFlow 独占持有直到终止。
//! 所有状态都只存在于内存中，会话结束后即丢弃。

use serde_json::Value;
use tokio::time::{Duration, Instant};
use url::Url;

use crate::models::job::Job;

/// 一次会话的全部可变状态
#[derive(Debug)]
pub struct Session {
    /// 起始 URL（会话期间不变）
    pub start_url: String,
    /// 提交携带的邮箱（会话期间不变）
    pub email: String,
    /// 提交携带的密钥（会话期间不变）
    pub secret: String,
    /// 当前页面 URL，每轮迭代更新；绝不允许与上一轮相同（循环守卫）
    pub current_url: String,
    /// 绝对截止时间，会话启动时固定，不再延长
    pub deadline: Instant,
    /// 最近一次观察到的提交响应，仅用于最终报告
    pub last_result: Option<SubmitReply>,
}

impl Session {
    /// 从任务创建会话，同时固定截止时间
    pub fn new(job: &Job, deadline: Duration) -> Self {
        Self {
            start_url: job.url.clone(),
            email: job.email.clone(),
            secret: job.secret.clone(),
            current_url: job.url.clone(),
            deadline: Instant::now() + deadline,
            last_result: None,
        }
    }
}

/// 单轮迭代派生出的页面内容（每轮重新计算，不持久化）
#[derive(Debug)]
pub struct PageContent {
    /// 原始响应体
    pub raw_body: String,
    /// 解码出的正文（仅当页面携带 base64 混淆时存在）
    pub decoded_body: Option<String>,
    /// 提取出的题目文本（入口页允许为空）
    pub question_text: String,
    /// 解析出的提交地址
    pub submit_url: Option<Url>,
}

impl PageContent {
    /// 有效正文：优先解码结果，否则回退到原始响应体
    pub fn effective_body(&self) -> &str {
        self.decoded_body.as_deref().unwrap_or(&self.raw_body)
    }
}

/// 提交响应的标签化表示
///
/// 循环只关心其中可选的 `url` 字段；非 JSON 的响应体是链条的正常完成信号。
/// 所有消费方必须显式地按标签分支，不做鸭子类型的字段访问。
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitReply {
    /// 服务器返回了 JSON
    Json(Value),
    /// 服务器返回了任意文本（终止标记）
    Text(String),
}

impl SubmitReply {
    /// 解析提交响应体
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => SubmitReply::Json(value),
            Err(_) => SubmitReply::Text(body.to_string()),
        }
    }

    /// 读取服务器给出的下一个 URL（空字符串视为不存在）
    pub fn next_url(&self) -> Option<&str> {
        match self {
            SubmitReply::Json(value) => value
                .get("url")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty()),
            SubmitReply::Text(_) => None,
        }
    }

    /// 是否是非 JSON 的终止文本
    pub fn is_final_text(&self) -> bool {
        matches!(self, SubmitReply::Text(_))
    }
}

/// 会话终止状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// 链条正常走完
    Done,
    /// 会话因致命条件被中止
    Aborted,
}

/// 会话中止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    DeadlineExceeded,
    FetchError,
    NoSubmitTarget,
    OracleError,
    SubmitError,
    CycleDetected,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            AbortReason::DeadlineExceeded => "截止时间已到",
            AbortReason::FetchError => "页面抓取失败",
            AbortReason::NoSubmitTarget => "找不到提交地址",
            AbortReason::OracleError => "Oracle错误",
            AbortReason::SubmitError => "答案提交失败",
            AbortReason::CycleDetected => "检测到循环",
        };
        write!(f, "{}", text)
    }
}

/// 会话的最终报告
///
/// 错误绝不跨越会话边界：调度方只拿到这个结构，拿不到任何异常。
#[derive(Debug)]
pub struct SessionOutcome {
    pub status: SessionStatus,
    /// 中止原因（仅 Aborted 时存在；用于可观测性，不用于重试决策）
    pub reason: Option<AbortReason>,
    /// 最近一次观察到的提交响应
    pub last_result: Option<SubmitReply>,
    /// 本会话走过的页面数
    pub pages_visited: usize,
}

impl SessionOutcome {
    pub fn done(last_result: Option<SubmitReply>, pages_visited: usize) -> Self {
        Self {
            status: SessionStatus::Done,
            reason: None,
            last_result,
            pages_visited,
        }
    }

    pub fn aborted(
        reason: AbortReason,
        last_result: Option<SubmitReply>,
        pages_visited: usize,
    ) -> Self {
        Self {
            status: SessionStatus::Aborted,
            reason: Some(reason),
            last_result,
            pages_visited,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == SessionStatus::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_reply_json_with_url() {
        let reply = SubmitReply::parse(r#"{"correct": true, "url": "https://h/next"}"#);
        assert_eq!(reply.next_url(), Some("https://h/next"));
        assert!(!reply.is_final_text());
    }

    #[test]
    fn test_submit_reply_json_without_url() {
        let reply = SubmitReply::parse(r#"{"correct": true}"#);
        assert_eq!(reply.next_url(), None);
    }

    #[test]
    fn test_submit_reply_empty_url_treated_as_absent() {
        let reply = SubmitReply::parse(r#"{"url": ""}"#);
        assert_eq!(reply.next_url(), None);
    }

    #[test]
    fn test_submit_reply_plain_text_is_final() {
        let reply = SubmitReply::parse("Quiz complete!");
        assert!(reply.is_final_text());
        assert_eq!(reply.next_url(), None);
        assert_eq!(reply, SubmitReply::Text("Quiz complete!".to_string()));
    }

    #[test]
    fn test_effective_body_prefers_decoded() {
        let page = PageContent {
            raw_body: "raw".to_string(),
            decoded_body: Some("decoded".to_string()),
            question_text: String::new(),
            submit_url: None,
        };
        assert_eq!(page.effective_body(), "decoded");

        let page = PageContent {
            decoded_body: None,
            ..page
        };
        assert_eq!(page.effective_body(), "raw");
    }

    #[test]
    fn test_session_carries_job_fields_unchanged() {
        let job = Job {
            url: "https://h/q/1".to_string(),
            email: "a@b.c".to_string(),
            secret: "s".to_string(),
        };
        let session = Session::new(&job, tokio::time::Duration::from_secs(120));
        assert_eq!(session.start_url, session.current_url);
        assert_eq!(session.email, "a@b.c");
        assert_eq!(session.secret, "s");
        assert!(session.last_result.is_none());
    }
}
