//! 链条驱动 - 流程层
//!
//! 核心职责：驱动"一个会话"的完整状态机
//!
//! 状态顺序：
//! FETCHING → DECODING → EXTRACTING → ANSWERING → SUBMITTING
//!     → {CONTINUING | DONE | ABORTED}
//!
//! 每轮迭代的开头做一次协作式截止检查；循环内严格串行，同一时刻最多
//! 一个在途网络调用。任何致命条件都只终止本会话，映射为 SessionOutcome，
//! 绝不让错误跨越会话边界。

use serde_json::{json, Value};
use tokio::time::{Duration, Instant};
use tracing::{error, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{SessionError, SessionResult};
use crate::infrastructure::HttpExecutor;
use crate::models::job::{Job, SubmissionPayload};
use crate::models::session::{PageContent, Session, SessionOutcome, SubmitReply};
use crate::services::{decoder, extractor, resolver, OracleService};
use crate::utils::logging::truncate_text;
use crate::workflow::session_ctx::SessionCtx;

/// 入口页（没有题目、只有提交地址）时提交的固定占位答案
pub const SENTINEL_ANSWER: &str = "start";

/// 单轮迭代的走向
enum StepOutcome {
    /// 服务器给出了新 URL，回到 FETCHING
    Continue,
    /// 链条正常结束
    Done,
}

/// 链条驱动流程
///
/// - 编排一个会话的完整循环
/// - 决定何时解码、何时问 Oracle、何时终止
/// - 不持有任何进程级资源（HttpExecutor 由编排层注入，内部只是连接池）
/// - 只依赖业务能力（services）
pub struct ChainFlow {
    executor: HttpExecutor,
    oracle: OracleService,
    deadline: Duration,
    verbose_logging: bool,
}

impl ChainFlow {
    /// 创建新的链条驱动流程
    pub fn new(config: &Config, executor: HttpExecutor) -> Self {
        Self {
            executor,
            oracle: OracleService::new(config),
            deadline: Duration::from_secs(config.session_deadline_secs),
            verbose_logging: config.verbose_logging,
        }
    }

    /// 跑完一个会话
    ///
    /// 从任务的起始 URL 开始循环，直到链条结束、截止时间到或出现致命条件。
    /// 永远返回 SessionOutcome，不返回 Err。
    pub async fn run(&self, job: &Job, ctx: &SessionCtx) -> SessionOutcome {
        let mut session = Session::new(job, self.deadline);
        let mut pages_visited = 0usize;

        loop {
            match self.step(&mut session, ctx).await {
                Ok(StepOutcome::Continue) => {
                    pages_visited += 1;
                    info!(
                        "[会话 {}] ➡️ 链条继续，下一页: {}",
                        ctx.session_index, session.current_url
                    );
                }
                Ok(StepOutcome::Done) => {
                    pages_visited += 1;
                    info!(
                        "[会话 {}] 🏁 链条结束，共访问 {} 页",
                        ctx.session_index, pages_visited
                    );
                    return SessionOutcome::done(session.last_result.take(), pages_visited);
                }
                Err(e) => {
                    error!("[会话 {}] ❌ 会话中止: {}", ctx.session_index, e);
                    return SessionOutcome::aborted(
                        e.reason(),
                        session.last_result.take(),
                        pages_visited,
                    );
                }
            }
        }
    }

    /// 执行一轮迭代：抓取 → 解码 → 提取 → 作答 → 提交 → 跟进
    async fn step(&self, session: &mut Session, ctx: &SessionCtx) -> SessionResult<StepOutcome> {
        // 1. 协作式截止检查（只在迭代边界做）
        if Instant::now() > session.deadline {
            return Err(SessionError::DeadlineExceeded);
        }

        // 2. FETCHING
        info!(
            "[会话 {}] 📥 正在抓取: {}",
            ctx.session_index, session.current_url
        );
        let raw_body = self
            .executor
            .get_text(&session.current_url)
            .await
            .map_err(|e| SessionError::Fetch {
                url: session.current_url.clone(),
                source: e.into(),
            })?;

        // 3. DECODING（建议性：失败就用原始正文）
        let decoded_body = decoder::decode(&raw_body);
        if decoded_body.is_some() {
            info!(
                "[会话 {}] 🔓 检测到 base64 混淆，已解码",
                ctx.session_index
            );
        }

        // 4. EXTRACTING：题目与提交地址都来自同一份有效正文
        let base_url = Url::parse(&session.current_url)
            .map_err(|e| SessionError::fetch_failed(session.current_url.clone(), e))?;

        let mut page = PageContent {
            raw_body,
            decoded_body,
            question_text: String::new(),
            submit_url: None,
        };
        page.question_text = extractor::extract(page.effective_body());
        page.submit_url = resolver::resolve(page.effective_body(), &base_url);

        // 没有提交地址就没有任何可继续的事，始终致命
        let submit_url = page.submit_url.clone().ok_or_else(|| {
            SessionError::NoSubmitTarget {
                url: session.current_url.clone(),
            }
        })?;

        if self.verbose_logging {
            info!(
                "[会话 {}] 题目: {}",
                ctx.session_index,
                truncate_text(&page.question_text, 80)
            );
        }

        // 5. ANSWERING：入口页（题目为空）跳过 Oracle，提交占位答案
        let answer: Value = if page.question_text.is_empty() {
            warn!(
                "[会话 {}] ⚠️ 页面没有题目，按入口页处理，提交占位答案",
                ctx.session_index
            );
            json!(SENTINEL_ANSWER)
        } else {
            info!("[会话 {}] 🤖 正在询问 Oracle...", ctx.session_index);
            let value = self.oracle.answer(&page.question_text).await?;
            info!(
                "[会话 {}] ✓ Oracle 返回答案: {}",
                ctx.session_index,
                truncate_text(&value.to_string(), 80)
            );
            value
        };

        // 6. SUBMITTING：url 字段是"正在作答的页面"，不是下一页
        let payload = SubmissionPayload {
            email: session.email.clone(),
            secret: session.secret.clone(),
            url: session.current_url.clone(),
            answer,
        };
        let payload_json = serde_json::to_value(&payload)
            .map_err(|e| SessionError::submit_failed(submit_url.to_string(), e))?;

        info!(
            "[会话 {}] 📤 正在提交答案到 {}",
            ctx.session_index, submit_url
        );
        let reply_body = self
            .executor
            .post_json(submit_url.as_str(), &payload_json)
            .await
            .map_err(|e| SessionError::Submit {
                url: submit_url.to_string(),
                source: e.into(),
            })?;

        // 7. 跟进：非 JSON 响应是链条的正常完成信号
        let reply = SubmitReply::parse(&reply_body);
        if reply.is_final_text() {
            info!(
                "[会话 {}] 收到非 JSON 响应，视为最终结果: {}",
                ctx.session_index,
                truncate_text(&reply_body, 80)
            );
        }

        let next = reply.next_url().map(str::to_string);
        session.last_result = Some(reply);

        match next {
            None => Ok(StepOutcome::Done),
            Some(next_url) if next_url == session.current_url => {
                // 循环守卫：服务器回显了同一页，否则会永远打转
                Err(SessionError::CycleDetected { url: next_url })
            }
            Some(next_url) => {
                session.current_url = next_url;
                Ok(StepOutcome::Continue)
            }
        }
    }
}
