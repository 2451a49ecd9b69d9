//! 即发即忘调度 - 编排层
//!
//! 任务接受端（上游协作方：HTTP 端点、队列消费者等）校验完 `{url, email,
//! secret}` 之后调用这里。会话被交给一个独立的 tokio 任务去跑，没有结果
//! 通道回传：调用方只知道"任务已接受"，永远不知道结局。
//! 结局只进日志，用于可观测性，不用于重试决策。

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::Config;
use crate::infrastructure::HttpExecutor;
use crate::models::Job;
use crate::workflow::{ChainFlow, SessionCtx};

/// 进程内递增的会话编号（仅用于日志）
static NEXT_SESSION_INDEX: AtomicUsize = AtomicUsize::new(1);

/// 接受一个任务并在后台启动会话
///
/// # 参数
/// - `job`: 已通过上游校验的任务
/// - `config`: 程序配置
/// - `executor`: 进程级共享的 HTTP 执行器
///
/// # 返回
/// 任务句柄仅用于测试和优雅停机；正常调用方直接丢弃它。
pub fn dispatch(job: Job, config: Config, executor: HttpExecutor) -> JoinHandle<()> {
    let session_index = NEXT_SESSION_INDEX.fetch_add(1, Ordering::Relaxed);

    info!("[会话 {}] 任务已接受，起点: {}", session_index, job.url);

    tokio::spawn(async move {
        let ctx = SessionCtx::new(session_index, job.url.clone());
        let flow = ChainFlow::new(&config, executor);
        let outcome = flow.run(&job, &ctx).await;

        match outcome.reason {
            None => info!(
                "[会话 {}] 🏁 会话正常结束，最终结果: {:?}",
                session_index, outcome.last_result
            ),
            Some(reason) => error!(
                "[会话 {}] ❌ 会话中止 (原因: {})，最后响应: {:?}",
                session_index, reason, outcome.last_result
            ),
        }
    })
}
