//! 批量会话处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是批处理模式的入口，负责批量任务的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：启动日志、创建共享 HttpExecutor
//! 2. **批量加载**：扫描并加载所有待处理的任务（`Vec<Job>`）
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分批处理**：将任务分批次处理，每批完成后再开始下一批
//! 5. **资源管理**：持有共享 HTTP 客户端，确保生命周期正确
//! 6. **全局统计**：汇总所有会话的终止状态
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个会话的细节
//! - **资源所有者**：唯一创建 HttpExecutor 的模块（各会话克隆共享连接池）
//! - **并发安全**：会话之间不共享任何可变状态，通过 Semaphore 和
//!   tokio::spawn 实现并发
//! - **向下委托**：委托 workflow::ChainFlow 处理单个会话

use crate::config::Config;
use crate::infrastructure::HttpExecutor;
use crate::models::Job;
use crate::utils::logging;
use crate::workflow::{ChainFlow, SessionCtx};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    executor: HttpExecutor,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        logging::init_log_file(&config.output_log_file)?;

        logging::log_startup(config.max_concurrent_sessions);

        // 创建共享 HTTP 执行器（进程级连接池，各会话共用）
        let executor = HttpExecutor::new(config.http_timeout_secs)?;

        Ok(Self { config, executor })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        // 加载所有待处理的任务
        let all_jobs = self.load_jobs().await?;

        if all_jobs.is_empty() {
            warn!("⚠️ 没有找到待处理的任务文件，程序结束");
            return Ok(());
        }

        let total_jobs = all_jobs.len();
        logging::log_jobs_loaded(total_jobs, self.config.max_concurrent_sessions);

        // 处理所有会话
        let stats = self.process_all_jobs(all_jobs).await?;

        // 输出最终统计
        logging::print_final_stats(
            stats.done,
            stats.aborted,
            stats.total,
            &self.config.output_log_file,
        );

        Ok(())
    }

    /// 加载任务
    async fn load_jobs(&self) -> Result<Vec<Job>> {
        info!("\n📁 正在扫描待处理的任务...");
        crate::models::load_all_toml_files(&self.config.jobs_folder).await
    }

    /// 处理所有任务
    async fn process_all_jobs(&self, all_jobs: Vec<Job>) -> Result<ProcessingStats> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_sessions));
        let total_jobs = all_jobs.len();
        let mut stats = ProcessingStats {
            total: total_jobs,
            ..Default::default()
        };

        // 分批处理
        for batch_start in (0..total_jobs).step_by(self.config.max_concurrent_sessions) {
            let batch_end = (batch_start + self.config.max_concurrent_sessions).min(total_jobs);
            let batch_jobs = &all_jobs[batch_start..batch_end];
            let batch_num = (batch_start / self.config.max_concurrent_sessions) + 1;
            let total_batches = (total_jobs + self.config.max_concurrent_sessions - 1)
                / self.config.max_concurrent_sessions;

            logging::log_batch_start(
                batch_num,
                total_batches,
                batch_start + 1,
                batch_end,
                total_jobs,
            );

            // 处理本批
            let batch_result = self
                .process_batch(batch_jobs, batch_start, semaphore.clone())
                .await?;

            stats.done += batch_result.done;
            stats.aborted += batch_result.aborted;

            logging::log_batch_complete(
                batch_num,
                batch_result.done,
                batch_result.done + batch_result.aborted,
            );
        }

        Ok(stats)
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch_jobs: &[Job],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut batch_handles = Vec::new();

        // 为本批创建并发任务
        for (idx, job) in batch_jobs.iter().enumerate() {
            let session_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;

            // HttpExecutor 可以安全地 clone：内部的 reqwest::Client 使用 Arc，
            // 克隆共享同一个连接池，不含任何会话数据
            let executor = self.executor.clone();
            let job_clone = job.clone();
            let config_clone = self.config.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let ctx = SessionCtx::new(session_index, job_clone.url.clone());
                let flow = ChainFlow::new(&config_clone, executor);
                let outcome = flow.run(&job_clone, &ctx).await;

                if let Some(reason) = outcome.reason {
                    error!("[会话 {}] ❌ 中止原因: {}", session_index, reason);
                }
                if let Some(last) = &outcome.last_result {
                    info!("[会话 {}] 最终结果: {:?}", session_index, last);
                }

                outcome.is_done()
            });
            batch_handles.push((session_index, handle));
        }

        // 等待本批所有任务完成
        let mut result = BatchResult::default();

        for (session_index, handle) in batch_handles {
            match handle.await {
                Ok(true) => {
                    result.done += 1;
                }
                Ok(false) => {
                    result.aborted += 1;
                }
                Err(e) => {
                    error!("[会话 {}] 任务执行失败: {}", session_index, e);
                    result.aborted += 1;
                }
            }
        }

        Ok(result)
    }
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    done: usize,
    aborted: usize,
    total: usize,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    done: usize,
    aborted: usize,
}
