//! # Quiz Chain Submit
//!
//! 一个用于自动化答题链提交的 Rust 应用程序：从一个起始 URL 出发，
//! 反复执行 抓取 → 解码 → 提取 → 作答 → 提交 → 跟进，直到链条结束、
//! 截止时间到或出现致命条件。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（共享 HTTP 连接池），只暴露能力
//! - `HttpExecutor` - 唯一的 client owner，提供 get_text() / post_json() 能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个页面/题目
//! - `decoder` - base64 混淆解码能力（纯函数）
//! - `extractor` - 题目文本提取能力（纯函数）
//! - `resolver` - 提交地址定位能力（纯函数，分层正则）
//! - `OracleService` - 外部推理服务调用能力（严格单字段 JSON 契约）
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个会话"的完整状态机
//! - `SessionCtx` - 上下文封装（session_index + start_url）
//! - `ChainFlow` - 流程编排（fetch → decode → extract → answer → submit → follow）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量任务处理器，管理资源和并发
//! - `orchestrator/dispatch` - 即发即忘调度，上游协作方的接入口
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{OracleError, SessionError, SessionResult};
pub use infrastructure::HttpExecutor;
pub use models::{Job, Session, SessionOutcome, SessionStatus, SubmitReply};
pub use orchestrator::{dispatch, App};
pub use workflow::{ChainFlow, SessionCtx, SENTINEL_ANSWER};
