//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责会话的接受、调度和统计，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量会话处理器
//! - 管理应用生命周期（初始化、运行、清理）
//! - 批量加载任务（Vec<Job>）
//! - 控制并发数量（Semaphore）
//! - 管理共享 HTTP 资源（HttpExecutor）
//! - 输出全局统计信息
//!
//! ### `dispatch` - 即发即忘调度
//! - 任务接受端的入口：把会话交给独立 tokio 任务
//! - 调用方只知道"已接受"，不知道结局
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor / dispatch (处理 Vec<Job> / 单个 Job)
//!     ↓
//! workflow::ChainFlow (驱动单个 Session 的状态机)
//!     ↓
//! services (能力层：decoder / extractor / resolver / oracle)
//!     ↓
//! infrastructure (基础设施：HttpExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管批量，dispatch 管单个
//! 2. **资源隔离**：只有编排层创建 HttpExecutor
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod batch_processor;
pub mod dispatch;

// 重新导出主要类型
pub use batch_processor::App;
pub use dispatch::dispatch;
