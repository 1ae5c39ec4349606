//! # Question Pipeline
//!
//! 尼日利亚标准化考试练习题的获取与投递流水线
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 进程内共享的基础能力
//! - `RateLimiter` - 令牌桶限速器，约束对外部题源的调用频率
//!
//! ### ② 业务能力层（Services + Clients）
//! - `clients/` - 外部题源客户端（`QuestionSource` 抽象 + ALOC 实现）
//! - `services/` - 描述"我能做什么"，只处理单个能力
//! - `Normalizer` - 原始记录 -> 规范化题目
//! - `QuestionStore` - 题库的持久化、去重与抽样
//! - `LlmCompletionService` - 以模板为参照的题目生成能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次获取请求"的完整处理流程
//! - `AcquireAccumulator` - 跨层去重的结果累积器
//! - `AcquisitionFlow` - 三层获取编排（题源 → 题库 → 生成）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/backfill` - 回填调度器，遍历 科目 x 考试类型 x 年份
//! - `orchestrator/coverage` - 覆盖度探测器，逐年摸清题源存货
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{AlocClient, QuestionSource};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::RateLimiter;
pub use models::{AcquisitionRequest, ExamType, Question, Subject};
pub use orchestrator::{BackfillReport, BackfillScheduler, CoverageAnalyzer, CoverageReport};
pub use services::{LlmCompletionService, Normalizer, QuestionGenerator, QuestionStore};
pub use workflow::AcquisitionFlow;
