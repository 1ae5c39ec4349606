//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量调度和统计汇总，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `backfill` - 回填调度器
//! - 按 科目 x 考试类型 x 年份 确定性遍历全部组合
//! - 单元失败只记录不中断
//! - 固定间隔节流、响应取消信号
//! - 输出嵌套结构的回填报告
//!
//! ### `coverage` - 覆盖度探测器
//! - 逐年最小代价探测题源存货
//! - 任何错误都按"无覆盖"处理, 永不失败
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator (backfill / coverage, 处理组合矩阵)
//!     ↓
//! workflow::AcquisitionFlow (处理单次获取请求)
//!     ↓
//! services (能力层: normalizer / store / completion)
//!     ↓
//! clients + infrastructure (题源客户端 / 限流器)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：backfill 管批量落库，coverage 管探测
//! 2. **向下依赖**：编排层 → workflow → services → clients
//! 3. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod backfill;
pub mod coverage;

// 重新导出主要类型
pub use backfill::{BackfillReport, BackfillScheduler, UnitOutcome};
pub use coverage::{CoverageAnalyzer, CoverageReport};
