//! 业务能力层
//!
//! 每个服务只提供一种能力，不关心调用顺序：
//! - `normalizer`: 原始记录 -> 规范化题目
//! - `question_store`: 题库的持久化与抽样
//! - `completion_service`: 以模板为参照的 LLM 生成

pub mod completion_service;
pub mod normalizer;
pub mod question_store;

pub use completion_service::{LlmCompletionService, QuestionGenerator};
pub use normalizer::{KeywordClassifier, Normalizer, StemClassifier};
pub use question_store::{dedup_key, QuestionStore};
