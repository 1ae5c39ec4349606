//! 回填调度器 - 编排层
//!
//! ## 职责
//!
//! 按 科目 x 考试类型 x 年份 的固定顺序遍历全部组合，
//! 从外部题源批量抓取历史题目并落库。
//!
//! ## 设计特点
//!
//! - **确定性遍历**：科目、考试类型、年份都按声明顺序循环，便于断点排查
//! - **单元隔离**：任何一个组合失败都只记录错误，不中断整轮回填
//! - **节流**：相邻两次外部调用之间强制等待固定间隔
//! - **可取消**：每次外部调用前检查取消标志，收到取消后立即收尾
//! - **向下委托**：抓取交给题源客户端，规范化交给 Normalizer，落库交给题库

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::clients::QuestionSource;
use crate::config::Config;
use crate::models::{ExamType, SourceQuery, Subject};
use crate::services::{Normalizer, QuestionStore};

/// 单个 科目 x 考试类型 x 年份 组合的回填结果
#[derive(Debug, Default, Clone, Serialize)]
pub struct UnitOutcome {
    /// 题源返回的原始记录数
    pub fetched: usize,
    /// 实际落库的题目数
    pub inserted: usize,
    /// 因语义重复被跳过的题目数
    pub duplicates: usize,
    /// 该组合的失败原因（成功时为 None）
    pub error: Option<String>,
}

/// 一轮回填的完整报告
///
/// `units` 按 科目 -> 考试类型 -> 年份 三级嵌套，
/// 键全部用稳定的 API 标识，方便序列化后对比两轮回填
#[derive(Debug, Default, Serialize)]
pub struct BackfillReport {
    /// 尝试过的组合数
    pub attempted: usize,
    /// 题源返回的原始记录总数
    pub fetched: usize,
    /// 落库总数
    pub inserted: usize,
    /// 语义重复总数
    pub duplicates: usize,
    /// 失败的组合数
    pub failed_units: usize,
    /// 是否因取消而提前结束
    pub cancelled: bool,
    pub units: BTreeMap<String, BTreeMap<String, BTreeMap<i32, UnitOutcome>>>,
}

impl BackfillReport {
    /// 无错误完成的组合占比（0.0 - 1.0）
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 1.0;
        }
        (self.attempted - self.failed_units) as f64 / self.attempted as f64
    }

    fn record(&mut self, subject: Subject, exam_type: ExamType, year: i32, outcome: UnitOutcome) {
        self.attempted += 1;
        self.fetched += outcome.fetched;
        self.inserted += outcome.inserted;
        self.duplicates += outcome.duplicates;
        if outcome.error.is_some() {
            self.failed_units += 1;
        }
        self.units
            .entry(subject.api_key().to_string())
            .or_default()
            .entry(exam_type.api_key().to_string())
            .or_default()
            .insert(year, outcome);
    }
}

/// 回填调度器
pub struct BackfillScheduler {
    source: Arc<dyn QuestionSource>,
    normalizer: Normalizer,
    store: Arc<QuestionStore>,
    per_year_count: usize,
    delay: Duration,
    cancel: Arc<AtomicBool>,
}

impl BackfillScheduler {
    /// 创建新的回填调度器
    ///
    /// # 参数
    /// - `cancel`: 外部取消标志（如 Ctrl+C 处理器置位）
    pub fn new(
        config: &Config,
        source: Arc<dyn QuestionSource>,
        store: Arc<QuestionStore>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            normalizer: Normalizer::new(),
            store,
            per_year_count: config.backfill_per_year_count,
            delay: Duration::from_millis(config.backfill_delay_ms),
            cancel,
        }
    }

    /// 执行一轮回填
    ///
    /// # 参数
    /// - `start_year` / `end_year`: 年份范围（闭区间）
    ///
    /// # 返回
    /// 完整报告；单个组合的失败不会导致整轮失败
    pub async fn run(&self, start_year: i32, end_year: i32) -> BackfillReport {
        let mut report = BackfillReport::default();
        if start_year > end_year {
            warn!("⚠️ 年份范围为空: {} > {}", start_year, end_year);
            return report;
        }

        let total_units =
            Subject::all().len() * ExamType::all().len() * (end_year - start_year + 1) as usize;
        log_backfill_start(total_units, start_year, end_year);

        'outer: for &subject in Subject::all() {
            for &exam_type in ExamType::all() {
                for year in start_year..=end_year {
                    if self.cancel.load(Ordering::Relaxed) {
                        warn!("🛑 收到取消信号, 回填提前结束");
                        report.cancelled = true;
                        break 'outer;
                    }

                    let outcome = self.backfill_unit(subject, exam_type, year).await;
                    log_unit(subject, exam_type, year, &outcome);
                    report.record(subject, exam_type, year, outcome);

                    // 固定间隔节流, 对题源保持礼貌
                    tokio::time::sleep(self.delay).await;
                }
            }
        }

        print_backfill_summary(&report);
        report
    }

    /// 回填单个 科目 x 考试类型 x 年份 组合
    async fn backfill_unit(
        &self,
        subject: Subject,
        exam_type: ExamType,
        year: i32,
    ) -> UnitOutcome {
        let query = SourceQuery {
            subject,
            exam_type,
            year: Some(year),
            count: self.per_year_count,
        };

        let raws = match self.source.fetch(&query).await {
            Ok(raws) => raws,
            Err(e) => {
                return UnitOutcome {
                    error: Some(e.to_string()),
                    ..Default::default()
                };
            }
        };

        let fetched = raws.len();
        let mut questions = Vec::with_capacity(fetched);
        for raw in &raws {
            match self.normalizer.normalize(raw, subject, exam_type) {
                Ok(q) => questions.push(q),
                Err(e) => {
                    warn!("⚠️ 跳过非法记录: {}", e);
                }
            }
        }

        let (inserted, duplicates) = self.store.insert_many(questions).await;
        UnitOutcome {
            fetched,
            inserted,
            duplicates,
            error: None,
        }
    }
}

// ========== 日志辅助函数 ==========

fn log_backfill_start(total_units: usize, start_year: i32, end_year: i32) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始回填: {} 个组合", total_units);
    info!("📅 年份范围: {} - {}", start_year, end_year);
    info!("{}", "=".repeat(60));
}

fn log_unit(subject: Subject, exam_type: ExamType, year: i32, outcome: &UnitOutcome) {
    match &outcome.error {
        Some(e) => {
            warn!(
                "❌ [{} / {} / {}] 失败: {}",
                subject.name(),
                exam_type.name(),
                year,
                e
            );
        }
        None => {
            info!(
                "✓ [{} / {} / {}] 抓取 {} 条, 落库 {} 条, 重复 {} 条",
                subject.name(),
                exam_type.name(),
                year,
                outcome.fetched,
                outcome.inserted,
                outcome.duplicates
            );
        }
    }
}

fn print_backfill_summary(report: &BackfillReport) {
    info!("\n{}", "=".repeat(60));
    info!("📊 回填完成统计");
    info!("{}", "=".repeat(60));
    info!("  尝试组合: {}", report.attempted);
    info!("  抓取记录: {}", report.fetched);
    info!("  落库题目: {}", report.inserted);
    info!("  语义重复: {}", report.duplicates);
    info!("  失败组合: {}", report.failed_units);
    info!("  成功率:   {:.1}%", report.success_rate() * 100.0);
    if report.cancelled {
        info!("  🛑 本轮因取消而提前结束");
    }
    info!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::error::SourceError;
    use crate::models::{RawOptions, RawQuestion};

    fn raw(stem: &str, year: i32) -> RawQuestion {
        RawQuestion {
            id: None,
            question: stem.to_string(),
            option: RawOptions {
                a: Some("opt a".to_string()),
                b: Some("opt b".to_string()),
                c: Some("opt c".to_string()),
                d: Some("opt d".to_string()),
            },
            answer: Some("a".to_string()),
            solution: None,
            examtype: None,
            examyear: Some(year.to_string()),
        }
    }

    /// 2021 年固定失败, 其余年份每次返回一条独一无二的记录
    struct FlakySource;

    #[async_trait]
    impl QuestionSource for FlakySource {
        async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawQuestion>, SourceError> {
            let year = query.year.expect("回填查询必须带年份");
            if year == 2021 {
                return Err(SourceError::Unavailable {
                    detail: "连接被拒绝".to_string(),
                    source: None,
                });
            }
            Ok(vec![raw(
                &format!(
                    "unit {} {} {}",
                    query.subject.api_key(),
                    query.exam_type.api_key(),
                    year
                ),
                year,
            )])
        }
    }

    struct DeadSource;

    #[async_trait]
    impl QuestionSource for DeadSource {
        async fn fetch(&self, _query: &SourceQuery) -> Result<Vec<RawQuestion>, SourceError> {
            Err(SourceError::Unavailable {
                detail: "连接被拒绝".to_string(),
                source: None,
            })
        }
    }

    fn config_without_delay() -> Config {
        Config {
            backfill_delay_ms: 0,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_run_covers_every_unit_even_when_all_fail() {
        let store = Arc::new(QuestionStore::new("unused.json"));
        let scheduler = BackfillScheduler::new(
            &config_without_delay(),
            Arc::new(DeadSource),
            store.clone(),
            Arc::new(AtomicBool::new(false)),
        );

        let report = scheduler.run(2020, 2022).await;
        let expected = Subject::all().len() * ExamType::all().len() * 3;
        assert_eq!(report.attempted, expected);
        assert_eq!(report.failed_units, expected);
        assert_eq!(report.inserted, 0);
        assert!(!report.cancelled);
        assert_eq!(report.success_rate(), 0.0);
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_year_does_not_stop_later_years() {
        let store = Arc::new(QuestionStore::new("unused.json"));
        let scheduler = BackfillScheduler::new(
            &config_without_delay(),
            Arc::new(FlakySource),
            store.clone(),
            Arc::new(AtomicBool::new(false)),
        );

        let report = scheduler.run(2020, 2022).await;
        let units = Subject::all().len() * ExamType::all().len();
        assert_eq!(report.attempted, units * 3);
        // 每个组合的 2021 都失败, 2020/2022 正常
        assert_eq!(report.failed_units, units);
        assert_eq!(report.inserted, units * 2);

        let maths = &report.units["mathematics"]["utme"];
        assert!(maths[&2021].error.is_some());
        assert_eq!(maths[&2022].inserted, 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_before_next_call() {
        let store = Arc::new(QuestionStore::new("unused.json"));
        let cancel = Arc::new(AtomicBool::new(true));
        let scheduler = BackfillScheduler::new(
            &config_without_delay(),
            Arc::new(FlakySource),
            store,
            cancel,
        );

        let report = scheduler.run(2015, 2023).await;
        assert!(report.cancelled);
        assert_eq!(report.attempted, 0);
    }

    #[tokio::test]
    async fn test_empty_year_range() {
        let store = Arc::new(QuestionStore::new("unused.json"));
        let scheduler = BackfillScheduler::new(
            &config_without_delay(),
            Arc::new(FlakySource),
            store,
            Arc::new(AtomicBool::new(false)),
        );

        let report = scheduler.run(2023, 2020).await;
        assert_eq!(report.attempted, 0);
        assert_eq!(report.success_rate(), 1.0);
    }
}
