//! 覆盖度探测器 - 编排层
//!
//! 对单个 科目 x 考试类型 组合逐年发起最小代价的探测请求
//! （每年只要 1 条记录），回答"题源在哪些年份有存货"。
//!
//! 探测永不失败：任何错误（不可用/限流/格式异常）都按
//! "该年份无覆盖"处理，调用方拿到的永远是一张完整的年份表。

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::clients::QuestionSource;
use crate::models::{ExamType, SourceQuery, Subject};

/// 覆盖度探测报告
#[derive(Debug, Serialize)]
pub struct CoverageReport {
    pub subject: Subject,
    pub exam_type: ExamType,
    /// 年份 -> 题源是否有存货（BTreeMap 保证按年份有序输出）
    pub years: BTreeMap<i32, bool>,
}

impl CoverageReport {
    /// 有存货的年份列表（升序）
    pub fn available_years(&self) -> Vec<i32> {
        self.years
            .iter()
            .filter(|(_, &covered)| covered)
            .map(|(&year, _)| year)
            .collect()
    }

    /// 覆盖率（0.0 - 1.0），空年份范围算作全覆盖
    pub fn coverage_percent(&self) -> f64 {
        if self.years.is_empty() {
            return 1.0;
        }
        let covered = self.years.values().filter(|&&c| c).count();
        covered as f64 / self.years.len() as f64
    }
}

/// 覆盖度探测器
pub struct CoverageAnalyzer {
    source: Arc<dyn QuestionSource>,
}

impl CoverageAnalyzer {
    pub fn new(source: Arc<dyn QuestionSource>) -> Self {
        Self { source }
    }

    /// 逐年探测题源覆盖度
    ///
    /// # 参数
    /// - `start_year` / `end_year`: 年份范围（闭区间）
    ///
    /// # 返回
    /// 范围内每个年份都有一项的完整报告，探测本身不会返回错误
    pub async fn analyze(
        &self,
        subject: Subject,
        exam_type: ExamType,
        start_year: i32,
        end_year: i32,
    ) -> CoverageReport {
        info!(
            "🔍 探测覆盖度: {} / {} ({} - {})",
            subject.name(),
            exam_type.name(),
            start_year,
            end_year
        );

        let mut years = BTreeMap::new();
        for year in start_year..=end_year {
            let covered = self.probe_year(subject, exam_type, year).await;
            years.insert(year, covered);
        }

        let report = CoverageReport {
            subject,
            exam_type,
            years,
        };
        info!(
            "✓ 覆盖度探测完成: {}/{} 个年份有存货 ({:.0}%)",
            report.available_years().len(),
            report.years.len(),
            report.coverage_percent() * 100.0
        );
        report
    }

    /// 探测单个年份，任何错误都按"无覆盖"处理
    async fn probe_year(&self, subject: Subject, exam_type: ExamType, year: i32) -> bool {
        let query = SourceQuery {
            subject,
            exam_type,
            year: Some(year),
            count: 1,
        };

        match self.source.fetch(&query).await {
            Ok(raws) => !raws.is_empty(),
            Err(e) => {
                warn!("⚠️ 探测 {} 年失败, 记为无覆盖: {}", year, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::error::SourceError;
    use crate::models::{RawOptions, RawQuestion};

    /// 偶数年份有存货, 2021 年报错, 其余奇数年份返回空
    struct PatchySource;

    #[async_trait]
    impl QuestionSource for PatchySource {
        async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawQuestion>, SourceError> {
            let year = query.year.expect("探测查询必须带年份");
            if year == 2021 {
                return Err(SourceError::Malformed {
                    detail: "意外的响应结构".to_string(),
                });
            }
            if year % 2 == 0 {
                Ok(vec![RawQuestion {
                    question: format!("probe {}", year),
                    option: RawOptions {
                        a: Some("a".to_string()),
                        b: Some("b".to_string()),
                        c: Some("c".to_string()),
                        d: Some("d".to_string()),
                    },
                    answer: Some("a".to_string()),
                    examyear: Some(year.to_string()),
                    ..Default::default()
                }])
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[tokio::test]
    async fn test_analyze_marks_errors_as_uncovered() {
        let analyzer = CoverageAnalyzer::new(Arc::new(PatchySource));
        let report = analyzer
            .analyze(Subject::Physics, ExamType::Jamb, 2019, 2023)
            .await;

        assert_eq!(report.years.len(), 5);
        assert_eq!(report.available_years(), vec![2020, 2022]);
        assert!(!report.years[&2021]);
        assert!((report.coverage_percent() - 0.4).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_analyze_single_year() {
        let analyzer = CoverageAnalyzer::new(Arc::new(PatchySource));
        let report = analyzer
            .analyze(Subject::Physics, ExamType::Jamb, 2020, 2020)
            .await;

        assert_eq!(report.years.len(), 1);
        assert!(report.years[&2020]);
        assert_eq!(report.coverage_percent(), 1.0);
    }
}
