//! 题目获取流程 - 流程层
//!
//! 核心职责：定义"一次获取请求"的完整处理流程
//!
//! 流程顺序：
//! 1. 外部题源抓取（先不带年份，再按近三年逐年补抓）
//! 2. 本地题库抽样（兜住外部题源不可用的情况）
//! 3. LLM 生成（最后手段，受调用次数上限约束）
//!
//! 各层内部的单次失败都被捕获并记录，只有两种终态错误会传播：
//! 需要生成但找不到模板，以及三层全部耗尽仍一无所获

use std::sync::Arc;

use chrono::{Datelike, Utc};
use futures::future::join_all;
use tracing::{info, warn};

use crate::clients::QuestionSource;
use crate::config::Config;
use crate::error::{AcquisitionError, SourceError};
use crate::models::{AcquisitionRequest, Question, SourceQuery};
use crate::services::{Normalizer, QuestionGenerator, QuestionStore};
use crate::utils::truncate_text;
use crate::workflow::accumulator::AcquireAccumulator;

/// 题目获取流程
///
/// - 编排完整的三层获取流程
/// - 决定何时抓取、何时抽样、何时生成
/// - 只依赖业务能力（services）和题源接口
pub struct AcquisitionFlow {
    source: Arc<dyn QuestionSource>,
    normalizer: Normalizer,
    store: Arc<QuestionStore>,
    generator: Arc<dyn QuestionGenerator>,
    generation_cap: usize,
    verbose_logging: bool,
}

impl AcquisitionFlow {
    /// 创建新的获取流程
    pub fn new(
        config: &Config,
        source: Arc<dyn QuestionSource>,
        store: Arc<QuestionStore>,
        generator: Arc<dyn QuestionGenerator>,
    ) -> Self {
        Self {
            source,
            normalizer: Normalizer::new(),
            store,
            generator,
            generation_cap: config.generation_cap,
            verbose_logging: config.verbose_logging,
        }
    }

    /// 执行一次获取请求
    ///
    /// # 返回
    /// 最多 `request.count` 道互不重复的题目；三层耗尽后数量可能不足，
    /// 但只要收到至少一道题就按成功返回
    pub async fn run(
        &self,
        request: &AcquisitionRequest,
    ) -> Result<Vec<Question>, AcquisitionError> {
        if request.count == 0 {
            return Ok(Vec::new());
        }

        info!(
            "📋 开始获取: {} / {} x{}",
            request.subject.name(),
            request.exam_type.name(),
            request.count
        );

        let mut acc = AcquireAccumulator::new(request);

        // ========== 流程 1: 外部题源抓取 ==========
        self.acquire_from_source(request, &mut acc).await;

        // ========== 流程 2: 本地题库抽样 ==========
        if !acc.is_full() {
            self.acquire_from_store(request, &mut acc).await;
        }

        // ========== 流程 3: LLM 生成 ==========
        if !acc.is_full() {
            self.acquire_from_generator(request, &mut acc).await?;
        }

        if acc.is_empty() {
            warn!(
                "❌ 三层全部耗尽, 没有收到任何题目: {} / {}",
                request.subject.name(),
                request.exam_type.name()
            );
            return Err(AcquisitionError::NoQuestionsAvailable {
                subject: request.subject.name().to_string(),
                exam_type: request.exam_type.name().to_string(),
            });
        }

        if !acc.is_full() {
            warn!(
                "⚠️ 题目数量不足: 目标 {}, 实际 {}",
                request.count,
                acc.len()
            );
        }
        info!("✓ 获取完成: {} 道题目", acc.len());
        Ok(acc.into_picked())
    }

    /// 流程 1: 外部题源抓取
    ///
    /// 先按"不限年份"抓一轮，不够再按近三年逐年补抓；
    /// 抓到的题目无论是否通过请求过滤都尝试落库，让回头客受益
    async fn acquire_from_source(&self, request: &AcquisitionRequest, acc: &mut AcquireAccumulator) {
        info!("🔍 流程 1: 尝试外部题源抓取...");

        let current_year = Utc::now().year();
        let year_plan = [
            None,
            Some(current_year),
            Some(current_year - 1),
            Some(current_year - 2),
        ];

        for year in year_plan {
            if acc.is_full() {
                break;
            }

            let query = SourceQuery {
                subject: request.subject,
                exam_type: request.exam_type,
                year,
                count: acc.remaining(),
            };

            let raws = match self.source.fetch(&query).await {
                Ok(raws) => raws,
                Err(e @ SourceError::Unavailable { .. }) => {
                    warn!("⚠️ 外部题源不可用, 降级到本地题库: {}", e);
                    return;
                }
                Err(e @ SourceError::RateLimited { .. }) => {
                    warn!("⚠️ 外部题源限流, 本轮不再抓取: {}", e);
                    return;
                }
                Err(e @ SourceError::Malformed { .. }) => {
                    warn!("⚠️ 外部题源响应异常, 按空结果处理: {}", e);
                    continue;
                }
            };

            if raws.is_empty() {
                continue;
            }

            let mut accepted = 0;
            for raw in &raws {
                let question = match self
                    .normalizer
                    .normalize(raw, request.subject, request.exam_type)
                {
                    Ok(q) => q,
                    Err(e) => {
                        if self.verbose_logging {
                            warn!(
                                "⚠️ 跳过非法记录: {} ({})",
                                e,
                                truncate_text(&raw.question, 60)
                            );
                        }
                        continue;
                    }
                };

                // 落库不受请求过滤影响
                let candidate = question.clone();
                if let Err(e) = self.store.insert(question).await {
                    if !e.is_duplicate() {
                        warn!("⚠️ 题目落库失败: {}", e);
                    }
                }

                if self.matches_filters(request, &candidate) && acc.push(candidate) {
                    accepted += 1;
                }
            }

            info!(
                "✓ 外部题源返回 {} 条, 收入 {} 道 (年份: {:?})",
                raws.len(),
                accepted,
                year
            );
        }
    }

    /// 流程 2: 本地题库抽样
    async fn acquire_from_store(&self, request: &AcquisitionRequest, acc: &mut AcquireAccumulator) {
        info!("🔍 流程 2: 尝试本地题库抽样...");

        // 已收入的题目也要从题库结果中排除
        let mut store_request = request.clone();
        store_request.count = acc.remaining();
        let mut exclude = request.exclude_ids.clone().unwrap_or_default();
        exclude.extend(acc.picked_ids());
        store_request.exclude_ids = Some(exclude);

        let sampled = self.store.sample_filtered(&store_request).await;
        let mut accepted = 0;
        for question in sampled {
            if acc.push(question) {
                accepted += 1;
            }
        }
        info!("✓ 题库抽样收入 {} 道题目", accepted);
    }

    /// 流程 3: LLM 生成
    ///
    /// 并发调用生成服务，单次请求最多 `generation_cap` 次；
    /// 生成成功的题目尽力落库，失败只记录不传播
    async fn acquire_from_generator(
        &self,
        request: &AcquisitionRequest,
        acc: &mut AcquireAccumulator,
    ) -> Result<(), AcquisitionError> {
        info!("🔍 流程 3: 尝试 LLM 生成...");

        // 模板优先用本次已收入的题目，其次从题库里找
        let template = match acc.picked().first().cloned() {
            Some(q) => Some(q),
            None => {
                self.store
                    .sample_template(request.subject, request.exam_type)
                    .await
            }
        };

        let Some(template) = template else {
            if acc.is_empty() {
                warn!(
                    "❌ 需要生成但没有任何模板题目: {} / {}",
                    request.subject.name(),
                    request.exam_type.name()
                );
                return Err(AcquisitionError::NoTemplateAvailable {
                    subject: request.subject.name().to_string(),
                    exam_type: request.exam_type.name().to_string(),
                });
            }
            // 已有部分题目时接受数量不足
            return Ok(());
        };

        let batch = acc.remaining().min(self.generation_cap);
        info!("📦 并发生成 {} 道题目 (模型调用上限: {})", batch, self.generation_cap);

        let calls = (0..batch).map(|_| self.generator.generate(&template));
        let results = join_all(calls).await;

        let mut accepted = 0;
        for result in results {
            match result {
                Ok(question) => {
                    let candidate = question.clone();
                    if let Err(e) = self.store.insert(question).await {
                        if !e.is_duplicate() {
                            warn!("⚠️ 生成题目落库失败: {}", e);
                        }
                    }
                    if self.matches_filters(request, &candidate) && acc.push(candidate) {
                        accepted += 1;
                    }
                }
                Err(e) => {
                    warn!("⚠️ 单次生成失败: {}", e);
                }
            }
        }

        info!("✓ 生成层收入 {} 道题目", accepted);
        Ok(())
    }

    /// 请求方的难度/知识点/排除过滤
    fn matches_filters(&self, request: &AcquisitionRequest, question: &Question) -> bool {
        if let Some(d) = request.difficulty {
            if question.difficulty != d {
                return false;
            }
        }
        if !request.topic_allowed(&question.topic) {
            return false;
        }
        !request.is_excluded(&question.id)
    }
}
