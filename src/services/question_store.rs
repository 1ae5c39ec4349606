//! 题库存储服务 - 业务能力层
//!
//! 内存索引 + JSON 快照文件的持久化题库：
//! - 以语义去重键防止重复落库（科目 + 考试类型 + 规范化题干）
//! - 支持按请求条件过滤后随机抽样
//! - 快照在启动时加载、退出前写回
//!
//! 并发模型：内部用读写锁保护，读多写少；
//! 快照写回是整库序列化，题量在万级以内时足够快。

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{AcquisitionRequest, ExamType, Question, Subject};
use crate::utils::normalize_for_dedup;

/// 计算题目的语义去重键
///
/// 同一科目、同一考试类型下题干"近似相同"的题目会得到相同的键
pub fn dedup_key(question: &Question) -> String {
    format!(
        "{}|{}|{}",
        question.subject.api_key(),
        question.exam_type.api_key(),
        normalize_for_dedup(&question.stem)
    )
}

#[derive(Debug, Default)]
struct StoreInner {
    questions: HashMap<Uuid, Question>,
    dedup_keys: HashSet<String>,
}

/// 题库存储服务
#[derive(Debug)]
pub struct QuestionStore {
    inner: RwLock<StoreInner>,
    snapshot_path: PathBuf,
}

impl QuestionStore {
    /// 创建空题库
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            snapshot_path: snapshot_path.into(),
        }
    }

    /// 从快照文件加载题库
    ///
    /// 快照文件不存在时返回空题库（首次运行的正常路径）；
    /// 文件存在但无法解析时返回错误，绝不静默丢弃已有数据
    pub async fn load(snapshot_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let snapshot_path = snapshot_path.into();
        let store = Self::new(snapshot_path.clone());

        if !Path::new(&snapshot_path).exists() {
            info!("📦 未找到题库快照, 从空题库启动: {}", snapshot_path.display());
            return Ok(store);
        }

        let content = tokio::fs::read_to_string(&snapshot_path)
            .await
            .map_err(|e| StoreError::SnapshotParseFailed {
                path: snapshot_path.display().to_string(),
                source: Box::new(e),
            })?;

        let questions: Vec<Question> =
            serde_json::from_str(&content).map_err(|e| StoreError::SnapshotParseFailed {
                path: snapshot_path.display().to_string(),
                source: Box::new(e),
            })?;

        let total = questions.len();
        let mut skipped = 0;
        {
            let mut inner = store.inner.write().await;
            for question in questions {
                let key = dedup_key(&question);
                if !inner.dedup_keys.insert(key) {
                    skipped += 1;
                    continue;
                }
                inner.questions.insert(question.id, question);
            }
        }

        if skipped > 0 {
            warn!("⚠️ 快照中有 {} 条重复题目被跳过", skipped);
        }
        info!("📦 题库快照加载完成: {} 条题目", total - skipped);
        Ok(store)
    }

    /// 插入一条题目
    ///
    /// # 返回
    /// 成功时返回题目 ID；语义重复时返回 `StoreError::Duplicate`
    pub async fn insert(&self, question: Question) -> Result<Uuid, StoreError> {
        let key = dedup_key(&question);
        let mut inner = self.inner.write().await;
        if inner.dedup_keys.contains(&key) {
            return Err(StoreError::Duplicate { dedup_key: key });
        }
        let id = question.id;
        inner.dedup_keys.insert(key);
        inner.questions.insert(id, question);
        Ok(id)
    }

    /// 批量插入，返回 (成功条数, 重复条数)
    pub async fn insert_many(&self, questions: Vec<Question>) -> (usize, usize) {
        let mut inserted = 0;
        let mut duplicates = 0;
        for question in questions {
            match self.insert(question).await {
                Ok(_) => inserted += 1,
                Err(e) if e.is_duplicate() => duplicates += 1,
                Err(e) => {
                    warn!("⚠️ 题目插入失败: {}", e);
                }
            }
        }
        (inserted, duplicates)
    }

    /// 按 ID 查询题目
    pub async fn get(&self, id: &Uuid) -> Option<Question> {
        self.inner.read().await.questions.get(id).cloned()
    }

    /// 题库总题数
    pub async fn count(&self) -> usize {
        self.inner.read().await.questions.len()
    }

    /// 某科目 + 考试类型下的题数
    pub async fn count_matching(&self, subject: Subject, exam_type: ExamType) -> usize {
        self.inner
            .read()
            .await
            .questions
            .values()
            .filter(|q| q.subject == subject && q.exam_type == exam_type)
            .count()
    }

    /// 按请求条件过滤后随机抽样
    ///
    /// 先收集全部满足条件的候选（科目/考试类型精确匹配，
    /// 难度/知识点/排除集按请求过滤），再整体乱序、截取目标数量；
    /// 候选不足时返回全部候选，不报错
    pub async fn sample_filtered(&self, request: &AcquisitionRequest) -> Vec<Question> {
        let inner = self.inner.read().await;
        let mut pool: Vec<Question> = inner
            .questions
            .values()
            .filter(|q| q.subject == request.subject && q.exam_type == request.exam_type)
            .filter(|q| {
                request
                    .difficulty
                    .map(|d| q.difficulty == d)
                    .unwrap_or(true)
            })
            .filter(|q| request.topic_allowed(&q.topic))
            .filter(|q| !request.is_excluded(&q.id))
            .cloned()
            .collect();
        drop(inner);

        pool.shuffle(&mut rand::rng());
        pool.truncate(request.count);
        pool
    }

    /// 无额外过滤条件的随机抽样
    pub async fn sample_random(
        &self,
        subject: Subject,
        exam_type: ExamType,
        count: usize,
    ) -> Vec<Question> {
        let request = AcquisitionRequest::new(subject, exam_type, count);
        self.sample_filtered(&request).await
    }

    /// 随机选取一条模板题目（用于生成层的风格参照）
    ///
    /// 模板只要求科目和考试类型匹配，不套用难度/知识点过滤——
    /// 有参照总比没有强
    pub async fn sample_template(
        &self,
        subject: Subject,
        exam_type: ExamType,
    ) -> Option<Question> {
        let inner = self.inner.read().await;
        let pool: Vec<&Question> = inner
            .questions
            .values()
            .filter(|q| q.subject == subject && q.exam_type == exam_type)
            .collect();
        use rand::seq::IndexedRandom;
        pool.choose(&mut rand::rng()).map(|q| (*q).clone())
    }

    /// 把题库写回快照文件
    pub async fn flush(&self) -> Result<(), StoreError> {
        let questions: Vec<Question> = {
            let inner = self.inner.read().await;
            inner.questions.values().cloned().collect()
        };

        let json =
            serde_json::to_string_pretty(&questions).map_err(|e| StoreError::WriteFailed {
                path: self.snapshot_path.display().to_string(),
                source: Box::new(e),
            })?;

        tokio::fs::write(&self.snapshot_path, json)
            .await
            .map_err(|e| StoreError::WriteFailed {
                path: self.snapshot_path.display().to_string(),
                source: Box::new(e),
            })?;

        info!(
            "💾 题库快照写入完成: {} 条题目 -> {}",
            questions.len(),
            self.snapshot_path.display()
        );
        Ok(())
    }
}
