//! 获取结果累积器
//!
//! 封装"一次获取请求已经收了哪些题"这一信息：
//! 跨层去重（ID + 语义键）并跟踪距离目标数量还差多少

use std::collections::HashSet;

use uuid::Uuid;

use crate::models::{AcquisitionRequest, Question};
use crate::services::dedup_key;

/// 获取结果累积器
///
/// 三层（外部题源/题库/生成）的产出都经过这里，
/// 保证最终结果内部无重复、且不含请求方已见过的题目
pub struct AcquireAccumulator {
    target: usize,
    picked: Vec<Question>,
    seen_ids: HashSet<Uuid>,
    seen_keys: HashSet<String>,
}

impl AcquireAccumulator {
    /// 创建累积器，请求方的排除集预先计入"已见"
    pub fn new(request: &AcquisitionRequest) -> Self {
        let seen_ids = request.exclude_ids.clone().unwrap_or_default();
        Self {
            target: request.count,
            picked: Vec::with_capacity(request.count),
            seen_ids,
            seen_keys: HashSet::new(),
        }
    }

    /// 尝试收入一道题
    ///
    /// # 返回
    /// 收入成功返回 `true`；已满/重复/已排除时返回 `false`
    pub fn push(&mut self, question: Question) -> bool {
        if self.is_full() {
            return false;
        }
        if self.seen_ids.contains(&question.id) {
            return false;
        }
        let key = dedup_key(&question);
        if self.seen_keys.contains(&key) {
            return false;
        }

        self.seen_ids.insert(question.id);
        self.seen_keys.insert(key);
        self.picked.push(question);
        true
    }

    /// 是否已达到目标数量
    pub fn is_full(&self) -> bool {
        self.picked.len() >= self.target
    }

    /// 距离目标还差多少
    pub fn remaining(&self) -> usize {
        self.target.saturating_sub(self.picked.len())
    }

    /// 已收入的题目数
    pub fn len(&self) -> usize {
        self.picked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picked.is_empty()
    }

    /// 已收入的题目（只读视图）
    pub fn picked(&self) -> &[Question] {
        &self.picked
    }

    /// 已收入的题目 ID 集合（用于向题库查询时合并排除）
    pub fn picked_ids(&self) -> HashSet<Uuid> {
        self.picked.iter().map(|q| q.id).collect()
    }

    /// 消费累积器，取出最终结果
    pub fn into_picked(self) -> Vec<Question> {
        self.picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerLetter, Difficulty, ExamType, Provenance, Subject};

    fn question(stem: &str) -> Question {
        Question {
            id: Uuid::new_v4(),
            subject: Subject::Mathematics,
            exam_type: ExamType::Jamb,
            stem: stem.to_string(),
            options: [
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
            answer: AnswerLetter::A,
            topic: "Algebra".to_string(),
            difficulty: Difficulty::Medium,
            explanation: None,
            source_year: None,
            provenance: Provenance::SourceExternal,
            generated_from: None,
        }
    }

    #[test]
    fn test_push_stops_at_target() {
        let request = AcquisitionRequest::new(Subject::Mathematics, ExamType::Jamb, 2);
        let mut acc = AcquireAccumulator::new(&request);

        assert!(acc.push(question("q1")));
        assert!(acc.push(question("q2")));
        assert!(acc.is_full());
        assert!(!acc.push(question("q3")));
        assert_eq!(acc.into_picked().len(), 2);
    }

    #[test]
    fn test_push_rejects_semantic_duplicate() {
        let request = AcquisitionRequest::new(Subject::Mathematics, ExamType::Jamb, 5);
        let mut acc = AcquireAccumulator::new(&request);

        assert!(acc.push(question("Find x if 2x = 10")));
        // 不同 ID 但题干语义相同
        assert!(!acc.push(question("find X if 2x = 10!")));
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn test_push_rejects_excluded_id() {
        let q = question("q1");
        let mut request = AcquisitionRequest::new(Subject::Mathematics, ExamType::Jamb, 5);
        request.exclude_ids = Some([q.id].into_iter().collect());

        let mut acc = AcquireAccumulator::new(&request);
        assert!(!acc.push(q));
        assert!(acc.is_empty());
        assert_eq!(acc.remaining(), 5);
    }
}
