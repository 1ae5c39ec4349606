//! 题目数据模型
//!
//! 规范化后的 `Question` 是整个流水线的核心数据单元；
//! `RawQuestion` 是外部题源返回的原始形态，只在规范化前短暂存在

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::exam_type::ExamType;
use crate::models::subject::Subject;

/// 正确选项字母
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
}

impl AnswerLetter {
    /// 从字符串解析答案字母（容忍小写和首尾空白）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Some(AnswerLetter::A),
            "B" => Some(AnswerLetter::B),
            "C" => Some(AnswerLetter::C),
            "D" => Some(AnswerLetter::D),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            AnswerLetter::A => 'A',
            AnswerLetter::B => 'B',
            AnswerLetter::C => 'C',
            AnswerLetter::D => 'D',
        }
    }
}

impl std::fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// 难度等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 题目来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// 外部题源抓取
    SourceExternal,
    /// LLM 生成
    Generated,
    /// 种子题目
    SeedFixture,
}

/// 规范化后的题目
///
/// 不变量：
/// - 四个选项均非空
/// - 答案字母在 A-D 范围内（由 `AnswerLetter` 类型保证）
/// - 来源为 Generated 时必须携带模板题目引用（generated_from）
///
/// 生命周期：创建后不再修改，也不由本子系统删除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// 唯一标识（创建时分配，落库后保持稳定）
    pub id: Uuid,
    pub subject: Subject,
    pub exam_type: ExamType,
    /// 题干
    pub stem: String,
    /// 选项 A-D
    pub options: [String; 4],
    /// 正确选项
    pub answer: AnswerLetter,
    /// 知识点（可能由启发式推断）
    pub topic: String,
    /// 难度（可能由启发式推断）
    pub difficulty: Difficulty,
    /// 解析（可选）
    pub explanation: Option<String>,
    /// 出题年份（可选）
    pub source_year: Option<i32>,
    pub provenance: Provenance,
    /// 生成题目的模板题目 ID（仅 provenance = Generated 时存在）
    pub generated_from: Option<Uuid>,
}

impl Question {
    /// 校验题目不变量
    ///
    /// # 返回
    /// 不变量全部满足时返回 `Ok(())`，否则返回第一条违反的描述
    pub fn validate(&self) -> Result<(), String> {
        if self.stem.trim().is_empty() {
            return Err("题干为空".to_string());
        }
        for (i, option) in self.options.iter().enumerate() {
            if option.trim().is_empty() {
                return Err(format!("选项 {} 为空", (b'A' + i as u8) as char));
            }
        }
        if self.provenance == Provenance::Generated && self.generated_from.is_none() {
            return Err("生成题目缺少模板引用".to_string());
        }
        Ok(())
    }

    /// 获取指定字母对应的选项文本
    pub fn option_text(&self, letter: AnswerLetter) -> &str {
        let index = match letter {
            AnswerLetter::A => 0,
            AnswerLetter::B => 1,
            AnswerLetter::C => 2,
            AnswerLetter::D => 3,
        };
        &self.options[index]
    }
}

/// 外部题源返回的原始选项表
///
/// 兼容不同来源的键名大小写
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawOptions {
    #[serde(default, alias = "A")]
    pub a: Option<String>,
    #[serde(default, alias = "B")]
    pub b: Option<String>,
    #[serde(default, alias = "C")]
    pub c: Option<String>,
    #[serde(default, alias = "D")]
    pub d: Option<String>,
}

/// 外部题源返回的原始题目记录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawQuestion {
    /// 题源自身的数字 ID（不沿用为本系统标识）
    #[serde(default)]
    pub id: Option<u64>,
    /// 题干（可能含 HTML 标签）
    #[serde(default)]
    pub question: String,
    #[serde(default, alias = "options")]
    pub option: RawOptions,
    /// 答案字母（可能是小写）
    #[serde(default)]
    pub answer: Option<String>,
    /// 详解（可选）
    #[serde(default)]
    pub solution: Option<String>,
    #[serde(default)]
    pub examtype: Option<String>,
    /// 出题年份（题源以字符串返回）
    #[serde(default)]
    pub examyear: Option<String>,
}

impl RawQuestion {
    /// 解析出题年份
    pub fn year(&self) -> Option<i32> {
        self.examyear.as_deref().and_then(|y| y.trim().parse().ok())
    }
}

/// 对外部题源的一次查询描述（不落库）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceQuery {
    pub subject: Subject,
    pub exam_type: ExamType,
    pub year: Option<i32>,
    pub count: usize,
}

/// 一次出题请求（不落库）
#[derive(Debug, Clone)]
pub struct AcquisitionRequest {
    pub subject: Subject,
    pub exam_type: ExamType,
    /// 目标题目数
    pub count: usize,
    /// 可选的难度过滤
    pub difficulty: Option<Difficulty>,
    /// 可选的知识点过滤（大小写不敏感）
    pub topics: Option<Vec<String>>,
    /// 本会话已见过的题目 ID，结果中必须排除
    pub exclude_ids: Option<HashSet<Uuid>>,
}

impl AcquisitionRequest {
    /// 创建只带必填字段的请求
    pub fn new(subject: Subject, exam_type: ExamType, count: usize) -> Self {
        Self {
            subject,
            exam_type,
            count,
            difficulty: None,
            topics: None,
            exclude_ids: None,
        }
    }

    /// 某个知识点是否通过过滤（大小写不敏感；未设置过滤则全部通过）
    pub fn topic_allowed(&self, topic: &str) -> bool {
        match &self.topics {
            Some(topics) => topics.iter().any(|t| t.eq_ignore_ascii_case(topic)),
            None => true,
        }
    }

    /// 某个题目 ID 是否被排除
    pub fn is_excluded(&self, id: &Uuid) -> bool {
        self.exclude_ids
            .as_ref()
            .map(|set| set.contains(id))
            .unwrap_or(false)
    }
}
