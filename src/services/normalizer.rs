//! 题目规范化服务 - 业务能力层
//!
//! 把外部题源的原始记录转换为规范 `Question`：
//! 清洗 HTML、映射选项到 A-D、推断缺失的知识点和难度。
//!
//! 知识点/难度推断是关键词启发式，只保证"尽力而为"，不保证准确；
//! 分类器做成可替换的策略接口，将来可以换成学习型分类器而不动获取流程。
//!
//! 规范化对非法记录"响亮地失败"：缺选项、题干为空、答案不在 A-D
//! 的记录一律拒绝，调用方跳过该条，绝不落库半成品。

use phf::{phf_map, phf_set};
use uuid::Uuid;

use crate::error::NormalizeError;
use crate::models::{
    AnswerLetter, Difficulty, ExamType, Provenance, Question, RawQuestion, Subject,
};
use crate::utils::strip_html;

/// 题干分类策略
///
/// 职责：
/// - 从题干文本推断知识点和难度
/// - 只处理单个题干，不关心流程
pub trait StemClassifier: Send + Sync {
    /// 推断知识点，无法判断时返回 None
    fn infer_topic(&self, subject: Subject, stem: &str) -> Option<&'static str>;

    /// 推断难度，无法判断时返回 None
    fn infer_difficulty(&self, stem: &str) -> Option<Difficulty>;
}

// ========== 关键词表 ==========

static MATHEMATICS_TOPICS: phf::Map<&'static str, &'static str> = phf_map! {
    "logarithm" => "Logarithms",
    "equation" => "Algebra",
    "simplify" => "Algebra",
    "polynomial" => "Algebra",
    "triangle" => "Geometry",
    "circle" => "Geometry",
    "angle" => "Geometry",
    "sine" => "Trigonometry",
    "cosine" => "Trigonometry",
    "tangent" => "Trigonometry",
    "probability" => "Probability",
    "mean" => "Statistics",
    "median" => "Statistics",
    "mode" => "Statistics",
    "matrix" => "Matrices",
    "progression" => "Sequences and Series",
    "sequence" => "Sequences and Series",
    "integrate" => "Calculus",
    "differentiate" => "Calculus",
    "gradient" => "Coordinate Geometry",
};

static ENGLISH_TOPICS: phf::Map<&'static str, &'static str> = phf_map! {
    "synonym" => "Synonyms",
    "nearest in meaning" => "Synonyms",
    "antonym" => "Antonyms",
    "opposite in meaning" => "Antonyms",
    "passage" => "Comprehension",
    "stress" => "Oral English",
    "vowel" => "Oral English",
    "consonant" => "Oral English",
    "lexis" => "Lexis and Structure",
};

static PHYSICS_TOPICS: phf::Map<&'static str, &'static str> = phf_map! {
    "velocity" => "Motion",
    "acceleration" => "Motion",
    "projectile" => "Motion",
    "force" => "Forces",
    "newton" => "Forces",
    "current" => "Electricity",
    "voltage" => "Electricity",
    "resistor" => "Electricity",
    "resistance" => "Electricity",
    "lens" => "Optics",
    "mirror" => "Optics",
    "refraction" => "Optics",
    "temperature" => "Heat",
    "thermometer" => "Heat",
    "wave" => "Waves",
    "frequency" => "Waves",
    "radioactive" => "Modern Physics",
};

static CHEMISTRY_TOPICS: phf::Map<&'static str, &'static str> = phf_map! {
    "acid" => "Acids and Bases",
    "base" => "Acids and Bases",
    "alkali" => "Acids and Bases",
    "electrolysis" => "Electrolysis",
    "alkane" => "Organic Chemistry",
    "alkene" => "Organic Chemistry",
    "hydrocarbon" => "Organic Chemistry",
    "periodic" => "Periodic Table",
    "mole" => "Stoichiometry",
    "molar" => "Stoichiometry",
    "bond" => "Chemical Bonding",
    "oxidation" => "Redox Reactions",
    "reduction" => "Redox Reactions",
};

static BIOLOGY_TOPICS: phf::Map<&'static str, &'static str> = phf_map! {
    "cell" => "Cell Biology",
    "photosynthesis" => "Plant Physiology",
    "gene" => "Genetics",
    "chromosome" => "Genetics",
    "heredity" => "Genetics",
    "ecosystem" => "Ecology",
    "habitat" => "Ecology",
    "enzyme" => "Nutrition",
    "digestion" => "Nutrition",
    "blood" => "Circulatory System",
    "heart" => "Circulatory System",
};

/// 偏计算/推导的动词 → 较难
static HARD_VERBS: phf::Set<&'static str> = phf_set! {
    "calculate",
    "derive",
    "analyze",
    "analyse",
    "evaluate",
    "prove",
    "integrate",
    "differentiate",
    "determine",
};

/// 偏记忆/识别的动词 → 较易
static EASY_VERBS: phf::Set<&'static str> = phf_set! {
    "identify",
    "name",
    "state",
    "list",
    "define",
    "choose",
    "select",
};

/// 关键词分类器（默认实现）
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    fn topic_table(subject: Subject) -> &'static phf::Map<&'static str, &'static str> {
        match subject {
            Subject::Mathematics => &MATHEMATICS_TOPICS,
            Subject::English => &ENGLISH_TOPICS,
            Subject::Physics => &PHYSICS_TOPICS,
            Subject::Chemistry => &CHEMISTRY_TOPICS,
            Subject::Biology => &BIOLOGY_TOPICS,
        }
    }
}

impl StemClassifier for KeywordClassifier {
    fn infer_topic(&self, subject: Subject, stem: &str) -> Option<&'static str> {
        let stem_lower = stem.to_lowercase();
        Self::topic_table(subject)
            .entries()
            .find(|(keyword, _)| stem_lower.contains(*keyword))
            .map(|(_, topic)| *topic)
    }

    fn infer_difficulty(&self, stem: &str) -> Option<Difficulty> {
        let stem_lower = stem.to_lowercase();
        for word in stem_lower.split(|c: char| !c.is_alphanumeric()) {
            if HARD_VERBS.contains(word) {
                return Some(Difficulty::Hard);
            }
        }
        for word in stem_lower.split(|c: char| !c.is_alphanumeric()) {
            if EASY_VERBS.contains(word) {
                return Some(Difficulty::Easy);
            }
        }
        None
    }
}

/// 没有匹配到任何知识点关键词时的兜底知识点
pub const GENERAL_TOPIC: &str = "General";

/// 题目规范化服务
pub struct Normalizer {
    classifier: Box<dyn StemClassifier>,
}

impl Normalizer {
    /// 创建使用关键词分类器的规范化服务
    pub fn new() -> Self {
        Self {
            classifier: Box::new(KeywordClassifier),
        }
    }

    /// 创建使用自定义分类器的规范化服务
    pub fn with_classifier(classifier: Box<dyn StemClassifier>) -> Self {
        Self { classifier }
    }

    /// 把原始记录规范化为 `Question`
    ///
    /// # 参数
    /// - `raw`: 题源原始记录
    /// - `subject`: 查询时使用的科目（题源响应不回传科目）
    /// - `exam_type`: 查询时使用的考试类型
    ///
    /// # 返回
    /// 满足全部不变量的 `Question`，或第一条违反不变量的错误
    pub fn normalize(
        &self,
        raw: &RawQuestion,
        subject: Subject,
        exam_type: ExamType,
    ) -> Result<Question, NormalizeError> {
        let stem = strip_html(&raw.question);
        if stem.is_empty() {
            return Err(NormalizeError::EmptyStem);
        }

        let options = [
            clean_option(&raw.option.a, 'A')?,
            clean_option(&raw.option.b, 'B')?,
            clean_option(&raw.option.c, 'C')?,
            clean_option(&raw.option.d, 'D')?,
        ];

        // 小写答案字母做无害矫正，A-D 之外一律拒绝
        let answer_str = raw.answer.as_deref().unwrap_or("");
        let answer =
            AnswerLetter::from_str(answer_str).ok_or_else(|| NormalizeError::InvalidAnswer {
                got: answer_str.to_string(),
            })?;

        let topic = self
            .classifier
            .infer_topic(subject, &stem)
            .unwrap_or(GENERAL_TOPIC)
            .to_string();
        let difficulty = self
            .classifier
            .infer_difficulty(&stem)
            .unwrap_or(Difficulty::Medium);

        let explanation = raw
            .solution
            .as_deref()
            .map(strip_html)
            .filter(|s| !s.is_empty());

        Ok(Question {
            id: Uuid::new_v4(),
            subject,
            exam_type,
            stem,
            options,
            answer,
            topic,
            difficulty,
            explanation,
            source_year: raw.year(),
            provenance: Provenance::SourceExternal,
            generated_from: None,
        })
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// 清洗单个选项，空选项按缺失处理
fn clean_option(option: &Option<String>, letter: char) -> Result<String, NormalizeError> {
    let text = option.as_deref().map(strip_html).unwrap_or_default();
    if text.is_empty() {
        return Err(NormalizeError::MissingOption { letter });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawOptions;

    fn raw(question: &str, answer: &str) -> RawQuestion {
        RawQuestion {
            id: Some(1),
            question: question.to_string(),
            option: RawOptions {
                a: Some("opt a".to_string()),
                b: Some("opt b".to_string()),
                c: Some("opt c".to_string()),
                d: Some("opt d".to_string()),
            },
            answer: Some(answer.to_string()),
            solution: None,
            examtype: None,
            examyear: Some("2020".to_string()),
        }
    }

    #[test]
    fn test_normalize_infers_topic_and_difficulty() {
        let normalizer = Normalizer::new();
        let question = normalizer
            .normalize(
                &raw("Calculate the logarithm of 100 to base 10", "a"),
                Subject::Mathematics,
                ExamType::Jamb,
            )
            .expect("规范化失败");

        assert_eq!(question.topic, "Logarithms");
        assert_eq!(question.difficulty, Difficulty::Hard);
        assert_eq!(question.answer, AnswerLetter::A);
        assert_eq!(question.source_year, Some(2020));
        assert_eq!(question.provenance, Provenance::SourceExternal);
    }

    #[test]
    fn test_normalize_falls_back_to_general_and_medium() {
        let normalizer = Normalizer::new();
        let question = normalizer
            .normalize(
                &raw("What is the capital of Nigeria?", "B"),
                Subject::English,
                ExamType::Waec,
            )
            .expect("规范化失败");

        assert_eq!(question.topic, GENERAL_TOPIC);
        assert_eq!(question.difficulty, Difficulty::Medium);
    }

    #[test]
    fn test_normalize_easy_recall_verb() {
        let normalizer = Normalizer::new();
        let question = normalizer
            .normalize(
                &raw("Name the organ that pumps blood", "d"),
                Subject::Biology,
                ExamType::Neco,
            )
            .expect("规范化失败");

        assert_eq!(question.difficulty, Difficulty::Easy);
        assert_eq!(question.topic, "Circulatory System");
    }

    #[test]
    fn test_normalize_strips_html() {
        let normalizer = Normalizer::new();
        let question = normalizer
            .normalize(
                &raw("<p>Find <b>x</b>&nbsp;if 2x = 10</p>", "a"),
                Subject::Mathematics,
                ExamType::Jamb,
            )
            .expect("规范化失败");

        assert_eq!(question.stem, "Find x if 2x = 10");
    }

    #[test]
    fn test_normalize_rejects_missing_option() {
        let normalizer = Normalizer::new();
        let mut record = raw("A valid stem", "a");
        record.option.d = None;

        let err = normalizer
            .normalize(&record, Subject::Physics, ExamType::Jamb)
            .expect_err("应拒绝缺选项的记录");
        assert!(matches!(err, NormalizeError::MissingOption { letter: 'D' }));
    }

    #[test]
    fn test_normalize_rejects_invalid_answer() {
        let normalizer = Normalizer::new();
        let err = normalizer
            .normalize(&raw("A valid stem", "E"), Subject::Physics, ExamType::Jamb)
            .expect_err("应拒绝非法答案字母");
        assert!(matches!(err, NormalizeError::InvalidAnswer { .. }));
    }

    #[test]
    fn test_normalize_rejects_empty_stem() {
        let normalizer = Normalizer::new();
        let err = normalizer
            .normalize(&raw("<p> </p>", "a"), Subject::Physics, ExamType::Jamb)
            .expect_err("应拒绝空题干");
        assert!(matches!(err, NormalizeError::EmptyStem));
    }
}
