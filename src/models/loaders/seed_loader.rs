//! 种子题目加载器
//!
//! 从 TOML 文件加载种子题目，用于在外部题源和题库都为空时
//! 给生成层提供模板

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::fs;
use uuid::Uuid;

use crate::models::exam_type::ExamType;
use crate::models::question::{AnswerLetter, Difficulty, Provenance, Question};
use crate::models::subject::Subject;

/// 种子文件的 TOML 结构
#[derive(Debug, Deserialize)]
struct SeedFile {
    subject: String,
    exam_type: String,
    #[serde(default)]
    questions: Vec<SeedQuestion>,
}

#[derive(Debug, Deserialize)]
struct SeedQuestion {
    stem: String,
    options: Vec<String>,
    answer: String,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    year: Option<i32>,
}

/// 从单个 TOML 文件加载种子题目
pub async fn load_seed_file(toml_file_path: &Path) -> Result<Vec<Question>> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取种子文件: {}", toml_file_path.display()))?;

    let seed: SeedFile = toml::from_str(&content)
        .with_context(|| format!("无法解析种子文件: {}", toml_file_path.display()))?;

    let subject = Subject::find(&seed.subject)
        .with_context(|| format!("种子文件科目非法: {}", seed.subject))?;
    let exam_type = ExamType::from_str(&seed.exam_type)
        .with_context(|| format!("种子文件考试类型非法: {}", seed.exam_type))?;

    let mut questions = Vec::new();
    for (index, item) in seed.questions.iter().enumerate() {
        match seed_to_question(item, subject, exam_type) {
            Ok(question) => questions.push(question),
            Err(e) => {
                tracing::warn!(
                    "跳过非法种子题目 {} #{}: {}",
                    toml_file_path.display(),
                    index + 1,
                    e
                );
            }
        }
    }

    Ok(questions)
}

/// 从文件夹中加载所有种子 TOML 文件
pub async fn load_all_seed_files(folder_path: &str) -> Result<Vec<Question>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        tracing::info!("种子目录不存在，跳过: {}", folder_path);
        return Ok(Vec::new());
    }

    let mut all_questions = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            tracing::info!(
                "正在加载种子文件: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );

            match load_seed_file(&path).await {
                Ok(mut questions) => {
                    tracing::info!("成功加载 {} 个种子题目", questions.len());
                    all_questions.append(&mut questions);
                }
                Err(e) => {
                    tracing::warn!("加载种子文件失败 {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(all_questions)
}

/// 把一条种子记录转换为规范题目
fn seed_to_question(
    item: &SeedQuestion,
    subject: Subject,
    exam_type: ExamType,
) -> Result<Question> {
    if item.options.len() != 4 {
        anyhow::bail!("选项数量应为 4，实际为 {}", item.options.len());
    }

    let answer = AnswerLetter::from_str(&item.answer)
        .with_context(|| format!("答案字母非法: {}", item.answer))?;

    let question = Question {
        id: Uuid::new_v4(),
        subject,
        exam_type,
        stem: item.stem.trim().to_string(),
        options: [
            item.options[0].clone(),
            item.options[1].clone(),
            item.options[2].clone(),
            item.options[3].clone(),
        ],
        answer,
        topic: item.topic.clone().unwrap_or_else(|| "General".to_string()),
        difficulty: item
            .difficulty
            .as_deref()
            .and_then(Difficulty::from_str)
            .unwrap_or(Difficulty::Medium),
        explanation: item.explanation.clone(),
        source_year: item.year,
        provenance: Provenance::SeedFixture,
        generated_from: None,
    };

    question
        .validate()
        .map_err(|e| anyhow::anyhow!("种子题目不满足不变量: {}", e))?;

    Ok(question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_seed_file() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let path = dir.path().join("math_jamb.toml");
        let content = r#"
subject = "Mathematics"
exam_type = "JAMB"

[[questions]]
stem = "Find the value of x if 2x = 10"
options = ["2", "5", "10", "20"]
answer = "B"
topic = "Algebra"
difficulty = "easy"
year = 2020

[[questions]]
stem = "只有三个选项的坏题目"
options = ["1", "2", "3"]
answer = "A"
"#;
        tokio::fs::write(&path, content).await.expect("写入失败");

        let questions = load_seed_file(&path).await.expect("加载失败");
        // 非法题目被跳过
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].subject, Subject::Mathematics);
        assert_eq!(questions[0].provenance, Provenance::SeedFixture);
        assert_eq!(questions[0].answer, AnswerLetter::B);
    }

    #[tokio::test]
    async fn test_missing_folder_is_empty() {
        let questions = load_all_seed_files("不存在的目录").await.expect("应返回空");
        assert!(questions.is_empty());
    }
}
