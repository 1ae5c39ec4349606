//! 题目生成服务 - 业务能力层
//!
//! 只负责"以一道已有题目为模板生成一道新题"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）
//!
//! 生成的题目继承模板的科目、考试类型、知识点和难度，
//! 并通过 `generated_from` 记录模板引用，保证可追溯

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::GenerationError;
use crate::models::{AnswerLetter, Provenance, Question};
use crate::utils::{normalize_for_dedup, truncate_text};

/// 题目生成能力的抽象接口
///
/// 获取流程只依赖这个接口，方便测试时替换为假实现
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// 以模板题目为风格参照生成一道新题
    async fn generate(&self, template: &Question) -> Result<Question, GenerationError>;
}

/// LLM 返回的题目载荷
#[derive(Debug, Deserialize)]
struct GeneratedPayload {
    stem: String,
    options: GeneratedOptions,
    answer: String,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedOptions {
    #[serde(alias = "A")]
    a: String,
    #[serde(alias = "B")]
    b: String,
    #[serde(alias = "C")]
    c: String,
    #[serde(alias = "D")]
    d: String,
}

/// 基于 LLM 的题目生成服务
///
/// 职责：
/// - 调用 LLM API 生成单道题目
/// - 解析并校验 LLM 返回的题目结构
/// - 只处理单个模板，不出现 Vec<Question>
/// - 不关心流程顺序
pub struct LlmCompletionService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmCompletionService {
    /// 创建新的生成服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: &str,
    ) -> Result<String, GenerationError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let build_err = |e: async_openai::error::OpenAIError| GenerationError::ApiCallFailed {
            model: self.model_name.clone(),
            source: Box::new(e),
        };

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_message)
            .build()
            .map_err(build_err)?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(build_err)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.7)
            .max_tokens(1024u32)
            .build()
            .map_err(build_err)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            GenerationError::ApiCallFailed {
                model: self.model_name.clone(),
                source: Box::new(e),
            }
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| GenerationError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }

    /// 构建生成题目的消息
    ///
    /// 返回 (user_message, system_message)
    fn build_generation_messages(&self, template: &Question) -> (String, String) {
        let system_message = "你是一名尼日利亚标准化考试的专业命题人，\
                             擅长按照给定的科目、知识点和难度命制全新的英文单选题。\
                             输出必须是严格的 JSON，不要附加任何解释文字。"
            .to_string();

        let user_message = format!(
            r#"请参照下面这道范例题目的风格和深度，命制一道全新的题目。

【要求】
- 科目：{subject}
- 考试类型：{exam_type}
- 知识点：{topic}
- 难度：{difficulty}
- 题干和选项使用英文，不得与范例题目相同或只做简单改写
- 恰好 4 个选项，有且仅有一个正确答案

范例题目：
  题干：{stem}
  选项 A：{opt_a}
  选项 B：{opt_b}
  选项 C：{opt_c}
  选项 D：{opt_d}
  答案：{answer}

只返回如下结构的 JSON，不要返回任何其他内容：
{{"stem": "...", "options": {{"a": "...", "b": "...", "c": "...", "d": "..."}}, "answer": "A", "explanation": "..."}}"#,
            subject = template.subject.name(),
            exam_type = template.exam_type.name(),
            topic = template.topic,
            difficulty = template.difficulty,
            stem = template.stem,
            opt_a = template.options[0],
            opt_b = template.options[1],
            opt_c = template.options[2],
            opt_d = template.options[3],
            answer = template.answer,
        );

        (user_message, system_message)
    }

    /// 解析 LLM 返回的题目内容
    ///
    /// 容忍 Markdown 代码围栏，围栏内外都尝试按 JSON 解析
    fn parse_generated(&self, response: &str) -> Result<GeneratedPayload, GenerationError> {
        let json_text = strip_code_fences(response);
        serde_json::from_str(json_text).map_err(|e| GenerationError::ParseFailed {
            detail: format!("{} (内容: {})", e, truncate_text(response, 120)),
        })
    }

    /// 把解析后的载荷装配为 `Question` 并做结构校验
    fn payload_to_question(
        &self,
        template: &Question,
        payload: GeneratedPayload,
    ) -> Result<Question, GenerationError> {
        let stem = payload.stem.trim().to_string();
        if stem.is_empty() {
            return Err(GenerationError::InvalidStructure {
                detail: "题干为空".to_string(),
            });
        }
        if normalize_for_dedup(&stem) == normalize_for_dedup(&template.stem) {
            return Err(GenerationError::InvalidStructure {
                detail: "生成题干与模板相同".to_string(),
            });
        }

        let options = [
            payload.options.a.trim().to_string(),
            payload.options.b.trim().to_string(),
            payload.options.c.trim().to_string(),
            payload.options.d.trim().to_string(),
        ];
        if let Some(i) = options.iter().position(|o| o.is_empty()) {
            return Err(GenerationError::InvalidStructure {
                detail: format!("选项 {} 为空", (b'A' + i as u8) as char),
            });
        }

        let answer = AnswerLetter::from_str(&payload.answer).ok_or_else(|| {
            GenerationError::InvalidStructure {
                detail: format!("答案字母非法: '{}'", payload.answer),
            }
        })?;

        Ok(Question {
            id: Uuid::new_v4(),
            subject: template.subject,
            exam_type: template.exam_type,
            stem,
            options,
            answer,
            topic: template.topic.clone(),
            difficulty: template.difficulty,
            explanation: payload
                .explanation
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            source_year: None,
            provenance: Provenance::Generated,
            generated_from: Some(template.id),
        })
    }
}

#[async_trait]
impl QuestionGenerator for LlmCompletionService {
    async fn generate(&self, template: &Question) -> Result<Question, GenerationError> {
        debug!(
            "开始生成题目，模板: {} ({}/{})",
            truncate_text(&template.stem, 50),
            template.subject.name(),
            template.topic
        );

        let (user_message, system_message) = self.build_generation_messages(template);
        let response = self.send_to_llm(&user_message, &system_message).await?;
        let payload = self.parse_generated(&response)?;
        let question = self.payload_to_question(template, payload)?;

        debug!("生成成功: {}", truncate_text(&question.stem, 50));
        Ok(question)
    }
}

// ========== 辅助函数 ==========

/// 去除 Markdown 代码围栏，返回内部的 JSON 文本
fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // 围栏首行可能带语言标记（```json）
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, ExamType, Subject};

    /// 创建测试用的生成服务
    fn create_test_service() -> LlmCompletionService {
        let config = OpenAIConfig::new()
            .with_api_key("test-key")
            .with_api_base("https://api.openai.com/v1");

        LlmCompletionService {
            client: Client::with_config(config),
            model_name: "gpt-4o-mini".to_string(),
        }
    }

    fn template() -> Question {
        Question {
            id: Uuid::new_v4(),
            subject: Subject::Mathematics,
            exam_type: ExamType::Jamb,
            stem: "Simplify 2x + 3x".to_string(),
            options: [
                "5x".to_string(),
                "6x".to_string(),
                "x".to_string(),
                "5x^2".to_string(),
            ],
            answer: AnswerLetter::A,
            topic: "Algebra".to_string(),
            difficulty: Difficulty::Easy,
            explanation: None,
            source_year: Some(2020),
            provenance: Provenance::SourceExternal,
            generated_from: None,
        }
    }

    const VALID_RESPONSE: &str = r#"{
        "stem": "Simplify 4y + 7y",
        "options": {"a": "11y", "b": "28y", "c": "3y", "d": "11y^2"},
        "answer": "a",
        "explanation": "Add the coefficients: 4 + 7 = 11."
    }"#;

    #[test]
    fn test_parse_and_assemble_valid_response() {
        let service = create_test_service();
        let tpl = template();

        let payload = service.parse_generated(VALID_RESPONSE).expect("解析失败");
        let question = service
            .payload_to_question(&tpl, payload)
            .expect("装配失败");

        assert_eq!(question.subject, tpl.subject);
        assert_eq!(question.topic, tpl.topic);
        assert_eq!(question.answer, AnswerLetter::A);
        assert_eq!(question.provenance, Provenance::Generated);
        assert_eq!(question.generated_from, Some(tpl.id));
        assert!(question.validate().is_ok());
    }

    #[test]
    fn test_parse_tolerates_code_fences() {
        let service = create_test_service();
        let fenced = format!("```json\n{}\n```", VALID_RESPONSE);
        assert!(service.parse_generated(&fenced).is_ok());

        let fenced_plain = format!("```\n{}\n```", VALID_RESPONSE);
        assert!(service.parse_generated(&fenced_plain).is_ok());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let service = create_test_service();
        let err = service
            .parse_generated("Sure! Here is your question.")
            .expect_err("应报解析错误");
        assert!(matches!(err, GenerationError::ParseFailed { .. }));
    }

    #[test]
    fn test_assemble_rejects_invalid_answer() {
        let service = create_test_service();
        let response = r#"{
            "stem": "Simplify 4y + 7y",
            "options": {"a": "11y", "b": "28y", "c": "3y", "d": "11y^2"},
            "answer": "E"
        }"#;

        let payload = service.parse_generated(response).expect("解析失败");
        let err = service
            .payload_to_question(&template(), payload)
            .expect_err("应拒绝非法答案");
        assert!(matches!(err, GenerationError::InvalidStructure { .. }));
    }

    #[test]
    fn test_assemble_rejects_copied_stem() {
        let service = create_test_service();
        let response = r#"{
            "stem": "Simplify 2x + 3x!",
            "options": {"a": "5x", "b": "6x", "c": "x", "d": "5x^2"},
            "answer": "A"
        }"#;

        let payload = service.parse_generated(response).expect("解析失败");
        let err = service
            .payload_to_question(&template(), payload)
            .expect_err("应拒绝照抄模板的题干");
        assert!(matches!(err, GenerationError::InvalidStructure { .. }));
    }

    /// 测试真实 LLM 生成
    ///
    /// 运行方式：
    /// ```bash
    /// LLM_API_KEY=sk-xxx cargo test test_live_generation -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_live_generation() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::from_env();
        let service = LlmCompletionService::new(&config);
        let tpl = template();

        println!("\n========== 测试真实 LLM 生成 ==========");
        match service.generate(&tpl).await {
            Ok(question) => {
                println!("✅ 生成成功！");
                println!("题干: {}", question.stem);
                println!("答案: {}", question.answer);
                assert!(question.validate().is_ok());
                assert_eq!(question.generated_from, Some(tpl.id));
            }
            Err(e) => {
                println!("❌ 生成失败: {}", e);
                panic!("测试失败: {}", e);
            }
        }
    }
}
