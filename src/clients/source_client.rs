//! 题源 API 客户端
//!
//! 对外部题库服务的薄封装：只负责取数和错误分类，
//! 不做规范化、不落库。
//!
//! 错误分类约定：
//! - 网络/DNS/超时/缺少凭证 → `Unavailable`（可降级到下一层）
//! - HTTP 429 或响应体标记限流 → `RateLimited`（调用方退避）
//! - 响应体不是预期形状 → `Malformed`（记日志，按空结果路由）
//! - 调用成功但没有内容 → `Ok(vec![])`，不是错误

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::SourceError;
use crate::infrastructure::RateLimiter;
use crate::models::{RawQuestion, SourceQuery};

/// 题源抽象
///
/// 获取流程、回填调度器和覆盖度分析器都只依赖这个 trait，
/// 测试中用内存实现替换真实客户端
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// 按查询描述取题
    ///
    /// # 返回
    /// 成功时返回最多 `query.count` 条原始记录；空结果用空 Vec 表达
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawQuestion>, SourceError>;
}

/// ALOC 风格题库 API 客户端
pub struct AlocClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    /// 单次调用的题目数上限，超过时自动拆分为多次调用
    page_size: usize,
    limiter: Arc<RateLimiter>,
}

impl AlocClient {
    /// 创建新的题源客户端
    ///
    /// # 参数
    /// - `config`: 程序配置
    /// - `limiter`: 全进程共享的限速器
    pub fn new(config: &Config, limiter: Arc<RateLimiter>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.source_api_base_url.trim_end_matches('/').to_string(),
            access_token: config.source_access_token.clone(),
            page_size: config.source_page_size.max(1),
            limiter,
        })
    }

    /// 单次调用取一页题目
    async fn fetch_page(
        &self,
        query: &SourceQuery,
        count: usize,
    ) -> Result<Vec<RawQuestion>, SourceError> {
        self.limiter.acquire().await;

        let url = format!("{}/api/v2/q/{}", self.base_url, count);
        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .header("AccessToken", &self.access_token)
            .query(&[
                ("subject", query.subject.api_key()),
                ("type", query.exam_type.api_key()),
            ]);
        if let Some(year) = query.year {
            request = request.query(&[("year", year.to_string())]);
        }

        debug!(
            "题源请求: {} (科目: {}, 考试: {}, 年份: {:?}, 数量: {})",
            url,
            query.subject,
            query.exam_type,
            query.year,
            count
        );

        let response = request.send().await.map_err(SourceError::from)?;
        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(SourceError::RateLimited { retry_after });
        }

        if !status.is_success() {
            return Err(SourceError::Unavailable {
                detail: format!("HTTP 状态 {}", status.as_u16()),
                source: None,
            });
        }

        let body: Value = response.json().await.map_err(|e| SourceError::Malformed {
            detail: format!("响应不是合法 JSON: {}", e),
        })?;

        if is_rate_limited_body(&body) {
            return Err(SourceError::RateLimited { retry_after: None });
        }

        parse_items(&body)
    }
}

#[async_trait]
impl QuestionSource for AlocClient {
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawQuestion>, SourceError> {
        // 缺少凭证时整个题源按不可用处理
        if self.access_token.trim().is_empty() {
            return Err(SourceError::Unavailable {
                detail: "未配置题源访问令牌".to_string(),
                source: None,
            });
        }

        if query.count == 0 {
            return Ok(Vec::new());
        }

        let mut collected: Vec<RawQuestion> = Vec::new();

        // 超出单次调用上限时拆分为多次调用并拼接
        while collected.len() < query.count {
            let take = (query.count - collected.len()).min(self.page_size);
            let page = self.fetch_page(query, take).await?;
            let page_len = page.len();
            collected.extend(page);

            // 返回不足一页说明题源已无更多内容
            if page_len < take {
                break;
            }
        }

        collected.truncate(query.count);
        Ok(collected)
    }
}

// ========== 辅助函数 ==========

/// 检查响应体是否标记了频率限制
fn is_rate_limited_body(body: &Value) -> bool {
    if let Some(status) = body.get("status").and_then(|v| v.as_u64()) {
        if status == 429 {
            return true;
        }
    }
    if let Some(msg) = body.get("message").and_then(|v| v.as_str()) {
        return msg.to_lowercase().contains("too many requests");
    }
    false
}

/// 从响应体中提取原始题目列表
///
/// `data` 可能是数组（批量接口）、单个对象（单题接口）或 null（无内容）；
/// 单条记录解析失败时跳过该条并记日志，整体形状异常时返回 `Malformed`
fn parse_items(body: &Value) -> Result<Vec<RawQuestion>, SourceError> {
    let data = match body.get("data") {
        Some(data) => data,
        None => {
            return Err(SourceError::Malformed {
                detail: "响应缺少 data 字段".to_string(),
            })
        }
    };

    let raw_items: Vec<&Value> = match data {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![data],
        other => {
            return Err(SourceError::Malformed {
                detail: format!("data 字段类型异常: {}", type_name(other)),
            })
        }
    };

    let mut items = Vec::with_capacity(raw_items.len());
    for (index, item) in raw_items.into_iter().enumerate() {
        match serde_json::from_value::<RawQuestion>(item.clone()) {
            Ok(raw) => items.push(raw),
            Err(e) => {
                warn!("跳过无法解析的题源记录 #{}: {}", index, e);
            }
        }
    }

    Ok(items)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExamType, Subject};
    use serde_json::json;

    #[test]
    fn test_parse_items_array() {
        let body = json!({
            "subject": "mathematics",
            "status": 200,
            "data": [
                { "id": 1, "question": "Q1", "option": { "a": "1", "b": "2", "c": "3", "d": "4" }, "answer": "a" },
                { "id": 2, "question": "Q2", "option": { "a": "1", "b": "2", "c": "3", "d": "4" }, "answer": "b" }
            ]
        });
        let items = parse_items(&body).expect("应能解析");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].question, "Q1");
    }

    #[test]
    fn test_parse_items_single_object() {
        let body = json!({
            "status": 200,
            "data": { "id": 7, "question": "单题接口", "option": { "a": "1", "b": "2", "c": "3", "d": "4" }, "answer": "c" }
        });
        let items = parse_items(&body).expect("应能解析");
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_parse_items_null_is_empty_not_error() {
        let body = json!({ "status": 200, "data": null });
        let items = parse_items(&body).expect("空结果不是错误");
        assert!(items.is_empty());
    }

    #[test]
    fn test_parse_items_missing_data_is_malformed() {
        let body = json!({ "status": 200 });
        let err = parse_items(&body).expect_err("应报格式异常");
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[test]
    fn test_rate_limited_body() {
        assert!(is_rate_limited_body(&json!({ "status": 429 })));
        assert!(is_rate_limited_body(
            &json!({ "message": "Too Many Requests, slow down" })
        ));
        assert!(!is_rate_limited_body(&json!({ "status": 200 })));
    }

    #[tokio::test]
    async fn test_missing_token_is_unavailable() {
        let config = Config::default(); // 默认令牌为空
        let client =
            AlocClient::new(&config, Arc::new(RateLimiter::unlimited())).expect("创建客户端失败");
        let query = SourceQuery {
            subject: Subject::Mathematics,
            exam_type: ExamType::Jamb,
            year: None,
            count: 5,
        };
        let err = client.fetch(&query).await.expect_err("应按不可用处理");
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }

    /// 真实题源连通性测试
    ///
    /// 运行方式：
    /// ```bash
    /// SOURCE_ACCESS_TOKEN=xxx cargo test test_live_fetch -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_live_fetch() {
        let config = Config::from_env();
        let client =
            AlocClient::new(&config, Arc::new(RateLimiter::unlimited())).expect("创建客户端失败");
        let query = SourceQuery {
            subject: Subject::Mathematics,
            exam_type: ExamType::Jamb,
            year: None,
            count: 3,
        };

        match client.fetch(&query).await {
            Ok(items) => {
                println!("✅ 题源返回 {} 条记录", items.len());
                for item in &items {
                    println!("  - {}", item.question);
                }
            }
            Err(e) => panic!("题源调用失败: {}", e),
        }
    }
}
