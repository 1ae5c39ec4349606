use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 外部题源错误
    Source(SourceError),
    /// 题目规范化错误
    Normalize(NormalizeError),
    /// 题库存储错误
    Store(StoreError),
    /// 生成服务错误
    Generation(GenerationError),
    /// 获取流程错误
    Acquisition(AcquisitionError),
    /// 配置错误
    Config(ConfigError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Source(e) => write!(f, "题源错误: {}", e),
            AppError::Normalize(e) => write!(f, "规范化错误: {}", e),
            AppError::Store(e) => write!(f, "存储错误: {}", e),
            AppError::Generation(e) => write!(f, "生成错误: {}", e),
            AppError::Acquisition(e) => write!(f, "获取错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Source(e) => Some(e),
            AppError::Normalize(e) => Some(e),
            AppError::Store(e) => Some(e),
            AppError::Generation(e) => Some(e),
            AppError::Acquisition(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 外部题源错误
///
/// 注意：空结果不是错误，题源客户端用 `Ok(vec![])` 表达"该查询无内容"
#[derive(Debug)]
pub enum SourceError {
    /// 服务不可用（网络/DNS/超时/缺少凭证）— 可以安全地降级到下一层
    Unavailable {
        detail: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    /// 请求频率限制 — 调用方应退避后重试
    RateLimited {
        retry_after: Option<u64>,
    },
    /// 响应结构不符合预期 — 记录日志后按空结果路由
    Malformed {
        detail: String,
    },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Unavailable { detail, .. } => {
                write!(f, "题源服务不可用: {}", detail)
            }
            SourceError::RateLimited { retry_after } => {
                write!(f, "题源请求频率限制, 建议等待: {:?}秒", retry_after)
            }
            SourceError::Malformed { detail } => {
                write!(f, "题源响应格式异常: {}", detail)
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Unavailable {
                source: Some(source),
                ..
            } => Some(source.as_ref() as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl SourceError {
    /// 是否可以通过退避后重试恢复
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::RateLimited { .. })
    }
}

/// 题目规范化错误
///
/// 规范化必须"响亮地失败"：任何一项不满足 Question 不变量的原始记录
/// 都不允许落库
#[derive(Debug)]
pub enum NormalizeError {
    /// 题干为空
    EmptyStem,
    /// 缺少选项
    MissingOption {
        letter: char,
    },
    /// 答案字母非法（不在 A-D 范围内）
    InvalidAnswer {
        got: String,
    },
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::EmptyStem => write!(f, "题干为空"),
            NormalizeError::MissingOption { letter } => {
                write!(f, "缺少选项 {}", letter)
            }
            NormalizeError::InvalidAnswer { got } => {
                write!(f, "答案字母非法: '{}'（应为 A-D）", got)
            }
        }
    }
}

impl std::error::Error for NormalizeError {}

/// 题库存储错误
#[derive(Debug)]
pub enum StoreError {
    /// 重复题目 — 路由信号而非失败，调用方按"跳过"处理
    Duplicate {
        dedup_key: String,
    },
    /// 快照写入失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 快照文件解析失败
    SnapshotParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Duplicate { dedup_key } => {
                write!(f, "重复题目: {}", dedup_key)
            }
            StoreError::WriteFailed { path, source } => {
                write!(f, "写入题库快照失败 ({}): {}", path, source)
            }
            StoreError::SnapshotParseFailed { path, source } => {
                write!(f, "题库快照解析失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::WriteFailed { source, .. }
            | StoreError::SnapshotParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl StoreError {
    /// 是否是重复题目（非致命）
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

/// 生成服务错误
#[derive(Debug)]
pub enum GenerationError {
    /// LLM API 调用失败
    ApiCallFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回内容为空
    EmptyContent {
        model: String,
    },
    /// 返回内容无法解析为题目 JSON
    ParseFailed {
        detail: String,
    },
    /// 返回题目结构非法（缺选项/答案歧义）
    InvalidStructure {
        detail: String,
    },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::ApiCallFailed { model, source } => {
                write!(f, "LLM API 调用失败 (模型: {}): {}", model, source)
            }
            GenerationError::EmptyContent { model } => {
                write!(f, "LLM 返回内容为空 (模型: {})", model)
            }
            GenerationError::ParseFailed { detail } => {
                write!(f, "无法解析 LLM 返回的题目: {}", detail)
            }
            GenerationError::InvalidStructure { detail } => {
                write!(f, "生成的题目结构非法: {}", detail)
            }
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::ApiCallFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 获取流程错误
///
/// 只有这两个终态错误会传播给外部调用方；各层内部的单次失败都被
/// 捕获并转化为路由决策
#[derive(Debug)]
pub enum AcquisitionError {
    /// 需要生成层但没有任何模板题目可用
    NoTemplateAvailable {
        subject: String,
        exam_type: String,
    },
    /// 所有层都耗尽后仍然没有任何题目
    NoQuestionsAvailable {
        subject: String,
        exam_type: String,
    },
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionError::NoTemplateAvailable { subject, exam_type } => {
                write!(
                    f,
                    "没有可用的模板题目 (科目: {}, 考试: {})",
                    subject, exam_type
                )
            }
            AcquisitionError::NoQuestionsAvailable { subject, exam_type } => {
                write!(
                    f,
                    "该选择下没有任何题目 (科目: {}, 考试: {})",
                    subject, exam_type
                )
            }
        }
    }
}

impl std::error::Error for AcquisitionError {}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 不在支持集合内的科目
    UnsupportedSubject {
        subject: String,
    },
    /// 不在支持集合内的考试类型
    UnsupportedExamType {
        exam_type: String,
    },
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnsupportedSubject { subject } => {
                write!(f, "不支持的科目: {}", subject)
            }
            ConfigError::UnsupportedExamType { exam_type } => {
                write!(f, "不支持的考试类型: {}", exam_type)
            }
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        AppError::Source(err)
    }
}

impl From<NormalizeError> for AppError {
    fn from(err: NormalizeError) -> Self {
        AppError::Normalize(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        AppError::Generation(err)
    }
}

impl From<AcquisitionError> for AppError {
    fn from(err: AcquisitionError) -> Self {
        AppError::Acquisition(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON解析失败: {}", err))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            SourceError::Unavailable {
                detail: "网络请求超时或无法连接".to_string(),
                source: Some(Box::new(err)),
            }
        } else if err.is_decode() {
            SourceError::Malformed {
                detail: format!("响应解码失败: {}", err),
            }
        } else {
            SourceError::Unavailable {
                detail: err.to_string(),
                source: Some(Box::new(err)),
            }
        }
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建题源不可用错误
    pub fn source_unavailable(detail: impl Into<String>) -> Self {
        AppError::Source(SourceError::Unavailable {
            detail: detail.into(),
            source: None,
        })
    }

    /// 创建生成结构非法错误
    pub fn generation_invalid(detail: impl Into<String>) -> Self {
        AppError::Generation(GenerationError::InvalidStructure {
            detail: detail.into(),
        })
    }

    /// 创建不支持科目错误
    pub fn unsupported_subject(subject: impl Into<String>) -> Self {
        AppError::Config(ConfigError::UnsupportedSubject {
            subject: subject.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
