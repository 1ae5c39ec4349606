/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 题源 API 地址
    pub source_api_base_url: String,
    /// 题源 API 访问令牌（为空时所有调用按"不可用"处理）
    pub source_access_token: String,
    /// 题源单次调用最多返回的题目数
    pub source_page_size: usize,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 回填时相邻两次外部调用的最小间隔（毫秒）
    pub backfill_delay_ms: u64,
    /// 回填时每个年份请求的题目数
    pub backfill_per_year_count: usize,
    /// 回填年份范围起点
    pub backfill_start_year: i32,
    /// 回填年份范围终点
    pub backfill_end_year: i32,
    /// 单次获取请求中生成层的最大调用次数
    pub generation_cap: usize,
    /// 题库快照文件路径
    pub store_snapshot_path: String,
    /// 种子题目 TOML 文件存放目录
    pub seed_folder: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_api_base_url: "https://questions.aloc.com.ng".to_string(),
            source_access_token: String::new(),
            source_page_size: 40,
            request_timeout_secs: 10,
            backfill_delay_ms: 1500,
            backfill_per_year_count: 8,
            backfill_start_year: 2015,
            backfill_end_year: 2023,
            generation_cap: 5,
            store_snapshot_path: "question_store.json".to_string(),
            seed_folder: "seed_toml".to_string(),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            source_api_base_url: std::env::var("SOURCE_API_BASE_URL").unwrap_or(default.source_api_base_url),
            source_access_token: std::env::var("SOURCE_ACCESS_TOKEN").unwrap_or(default.source_access_token),
            source_page_size: std::env::var("SOURCE_PAGE_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.source_page_size),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            backfill_delay_ms: std::env::var("BACKFILL_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.backfill_delay_ms),
            backfill_per_year_count: std::env::var("BACKFILL_PER_YEAR_COUNT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.backfill_per_year_count),
            backfill_start_year: std::env::var("BACKFILL_START_YEAR").ok().and_then(|v| v.parse().ok()).unwrap_or(default.backfill_start_year),
            backfill_end_year: std::env::var("BACKFILL_END_YEAR").ok().and_then(|v| v.parse().ok()).unwrap_or(default.backfill_end_year),
            generation_cap: std::env::var("GENERATION_CAP").ok().and_then(|v| v.parse().ok()).unwrap_or(default.generation_cap),
            store_snapshot_path: std::env::var("STORE_SNAPSHOT_PATH").unwrap_or(default.store_snapshot_path),
            seed_folder: std::env::var("SEED_FOLDER").unwrap_or(default.seed_folder),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
        }
    }
}
