/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时运行的会话数量
    pub max_concurrent_sessions: usize,
    /// 任务文件存放目录
    pub jobs_folder: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- Oracle (LLM) 配置 ---
    pub oracle_api_key: String,
    pub oracle_api_base_url: String,
    pub oracle_model_name: String,
    /// Oracle 调用失败后的重试次数
    pub oracle_max_retries: u32,
    /// Oracle 重试的线性退避基数（秒）
    pub oracle_backoff_secs: u64,
    // --- 会话配置 ---
    /// 单次 HTTP 调用的超时时间（秒）
    pub http_timeout_secs: u64,
    /// 单个会话的截止时间（秒），会话启动时固定，不再延长
    pub session_deadline_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 8,
            jobs_folder: "jobs".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            oracle_api_key: String::new(),
            oracle_api_base_url: "https://aipipe.org/openrouter/v1".to_string(),
            oracle_model_name: "openai/gpt-4.1-nano".to_string(),
            oracle_max_retries: 2,
            oracle_backoff_secs: 1,
            http_timeout_secs: 60,
            session_deadline_secs: 120,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_sessions: std::env::var("MAX_CONCURRENT_SESSIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_sessions),
            jobs_folder: std::env::var("JOBS_FOLDER").unwrap_or(default.jobs_folder),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            oracle_api_key: std::env::var("ORACLE_API_KEY").unwrap_or(default.oracle_api_key),
            oracle_api_base_url: std::env::var("ORACLE_API_BASE_URL").unwrap_or(default.oracle_api_base_url),
            oracle_model_name: std::env::var("ORACLE_MODEL_NAME").unwrap_or(default.oracle_model_name),
            oracle_max_retries: std::env::var("ORACLE_MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.oracle_max_retries),
            oracle_backoff_secs: std::env::var("ORACLE_BACKOFF_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.oracle_backoff_secs),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.http_timeout_secs),
            session_deadline_secs: std::env::var("SESSION_DEADLINE_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.session_deadline_secs),
        }
    }
}
