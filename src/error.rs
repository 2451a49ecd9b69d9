use std::fmt;

/// 会话错误类型
///
/// 所有错误都只终止自己所属的会话，绝不升级为进程级失败。
/// 非 JSON 的提交响应不是错误，而是链条的正常完成信号，因此不出现在这里。
#[derive(Debug)]
pub enum SessionError {
    /// GET 页面失败（传输层或超时）
    Fetch {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// POST 提交失败（传输层或超时）
    Submit {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 页面中找不到提交地址
    NoSubmitTarget {
        url: String,
    },
    /// Oracle 错误（重试耗尽后）
    Oracle(OracleError),
    /// 会话截止时间已到
    DeadlineExceeded,
    /// 检测到循环：服务器返回的下一个 URL 与当前 URL 相同
    CycleDetected {
        url: String,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Fetch { url, source } => {
                write!(f, "页面抓取失败 ({}): {}", url, source)
            }
            SessionError::Submit { url, source } => {
                write!(f, "答案提交失败 ({}): {}", url, source)
            }
            SessionError::NoSubmitTarget { url } => {
                write!(f, "页面中找不到提交地址: {}", url)
            }
            SessionError::Oracle(e) => write!(f, "Oracle错误: {}", e),
            SessionError::DeadlineExceeded => write!(f, "会话截止时间已到"),
            SessionError::CycleDetected { url } => {
                write!(f, "检测到循环: 服务器再次返回 {}", url)
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Fetch { source, .. } | SessionError::Submit { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            SessionError::Oracle(e) => Some(e),
            _ => None,
        }
    }
}

/// Oracle（外部推理服务）错误
#[derive(Debug)]
pub enum OracleError {
    /// API 调用失败
    ApiCallFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回内容为空
    EmptyContent {
        model: String,
    },
    /// 响应不符合"单字段 JSON"契约且无法按裸标量解析
    ContractViolated {
        response: String,
    },
    /// 重试耗尽
    RetriesExhausted {
        attempts: u32,
        last_error: String,
    },
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::ApiCallFailed { model, source } => {
                write!(f, "Oracle API调用失败 (模型: {}): {}", model, source)
            }
            OracleError::EmptyContent { model } => {
                write!(f, "Oracle返回内容为空 (模型: {})", model)
            }
            OracleError::ContractViolated { response } => {
                write!(f, "Oracle响应不符合契约: {}", response)
            }
            OracleError::RetriesExhausted {
                attempts,
                last_error,
            } => {
                write!(
                    f,
                    "Oracle重试耗尽 (共尝试 {} 次), 最后一次错误: {}",
                    attempts, last_error
                )
            }
        }
    }
}

impl std::error::Error for OracleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OracleError::ApiCallFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<OracleError> for SessionError {
    fn from(err: OracleError) -> Self {
        SessionError::Oracle(err)
    }
}

// ========== 便捷构造函数 ==========

impl SessionError {
    /// 创建页面抓取错误
    pub fn fetch_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SessionError::Fetch {
            url: url.into(),
            source: Box::new(source),
        }
    }

    /// 创建答案提交错误
    pub fn submit_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SessionError::Submit {
            url: url.into(),
            source: Box::new(source),
        }
    }

    /// 终止原因的简短标识（用于统计和最终报告）
    pub fn reason(&self) -> crate::models::session::AbortReason {
        use crate::models::session::AbortReason;
        match self {
            SessionError::Fetch { .. } => AbortReason::FetchError,
            SessionError::Submit { .. } => AbortReason::SubmitError,
            SessionError::NoSubmitTarget { .. } => AbortReason::NoSubmitTarget,
            SessionError::Oracle(_) => AbortReason::OracleError,
            SessionError::DeadlineExceeded => AbortReason::DeadlineExceeded,
            SessionError::CycleDetected { .. } => AbortReason::CycleDetected,
        }
    }
}

// ========== Result 类型别名 ==========

/// 会话内部结果类型
pub type SessionResult<T> = Result<T, SessionError>;
