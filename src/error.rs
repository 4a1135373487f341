use thiserror::Error;

/// 应用程序错误类型
///
/// 单个文件的提取/生成失败不会走到这里，它们在执行层被转换为
/// `Outcome::Failure`。这里只承载"整次运行"级别的错误。
#[derive(Debug, Error)]
pub enum AppError {
    /// 运行前的参数校验错误
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 文本提取错误
    #[error("提取错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// 生成后端错误
    #[error("生成错误: {0}")]
    Generation(#[from] GenerationError),
    /// 模型库存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 审阅状态机错误
    #[error("审阅错误: {0}")]
    Review(#[from] ReviewError),
    /// 运行控制器错误
    #[error("运行错误: {0}")]
    Run(#[from] RunError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 运行前的校验错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// 没有提交任何文件
    #[error("文件列表不能为空")]
    EmptyFileSet,
    /// 文件数量超过上限
    #[error("文件数量 {count} 超过上限 {max}")]
    TooManyFiles { count: usize, max: usize },
    /// 批次大小必须为正数
    #[error("批次大小必须大于 0")]
    InvalidBatchSize,
}

/// 文本提取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 文件不是可识别的文本
    #[error("不支持的文件格式: {name}")]
    UnsupportedFormat { name: String },
    /// 提取结果为空
    #[error("文件中没有可提取的文本: {name}")]
    EmptyText { name: String },
}

/// 生成后端错误
#[derive(Debug, Error)]
pub enum GenerationError {
    /// API 调用失败
    #[error("生成接口调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 返回内容为空
    #[error("生成接口返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 返回内容无法解析为模型列表
    #[error("无法解析生成结果: {message}")]
    MalformedResponse { message: String },
}

/// 模型库存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 读取模型库失败
    #[error("读取模型库失败 ({path}): {message}")]
    LoadFailed { path: String, message: String },
    /// 写入模型库失败
    #[error("写入模型库失败 ({path}): {message}")]
    PersistFailed { path: String, message: String },
}

/// 审阅状态机错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReviewError {
    /// 当前状态不允许该操作
    #[error("审阅已处于 {state} 状态，不能执行 {operation}")]
    IllegalTransition {
        state: &'static str,
        operation: &'static str,
    },
    /// 模型不存在
    #[error("找不到模型: {id}")]
    ModelNotFound { id: String },
    /// 运行尚未结束，不能进入审阅
    #[error("运行处于 {state} 状态，尚未结束")]
    RunNotFinished { state: &'static str },
}

/// 运行控制器错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunError {
    /// 控制器已经驱动过一次运行
    #[error("运行控制器已处于 {state} 状态，不能再次启动")]
    AlreadyStarted { state: &'static str },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置值不合法
    #[error("配置项 {name} 的值 '{value}' 不合法: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Generation(GenerationError::MalformedResponse {
            message: err.to_string(),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::ParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: err,
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Extraction(ExtractionError::ReadFailed {
            path: String::new(),
            source: err,
        })
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Other(format!("{:#}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建配置值不合法错误
    pub fn invalid_config(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        })
    }

    /// 创建审阅非法状态转换错误
    pub fn illegal_review(state: &'static str, operation: &'static str) -> Self {
        AppError::Review(ReviewError::IllegalTransition { state, operation })
    }

    /// 创建模型库读取错误
    pub fn store_load_failed(path: impl Into<String>, message: impl ToString) -> Self {
        AppError::Store(StoreError::LoadFailed {
            path: path.into(),
            message: message.to_string(),
        })
    }

    /// 创建模型库写入错误
    pub fn store_persist_failed(path: impl Into<String>, message: impl ToString) -> Self {
        AppError::Store(StoreError::PersistFailed {
            path: path.into(),
            message: message.to_string(),
        })
    }

    /// 是否为运行前的校验错误
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
