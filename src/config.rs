use std::time::Duration;

use crate::error::{AppError, AppResult};

/// 批次之间的固定冷却时间（毫秒）
pub const BATCH_COOLDOWN_MS: u64 = 1000;

/// 错峰间隔上限（毫秒）
pub const MAX_STAGGER_DELAY_MS: u64 = 60_000;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 每批同时处理的文件数量
    pub batch_size: usize,
    /// 同一批内相邻任务启动之间的间隔（毫秒），0 表示同时启动
    pub stagger_delay_ms: u64,
    /// 单次运行允许的最大文件数
    pub max_files: usize,
    /// 待处理文件所在目录
    pub input_folder: String,
    /// 模型库 JSON 文件
    pub library_file: String,
    /// 相似度提示阈值（严格大于才标注）
    pub similarity_threshold: f64,
    /// 发送给生成后端的最大文本长度（字符）
    pub max_text_chars: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 运行结束后是否直接提交全部生成结果
    pub auto_commit: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 生成参数 TOML 文件（可选）
    pub generation_settings_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 3,
            stagger_delay_ms: 0,
            max_files: 20,
            input_folder: "input_docs".to_string(),
            library_file: "model_library.json".to_string(),
            similarity_threshold: 0.60,
            max_text_chars: 12_000,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            auto_commit: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            generation_settings_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            batch_size: std::env::var("BATCH_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.batch_size),
            stagger_delay_ms: std::env::var("STAGGER_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.stagger_delay_ms),
            max_files: std::env::var("MAX_FILES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_files),
            input_folder: std::env::var("INPUT_FOLDER").unwrap_or(default.input_folder),
            library_file: std::env::var("LIBRARY_FILE").unwrap_or(default.library_file),
            similarity_threshold: std::env::var("SIMILARITY_THRESHOLD").ok().and_then(|v| v.parse().ok()).unwrap_or(default.similarity_threshold),
            max_text_chars: std::env::var("MAX_TEXT_CHARS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_text_chars),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            auto_commit: std::env::var("AUTO_COMMIT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.auto_commit),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            generation_settings_file: std::env::var("GENERATION_SETTINGS_FILE").ok().or(default.generation_settings_file),
        }
    }

    /// 校验配置，在运行开始前调用
    pub fn validate(&self) -> AppResult<()> {
        if self.batch_size == 0 {
            return Err(AppError::invalid_config("BATCH_SIZE", self.batch_size, "必须大于 0"));
        }
        if self.max_files == 0 {
            return Err(AppError::invalid_config("MAX_FILES", self.max_files, "必须大于 0"));
        }
        if self.stagger_delay_ms > MAX_STAGGER_DELAY_MS {
            return Err(AppError::invalid_config(
                "STAGGER_DELAY_MS",
                self.stagger_delay_ms,
                format!("不能超过 {}", MAX_STAGGER_DELAY_MS),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(AppError::invalid_config(
                "SIMILARITY_THRESHOLD",
                self.similarity_threshold,
                "必须位于 [0, 1] 区间",
            ));
        }
        Ok(())
    }

    /// 调度器使用的配置
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            batch_size: self.batch_size,
            stagger_delay: Duration::from_millis(self.stagger_delay_ms),
            cooldown: Duration::from_millis(BATCH_COOLDOWN_MS),
            max_files: self.max_files,
        }
    }
}

/// 批次调度配置
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub batch_size: usize,
    pub stagger_delay: Duration,
    pub cooldown: Duration,
    pub max_files: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Config::default().scheduler_config()
    }
}

impl SchedulerConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_stagger(mut self, preset: StaggerPreset) -> Self {
        self.stagger_delay = preset.delay();
        self
    }

    pub fn with_stagger_delay(mut self, delay: Duration) -> Self {
        self.stagger_delay = delay;
        self
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }
}

/// 界面上提供的错峰预设
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StaggerPreset {
    /// 同时启动
    None,
    Short,
    Medium,
    Long,
}

impl StaggerPreset {
    pub fn delay(self) -> Duration {
        Duration::from_millis(match self {
            StaggerPreset::None => 0,
            StaggerPreset::Short => 300,
            StaggerPreset::Medium => 500,
            StaggerPreset::Long => 1000,
        })
    }
}
