use serde::{Deserialize, Serialize};

use crate::config::Config;

/// 生成参数
///
/// 由调用方提供，整次运行中原样传给生成后端
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// 服务提供方名称，仅用于日志
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model_name: String,
    /// 风格提示，拼接进提示词
    #[serde(default)]
    pub style_hints: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// 单个文件最多生成的模型数
    #[serde(default = "default_max_models")]
    pub max_models_per_file: usize,
}

fn default_provider() -> String {
    "openai-compatible".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_max_models() -> usize {
    3
}

impl GenerationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            provider: default_provider(),
            model_name: config.llm_model_name.clone(),
            style_hints: Vec::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_models_per_file: default_max_models(),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
