use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError};
use crate::models::settings::GenerationSettings;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载生成参数
pub async fn load_generation_settings(path: &Path) -> AppResult<GenerationSettings> {
    let content = fs::read_to_string(path).await.map_err(|e| {
        AppError::invalid_config("GENERATION_SETTINGS_FILE", path.display(), e.to_string())
    })?;

    toml::from_str(&content).map_err(|source| {
        AppError::Config(ConfigError::ParseFailed {
            path: path.display().to_string(),
            source,
        })
    })
}

/// 配置了文件就读取文件，否则使用环境配置
pub async fn resolve_generation_settings(config: &Config) -> AppResult<GenerationSettings> {
    match &config.generation_settings_file {
        Some(path) => {
            tracing::info!("📁 正在加载生成参数: {}", path);
            load_generation_settings(Path::new(path)).await
        }
        None => Ok(GenerationSettings::from_config(config)),
    }
}
