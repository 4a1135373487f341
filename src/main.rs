use anyhow::Result;
use bulk_model_generate::utils::logging;
use bulk_model_generate::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志（终端 + 日志文件）
    logging::init_with_log_file(config.verbose_logging, &config.output_log_file)?;

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
