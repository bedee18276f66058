use anyhow::Result;
use iaai_scraper::models::{load_config, RunStatistics};
use iaai_scraper::orchestrator::App;
use iaai_scraper::utils::logging;
use std::path::PathBuf;
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    // 输入文件：命令行第一个参数，或 INPUT_FILE 环境变量
    let input = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("INPUT_FILE").ok())
        .map(PathBuf::from);

    // 加载配置
    let config = match load_config(input.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            logging::init(false);
            error!("❌ 配置无效: {:#}", e);
            return Err(e);
        }
    };

    // 初始化日志
    logging::init(config.debug_mode);

    // 初始化并运行应用
    let app = match App::initialize(config).await {
        Ok(app) => app,
        Err(e) => {
            error!("❌ 初始化失败: {:#}", e);
            let mut stats = RunStatistics::new();
            stats.finish();
            logging::print_final_stats(&stats);
            return Err(e);
        }
    };

    app.run().await;
    app.shutdown().await?;

    Ok(())
}
