use std::path::Path;

use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tracing::{debug, error, info};

use crate::config::Config;

/// 按配置启动浏览器（默认无头）
pub async fn launch_browser(config: &Config) -> Result<Browser> {
    info!(
        "🚀 启动浏览器 ({})...",
        if config.headless { "无头" } else { "有界面" }
    );

    let mut builder = BrowserConfig::builder();
    builder = if config.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(executable) = &config.chrome_executable {
        debug!("浏览器可执行文件: {}", executable);
        builder = builder.chrome_executable(Path::new(executable));
    }

    let mut args = vec![
        "--no-sandbox".to_string(),            // 容器内运行
        "--disable-setuid-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(), // 防止共享内存不足
        "--disable-gpu".to_string(),
    ];
    if let Some(proxy) = &config.proxy_server {
        args.push(format!("--proxy-server={}", proxy));
    }

    let browser_config = builder.args(args).build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        anyhow::anyhow!("配置浏览器失败: {}", e)
    })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow::anyhow!("启动浏览器失败: {}", e)
    })?;

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    info!("✅ 浏览器已启动");
    Ok(browser)
}
