//! 浏览器引导：启动新浏览器，或连接到已运行的浏览器

mod connection;
mod headless;

pub use connection::connect_to_browser;
pub use headless::launch_browser;

use crate::config::Config;
use anyhow::Result;
use chromiumoxide::Browser;

/// 配置了调试端口则连接，否则启动新浏览器
pub async fn open_browser(config: &Config) -> Result<Browser> {
    match config.browser_debug_port {
        Some(port) => connect_to_browser(port).await,
        None => launch_browser(config).await,
    }
}
