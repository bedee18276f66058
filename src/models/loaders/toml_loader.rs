use crate::config::Config;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 加载运行配置
///
/// 指定了输入文件则从 TOML 读取（缺省字段取默认值），否则读取环境变量。
pub async fn load_config(input_path: Option<&Path>) -> Result<Config> {
    let config = match input_path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("无法读取输入文件: {}", path.display()))?;
            tracing::info!("正在加载输入文件: {}", path.display());
            Config::from_toml_str(&content)
                .with_context(|| format!("无法解析输入文件: {}", path.display()))?
        }
        None => Config::from_env(),
    };

    config.validate()?;
    Ok(config)
}
