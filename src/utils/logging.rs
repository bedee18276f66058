/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use crate::config::Config;
use crate::models::{RunStatistics, StopReason};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则默认 `info`，调试模式下为 `debug`。
/// 重复调用不会报错（测试中会多次初始化）。
pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - IAAI 列表抓取");
    info!("🔗 起始 URL: {} 个", config.start_urls.len());
    for url in &config.start_urls {
        info!("   - {}", url);
    }
    info!("📊 最大并发数: {}", config.max_concurrency);
    info!("📄 最大页数: {}", config.max_pages);
    info!(
        "🖥️ 浏览器: {}",
        match config.browser_debug_port {
            Some(port) => format!("连接到调试端口 {}", port),
            None if config.headless => "无头模式".to_string(),
            None => "有界面模式".to_string(),
        }
    );
    if config.proxy_server.is_some() {
        info!("🌐 已启用代理");
    }
    info!("{}", "=".repeat(60));
}

/// 记录页面开始处理
pub fn log_page_header(label: &str, page: u32) {
    info!("\n{}", "─".repeat(60));
    info!("[{}] 📄 正在处理第 {} 页", label, page);
    info!("{}", "─".repeat(60));
}

/// 记录单个起始 URL 的运行结果
pub fn log_run_summary(label: &str, stats: &RunStatistics, reason: StopReason) {
    info!("\n{}", "─".repeat(60));
    if reason.is_normal() {
        info!("[{}] ✓ 运行结束: {}", label, reason);
    } else {
        warn!("[{}] ⚠️ 运行中止: {}", label, reason);
    }
    info!(
        "[{}] 页数 {} | 找到 {} | 保存 {} | 失败 {} | 跳过 {}",
        label,
        stats.pages_processed,
        stats.records_found,
        stats.records_saved,
        stats.records_failed,
        stats.records_skipped
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息（提前中止时同样输出）
pub fn print_final_stats(stats: &RunStatistics) {
    info!("\n{}", "=".repeat(60));
    info!("📊 抓取完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📄 处理页数: {}", stats.pages_processed);
    info!("🚗 找到记录: {}", stats.records_found);
    match stats.site_total {
        Some(total) => info!("🌐 站点总数: {}", total),
        None => info!("🌐 站点总数: N/A"),
    }
    info!(
        "✅ 已保存: {} (新增 {}, 更新 {})",
        stats.records_saved, stats.records_created, stats.records_updated
    );
    info!("❌ 保存失败: {}", stats.records_failed);
    info!("⏭️ 缺少 stock 跳过: {}", stats.records_skipped);
    info!("⚠️ 页面错误: {}", stats.page_errors);
    info!("⏱️ 耗时: {:.1} 秒", stats.duration.as_secs_f64());
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
