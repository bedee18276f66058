//! 多起始 URL 处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：打开数据库（失败即终止）、启动或连接浏览器
//! 2. **并发控制**：每个起始 URL 独占一个页面，最多 `max_concurrency` 个同时运行
//! 3. **整体超时**：每个起始 URL 受 `run_timeout` 约束，超时后保留已累计的统计
//! 4. **全局统计**：汇总所有起始 URL 的结果并输出（提前中止时同样输出）
//!
//! 唯一跨会话共享的可变状态是 `SqliteSink`。

use crate::browser;
use crate::config::Config;
use crate::infrastructure::{ChromiumListingView, JsExecutor};
use crate::models::{RunStatistics, StopReason};
use crate::orchestrator::crawl_run::{CrawlRun, RunSettings};
use crate::services::checkpoint::checkpoint_key;
use crate::services::{
    CheckpointStore, ChromiumExtractor, DatasetWriter, FileCheckpointStore,
    MemoryCheckpointStore, Normalizer, RecordSink, SqliteSink,
};
use crate::utils::logging::{log_run_summary, log_startup, print_final_stats};
use anyhow::{Context, Result};
use chromiumoxide::Browser;
use futures::stream::{self, StreamExt};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    browser: Browser,
    sink: SqliteSink,
    dataset: DatasetWriter,
    normalizer: Normalizer,
    extractor: ChromiumExtractor,
}

impl App {
    /// 初始化应用
    ///
    /// 数据库或浏览器不可用时直接返回错误，不做任何页面工作。
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let sink = SqliteSink::open(&config.database_path)
            .with_context(|| format!("无法打开数据库: {}", config.database_path))?;
        match sink.count() {
            Ok(count) => info!("📦 数据库中已有 {} 辆车", count),
            Err(e) => warn!("统计已有记录失败: {}", e),
        }
        if let Ok(recent) = sink.recent_stocks(5) {
            if !recent.is_empty() {
                debug!("最近写入: {}", recent.join(", "));
            }
        }

        let browser = browser::open_browser(&config).await?;

        Ok(Self {
            dataset: DatasetWriter::new(&config.dataset_path),
            normalizer: Normalizer::new(config.distance_mode, config.translate_damage),
            extractor: ChromiumExtractor::new(),
            config,
            browser,
            sink,
        })
    }

    /// 运行所有起始 URL，返回汇总统计
    pub async fn run(&self) -> RunStatistics {
        let concurrency = self.config.max_concurrency.max(1);
        info!(
            "📋 共 {} 个起始 URL，并发数 {}",
            self.config.start_urls.len(),
            concurrency
        );

        let results: Vec<RunStatistics> = stream::iter(self.config.start_urls.iter().enumerate())
            .map(|(index, url)| self.run_start_url(index, url))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut total = RunStatistics::new();
        for stats in &results {
            total.absorb(stats);
        }
        total.finish();
        print_final_stats(&total);
        total
    }

    /// 处理单个起始 URL
    async fn run_start_url(&self, index: usize, url: &str) -> RunStatistics {
        let label = format!("#{}", index + 1);
        let mut stats = RunStatistics::new();

        let page = match self.browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                error!("[{}] ❌ 创建页面失败: {}", label, e);
                stats.finish();
                log_run_summary(&label, &stats, StopReason::NavigationFailed);
                return stats;
            }
        };
        let view = ChromiumListingView::new(JsExecutor::new(page.clone()));
        let checkpoint = self.checkpoint_store(index);

        let run = CrawlRun::new(
            &view,
            &self.extractor,
            checkpoint.as_ref(),
            &self.sink,
            &self.normalizer,
            RunSettings::from_config(&self.config),
        )
        .with_label(label.clone())
        .with_dataset(&self.dataset);

        info!("[{}] 🔗 {}", label, url);
        let reason = match timeout(self.config.run_timeout(), run.run(url, &mut stats)).await {
            Ok(Ok(reason)) => reason,
            Ok(Err(e)) => {
                error!("[{}] ❌ 打开起始页失败: {}", label, e);
                StopReason::NavigationFailed
            }
            Err(_) => {
                warn!(
                    "[{}] ⏱️ 运行超过 {:?}，强制结束",
                    label,
                    self.config.run_timeout()
                );
                StopReason::TimedOut
            }
        };
        stats.finish();
        log_run_summary(&label, &stats, reason);

        if let Err(e) = page.close().await {
            debug!("[{}] 关闭页面失败: {}", label, e);
        }
        stats
    }

    fn checkpoint_store(&self, index: usize) -> Box<dyn CheckpointStore> {
        if self.config.checkpoint_dir.trim().is_empty() {
            Box::new(MemoryCheckpointStore::new())
        } else {
            let store = FileCheckpointStore::new(&self.config.checkpoint_dir, &checkpoint_key(index));
            debug!("断点文件: {}", store.path().display());
            Box::new(store)
        }
    }

    /// 关闭自己启动的浏览器；连接到外部浏览器时保持其运行
    pub async fn shutdown(mut self) -> Result<()> {
        if self.config.browser_debug_port.is_none() {
            self.browser.close().await?;
            let _ = self.browser.wait().await;
        }
        info!("👋 已退出");
        Ok(())
    }
}
