//! 单个起始 URL 的抓取循环 - 编排层
//!
//! ```text
//! Init → (Resuming) → Scraping(page) → Scraping(page+1) | Terminated
//! ```
//!
//! 每页顺序固定：写断点 → 短暂等待 → 抽取 → 归一化 + upsert + 写数据集
//! → 统计 → 终止条件检查 → 翻页。

use crate::config::{Config, PageErrorPolicy};
use crate::error::{AppError, ExtractionError};
use crate::infrastructure::ListingView;
use crate::models::{fields, CheckpointState, RunStatistics, StopReason, VehicleRecord};
use crate::services::{
    CheckpointStore, DatasetWriter, Normalizer, PageExtractor, RecordSink, UpsertOutcome,
};
use crate::utils::logging::{log_page_header, truncate_text};
use crate::workflow::{AdvanceOutcome, PaginationController, PaginationSettings};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// 运行参数
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// 最大页码（绝对页码）
    pub max_pages: u32,
    pub navigation_timeout: Duration,
    pub results_timeout: Duration,
    /// 单页抽取上限
    pub page_timeout: Duration,
    /// 写完断点后、抽取前的等待
    pub pre_extract_pause: Duration,
    pub on_page_error: PageErrorPolicy,
    pub reset_checkpoint_on_complete: bool,
    pub pagination: PaginationSettings,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_pages: config.max_pages,
            navigation_timeout: config.navigation_timeout(),
            results_timeout: config.results_timeout(),
            page_timeout: config.page_timeout(),
            pre_extract_pause: Duration::from_secs(1),
            on_page_error: config.on_page_error,
            reset_checkpoint_on_complete: config.reset_checkpoint_on_complete,
            pagination: PaginationSettings {
                batch_size: config.batch_size,
                settle_timeout: config.settle_timeout(),
                settle_hard_bound: config.settle_hard_bound(),
                ..PaginationSettings::default()
            },
        }
    }
}

/// 单页处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageOutcome {
    Processed,
    Empty,
    Failed,
}

/// 一次抓取运行
///
/// 只借用协作者；统计由调用方持有，整体超时取消时已累计的统计仍然保留。
pub struct CrawlRun<'a> {
    label: String,
    view: &'a dyn ListingView,
    extractor: &'a dyn PageExtractor,
    checkpoint: &'a dyn CheckpointStore,
    sink: &'a dyn RecordSink,
    dataset: Option<&'a DatasetWriter>,
    normalizer: &'a Normalizer,
    settings: RunSettings,
}

impl<'a> CrawlRun<'a> {
    pub fn new(
        view: &'a dyn ListingView,
        extractor: &'a dyn PageExtractor,
        checkpoint: &'a dyn CheckpointStore,
        sink: &'a dyn RecordSink,
        normalizer: &'a Normalizer,
        settings: RunSettings,
    ) -> Self {
        Self {
            label: "#1".to_string(),
            view,
            extractor,
            checkpoint,
            sink,
            dataset: None,
            normalizer,
            settings,
        }
    }

    /// 日志前缀
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_dataset(mut self, dataset: &'a DatasetWriter) -> Self {
        self.dataset = Some(dataset);
        self
    }

    /// 从 `start_url` 开始抓取直到任一终止条件
    ///
    /// 只有打开起始页失败才返回 `Err`；其余情况都以 `StopReason` 结束。
    pub async fn run(
        &self,
        start_url: &str,
        stats: &mut RunStatistics,
    ) -> Result<StopReason, AppError> {
        let label = self.label.as_str();

        self.view
            .open(start_url, self.settings.navigation_timeout)
            .await?;
        if let Err(e) = self.view.dismiss_cookie_banner().await {
            debug!("[{}] 关闭 cookie 提示失败: {}", label, e);
        }

        if !self.view.ensure_results(self.settings.results_timeout).await? {
            error!("[{}] ❌ 结果列表未能加载", label);
            return Ok(StopReason::NoResults);
        }

        match self.view.site_total().await {
            Ok(Some(total)) => {
                info!("[{}] 🌐 站点报告车辆总数: {}", label, total);
                stats.site_total = Some(total);
            }
            Ok(None) => info!("[{}] 🌐 站点总数不可用 (N/A)", label),
            Err(e) => warn!("[{}] 读取站点总数失败: {}", label, e),
        }

        let controller = PaginationController::new(self.view, self.settings.pagination.clone());
        let mut page = match self.resume(&controller).await {
            Some(page) => page,
            None => return Ok(StopReason::NavigationFailed),
        };

        let reason = loop {
            if page > self.settings.max_pages {
                break StopReason::MaxPages;
            }

            log_page_header(label, page);
            match self.process_page(page, stats).await {
                PageOutcome::Processed => {}
                PageOutcome::Empty => {
                    info!("[{}] 🏁 第 {} 页没有记录，结束", label, page);
                    break StopReason::EmptyPage;
                }
                PageOutcome::Failed => {
                    if self.settings.on_page_error == PageErrorPolicy::Abort {
                        break StopReason::PageError;
                    }
                    warn!("[{}] 跳过第 {} 页，继续下一页", label, page);
                }
            }

            if stats.reached_site_total() {
                info!(
                    "[{}] 🏁 已抓取 {} 条，达到站点总数",
                    label, stats.records_found
                );
                break StopReason::ReachedSiteTotal;
            }
            if page >= self.settings.max_pages {
                info!("[{}] 🏁 已达到最大页数 {}", label, self.settings.max_pages);
                break StopReason::MaxPages;
            }

            match controller.advance(page).await {
                AdvanceOutcome::Advanced(next) => page = next,
                AdvanceOutcome::NoMoreResults => break StopReason::NoMoreResults,
                AdvanceOutcome::NavigationFailed => break StopReason::NavigationFailed,
            }
        };

        if reason.is_normal() && self.settings.reset_checkpoint_on_complete {
            match self.checkpoint.clear() {
                Ok(()) => info!("[{}] 🔄 断点已重置", label),
                Err(e) => warn!("[{}] 重置断点失败: {}", label, e),
            }
        }
        Ok(reason)
    }

    /// 读取断点并快进；返回开始抓取的页码，快进失败返回 `None`
    async fn resume(&self, controller: &PaginationController<'_>) -> Option<u32> {
        let label = self.label.as_str();
        let last_page = match self.checkpoint.load() {
            Ok(state) => state.last_page_processed,
            Err(e) => {
                warn!("[{}] ⚠️ 读取断点失败，从第 1 页开始: {}", label, e);
                0
            }
        };
        if last_page <= 1 {
            return Some(1);
        }

        info!("[{}] 🔁 检测到断点，上次处理到第 {} 页", label, last_page);
        match controller.fast_forward(last_page).await {
            Ok(report) => {
                info!(
                    "[{}] 快进完成: 第 {} 页 (下 10 页 {} 次, 直接跳转 {} 次)",
                    label, report.reached_page, report.batch_clicks, report.direct_jumps
                );
                Some(report.reached_page.max(1))
            }
            Err(e) => {
                error!("[{}] ❌ 快进失败: {}", label, e);
                None
            }
        }
    }

    async fn process_page(&self, page: u32, stats: &mut RunStatistics) -> PageOutcome {
        let label = self.label.as_str();

        // 抽取前写断点：中途退出时恢复会重抓这一页
        if let Err(e) = self.checkpoint.save(CheckpointState::new(page)) {
            warn!("[{}] ⚠️ 保存断点失败: {}", label, e);
        }
        sleep(self.settings.pre_extract_pause).await;

        let extracted = match timeout(
            self.settings.page_timeout,
            self.extractor.extract_page(self.view),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout(
                self.settings.page_timeout.as_millis() as u64,
            )),
        };
        let records = match extracted {
            Ok(records) => records,
            Err(e) => {
                stats.page_errors += 1;
                error!("[{}] ❌ 第 {} 页抽取失败: {}", label, page, e);
                return PageOutcome::Failed;
            }
        };
        if records.is_empty() {
            return PageOutcome::Empty;
        }

        stats.pages_processed += 1;
        stats.records_found += records.len() as u64;
        info!("[{}] 🚗 第 {} 页找到 {} 条记录", label, page, records.len());
        if let Some(title) = records.first().and_then(|r| r.get(fields::TITLE)) {
            debug!("[{}] 首条: {}", label, truncate_text(title, 60));
        }

        let saved_before = stats.records_saved;
        for raw in &records {
            match self.normalizer.normalize(raw) {
                Some(record) => self.persist_one(&record, stats),
                None => {
                    stats.records_skipped += 1;
                    debug!("[{}] 跳过缺少 stock 的记录", label);
                }
            }
        }
        info!(
            "[{}] 💾 第 {} 页保存 {} 条 (累计 {})",
            label,
            page,
            stats.records_saved - saved_before,
            stats.records_saved
        );
        PageOutcome::Processed
    }

    fn persist_one(&self, record: &VehicleRecord, stats: &mut RunStatistics) {
        match self.sink.upsert(record) {
            Ok(outcome) => {
                stats.records_saved += 1;
                match outcome {
                    UpsertOutcome::Created => stats.records_created += 1,
                    UpsertOutcome::Updated => stats.records_updated += 1,
                }
                if let Some(dataset) = self.dataset {
                    if let Err(e) = dataset.append(record) {
                        warn!("[{}] 写入数据集失败 ({}): {}", self.label, record.stock, e);
                    }
                }
            }
            Err(e) if e.is_constraint() => {
                stats.records_failed += 1;
                warn!("[{}] ⚠️ 记录 {} 违反约束: {}", self.label, record.stock, e);
            }
            Err(e) => {
                stats.records_failed += 1;
                error!("[{}] ❌ 保存 {} 失败: {}", self.label, record.stock, e);
            }
        }
    }
}
