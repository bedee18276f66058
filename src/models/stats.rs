//! 运行统计与终止原因

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// 断点状态：最近一次开始处理的页码（0 表示全新运行）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointState {
    pub last_page_processed: u32,
}

impl CheckpointState {
    pub fn new(last_page_processed: u32) -> Self {
        Self {
            last_page_processed,
        }
    }
}

/// 单次运行的统计，由编排层独占，运行结束时输出，不持久化
#[derive(Debug, Clone, Serialize)]
pub struct RunStatistics {
    pub pages_processed: u32,
    pub records_found: u64,
    pub records_saved: u64,
    pub records_created: u64,
    pub records_updated: u64,
    pub records_failed: u64,
    /// 缺少 stock 被丢弃的记录
    pub records_skipped: u64,
    pub page_errors: u32,
    /// 站点报告的总数（尽力获取，可能缺失）
    pub site_total: Option<u64>,
    pub started_at: DateTime<Local>,
    #[serde(skip)]
    started: Instant,
    pub duration: Duration,
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStatistics {
    pub fn new() -> Self {
        Self {
            pages_processed: 0,
            records_found: 0,
            records_saved: 0,
            records_created: 0,
            records_updated: 0,
            records_failed: 0,
            records_skipped: 0,
            page_errors: 0,
            site_total: None,
            started_at: Local::now(),
            started: Instant::now(),
            duration: Duration::ZERO,
        }
    }

    /// 记录结束时间
    pub fn finish(&mut self) {
        self.duration = self.started.elapsed();
    }

    /// 是否已达到站点报告的总数（总数未知时永远为 false）
    pub fn reached_site_total(&self) -> bool {
        matches!(self.site_total, Some(total) if self.records_found >= total)
    }

    /// 汇总多个起始 URL 的统计
    pub fn absorb(&mut self, other: &RunStatistics) {
        self.pages_processed += other.pages_processed;
        self.records_found += other.records_found;
        self.records_saved += other.records_saved;
        self.records_created += other.records_created;
        self.records_updated += other.records_updated;
        self.records_failed += other.records_failed;
        self.records_skipped += other.records_skipped;
        self.page_errors += other.page_errors;
        self.site_total = match (self.site_total, other.site_total) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
    }
}

/// 运行终止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// 当前页没有记录
    EmptyPage,
    /// 已抓取数量达到站点报告总数
    ReachedSiteTotal,
    /// 达到配置的最大页码
    MaxPages,
    /// 没有更多分页
    NoMoreResults,
    /// 分页导航失败
    NavigationFailed,
    /// 单页出错且策略为终止
    PageError,
    /// 结果列表未能加载
    NoResults,
    /// 整体运行超时
    TimedOut,
}

impl StopReason {
    /// 正常终止（非错误）
    pub fn is_normal(self) -> bool {
        matches!(
            self,
            StopReason::EmptyPage
                | StopReason::ReachedSiteTotal
                | StopReason::MaxPages
                | StopReason::NoMoreResults
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::EmptyPage => "当前页无记录",
            StopReason::ReachedSiteTotal => "已达到站点总数",
            StopReason::MaxPages => "已达到最大页数",
            StopReason::NoMoreResults => "没有更多分页",
            StopReason::NavigationFailed => "分页导航失败",
            StopReason::PageError => "页面处理出错",
            StopReason::NoResults => "未找到结果列表",
            StopReason::TimedOut => "运行超时",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_total_is_secondary_signal() {
        let mut stats = RunStatistics::new();
        stats.records_found = 500;
        assert!(!stats.reached_site_total());

        stats.site_total = Some(500);
        assert!(stats.reached_site_total());
    }

    #[test]
    fn test_absorb_sums_counters() {
        let mut total = RunStatistics::new();
        let mut a = RunStatistics::new();
        a.pages_processed = 2;
        a.records_saved = 40;
        a.site_total = Some(100);
        let mut b = RunStatistics::new();
        b.pages_processed = 1;
        b.records_failed = 3;

        total.absorb(&a);
        total.absorb(&b);

        assert_eq!(total.pages_processed, 3);
        assert_eq!(total.records_saved, 40);
        assert_eq!(total.records_failed, 3);
        assert_eq!(total.site_total, Some(100));
    }

    #[test]
    fn test_checkpoint_state_json_shape() {
        let json = serde_json::to_string(&CheckpointState::new(63)).unwrap();
        assert_eq!(json, r#"{"lastPageProcessed":63}"#);
    }
}
