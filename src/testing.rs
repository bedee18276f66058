//! 测试替身：模拟分页栏、脚本化抽取器、内存写入端

use crate::error::{ExtractionError, NavigationError, PersistError};
use crate::infrastructure::{ControlState, ListingView};
use crate::models::{fields, RawRecord, VehicleRecord};
use crate::services::{PageExtractor, RecordSink, UpsertOutcome};
use crate::workflow::PaginationSettings;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub fn fast_settings() -> PaginationSettings {
    PaginationSettings {
        batch_size: 10,
        settle_timeout: Duration::from_millis(5),
        settle_hard_bound: Duration::from_millis(200),
        batch_render_pause: Duration::from_millis(0),
    }
}

/// 点击计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionLog {
    pub page_clicks: u32,
    pub batch_clicks: u32,
    pub next_clicks: u32,
}

#[derive(Debug, Default)]
struct PagerState {
    active: u32,
    block_start: u32,
    log: ActionLog,
    hide_page_numbers: bool,
    batch_lands_on_previous: bool,
    batch_noop: bool,
    active_unreadable: bool,
    active_read_fails: bool,
    disabled_pages: HashSet<u32>,
    disabled_checks: HashMap<u32, u32>,
    loader_stuck: bool,
    loader_hangs: bool,
    clicks_fail: bool,
    has_results: bool,
    site_total: Option<u64>,
}

/// 模拟 IAAI 分页栏：一次显示 `batch_size` 个页码，带"下 10 页"和"下一页"
pub struct SimulatedPager {
    total_pages: u32,
    batch_size: u32,
    state: Mutex<PagerState>,
}

impl SimulatedPager {
    pub fn new(total_pages: u32, batch_size: u32) -> Self {
        Self {
            total_pages,
            batch_size,
            state: Mutex::new(PagerState {
                active: 1,
                block_start: 1,
                has_results: true,
                ..Default::default()
            }),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PagerState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    fn block_of(&self, page: u32) -> u32 {
        ((page.max(1) - 1) / self.batch_size) * self.batch_size + 1
    }

    fn block_end(&self, block_start: u32) -> u32 {
        (block_start + self.batch_size - 1).min(self.total_pages)
    }

    pub fn active(&self) -> u32 {
        self.with_state(|s| s.active)
    }

    pub fn set_active(&self, page: u32) {
        let block = self.block_of(page);
        self.with_state(|s| {
            s.active = page;
            s.block_start = block;
        });
    }

    pub fn actions(&self) -> ActionLog {
        self.with_state(|s| s.log)
    }

    pub fn hide_page_numbers(&self, hide: bool) {
        self.with_state(|s| s.hide_page_numbers = hide);
    }

    /// "下 10 页"之后仍高亮旧页码（新一组按钮中没有激活项）
    pub fn set_batch_lands_on_previous(&self, value: bool) {
        self.with_state(|s| s.batch_lands_on_previous = value);
    }

    /// "下 10 页"可点击但点击后什么都不变
    pub fn set_batch_noop(&self, value: bool) {
        self.with_state(|s| s.batch_noop = value);
    }

    /// 没有高亮的页码按钮，`active_page` 读不到
    pub fn set_active_unreadable(&self, value: bool) {
        self.with_state(|s| s.active_unreadable = value);
    }

    /// 读取当前页码的脚本报错
    pub fn set_active_read_fails(&self, value: bool) {
        self.with_state(|s| s.active_read_fails = value);
    }

    /// 页码按钮始终显示为不可用
    pub fn show_page_disabled(&self, page: u32) {
        self.with_state(|s| {
            s.disabled_pages.insert(page);
        });
    }

    /// 页码按钮在前 `checks` 次检查中显示为不可用
    pub fn disable_page_for_checks(&self, page: u32, checks: u32) {
        self.with_state(|s| {
            s.disabled_checks.insert(page, checks);
        });
    }

    pub fn set_loader_stuck(&self, value: bool) {
        self.with_state(|s| s.loader_stuck = value);
    }

    pub fn set_loader_hangs(&self, value: bool) {
        self.with_state(|s| s.loader_hangs = value);
    }

    pub fn set_clicks_fail(&self, value: bool) {
        self.with_state(|s| s.clicks_fail = value);
    }

    pub fn set_has_results(&self, value: bool) {
        self.with_state(|s| s.has_results = value);
    }

    pub fn set_site_total(&self, total: Option<u64>) {
        self.with_state(|s| s.site_total = total);
    }

    fn click_guard(state: &PagerState) -> Result<(), NavigationError> {
        if state.clicks_fail {
            Err(NavigationError::Script("click rejected".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ListingView for SimulatedPager {
    async fn open(&self, _url: &str, _timeout: Duration) -> Result<(), NavigationError> {
        Ok(())
    }

    async fn dismiss_cookie_banner(&self) -> Result<(), NavigationError> {
        Ok(())
    }

    async fn ensure_results(&self, _timeout: Duration) -> Result<bool, NavigationError> {
        Ok(self.with_state(|s| s.has_results))
    }

    async fn site_total(&self) -> Result<Option<u64>, NavigationError> {
        Ok(self.with_state(|s| s.site_total))
    }

    async fn page_button_state(&self, page: u32) -> Result<ControlState, NavigationError> {
        Ok(self.with_state(|s| {
            if s.hide_page_numbers || page == 0 || page > self.total_pages {
                return ControlState::Absent;
            }
            if s.disabled_pages.contains(&page) {
                return ControlState::Disabled;
            }
            if let Some(remaining) = s.disabled_checks.get_mut(&page) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return ControlState::Disabled;
                }
            }
            if (s.block_start..=self.block_end(s.block_start)).contains(&page) {
                ControlState::Enabled
            } else {
                ControlState::Absent
            }
        }))
    }

    async fn is_page_active(&self, page: u32) -> Result<bool, NavigationError> {
        Ok(self.with_state(|s| s.active == page))
    }

    async fn click_page_button(&self, page: u32) -> Result<(), NavigationError> {
        self.with_state(|s| {
            Self::click_guard(s)?;
            if s.hide_page_numbers
                || !(s.block_start..=self.block_end(s.block_start)).contains(&page)
            {
                return Err(NavigationError::Script(format!("no button {}", page)));
            }
            s.active = page;
            s.log.page_clicks += 1;
            Ok(())
        })
    }

    async fn batch_advance_state(&self) -> Result<ControlState, NavigationError> {
        Ok(self.with_state(|s| {
            if s.block_start + self.batch_size <= self.total_pages {
                ControlState::Enabled
            } else {
                ControlState::Absent
            }
        }))
    }

    async fn click_batch_advance(&self) -> Result<(), NavigationError> {
        self.with_state(|s| {
            Self::click_guard(s)?;
            if s.block_start + self.batch_size > self.total_pages {
                return Err(NavigationError::Script("no next block".into()));
            }
            s.log.batch_clicks += 1;
            if s.batch_noop {
                return Ok(());
            }
            s.block_start += self.batch_size;
            if !s.batch_lands_on_previous {
                s.active = s.block_start;
            }
            Ok(())
        })
    }

    async fn next_state(&self) -> Result<ControlState, NavigationError> {
        Ok(self.with_state(|s| {
            if s.active < self.total_pages {
                ControlState::Enabled
            } else {
                ControlState::Disabled
            }
        }))
    }

    async fn click_next(&self) -> Result<(), NavigationError> {
        let block = self.with_state(|s| s.active + 1);
        let block = self.block_of(block);
        self.with_state(|s| {
            Self::click_guard(s)?;
            if s.active >= self.total_pages {
                return Err(NavigationError::Script("next disabled".into()));
            }
            s.active += 1;
            s.block_start = block;
            s.log.next_clicks += 1;
            Ok(())
        })
    }

    async fn wait_for_loader_hidden(&self, _timeout: Duration) -> Result<bool, NavigationError> {
        let (stuck, hangs) = self.with_state(|s| (s.loader_stuck, s.loader_hangs));
        if hangs {
            std::future::pending::<()>().await;
        }
        Ok(!stuck)
    }

    async fn active_page(&self) -> Result<Option<u32>, NavigationError> {
        self.with_state(|s| {
            if s.active_read_fails {
                return Err(NavigationError::Script("No value found".into()));
            }
            Ok((!s.active_unreadable).then_some(s.active))
        })
    }

    async fn evaluate(&self, _script: &str) -> Result<JsonValue, NavigationError> {
        Ok(JsonValue::Null)
    }
}

/// 按当前激活页生成记录的抽取器
///
/// 第 p 页第 i 条记录的 stock 为 `p * 100 + i`。
pub struct ScriptedExtractor {
    per_page: usize,
    empty_from: Option<u32>,
    failing_pages: HashSet<u32>,
    hanging_page: Option<u32>,
    stockless_per_page: usize,
    calls: Mutex<Vec<u32>>,
}

impl ScriptedExtractor {
    pub fn new(per_page: usize) -> Self {
        Self {
            per_page,
            empty_from: None,
            failing_pages: HashSet::new(),
            hanging_page: None,
            stockless_per_page: 0,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 从第 `page` 页起返回空列表
    pub fn empty_from(mut self, page: u32) -> Self {
        self.empty_from = Some(page);
        self
    }

    pub fn failing_on(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    /// 在第 `page` 页永远不返回（模拟进程在抽取中途退出）
    pub fn hanging_on(mut self, page: u32) -> Self {
        self.hanging_page = Some(page);
        self
    }

    pub fn with_stockless(mut self, count: usize) -> Self {
        self.stockless_per_page = count;
        self
    }

    /// 每次抽取时的页码
    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stock_for(page: u32, index: usize) -> String {
        (page as usize * 100 + index).to_string()
    }
}

#[async_trait]
impl PageExtractor for ScriptedExtractor {
    async fn extract_page(
        &self,
        view: &dyn ListingView,
    ) -> Result<Vec<RawRecord>, ExtractionError> {
        let page = view
            .active_page()
            .await
            .map_err(|e| ExtractionError::Script(e.to_string()))?
            .unwrap_or(0);
        self.calls.lock().unwrap().push(page);

        if self.hanging_page == Some(page) {
            std::future::pending::<()>().await;
        }
        if self.failing_pages.contains(&page) {
            return Err(ExtractionError::Script(format!("page {} exploded", page)));
        }
        if matches!(self.empty_from, Some(from) if page >= from) {
            return Ok(Vec::new());
        }

        let mut records: Vec<RawRecord> = (0..self.per_page)
            .map(|i| {
                RawRecord::new()
                    .with(fields::STOCK, Self::stock_for(page, i))
                    .with(fields::TITLE, "2019 Toyota Camry SE")
                    .with(fields::BID_PRICE, "$1,250")
            })
            .collect();
        records.extend(
            (0..self.stockless_per_page)
                .map(|_| RawRecord::new().with(fields::TITLE, "2018 Ford Focus")),
        );
        Ok(records)
    }
}

/// 内存写入端
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<HashMap<String, VehicleRecord>>,
    failing_stocks: HashSet<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, stock: &str) -> Self {
        self.failing_stocks.insert(stock.to_string());
        self
    }

    pub fn stocks(&self) -> HashSet<String> {
        self.records.lock().unwrap().keys().cloned().collect()
    }
}

impl RecordSink for RecordingSink {
    fn upsert(&self, record: &VehicleRecord) -> Result<UpsertOutcome, PersistError> {
        if self.failing_stocks.contains(&record.stock) {
            return Err(PersistError::Transient("connection reset".into()));
        }
        let previous = self
            .records
            .lock()
            .unwrap()
            .insert(record.stock.clone(), record.clone());
        Ok(if previous.is_some() {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Created
        })
    }

    fn count(&self) -> Result<u64, PersistError> {
        Ok(self.records.lock().unwrap().len() as u64)
    }
}
