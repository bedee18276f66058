//! 列表视图 - 基础设施层
//!
//! `ListingView` 是分页控制器和抽取器看到的"活的分页列表"。
//! `ChromiumListingView` 用站点的 DOM 选择器在 `JsExecutor` 上实现它。

use crate::error::NavigationError;
use crate::infrastructure::JsExecutor;
use crate::services::normalizer::parse_int;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, warn};

/// 控件状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlState {
    /// 不存在或不可见
    Absent,
    /// 可见但不可点击
    Disabled,
    /// 可见且可点击
    Enabled,
}

/// 分页列表视图
///
/// 所有方法都是挂起点，实现必须自带超时，不允许无限阻塞。
#[async_trait]
pub trait ListingView: Send + Sync {
    /// 打开起始页
    async fn open(&self, url: &str, timeout: Duration) -> Result<(), NavigationError>;

    /// 关闭 cookie 提示（失败可忽略）
    async fn dismiss_cookie_banner(&self) -> Result<(), NavigationError>;

    /// 等待结果列表出现
    async fn ensure_results(&self, timeout: Duration) -> Result<bool, NavigationError>;

    /// 站点报告的总数（尽力获取）
    async fn site_total(&self) -> Result<Option<u64>, NavigationError>;

    async fn page_button_state(&self, page: u32) -> Result<ControlState, NavigationError>;
    async fn is_page_active(&self, page: u32) -> Result<bool, NavigationError>;
    async fn click_page_button(&self, page: u32) -> Result<(), NavigationError>;

    /// "下 10 页" 控件
    async fn batch_advance_state(&self) -> Result<ControlState, NavigationError>;
    async fn click_batch_advance(&self) -> Result<(), NavigationError>;

    /// "下一页" 控件
    async fn next_state(&self) -> Result<ControlState, NavigationError>;
    async fn click_next(&self) -> Result<(), NavigationError>;

    /// 等待加载指示器隐藏；`Ok(false)` 表示超时仍可见
    async fn wait_for_loader_hidden(&self, timeout: Duration) -> Result<bool, NavigationError>;

    /// 当前高亮的页码
    async fn active_page(&self) -> Result<Option<u32>, NavigationError>;

    /// 在页面上执行脚本（抽取器使用）
    async fn evaluate(&self, script: &str) -> Result<JsonValue, NavigationError>;
}

const RESULTS_SELECTOR: &str = "div.table-body";
const LOADER_SELECTOR: &str = ".circle-loader-shape";
const OVERLAY_SELECTOR: &str = ".blockUI.blockOverlay";
const BATCH_SELECTOR: &str = "button.btn-next-10";
const NEXT_SELECTOR: &str = "button.btn-next";
const COOKIE_SELECTOR: &str = "#truste-consent-button";
const TOTAL_SELECTOR: &str = "label.label--total";

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const OVERLAY_TIMEOUT: Duration = Duration::from_secs(5);
const COOKIE_TIMEOUT: Duration = Duration::from_secs(3);

fn page_selector(page: u32) -> String {
    format!("button#PageNumber{}", page)
}

fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// 脚本用 0 表示"没有激活页"（`null` 无法作为求值结果返回）
fn page_from_script(value: i64) -> Option<u32> {
    u32::try_from(value).ok().filter(|&page| page > 0)
}

/// 站点总数标签，例如 "1,234 Vehicles"；空串表示标签不存在
fn total_from_label(text: &str) -> Option<u64> {
    parse_int(text).and_then(|n| u64::try_from(n).ok())
}

fn state_script(selector: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = document.querySelector({sel});
            if (!el) return 'absent';
            const style = window.getComputedStyle(el);
            if (el.offsetParent === null || style.visibility === 'hidden' || style.display === 'none') {{
                return 'absent';
            }}
            const disabled = el.disabled
                || el.getAttribute('aria-disabled') === 'true'
                || el.classList.contains('disabled');
            return disabled ? 'disabled' : 'enabled';
        }})()
        "#,
        sel = js_str(selector)
    )
}

fn click_script(selector: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            el.scrollIntoView({{ block: 'center' }});
            el.click();
            return true;
        }})()
        "#,
        sel = js_str(selector)
    )
}

fn hidden_script(selector: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = document.querySelector({sel});
            if (!el) return true;
            const style = window.getComputedStyle(el);
            return el.offsetParent === null || style.visibility === 'hidden' || style.display === 'none';
        }})()
        "#,
        sel = js_str(selector)
    )
}

/// 基于 Chromium 的列表视图
pub struct ChromiumListingView {
    executor: JsExecutor,
}

impl ChromiumListingView {
    pub fn new(executor: JsExecutor) -> Self {
        Self { executor }
    }

    async fn control_state(&self, selector: &str) -> Result<ControlState, NavigationError> {
        self.executor
            .eval_as(state_script(selector))
            .await
            .map_err(script_error)
    }

    async fn click(&self, selector: &str) -> Result<(), NavigationError> {
        let clicked: bool = self
            .executor
            .eval_as(click_script(selector))
            .await
            .map_err(script_error)?;
        if clicked {
            debug!("已点击: {}", selector);
            Ok(())
        } else {
            Err(NavigationError::Script(format!("控件不存在: {}", selector)))
        }
    }

    async fn wait_hidden(&self, selector: &str, limit: Duration) -> Result<bool, NavigationError> {
        self.executor
            .wait_until(&hidden_script(selector), limit, POLL_INTERVAL)
            .await
            .map_err(script_error)
    }
}

fn script_error(err: anyhow::Error) -> NavigationError {
    NavigationError::Script(format!("{:#}", err))
}

#[async_trait]
impl ListingView for ChromiumListingView {
    async fn open(&self, url: &str, timeout: Duration) -> Result<(), NavigationError> {
        debug!("导航到: {}", url);
        match tokio::time::timeout(timeout, self.executor.page().goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(NavigationError::Timeout {
                what: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn dismiss_cookie_banner(&self) -> Result<(), NavigationError> {
        let visible = self
            .executor
            .wait_until(
                &format!("{} !== 'absent'", state_script(COOKIE_SELECTOR).trim()),
                COOKIE_TIMEOUT,
                POLL_INTERVAL,
            )
            .await
            .map_err(script_error)?;
        if visible {
            self.click(COOKIE_SELECTOR).await?;
        }
        Ok(())
    }

    async fn ensure_results(&self, timeout: Duration) -> Result<bool, NavigationError> {
        let present = self
            .executor
            .wait_until(
                &format!("!!document.querySelector({})", js_str(RESULTS_SELECTOR)),
                timeout,
                POLL_INTERVAL,
            )
            .await
            .map_err(script_error)?;
        if !present {
            warn!("⚠️ 未找到结果列表");
            return Ok(false);
        }
        self.wait_for_loader_hidden(timeout).await?;
        Ok(true)
    }

    async fn site_total(&self) -> Result<Option<u64>, NavigationError> {
        let text: String = self
            .executor
            .eval_as(format!(
                "(() => {{ const el = document.querySelector({}); return el ? el.textContent : ''; }})()",
                js_str(TOTAL_SELECTOR)
            ))
            .await
            .map_err(script_error)?;
        Ok(total_from_label(&text))
    }

    async fn page_button_state(&self, page: u32) -> Result<ControlState, NavigationError> {
        self.control_state(&page_selector(page)).await
    }

    async fn is_page_active(&self, page: u32) -> Result<bool, NavigationError> {
        self.executor
            .eval_as(format!(
                "(() => {{ const el = document.querySelector({}); return !!el && el.classList.contains('active'); }})()",
                js_str(&page_selector(page))
            ))
            .await
            .map_err(script_error)
    }

    async fn click_page_button(&self, page: u32) -> Result<(), NavigationError> {
        self.click(&page_selector(page)).await
    }

    async fn batch_advance_state(&self) -> Result<ControlState, NavigationError> {
        self.control_state(BATCH_SELECTOR).await
    }

    async fn click_batch_advance(&self) -> Result<(), NavigationError> {
        self.click(BATCH_SELECTOR).await
    }

    async fn next_state(&self) -> Result<ControlState, NavigationError> {
        self.control_state(NEXT_SELECTOR).await
    }

    async fn click_next(&self) -> Result<(), NavigationError> {
        self.click(NEXT_SELECTOR).await
    }

    async fn wait_for_loader_hidden(&self, timeout: Duration) -> Result<bool, NavigationError> {
        let hidden = self.wait_hidden(LOADER_SELECTOR, timeout).await?;
        // 遮罩层超时不影响结果
        if !self.wait_hidden(OVERLAY_SELECTOR, OVERLAY_TIMEOUT).await? {
            debug!("遮罩层在 {:?} 内未消失", OVERLAY_TIMEOUT);
        }
        Ok(hidden)
    }

    async fn active_page(&self) -> Result<Option<u32>, NavigationError> {
        let page: i64 = self
            .executor
            .eval_as(
                r#"
                (() => {
                    const el = document.querySelector('button[id^="PageNumber"].active');
                    if (!el) return 0;
                    const n = parseInt(el.id.replace('PageNumber', ''), 10);
                    return Number.isNaN(n) ? 0 : n;
                })()
                "#,
            )
            .await
            .map_err(script_error)?;
        Ok(page_from_script(page))
    }

    async fn evaluate(&self, script: &str) -> Result<JsonValue, NavigationError> {
        self.executor.eval(script).await.map_err(script_error)
    }
}
