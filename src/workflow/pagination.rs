//! 分页控制 - 流程层
//!
//! 把活的分页列表从第 N 页推进到第 N+1 页，或判断已没有更多页。
//!
//! 策略顺序固定：
//! 1. 直接点击页码 `N+1`（必须可见且可用）
//! 2. "下 10 页"（仅当 `N+1` 的页码按钮**不存在**时）
//! 3. "下一页"
//!
//! 每次成功点击后都要等待加载指示器消失（settle），软超时只告警，
//! 超过硬上限或视图出错才算导航失败。

use crate::error::NavigationError;
use crate::infrastructure::{ControlState, ListingView};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// 一次翻页的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// 已到达新页
    Advanced(u32),
    /// 没有可用的导航控件，正常结束
    NoMoreResults,
    /// 页面卡死或控件全部出错，本次运行应停止
    NavigationFailed,
}

/// 快进报告
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastForwardReport {
    /// 视图实际停留的页码
    pub reached_page: u32,
    pub batch_clicks: u32,
    pub direct_jumps: u32,
}

/// 分页参数
#[derive(Debug, Clone)]
pub struct PaginationSettings {
    /// 分页栏每组页码数
    pub batch_size: u32,
    /// settle 软超时：超时后告警并继续
    pub settle_timeout: Duration,
    /// settle 硬上限：超过即导航失败
    pub settle_hard_bound: Duration,
    /// 点击"下 10 页"后等待分页栏重绘
    pub batch_render_pause: Duration,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            settle_timeout: Duration::from_secs(25),
            settle_hard_bound: Duration::from_secs(60),
            batch_render_pause: Duration::from_secs(2),
        }
    }
}

/// 直接跳转的结果
enum DirectJump {
    Clicked,
    Absent,
    Disabled,
}

/// 分页控制器
///
/// 不持有视图，只借用；同一视图同一时间只能有一个控制器在操作。
pub struct PaginationController<'a> {
    view: &'a dyn ListingView,
    settings: PaginationSettings,
}

impl<'a> PaginationController<'a> {
    pub fn new(view: &'a dyn ListingView, settings: PaginationSettings) -> Self {
        Self { view, settings }
    }

    /// 等待页面稳定
    ///
    /// 软超时告警后继续；硬上限或视图错误返回 `Err`。
    pub async fn settle(&self) -> Result<(), NavigationError> {
        let hard_bound = self.settings.settle_hard_bound;
        match timeout(
            hard_bound,
            self.view.wait_for_loader_hidden(self.settings.settle_timeout),
        )
        .await
        {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => {
                warn!(
                    "⚠️ 加载指示器在 {:?} 内未消失，继续执行",
                    self.settings.settle_timeout
                );
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(NavigationError::Stuck(format!(
                "等待页面稳定超过硬上限 {:?}",
                hard_bound
            ))),
        }
    }

    /// 从 `current_page` 推进到下一页
    pub async fn advance(&self, current_page: u32) -> AdvanceOutcome {
        let target = current_page + 1;
        let mut tier_failed = false;

        if let Err(e) = self.settle().await {
            error!("❌ 翻页前页面未稳定: {}", e);
            return AdvanceOutcome::NavigationFailed;
        }

        // ① 直接跳转
        let skip_batch = match self.try_direct(target).await {
            Ok(DirectJump::Clicked) => return self.after_click(target).await,
            Ok(DirectJump::Absent) => false,
            // 按钮存在但不可用意味着"等待"，不能跳到下一组
            Ok(DirectJump::Disabled) => {
                debug!("第 {} 页按钮不可用，跳过\"下 10 页\"", target);
                true
            }
            Err(e) => {
                warn!("直接跳转到第 {} 页失败: {}", target, e);
                tier_failed = true;
                false
            }
        };

        // ② 下 10 页
        if !skip_batch {
            match self.view.batch_advance_state().await {
                Ok(ControlState::Enabled) => return self.batch_then_direct(target).await,
                Ok(_) => {}
                Err(e) => {
                    warn!("检查\"下 10 页\"失败: {}", e);
                    tier_failed = true;
                }
            }
        }

        // ③ 下一页
        match self.try_next().await {
            Ok(true) => return self.after_click(target).await,
            Ok(false) => {}
            Err(e) => {
                warn!("点击\"下一页\"失败: {}", e);
                tier_failed = true;
            }
        }

        if tier_failed {
            warn!("⚠️ 无法导航到第 {} 页", target);
            AdvanceOutcome::NavigationFailed
        } else {
            info!("🏁 没有更多分页 (停在第 {} 页)", current_page);
            AdvanceOutcome::NoMoreResults
        }
    }

    async fn try_direct(&self, target: u32) -> Result<DirectJump, NavigationError> {
        match self.view.page_button_state(target).await? {
            ControlState::Absent => Ok(DirectJump::Absent),
            ControlState::Enabled => {
                self.view.click_page_button(target).await?;
                Ok(DirectJump::Clicked)
            }
            ControlState::Disabled => {
                self.settle().await?;
                if self.view.page_button_state(target).await? == ControlState::Enabled {
                    self.view.click_page_button(target).await?;
                    Ok(DirectJump::Clicked)
                } else {
                    Ok(DirectJump::Disabled)
                }
            }
        }
    }

    async fn try_next(&self) -> Result<bool, NavigationError> {
        if self.view.next_state().await? != ControlState::Enabled {
            return Ok(false);
        }
        self.view.click_next().await?;
        Ok(true)
    }

    async fn batch_then_direct(&self, target: u32) -> AdvanceOutcome {
        info!("⏭️ 第 {} 页按钮不存在，点击\"下 10 页\"", target);
        let result: Result<(), NavigationError> = async {
            self.click_batch().await?;
            // 下一组出现后，目标页若尚未激活则补点一次
            if self.view.page_button_state(target).await? == ControlState::Enabled
                && !self.view.is_page_active(target).await?
            {
                self.view.click_page_button(target).await?;
                self.settle().await?;
            }
            // 点击没有生效时视图仍停在旧页，不能让页码领先于视图
            match self.view.active_page().await? {
                Some(page) if page != target => Err(NavigationError::Stuck(format!(
                    "\"下 10 页\"之后停在第 {} 页，目标第 {} 页",
                    page, target
                ))),
                _ => Ok(()),
            }
        }
        .await;

        match result {
            Ok(()) => AdvanceOutcome::Advanced(target),
            Err(e) => {
                error!("❌ \"下 10 页\"之后导航失败: {}", e);
                AdvanceOutcome::NavigationFailed
            }
        }
    }

    async fn click_batch(&self) -> Result<(), NavigationError> {
        self.view.click_batch_advance().await?;
        sleep(self.settings.batch_render_pause).await;
        self.settle().await
    }

    async fn after_click(&self, target: u32) -> AdvanceOutcome {
        match self.settle().await {
            Ok(()) => AdvanceOutcome::Advanced(target),
            Err(e) => {
                error!("❌ 导航到第 {} 页后页面卡死: {}", target, e);
                AdvanceOutcome::NavigationFailed
            }
        }
    }

    /// 恢复运行时快进到 `target` 页，不抽取、不持久化
    ///
    /// 假设分页栏初始显示 `1..=batch_size`，每次"下 10 页"推进一组，
    /// 最后最多一次直接跳转。
    pub async fn fast_forward(&self, target: u32) -> Result<FastForwardReport, NavigationError> {
        info!("⏩ 快进模式: 跳转到第 {} 页...", target);
        let batch_size = self.settings.batch_size.max(1);
        let mut range_max = batch_size;
        let mut batch_clicks = 0;

        self.settle().await?;

        while target > range_max {
            debug!(
                "当前页码范围上限 {}，目标 {}，点击\"下 10 页\"",
                range_max, target
            );
            if self.view.batch_advance_state().await? != ControlState::Enabled {
                warn!("⚠️ 无法继续快进（\"下 10 页\"不存在或不可用）");
                break;
            }
            self.click_batch().await?;
            range_max += batch_size;
            batch_clicks += 1;
        }

        let mut direct_jumps = 0;
        if !self.view.is_page_active(target).await? {
            if self.view.page_button_state(target).await? == ControlState::Enabled {
                self.view.click_page_button(target).await?;
                self.settle().await?;
                direct_jumps = 1;
            } else {
                warn!("⚠️ 第 {} 页按钮不可用，无法直接跳转", target);
            }
        }

        let reached_page = match self.view.active_page().await {
            Ok(Some(page)) => page,
            Ok(None) => target,
            Err(e) => {
                warn!("读取当前页码失败，按目标页处理: {}", e);
                target
            }
        };
        if reached_page != target {
            warn!(
                "⚠️ 快进停在第 {} 页（目标第 {} 页）",
                reached_page, target
            );
        } else {
            info!("🎯 已快进到第 {} 页", reached_page);
        }

        Ok(FastForwardReport {
            reached_page,
            batch_clicks,
            direct_jumps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_settings, SimulatedPager};

    #[tokio::test]
    async fn test_direct_jump_within_block() {
        let pager = SimulatedPager::new(30, 10);
        let controller = PaginationController::new(&pager, fast_settings());

        assert_eq!(controller.advance(1).await, AdvanceOutcome::Advanced(2));
        assert_eq!(pager.active(), 2);
        let log = pager.actions();
        assert_eq!(log.page_clicks, 1);
        assert_eq!(log.batch_clicks, 0);
        assert_eq!(log.next_clicks, 0);
    }

    #[tokio::test]
    async fn test_batch_advance_at_block_boundary() {
        let pager = SimulatedPager::new(30, 10);
        pager.set_active(10);
        let controller = PaginationController::new(&pager, fast_settings());

        assert_eq!(controller.advance(10).await, AdvanceOutcome::Advanced(11));
        assert_eq!(pager.active(), 11);
        let log = pager.actions();
        assert_eq!(log.batch_clicks, 1);
        // 批量翻页后 11 已激活，不再点击页码
        assert_eq!(log.page_clicks, 0);
    }

    #[tokio::test]
    async fn test_batch_advance_then_direct_when_site_lands_elsewhere() {
        let pager = SimulatedPager::new(30, 10);
        pager.set_active(10);
        pager.set_batch_lands_on_previous(true);
        let controller = PaginationController::new(&pager, fast_settings());

        assert_eq!(controller.advance(10).await, AdvanceOutcome::Advanced(11));
        assert_eq!(pager.active(), 11);
        assert_eq!(pager.actions().page_clicks, 1);
    }

    #[tokio::test]
    async fn test_disabled_direct_never_triggers_batch() {
        let pager = SimulatedPager::new(30, 10);
        pager.set_active(10);
        pager.show_page_disabled(11);
        let controller = PaginationController::new(&pager, fast_settings());

        assert_eq!(controller.advance(10).await, AdvanceOutcome::Advanced(11));
        let log = pager.actions();
        assert_eq!(log.batch_clicks, 0);
        assert_eq!(log.next_clicks, 1);
    }

    #[tokio::test]
    async fn test_disabled_direct_that_recovers_is_clicked() {
        let pager = SimulatedPager::new(30, 10);
        pager.disable_page_for_checks(2, 1);
        let controller = PaginationController::new(&pager, fast_settings());

        assert_eq!(controller.advance(1).await, AdvanceOutcome::Advanced(2));
        let log = pager.actions();
        assert_eq!(log.page_clicks, 1);
        assert_eq!(log.next_clicks, 0);
    }

    #[tokio::test]
    async fn test_sequential_next_when_no_page_numbers() {
        let pager = SimulatedPager::new(5, 10);
        pager.hide_page_numbers(true);
        let controller = PaginationController::new(&pager, fast_settings());

        assert_eq!(controller.advance(1).await, AdvanceOutcome::Advanced(2));
        assert_eq!(pager.actions().next_clicks, 1);
    }

    #[tokio::test]
    async fn test_last_page_is_no_more_results() {
        let pager = SimulatedPager::new(3, 10);
        pager.set_active(3);
        let controller = PaginationController::new(&pager, fast_settings());

        assert_eq!(controller.advance(3).await, AdvanceOutcome::NoMoreResults);
        assert_eq!(pager.active(), 3);
    }

    #[tokio::test]
    async fn test_soft_settle_timeout_only_warns() {
        let pager = SimulatedPager::new(10, 10);
        pager.set_loader_stuck(true);
        let controller = PaginationController::new(&pager, fast_settings());

        assert_eq!(controller.advance(1).await, AdvanceOutcome::Advanced(2));
    }

    #[tokio::test]
    async fn test_settle_hard_bound_is_navigation_failed() {
        let pager = SimulatedPager::new(10, 10);
        pager.set_loader_hangs(true);
        let mut settings = fast_settings();
        settings.settle_hard_bound = Duration::from_millis(20);
        let controller = PaginationController::new(&pager, settings);

        assert_eq!(controller.advance(1).await, AdvanceOutcome::NavigationFailed);
    }

    #[tokio::test]
    async fn test_click_errors_everywhere_is_navigation_failed() {
        let pager = SimulatedPager::new(10, 10);
        pager.set_clicks_fail(true);
        let controller = PaginationController::new(&pager, fast_settings());

        assert_eq!(controller.advance(1).await, AdvanceOutcome::NavigationFailed);
    }

    #[tokio::test]
    async fn test_fast_forward_uses_batches_then_one_jump() {
        let pager = SimulatedPager::new(100, 10);
        let controller = PaginationController::new(&pager, fast_settings());

        let report = controller.fast_forward(57).await.unwrap();
        assert_eq!(report.reached_page, 57);
        assert_eq!(report.batch_clicks, 5);
        assert_eq!(report.direct_jumps, 1);

        let log = pager.actions();
        assert_eq!(log.next_clicks, 0);
        assert_eq!(log.page_clicks, 1);
        assert_eq!(pager.active(), 57);
    }

    #[tokio::test]
    async fn test_fast_forward_to_block_start_needs_no_jump() {
        let pager = SimulatedPager::new(100, 10);
        let controller = PaginationController::new(&pager, fast_settings());

        let report = controller.fast_forward(21).await.unwrap();
        assert_eq!(report.reached_page, 21);
        assert_eq!(report.batch_clicks, 2);
        assert_eq!(report.direct_jumps, 0);
    }

    #[tokio::test]
    async fn test_fast_forward_efficiency_scales_with_batches() {
        for target in [2u32, 10, 11, 99, 250] {
            let pager = SimulatedPager::new(300, 10);
            let controller = PaginationController::new(&pager, fast_settings());

            let report = controller.fast_forward(target).await.unwrap();
            assert_eq!(report.reached_page, target);
            assert_eq!(report.batch_clicks, (target - 1) / 10);
            assert!(report.direct_jumps <= 1);
        }
    }

    #[tokio::test]
    async fn test_batch_click_without_effect_is_navigation_failed() {
        let pager = SimulatedPager::new(30, 10);
        pager.set_active(10);
        pager.set_batch_noop(true);
        let controller = PaginationController::new(&pager, fast_settings());

        assert_eq!(controller.advance(10).await, AdvanceOutcome::NavigationFailed);
        assert_eq!(pager.actions().batch_clicks, 1);
        assert_eq!(pager.active(), 10);
    }

    #[tokio::test]
    async fn test_batch_advance_trusted_when_active_page_unreadable() {
        let pager = SimulatedPager::new(30, 10);
        pager.set_active(10);
        pager.set_active_unreadable(true);
        let controller = PaginationController::new(&pager, fast_settings());

        assert_eq!(controller.advance(10).await, AdvanceOutcome::Advanced(11));
        assert_eq!(pager.active(), 11);
    }

    #[tokio::test]
    async fn test_fast_forward_falls_back_to_target_when_active_unreadable() {
        let pager = SimulatedPager::new(100, 10);
        pager.set_active_unreadable(true);
        let controller = PaginationController::new(&pager, fast_settings());

        let report = controller.fast_forward(57).await.unwrap();
        assert_eq!(report.reached_page, 57);
        assert_eq!(report.batch_clicks, 5);
        assert_eq!(report.direct_jumps, 1);
    }

    #[tokio::test]
    async fn test_fast_forward_survives_active_page_read_error() {
        let pager = SimulatedPager::new(100, 10);
        pager.set_active_read_fails(true);
        let controller = PaginationController::new(&pager, fast_settings());

        let report = controller.fast_forward(23).await.unwrap();
        assert_eq!(report.reached_page, 23);
        assert_eq!(pager.active(), 23);
    }

    #[tokio::test]
    async fn test_fast_forward_stops_when_batch_unavailable() {
        let pager = SimulatedPager::new(15, 10);
        let controller = PaginationController::new(&pager, fast_settings());

        let report = controller.fast_forward(40).await.unwrap();
        assert_eq!(report.batch_clicks, 1);
        assert_eq!(report.reached_page, 11);
    }
}
