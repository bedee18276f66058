//! # IAAI Scraper
//!
//! 抓取 IAAI 拍卖列表，逐页翻页、断点续抓，并按 stock upsert 到 SQLite。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 启动或连接浏览器
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `ChromiumListingView` - 用站点选择器实现 `ListingView`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `ChromiumExtractor` - 抽取当前页的原始记录
//! - `Normalizer` - 原始字段 → `VehicleRecord`
//! - `SqliteSink` / `DatasetWriter` - upsert 与追加写入
//! - `FileCheckpointStore` - 断点存储
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"从第 N 页到第 N+1 页"的翻页流程与快进
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/crawl_run` - 单个起始 URL 的抓取循环
//! - `orchestrator/batch_processor` - 多起始 URL 并发、整体超时、全局统计
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出常用类型
pub use config::Config;
pub use error::AppError;
pub use infrastructure::{ChromiumListingView, JsExecutor, ListingView};
pub use models::{CheckpointState, RawRecord, RunStatistics, StopReason, VehicleRecord};
pub use orchestrator::{App, CrawlRun, RunSettings};
pub use workflow::{AdvanceOutcome, PaginationController};
