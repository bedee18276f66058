//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 多起始 URL 处理器
//! - 管理应用生命周期（初始化、运行、关闭）
//! - 持有 Browser、数据库和数据集写入端
//! - 控制并发数量，每个起始 URL 独占一个页面
//! - 输出全局统计信息
//!
//! ### `crawl_run` - 单个起始 URL 的抓取循环
//! - 断点恢复与快进
//! - 逐页：写断点 → 抽取 → 归一化 → upsert → 翻页
//! - 判断终止条件
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<start_url>)
//!     ↓
//! crawl_run (处理一个 start_url 的所有页)
//!     ↓
//! workflow::PaginationController (N → N+1)
//!     ↓
//! services (能力层：extract / normalize / persist / checkpoint)
//!     ↓
//! infrastructure (基础设施：JsExecutor、ListingView)
//! ```

pub mod batch_processor;
pub mod crawl_run;

// 重新导出主要类型
pub use batch_processor::App;
pub use crawl_run::{CrawlRun, RunSettings};
