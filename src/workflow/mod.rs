//! 流程层（Workflow Layer）
//!
//! 定义"从第 N 页到第 N+1 页"的完整翻页流程，以及恢复运行时的快进。
//! 不持有页面资源，只通过 `ListingView` 操作列表。

pub mod pagination;

pub use pagination::{AdvanceOutcome, FastForwardReport, PaginationController, PaginationSettings};
