//! 列表抽取 - 业务能力层
//!
//! 只负责"把当前页的行变成原始记录"，不翻页、不归一化。

use crate::error::ExtractionError;
use crate::infrastructure::ListingView;
use crate::models::RawRecord;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// 页面抽取器
///
/// 没有匹配的行时必须返回空列表，而不是错误。
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract_page(&self, view: &dyn ListingView)
        -> Result<Vec<RawRecord>, ExtractionError>;
}

/// 抽取脚本的返回结构
#[derive(Debug, Deserialize)]
struct ScriptOutput {
    #[serde(default)]
    records: Vec<RawRecord>,
    /// 抛出异常被跳过的行
    #[serde(default)]
    skipped: u32,
    #[serde(default, rename = "errors")]
    error_messages: Vec<String>,
}

/// 每行独立 try/catch，单行失败不影响同页其他行
const EXTRACT_SCRIPT: &str = r#"
(() => {
    const records = [];
    const errors = [];
    let skipped = 0;
    document.querySelectorAll('div.table-row.table-row-border').forEach(row => {
        try {
            const text = (el) => el ? el.textContent.trim() : null;
            const byTitle = (prefix) => text(row.querySelector(`span[title^="${prefix}"]`));
            const bySelector = (selector) => text(row.querySelector(selector));

            const link = row.querySelector('h4.heading-7 a');
            if (!link) return;

            let stock = null;
            let vin = null;
            row.querySelectorAll('.data-list__item').forEach(item => {
                const label = item.querySelector('.data-list__label');
                if (!label) return;
                const labelText = label.textContent.trim();
                if (labelText.startsWith('Stock #:')) {
                    stock = text(item.querySelector('.data-list__value'));
                }
                if (labelText.startsWith('VIN:')) {
                    vin = text(label.nextElementSibling);
                }
            });

            let buyNow = null;
            row.querySelectorAll('.data-list--action a').forEach(a => {
                const t = a.textContent.trim();
                if (t.startsWith('Buy Now')) buyNow = t;
            });

            const img = row.querySelector('.table-cell--image img');

            records.push({
                title: link.textContent.trim(),
                detailUrl: new URL(link.getAttribute('href'), location.origin).href,
                imageUrl: img ? (img.getAttribute('data-src') || img.getAttribute('src')) : null,
                stock,
                vin,
                primaryDamage: byTitle('Primary Damage:'),
                lossType: byTitle('Loss:'),
                odometer: byTitle('Odometer:'),
                engineInfo: byTitle('Engine:'),
                fuelType: byTitle('Fuel Type:'),
                cylinders: byTitle('Cylinder:'),
                origin: bySelector('span[title^="Branch:"] a'),
                engineStatus: bySelector('.badge'),
                bidPrice: bySelector('.btn--pre-bid') || bySelector('[data-testid="current-bid-price"]'),
                acv: byTitle('ACV:'),
                buyNow,
                auctionDate: bySelector('.data-list__value--action'),
                is360: row.querySelector('span.media_360_view') ? 'true' : 'false',
            });
        } catch (e) {
            skipped += 1;
            errors.push(String(e && e.message ? e.message : e));
        }
    });
    return { records, skipped, errors };
})()
"#;

/// 在浏览器中执行抽取脚本的抽取器
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumExtractor;

impl ChromiumExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PageExtractor for ChromiumExtractor {
    async fn extract_page(
        &self,
        view: &dyn ListingView,
    ) -> Result<Vec<RawRecord>, ExtractionError> {
        let value = view
            .evaluate(EXTRACT_SCRIPT)
            .await
            .map_err(|e| ExtractionError::Script(e.to_string()))?;
        let output: ScriptOutput = serde_json::from_value(value)?;

        if output.skipped > 0 {
            warn!("⚠️ 跳过 {} 行无法解析的记录", output.skipped);
            for message in &output.error_messages {
                debug!("行解析错误: {}", message);
            }
        }
        Ok(output.records)
    }
}
