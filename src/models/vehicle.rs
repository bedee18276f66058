use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 原始字段名（与抽取脚本返回的键一致）
pub mod fields {
    pub const TITLE: &str = "title";
    pub const STOCK: &str = "stock";
    pub const VIN: &str = "vin";
    pub const PRIMARY_DAMAGE: &str = "primaryDamage";
    pub const LOSS_TYPE: &str = "lossType";
    pub const ODOMETER: &str = "odometer";
    pub const ENGINE_INFO: &str = "engineInfo";
    pub const FUEL_TYPE: &str = "fuelType";
    pub const CYLINDERS: &str = "cylinders";
    pub const ORIGIN: &str = "origin";
    pub const ENGINE_STATUS: &str = "engineStatus";
    pub const BID_PRICE: &str = "bidPrice";
    pub const ACV: &str = "acv";
    pub const BUY_NOW: &str = "buyNow";
    pub const AUCTION_DATE: &str = "auctionDate";
    pub const IS_360: &str = "is360";
    pub const DETAIL_URL: &str = "detailUrl";
    pub const IMAGE_URL: &str = "imageUrl";
}

/// 列表中一行的原始数据：字段名 → 字符串（可能缺失）
///
/// 此阶段不做任何校验，字段可能缺失或格式错误。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: BTreeMap<String, Option<String>>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式设置字段（测试与手工构造用）
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, Some(value.into()));
        self
    }

    pub fn insert(&mut self, key: &str, value: Option<String>) {
        self.fields.insert(key.to_string(), value);
    }

    /// 读取字段，空白字符串视为缺失
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// 归一化后的车辆记录
///
/// `stock` 是业务主键，没有 stock 的记录不会被持久化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    pub stock: String,
    pub year: i32,
    pub make: String,
    pub model: String,
    pub version: Option<String>,
    /// 可能为组合值 "A / B"
    pub damage_type: String,
    /// 公里
    pub mileage: Option<i64>,
    pub engine_status: String,
    pub bid_price: f64,
    pub buy_now_price: Option<f64>,
    pub auction_date: Option<DateTime<Utc>>,
    pub detail_url: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub vin: Option<String>,
    pub origin: Option<String>,
    pub engine_info: Option<String>,
    pub fuel_type: Option<String>,
    pub cylinders: Option<String>,
    pub is360: bool,
}

impl VehicleRecord {
    /// 只有 stock 的最小记录，其余字段取产品默认值
    pub fn with_stock(stock: impl Into<String>) -> Self {
        Self {
            stock: stock.into(),
            year: 2020,
            make: "Unknown".to_string(),
            model: "Unknown".to_string(),
            version: None,
            damage_type: String::new(),
            mileage: None,
            engine_status: "Unknown".to_string(),
            bid_price: 0.0,
            buy_now_price: None,
            auction_date: None,
            detail_url: None,
            image_url: None,
            video_url: None,
            vin: None,
            origin: None,
            engine_info: None,
            fuel_type: None,
            cylinders: None,
            is360: false,
        }
    }
}
