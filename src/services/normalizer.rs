//! 字段归一化 - 业务能力层
//!
//! 把抽取到的原始字符串字段转换为 `VehicleRecord`。
//! 所有函数都是全函数：解析失败返回 `None` 或字段约定的默认值，从不 panic，
//! 单个字段格式错误不会中断整页处理。

use crate::config::DistanceMode;
use crate::models::{fields, RawRecord, VehicleRecord};
use crate::services::damage::translate_damage;
use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use phf::phf_map;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// 缺少年份时写入的默认年份
pub const DEFAULT_YEAR: i32 = 2020;
/// make / model / engine status 缺失时的占位值
pub const UNKNOWN: &str = "Unknown";

const MILES_TO_KM: f64 = 1.60934;
const VIDEO_URL_PREFIX: &str = "https://mediastorageaccountprod.blob.core.windows.net/media/";

static MONTHS: phf::Map<&'static str, u32> = phf_map! {
    "jan" => 1, "january" => 1,
    "feb" => 2, "february" => 2,
    "mar" => 3, "march" => 3,
    "apr" => 4, "april" => 4,
    "may" => 5,
    "jun" => 6, "june" => 6,
    "jul" => 7, "july" => 7,
    "aug" => 8, "august" => 8,
    "sep" => 9, "sept" => 9, "september" => 9,
    "oct" => 10, "october" => 10,
    "nov" => 11, "november" => 11,
    "dec" => 12, "december" => 12,
};

/// 时区缩写 → UTC 偏移（小时）
static TZ_OFFSETS: phf::Map<&'static str, i32> = phf_map! {
    "EDT" => -4, "EST" => -5,
    "CDT" => -5, "CST" => -6,
    "MDT" => -6, "MST" => -7,
    "PDT" => -7, "PST" => -8,
    "AKDT" => -8, "AKST" => -9,
    "HST" => -10,
    "UTC" => 0, "GMT" => 0,
};

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})\s+(.*)$").expect("valid regex"));

static NUMERIC_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})[/\-](\d{1,2})[/\-](\d{4})").expect("valid regex")
});

// [Weekday[,]] Month Day[,] H:MM am/pm TZ
static COMPOSITE_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:[a-z]{3,9}\.?,?\s+)?([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{1,2}):(\d{2})\s*([ap])\.?m\.?\s+([a-z]{2,4})$",
    )
    .expect("valid regex")
});

/// 标题拆分结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleParts {
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub version: Option<String>,
}

/// 字段归一化器
#[derive(Debug, Clone)]
pub struct Normalizer {
    distance_mode: DistanceMode,
    translate_damage: bool,
    current_year: i32,
}

impl Normalizer {
    pub fn new(distance_mode: DistanceMode, translate_damage: bool) -> Self {
        Self {
            distance_mode,
            translate_damage,
            current_year: Local::now().year(),
        }
    }

    /// 固定“当前年份”（站点日期不带年份）
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    /// 归一化一行记录
    ///
    /// 没有 stock 的记录无法 upsert，返回 `None`。
    pub fn normalize(&self, raw: &RawRecord) -> Option<VehicleRecord> {
        let stock = raw.get(fields::STOCK)?.to_string();
        let title = raw.get(fields::TITLE).map(split_title).unwrap_or_default();

        let mut damage_type = join_composite(
            raw.get(fields::PRIMARY_DAMAGE),
            raw.get(fields::LOSS_TYPE),
        );
        if self.translate_damage {
            damage_type = translate_damage(&damage_type);
        }

        Some(VehicleRecord {
            video_url: Some(video_url_for(&stock)),
            year: title.year.unwrap_or(DEFAULT_YEAR),
            make: title.make.unwrap_or_else(|| UNKNOWN.to_string()),
            model: title.model.unwrap_or_else(|| UNKNOWN.to_string()),
            version: title.version,
            damage_type,
            mileage: raw
                .get(fields::ODOMETER)
                .and_then(|v| parse_distance(v, self.distance_mode)),
            engine_status: raw
                .get(fields::ENGINE_STATUS)
                .unwrap_or(UNKNOWN)
                .to_string(),
            bid_price: parse_bid_price(raw.get(fields::BID_PRICE), raw.get(fields::ACV)),
            buy_now_price: raw.get(fields::BUY_NOW).and_then(parse_currency),
            auction_date: raw
                .get(fields::AUCTION_DATE)
                .and_then(|v| parse_auction_date(v, self.current_year)),
            detail_url: owned(raw.get(fields::DETAIL_URL)),
            image_url: owned(raw.get(fields::IMAGE_URL)),
            vin: owned(raw.get(fields::VIN)),
            origin: owned(raw.get(fields::ORIGIN)),
            engine_info: owned(raw.get(fields::ENGINE_INFO)),
            fuel_type: owned(raw.get(fields::FUEL_TYPE)),
            cylinders: owned(raw.get(fields::CYLINDERS)),
            is360: raw.get(fields::IS_360).map(parse_flag).unwrap_or(false),
            stock,
        })
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// 去掉所有非数字字符后解析整数
pub fn parse_int(value: &str) -> Option<i64> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// 去掉货币符号和千位分隔符后解析金额
pub fn parse_currency(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 出价：按钮显示 "Pre-Bid" 时取 ACV；无法解析时为 0
pub fn parse_bid_price(bid: Option<&str>, acv: Option<&str>) -> f64 {
    let source = match (bid, acv) {
        (Some(b), Some(a)) if b.trim().eq_ignore_ascii_case("pre-bid") => Some(a),
        (b, _) => b,
    };
    source.and_then(parse_currency).unwrap_or(0.0)
}

/// 里程：按模式决定是否英里换算为公里
pub fn parse_distance(value: &str, mode: DistanceMode) -> Option<i64> {
    let raw = parse_int(value)?;
    match mode {
        DistanceMode::AsIs => Some(raw),
        DistanceMode::MilesToKilometers => Some((raw as f64 * MILES_TO_KM).round() as i64),
    }
}

/// 组合两段标签，任一为空时不产生多余分隔符
pub fn join_composite(primary: Option<&str>, secondary: Option<&str>) -> String {
    [primary, secondary]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
}

/// "2019 Toyota Camry LE" → 年份 / 品牌 / 型号 / 版本
pub fn split_title(title: &str) -> TitleParts {
    let Some(caps) = TITLE_RE.captures(title.trim()) else {
        return TitleParts::default();
    };
    let year = caps[1].parse().ok();
    let mut parts = caps[2].split_whitespace();
    let make = parts.next().map(str::to_string);
    let model = parts.next().map(str::to_string);
    let version = parts.collect::<Vec<_>>().join(" ");

    TitleParts {
        year,
        make,
        model,
        version: (!version.is_empty()).then_some(version),
    }
}

pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

pub fn video_url_for(stock: &str) -> String {
    format!("{}{}_VES-100_1", VIDEO_URL_PREFIX, stock)
}

/// 解析拍卖时间
///
/// 依次尝试：RFC 3339、`%Y-%m-%d %H:%M:%S`、`%Y-%m-%d`、`M/D/YYYY`，
/// 最后是站点的组合格式 "Month Day H:MMam TZ"（年份取 `current_year`）。
/// 无法解析时返回 `None`。
pub fn parse_auction_date(value: &str, current_year: i32) -> Option<DateTime<Utc>> {
    let cleaned = value.trim();
    if cleaned.is_empty() {
        return None;
    }

    let parsed = parse_direct(cleaned)
        .or_else(|| parse_numeric(cleaned))
        .or_else(|| parse_composite(cleaned, current_year));

    if parsed.is_none() {
        warn!("无法解析拍卖日期: '{}'", cleaned);
    }
    parsed
}

fn parse_direct(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_numeric(value: &str) -> Option<DateTime<Utc>> {
    let caps = NUMERIC_DATE_RE.captures(value)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    if year <= 2000 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

fn parse_composite(value: &str, year: i32) -> Option<DateTime<Utc>> {
    let caps = COMPOSITE_DATE_RE.captures(value)?;
    let month = *MONTHS.get(caps[1].to_ascii_lowercase().as_str())?;
    let day: u32 = caps[2].parse().ok()?;
    let hour12: u32 = caps[3].parse().ok()?;
    let minute: u32 = caps[4].parse().ok()?;
    let is_pm = caps[5].eq_ignore_ascii_case("p");
    let offset_hours = *TZ_OFFSETS.get(caps[6].to_ascii_uppercase().as_str())?;

    if !(1..=12).contains(&hour12) {
        return None;
    }
    let hour = match (hour12, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    let offset = FixedOffset::east_opt(offset_hours * 3600)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
