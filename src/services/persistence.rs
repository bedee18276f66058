//! 持久化 - 业务能力层
//!
//! 以 stock 为业务主键 upsert 车辆记录。每条记录在一个事务里整体写入，
//! 并发会话共享同一个连接（互斥锁保护），同一 stock 的并发写入以最后一次为准。

use crate::error::PersistError;
use crate::models::VehicleRecord;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// upsert 结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// 记录写入端
pub trait RecordSink: Send + Sync {
    /// 按 stock 插入或更新一条记录
    fn upsert(&self, record: &VehicleRecord) -> Result<UpsertOutcome, PersistError>;

    /// 已存储的记录数
    fn count(&self) -> Result<u64, PersistError>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS cars (
        stock          TEXT PRIMARY KEY NOT NULL CHECK (length(stock) > 0),
        year           INTEGER NOT NULL,
        make           TEXT NOT NULL,
        model          TEXT NOT NULL,
        version        TEXT,
        damage_type    TEXT NOT NULL DEFAULT '',
        mileage        INTEGER,
        engine_status  TEXT NOT NULL,
        bid_price      REAL NOT NULL DEFAULT 0 CHECK (bid_price >= 0),
        buy_now_price  REAL,
        auction_date   TEXT,
        detail_url     TEXT,
        image_url      TEXT,
        video_url      TEXT,
        vin            TEXT,
        origin         TEXT,
        engine_info    TEXT,
        fuel_type      TEXT,
        cylinders      TEXT,
        is360          BOOLEAN NOT NULL DEFAULT 0,
        created_at     TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at     TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_cars_created ON cars(created_at);
";

const UPSERT_SQL: &str = "
    INSERT INTO cars (
        stock, year, make, model, version, damage_type, mileage, engine_status,
        bid_price, buy_now_price, auction_date, detail_url, image_url, video_url,
        vin, origin, engine_info, fuel_type, cylinders, is360
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
    ON CONFLICT(stock) DO UPDATE SET
        year = excluded.year,
        make = excluded.make,
        model = excluded.model,
        version = excluded.version,
        damage_type = excluded.damage_type,
        mileage = excluded.mileage,
        engine_status = excluded.engine_status,
        bid_price = excluded.bid_price,
        buy_now_price = excluded.buy_now_price,
        auction_date = excluded.auction_date,
        detail_url = excluded.detail_url,
        image_url = excluded.image_url,
        video_url = excluded.video_url,
        vin = excluded.vin,
        origin = excluded.origin,
        engine_info = excluded.engine_info,
        fuel_type = excluded.fuel_type,
        cylinders = excluded.cylinders,
        is360 = excluded.is360,
        updated_at = datetime('now')
";

/// SQLite 写入端
pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    /// 打开（必要时创建）数据库并建表
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| PersistError::Transient(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
        info!("数据库已打开: {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, PersistError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, PersistError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, PersistError> {
        self.conn
            .lock()
            .map_err(|_| PersistError::Transient("数据库连接锁已损坏".into()))
    }

    /// 按 stock 读取记录
    pub fn get(&self, stock: &str) -> Result<Option<VehicleRecord>, PersistError> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT stock, year, make, model, version, damage_type, mileage, engine_status,
                        bid_price, buy_now_price, auction_date, detail_url, image_url, video_url,
                        vin, origin, engine_info, fuel_type, cylinders, is360
                 FROM cars WHERE stock = ?1",
                [stock],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// 最近写入的 stock（启动时展示用）
    pub fn recent_stocks(&self, limit: usize) -> Result<Vec<String>, PersistError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT stock FROM cars ORDER BY created_at DESC, rowid DESC LIMIT ?1")?;
        let stocks = stmt
            .query_map([limit as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(stocks)
    }
}

impl RecordSink for SqliteSink {
    fn upsert(&self, record: &VehicleRecord) -> Result<UpsertOutcome, PersistError> {
        if record.stock.trim().is_empty() {
            return Err(PersistError::Constraint("stock 不能为空".into()));
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM cars WHERE stock = ?1)",
            [&record.stock],
            |row| row.get(0),
        )?;
        tx.execute(
            UPSERT_SQL,
            params![
                record.stock,
                record.year,
                record.make,
                record.model,
                record.version,
                record.damage_type,
                record.mileage,
                record.engine_status,
                record.bid_price,
                record.buy_now_price,
                record.auction_date.map(|d| d.to_rfc3339()),
                record.detail_url,
                record.image_url,
                record.video_url,
                record.vin,
                record.origin,
                record.engine_info,
                record.fuel_type,
                record.cylinders,
                record.is360,
            ],
        )?;
        tx.commit()?;

        debug!("upsert stock={} (已存在: {})", record.stock, exists);
        Ok(if exists {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Created
        })
    }

    fn count(&self) -> Result<u64, PersistError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cars", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

fn row_to_record(row: &Row) -> rusqlite::Result<VehicleRecord> {
    let auction_date: Option<String> = row.get(10)?;
    Ok(VehicleRecord {
        stock: row.get(0)?,
        year: row.get(1)?,
        make: row.get(2)?,
        model: row.get(3)?,
        version: row.get(4)?,
        damage_type: row.get(5)?,
        mileage: row.get(6)?,
        engine_status: row.get(7)?,
        bid_price: row.get(8)?,
        buy_now_price: row.get(9)?,
        auction_date: auction_date
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc)),
        detail_url: row.get(11)?,
        image_url: row.get(12)?,
        video_url: row.get(13)?,
        vin: row.get(14)?,
        origin: row.get(15)?,
        engine_info: row.get(16)?,
        fuel_type: row.get(17)?,
        cylinders: row.get(18)?,
        is360: row.get(19)?,
    })
}
