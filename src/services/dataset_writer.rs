//! 数据集写入 - 业务能力层
//!
//! 只负责把已持久化的记录追加到 JSON Lines 文件，不关心流程

use crate::models::VehicleRecord;
use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// 追加写入的数据集
///
/// 每条记录一行，行级写入由互斥锁串行化，多个会话共用时不会交错。
pub struct DatasetWriter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DatasetWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条记录
    pub fn append(&self, record: &VehicleRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("数据集写入锁已损坏"))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        debug!("数据集追加: stock={}", record.stock);
        Ok(())
    }
}
