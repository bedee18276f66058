//! 断点存储 - 业务能力层
//!
//! 记录 `{lastPageProcessed}`，使中断的运行可以从中断页重新开始。
//! 每页在抽取**之前**写入一次：进程在页中途退出时，恢复后重抓这一页
//! （重复抽取 + upsert 是幂等的），而不会跳过它。

use crate::error::CheckpointError;
use crate::models::CheckpointState;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// 默认断点键
pub const STATE_KEY: &str = "CRAWLER_STATE";

/// 第 `index` 个起始 URL 使用的断点键
pub fn checkpoint_key(index: usize) -> String {
    if index == 0 {
        STATE_KEY.to_string()
    } else {
        format!("{}_{}", STATE_KEY, index)
    }
}

/// 断点存储
pub trait CheckpointStore: Send + Sync {
    /// 读取断点，不存在时返回 `{0}`
    fn load(&self) -> Result<CheckpointState, CheckpointError>;

    /// 持久化断点，返回时数据已落盘
    fn save(&self, state: CheckpointState) -> Result<(), CheckpointError>;

    /// 重置为全新运行
    fn clear(&self) -> Result<(), CheckpointError> {
        self.save(CheckpointState::default())
    }
}

/// 文件断点存储：每个键一个 JSON 文件（`<dir>/<key>.json`）
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", key)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Result<CheckpointState, CheckpointError> {
        if !self.path.exists() {
            return Ok(CheckpointState::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        serde_json::from_str(&content).map_err(|source| CheckpointError::Malformed {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn save(&self, state: CheckpointState) -> Result<(), CheckpointError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }
        let body = serde_json::to_vec(&state).map_err(|source| CheckpointError::Malformed {
            path: self.path.display().to_string(),
            source,
        })?;

        // 先写临时文件再 rename，避免留下半截内容
        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).map_err(|e| self.io_error(e))?;
        file.write_all(&body).map_err(|e| self.io_error(e))?;
        file.sync_all().map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        debug!(
            "断点已保存: {} -> 第 {} 页",
            self.path.display(),
            state.last_page_processed
        );
        Ok(())
    }
}

/// 内存断点存储（不跨进程，`checkpoint_dir` 为空时使用）
///
/// 同时记录每次写入，便于检查写入顺序。
#[derive(Default)]
pub struct MemoryCheckpointStore {
    state: Mutex<CheckpointState>,
    history: Mutex<Vec<u32>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: CheckpointState) -> Self {
        Self {
            state: Mutex::new(state),
            history: Mutex::new(Vec::new()),
        }
    }

    /// 历次写入的页码
    pub fn history(&self) -> Vec<u32> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self) -> Result<CheckpointState, CheckpointError> {
        Ok(self.state.lock().map(|s| *s).unwrap_or_default())
    }

    fn save(&self, state: CheckpointState) -> Result<(), CheckpointError> {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
        if let Ok(mut history) = self.history.lock() {
            history.push(state.last_page_processed);
        }
        Ok(())
    }
}
