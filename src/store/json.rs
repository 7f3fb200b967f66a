//! JSON 文件存储
//!
//! 内存中保存完整数据库，持久化时整体写入数据文件（先写临时文件再重命名）。
//! 数据文件也会被其他进程（命令行 add/remove）修改：每次写入前以及每轮巡检
//! 开始时都会重新读取文件中的目标列表并与内存合并，文件决定目标的增删。

use crate::error::{PersistenceError, Result};
use crate::monitor::history::HistoryEntry;
use crate::store::model::{AppliedSweep, Database, SweepBatch, Target};
use crate::store::MonitorStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// 基于 JSON 文件的监控数据存储
#[derive(Debug)]
pub struct JsonFileStore {
    /// 数据文件路径，为空时只保存在内存中
    path: Option<PathBuf>,
    /// 数据库内容
    db: RwLock<Database>,
    /// 串行化所有修改：文件读写以及内存提交
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// 打开数据文件，文件不存在时从空数据库开始
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Self::read_file(&path).await?.unwrap_or_else(|| {
            debug!("数据文件不存在，使用空数据库: {}", path.display());
            Database::default()
        });

        info!(
            "加载数据文件: {}，目标数量: {}，历史记录: {}",
            path.display(),
            db.targets.len(),
            db.history.len()
        );

        Ok(Self {
            path: Some(path),
            db: RwLock::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// 仅内存存储
    pub fn in_memory(db: Database) -> Self {
        Self {
            path: None,
            db: RwLock::new(db),
            write_lock: Mutex::new(()),
        }
    }

    /// 读取数据文件，文件不存在时返回 None
    async fn read_file(path: &Path) -> Result<Option<Database>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let db = serde_json::from_slice(&bytes).map_err(PersistenceError::from)?;
                Ok(Some(db))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Read {
                path: path.display().to_string(),
                source,
            }
            .into()),
        }
    }

    async fn write_file(path: &Path, bytes: &[u8]) -> std::result::Result<(), PersistenceError> {
        let write_err = |source| PersistenceError::Write {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
        if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(write_err(e));
        }
        Ok(())
    }

    /// 在副本上应用修改，写入成功后才替换内存中的数据库
    ///
    /// 副本先与数据文件中的目标列表合并，其他进程注册或删除的目标不会被覆盖
    async fn commit<R>(&self, change: impl FnOnce(&mut Database) -> R) -> Result<R> {
        let _guard = self.write_lock.lock().await;
        let mut next = self.db.read().await.clone();

        if let Some(path) = self.path.as_deref() {
            if let Some(on_disk) = Self::read_file(path).await? {
                next.merge_registry(on_disk.targets);
            }
        }

        let out = change(&mut next);

        if let Some(path) = self.path.as_deref() {
            let bytes = serde_json::to_vec_pretty(&next).map_err(PersistenceError::from)?;
            Self::write_file(path, &bytes).await?;
            debug!("数据文件已写入: {} ({} 字节)", path.display(), bytes.len());
        }

        *self.db.write().await = next;
        Ok(out)
    }
}

#[async_trait]
impl MonitorStore for JsonFileStore {
    async fn list_targets(&self) -> Vec<Target> {
        self.db.read().await.list_targets()
    }

    async fn recent_history(&self, limit: usize) -> Vec<HistoryEntry> {
        self.db.read().await.history.recent(limit)
    }

    async fn history_len(&self) -> usize {
        self.db.read().await.history.len()
    }

    async fn add_target(&self, name: &str, url: &str) -> Result<Target> {
        let target = Target::new(name, url)?;
        let registered = target.clone();
        self.commit(move |db| db.add_target(registered)).await?;

        info!("注册目标: {} ({}) id={}", target.name, target.url, target.id);
        Ok(target)
    }

    async fn remove_target(&self, target_id: &str) -> Result<bool> {
        let removed = self.commit(|db| db.remove_target(target_id)).await?;
        if removed {
            info!("删除目标: {}", target_id);
        }
        Ok(removed)
    }

    async fn sync_registry(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let _guard = self.write_lock.lock().await;
        let Some(on_disk) = Self::read_file(path).await? else {
            return Ok(());
        };

        let (added, removed) = self.db.write().await.merge_registry(on_disk.targets);
        if added > 0 || removed > 0 {
            info!("数据文件中的目标有变化: 新增 {}，删除 {}", added, removed);
        }
        Ok(())
    }

    async fn apply_sweep(&self, batch: SweepBatch, history_limit: usize) -> AppliedSweep {
        let _guard = self.write_lock.lock().await;
        let mut db = self.db.write().await;
        db.apply(batch, history_limit)
    }

    async fn persist(&self) -> Result<()> {
        self.commit(|_| ()).await
    }
}
