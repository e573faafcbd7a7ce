use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub type PoolId = u64;

pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Connection parameters of a registered pool. Never carries a password.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
}

impl PoolParams {
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_MYSQL_PORT,
            user: user.into(),
            database: database.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolRecord {
    pub id: PoolId,
    #[serde(flatten)]
    pub params: PoolParams,
}

#[derive(Debug, Error)]
pub enum PoolStoreError {
    #[error("data directory is unavailable for this platform")]
    DataDirUnavailable,
    #[error("failed to read pools file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse pools file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("pools file at {path} lists pool id {id} more than once")]
    DuplicateId { path: PathBuf, id: PoolId },
    #[error("failed to create data directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize pools: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write pools file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoolsDocument {
    next_id: PoolId,
    #[serde(default)]
    pools: Vec<PoolRecord>,
}

impl Default for PoolsDocument {
    fn default() -> Self {
        Self {
            next_id: 1,
            pools: Vec::new(),
        }
    }
}

impl PoolsDocument {
    /// Orders pools by id and moves `next_id` past every stored id, so a
    /// hand-edited file can never hand out an id twice. Returns the first id
    /// that appears more than once.
    fn normalize(&mut self) -> Result<(), PoolId> {
        self.pools.sort_by_key(|pool| pool.id);
        if let Some(pair) = self.pools.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(pair[0].id);
        }
        let floor = self.pools.last().map_or(1, |pool| pool.id + 1);
        self.next_id = self.next_id.max(floor);
        Ok(())
    }
}

/// JSON-file backed pool registry.
///
/// Every access is a read-modify-write of the whole document under one lock, so
/// concurrent registrations cannot lose updates or share an id.
#[derive(Debug)]
pub struct FilePoolStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FilePoolStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn open_default() -> Result<Self, PoolStoreError> {
        Ok(Self::new(default_pools_path()?))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Result<Vec<PoolRecord>, PoolStoreError> {
        let _guard = self.lock.lock();
        Ok(self.load_or_init()?.pools)
    }

    pub fn get(&self, id: PoolId) -> Result<Option<PoolRecord>, PoolStoreError> {
        let _guard = self.lock.lock();
        Ok(self
            .load_or_init()?
            .pools
            .into_iter()
            .find(|pool| pool.id == id))
    }

    pub fn append(&self, params: PoolParams) -> Result<PoolRecord, PoolStoreError> {
        let _guard = self.lock.lock();
        let mut doc = self.load_or_init()?;

        let record = PoolRecord {
            id: doc.next_id,
            params,
        };
        doc.pools.push(record.clone());
        doc.next_id += 1;
        self.persist(&doc)?;

        Ok(record)
    }

    fn load_or_init(&self) -> Result<PoolsDocument, PoolStoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "initializing empty pools file");
            let doc = PoolsDocument::default();
            self.persist(&doc)?;
            return Ok(doc);
        }

        let raw = fs::read_to_string(&self.path).map_err(|source| PoolStoreError::Read {
            path: self.path.clone(),
            source,
        })?;

        if raw.trim().is_empty() {
            return Ok(PoolsDocument::default());
        }

        let mut doc: PoolsDocument =
            serde_json::from_str(&raw).map_err(|source| PoolStoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        doc.normalize().map_err(|id| PoolStoreError::DuplicateId {
            path: self.path.clone(),
            id,
        })?;
        Ok(doc)
    }

    fn persist(&self, doc: &PoolsDocument) -> Result<(), PoolStoreError> {
        if let Some(parent_dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent_dir).map_err(|source| PoolStoreError::CreateDir {
                path: parent_dir.to_path_buf(),
                source,
            })?;
        }

        let rendered = serde_json::to_string_pretty(doc)
            .map_err(|source| PoolStoreError::Serialize { source })?;

        let staging = staging_path(&self.path);
        fs::write(&staging, rendered).map_err(|source| PoolStoreError::Write {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &self.path).map_err(|source| PoolStoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

pub fn default_pools_path() -> Result<PathBuf, PoolStoreError> {
    if let Some(custom) = env::var_os("MDBADMIN_DATA_DIR") {
        return Ok(PathBuf::from(custom).join("pools.json"));
    }

    let base_dir = if cfg!(target_os = "windows") {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .ok_or(PoolStoreError::DataDirUnavailable)?
    } else if let Some(xdg_config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home)
    } else {
        let home = env::var_os("HOME").ok_or(PoolStoreError::DataDirUnavailable)?;
        PathBuf::from(home).join(".config")
    };

    Ok(base_dir.join("mdbadmin").join("pools.json"))
}
