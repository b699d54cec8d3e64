use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use rusqlite::Connection;

use crate::db::repository::MetaRepo;

/// One SQLite connection shared by the UI thread and background workers.
pub type SharedConn = Arc<Mutex<Connection>>;

pub fn share(conn: Connection) -> SharedConn {
    Arc::new(Mutex::new(conn))
}

/// Durable string key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// `app_meta` table as a key-value store.
#[derive(Clone)]
pub struct MetaStore {
    conn: SharedConn,
}

impl MetaStore {
    pub fn new(conn: SharedConn) -> Self {
        Self { conn }
    }
}

impl KeyValueStore for MetaStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        MetaRepo::get(&self.conn.lock(), key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        MetaRepo::set(&self.conn.lock(), key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        MetaRepo::remove(&self.conn.lock(), key)
    }
}

#[cfg(test)]
pub use memory::MemoryStore;
