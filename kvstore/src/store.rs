use std::path::Path;
use std::rc::Rc;

use buffer_pool_manager::BufferPool;
use common::codec::FileHeader;
use common::disk_manager::DiskManager;
use common::error::StoreError;
use common::{PageId, Result};
use storage_engine::BPlusTree;
use storage_node::Value;

use crate::config::StoreConfig;

/// The single file a store owns within its directory. The directory itself
/// — not the file — is the unit `create`/`open`/`delete` operate on,
/// matching the programmatic surface's `Create(directory)`/`Open(directory,
/// ..)`/`Delete(directory)`.
pub const STORE_FILE_NAME: &str = "store.kv";

fn store_path(directory: &Path) -> std::path::PathBuf {
    directory.join(STORE_FILE_NAME)
}

/// The store facade (C5): owns the backing file, the file header, the
/// B+-tree, and the buffer pool it reads and writes through. `Put`/`Get`
/// are the only mutating/observing operations; durability is only
/// guaranteed after `close`.
pub struct Store {
    disk: Rc<DiskManager>,
    pool: Rc<BufferPool>,
    tree: BPlusTree,
    page_size: usize,
    opened_root_id: PageId,
    opened_next_node_id: PageId,
}

impl Store {
    /// Creates a fresh store file under `directory`. Fails if the
    /// directory does not exist or a store is already present there.
    #[tracing::instrument(skip(config))]
    pub fn create(directory: &Path, config: StoreConfig) -> Result<Self> {
        if !directory.is_dir() {
            return Err(StoreError::NoSuchDirectory);
        }
        let path = store_path(directory);
        if path.exists() {
            return Err(StoreError::AlreadyExists);
        }
        let capacity = config.buffer_pool_capacity()?;

        let disk = Rc::new(DiskManager::open(&path, config.page_size)?);
        let pool = Rc::new(BufferPool::new(capacity, disk.clone()));
        let tree = BPlusTree::create(pool.clone(), config.page_size)?;

        let header = FileHeader { root_id: tree.root_id(), next_node_id: tree.next_node_id() };
        disk.write_page(0, &header.encode(config.page_size))?;

        tracing::debug!(root_id = header.root_id, "created store");
        Ok(Self {
            disk,
            pool,
            tree,
            page_size: config.page_size,
            opened_root_id: header.root_id,
            opened_next_node_id: header.next_node_id,
        })
    }

    /// Opens an existing store file under `directory`. Fails if no store
    /// is present there, or if `config.memory_budget` is below the floor.
    #[tracing::instrument(skip(config))]
    pub fn open(directory: &Path, config: StoreConfig) -> Result<Self> {
        let path = store_path(directory);
        if !path.exists() {
            return Err(StoreError::NoSuchStore);
        }
        let capacity = config.buffer_pool_capacity()?;

        let disk = Rc::new(DiskManager::open(&path, config.page_size)?);
        let mut header_buf = vec![0u8; config.page_size];
        disk.read_page(0, &mut header_buf)?;
        let header = FileHeader::decode(&header_buf);

        let pool = Rc::new(BufferPool::new(capacity, disk.clone()));
        // `next_node_id == 0` only for a header page that was never
        // written (a degenerate pre-formatted file); treat it like a
        // brand-new store rather than erroring.
        let tree = if header.next_node_id == 0 {
            BPlusTree::create(pool.clone(), config.page_size)?
        } else {
            BPlusTree::open(pool.clone(), header.root_id, header.next_node_id, config.page_size)?
        };

        tracing::debug!(root_id = header.root_id, next_node_id = header.next_node_id, "opened store");
        Ok(Self {
            disk,
            pool,
            tree,
            page_size: config.page_size,
            opened_root_id: header.root_id,
            opened_next_node_id: header.next_node_id,
        })
    }

    /// Removes the store file under `directory`. Fails if no store is
    /// present there.
    pub fn delete(directory: &Path) -> Result<()> {
        let path = store_path(directory);
        if !path.exists() {
            return Err(StoreError::NoSuchStore);
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, value))]
    pub fn put(&mut self, key: u64, value: Value) -> Result<()> {
        self.tree.put(key, value)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn get(&self, key: u64) -> Result<Option<Value>> {
        self.tree.get(key)
    }

    /// Writes every dirty resident node through to disk without releasing
    /// residency or rewriting the header.
    #[tracing::instrument(skip(self))]
    pub fn flush(&self) -> Result<()> {
        self.pool.flush()
    }

    /// Flushes the pool and, iff `root_id` or `next_node_id` changed since
    /// this store was created/opened, rewrites the header. Consumes the
    /// store, releasing the file handle.
    #[tracing::instrument(skip(self))]
    pub fn close(self) -> Result<()> {
        self.pool.flush()?;
        if self.tree.root_id() != self.opened_root_id || self.tree.next_node_id() != self.opened_next_node_id {
            let header = FileHeader { root_id: self.tree.root_id(), next_node_id: self.tree.next_node_id() };
            self.disk.write_page(0, &header.encode(self.page_size))?;
            tracing::debug!(root_id = header.root_id, next_node_id = header.next_node_id, "rewrote header on close");
        }
        self.disk.sync()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("kvstore_store_test_{}_{}", std::process::id(), name));
        std::fs::create_dir_all(&p).unwrap();
        p
    }

    fn config() -> StoreConfig {
        StoreConfig { page_size: 256, memory_budget: crate::config::MIN_MEMORY_BUDGET * 4 }
    }

    fn value_of(i: u64) -> Value {
        let s = format!("Test{}", i);
        let mut v = [0u8; 10];
        let bytes = s.as_bytes();
        v[..bytes.len().min(10)].copy_from_slice(&bytes[..bytes.len().min(10)]);
        v
    }

    #[test]
    fn create_then_open_then_delete() {
        let dir = scratch_dir("lifecycle");

        let mut store = Store::create(&dir, config()).unwrap();
        store.put(1, value_of(1)).unwrap();
        assert_eq!(store.get(1).unwrap(), Some(value_of(1)));
        store.close().unwrap();

        let store = Store::open(&dir, config()).unwrap();
        assert_eq!(store.get(1).unwrap(), Some(value_of(1)));
        assert_eq!(store.get(2).unwrap(), None);
        store.close().unwrap();

        Store::delete(&dir).unwrap();
        assert!(matches!(Store::open(&dir, config()), Err(StoreError::NoSuchStore)));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn create_twice_is_already_exists() {
        let dir = scratch_dir("double_create");
        let _store = Store::create(&dir, config()).unwrap();
        assert!(matches!(Store::create(&dir, config()), Err(StoreError::AlreadyExists)));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn create_in_missing_directory_is_no_such_directory() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("kvstore_store_test_missing_{}", std::process::id()));
        assert!(matches!(Store::create(&dir, config()), Err(StoreError::NoSuchDirectory)));
    }

    #[test]
    fn open_missing_store_is_no_such_store() {
        let dir = scratch_dir("missing_open");
        assert!(matches!(Store::open(&dir, config()), Err(StoreError::NoSuchStore)));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn memory_budget_below_floor_is_invalid_config() {
        let dir = scratch_dir("budget_floor");
        let tiny = StoreConfig { page_size: 256, memory_budget: 1024 };
        assert!(matches!(Store::create(&dir, tiny), Err(StoreError::InvalidConfig(_))));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn reopen_without_flush_retrieves_all_keys() {
        let dir = scratch_dir("reopen_no_flush");
        let mut store = Store::create(&dir, config()).unwrap();
        for i in 1..=50u64 {
            store.put(i, value_of(i)).unwrap();
        }
        store.close().unwrap();

        let store = Store::open(&dir, config()).unwrap();
        for i in 1..=50u64 {
            assert_eq!(store.get(i).unwrap(), Some(value_of(i)), "key {i}");
        }
        store.close().unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
