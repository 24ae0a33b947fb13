use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use common::disk_manager::DiskManager;
use common::{PageId, Result};
use storage_node::{decode_node, encode_node, Node};

/// Conservative uniform per-entry memory estimate used to derive buffer pool
/// capacity from a caller-supplied memory budget.
pub const MEMORY_PER_ENTRY: u64 = 10_240;

struct Entry {
    node: Node,
    prev: Option<PageId>,
    next: Option<PageId>,
}

struct Inner {
    entries: HashMap<PageId, Entry>,
    /// Head of the recency list: least-recently-used.
    lru: Option<PageId>,
    /// Tail of the recency list: most-recently-used.
    mru: Option<PageId>,
    capacity: usize,
}

impl Inner {
    fn unlink(&mut self, id: PageId) {
        let (prev, next) = {
            let entry = &self.entries[&id];
            (entry.prev, entry.next)
        };
        match prev {
            Some(p) => self.entries.get_mut(&p).unwrap().next = next,
            None => self.lru = next,
        }
        match next {
            Some(n) => self.entries.get_mut(&n).unwrap().prev = prev,
            None => self.mru = prev,
        }
    }

    fn push_mru(&mut self, id: PageId) {
        let old_mru = self.mru;
        {
            let entry = self.entries.get_mut(&id).unwrap();
            entry.prev = old_mru;
            entry.next = None;
        }
        if let Some(old) = old_mru {
            self.entries.get_mut(&old).unwrap().next = Some(id);
        }
        self.mru = Some(id);
        if self.lru.is_none() {
            self.lru = Some(id);
        }
    }

    fn touch_mru(&mut self, id: PageId) {
        if self.mru == Some(id) {
            return;
        }
        self.unlink(id);
        self.push_mru(id);
    }

    /// Writes the LRU entry back first (if dirty) and only removes it from
    /// `entries`/the recency list once that write succeeds. A write
    /// failure must leave the node exactly as resident and dirty as it was
    /// before eviction was attempted, so the caller can retry on the next
    /// flush (I7, spec §4.4.7).
    fn evict_lru(&mut self, disk: &DiskManager) -> Result<()> {
        let victim = self
            .lru
            .expect("eviction requested on an empty buffer pool");
        if self.entries[&victim].node.dirty {
            tracing::debug!(node_id = victim, "evicting dirty node, writing back");
            let bytes = encode_node(&self.entries[&victim].node, disk.page_size());
            disk.write_page(victim, &bytes)?;
        } else {
            tracing::debug!(node_id = victim, "evicting clean node");
        }
        self.unlink(victim);
        self.entries.remove(&victim);
        Ok(())
    }

    /// Admits `node` as the resident copy for its id: replaces an existing
    /// entry in place (always dirty — it was just mutated) or inserts a
    /// fresh one, evicting the LRU entry first if the pool is full.
    fn admit(&mut self, mut node: Node, freshly_loaded: bool, disk: &DiskManager) -> Result<()> {
        let id = node.id;
        if self.entries.contains_key(&id) {
            node.dirty = true;
            self.unlink(id);
            self.entries.insert(id, Entry { node, prev: None, next: None });
            self.push_mru(id);
            return Ok(());
        }
        if self.entries.len() == self.capacity {
            self.evict_lru(disk)?;
        }
        node.dirty = !freshly_loaded;
        self.entries.insert(id, Entry { node, prev: None, next: None });
        self.push_mru(id);
        Ok(())
    }
}

/// Single-threaded by design: interior mutability via `RefCell` means any
/// attempt to hold two resident nodes open at once panics instead of
/// silently aliasing, which is exactly the discipline the tree must honor
/// (re-resolve every cross-node hop through `get`, never hold a reference
/// across a call that might evict it).
pub struct BufferPool {
    inner: RefCell<Inner>,
    disk: Rc<DiskManager>,
}

impl BufferPool {
    pub fn new(capacity: usize, disk: Rc<DiskManager>) -> Self {
        assert!(capacity > 0, "buffer pool capacity must be at least 1");
        Self {
            inner: RefCell::new(Inner {
                entries: HashMap::new(),
                lru: None,
                mru: None,
                capacity,
            }),
            disk,
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.borrow().capacity
    }

    pub fn resident_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Looks up `id`, loading it through Node I/O on a miss (admitting it
    /// as clean, evicting the LRU entry first if the pool is full), and
    /// promotes the entry to MRU either way.
    pub fn get(&self, id: PageId) -> Result<Node> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.entries.contains_key(&id) {
                inner.touch_mru(id);
                return Ok(inner.entries[&id].node.clone());
            }
        }
        let mut buf = vec![0u8; self.disk.page_size()];
        self.disk.read_page(id, &mut buf)?;
        let node = decode_node(&buf, id)?;
        let mut inner = self.inner.borrow_mut();
        inner.admit(node.clone(), true, &self.disk)?;
        Ok(node)
    }

    /// Admits `node` as the new resident copy for its id — used both for a
    /// freshly allocated node and for writing a mutated node back into the
    /// cache. Always marks the entry dirty.
    pub fn put(&self, node: Node) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.admit(node, false, &self.disk)
    }

    /// Writes every dirty entry through Node I/O, LRU to MRU, clearing
    /// each dirty flag. Residency is preserved; nothing is evicted.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        let page_size = self.disk.page_size();
        let mut cur = inner.lru;
        while let Some(id) = cur {
            cur = inner.entries[&id].next;
            if inner.entries[&id].node.dirty {
                let bytes = encode_node(&inner.entries[&id].node, page_size);
                self.disk.write_page(id, &bytes)?;
                inner.entries.get_mut(&id).unwrap().node.dirty = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn scratch_path(name: &str) -> std::path::PathBuf {
        let mut p = env::temp_dir();
        p.push(format!("kvstore_pool_test_{}_{}", std::process::id(), name));
        p
    }

    fn pool(capacity: usize, name: &str) -> (BufferPool, std::path::PathBuf) {
        let path = scratch_path(name);
        let disk = Rc::new(DiskManager::open(&path, 128).unwrap());
        (BufferPool::new(capacity, disk), path)
    }

    #[test]
    fn put_then_get_round_trips() {
        let (pool, path) = pool(2, "put_get");
        let node = Node::new_leaf(1);
        pool.put(node.clone()).unwrap();
        let fetched = pool.get(1).unwrap();
        assert_eq!(fetched.id, node.id);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn eviction_write_failure_leaves_dirty_node_resident() {
        // `/dev/full` always fails writes with ENOSPC, simulating a disk
        // write error during eviction without touching real disk space.
        let disk = Rc::new(DiskManager::open(std::path::Path::new("/dev/full"), 128).unwrap());
        let pool = BufferPool::new(1, disk);

        let mut first = Node::new_leaf(1);
        first.keys = vec![10];
        first.values = vec![[9u8; 10]];
        pool.put(first).unwrap();

        // Admitting a second node evicts id 1; the write-back fails, so
        // `put` must surface the error rather than silently dropping id 1.
        let second = Node::new_leaf(2);
        assert!(pool.put(second).is_err());

        // id 1 must still be resident and unchanged, retryable on the next
        // flush, not evicted with no corresponding on-disk page.
        assert_eq!(pool.resident_count(), 1);
        let still_resident = pool.get(1).unwrap();
        assert_eq!(still_resident.keys, vec![10]);
        assert_eq!(still_resident.values, vec![[9u8; 10]]);
    }

    #[test]
    fn eviction_writes_back_dirty_entries() {
        let (pool, path) = pool(1, "evict");
        let mut first = Node::new_leaf(1);
        first.keys = vec![10];
        first.values = vec![[1u8; 10]];
        pool.put(first).unwrap();

        // Admitting a second node with capacity 1 evicts id 1, which must
        // have been written back since it was dirty.
        let second = Node::new_leaf(2);
        pool.put(second).unwrap();
        assert_eq!(pool.resident_count(), 1);

        let reloaded = pool.get(1).unwrap();
        assert_eq!(reloaded.keys, vec![10]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn get_promotes_to_mru_and_protects_from_eviction() {
        let (pool, path) = pool(2, "mru");
        pool.put(Node::new_leaf(1)).unwrap();
        pool.put(Node::new_leaf(2)).unwrap();
        // touch 1, making 2 the LRU entry
        pool.get(1).unwrap();
        pool.put(Node::new_leaf(3)).unwrap();
        assert!(pool.get(1).is_ok());
        // 2 should have been evicted, not 1
        let reloaded = pool.get(2).unwrap();
        assert_eq!(reloaded.id, 2);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn flush_clears_dirty_without_evicting() {
        let (pool, path) = pool(4, "flush");
        pool.put(Node::new_leaf(1)).unwrap();
        pool.flush().unwrap();
        assert_eq!(pool.resident_count(), 1);
        std::fs::remove_file(&path).unwrap();
    }
}
