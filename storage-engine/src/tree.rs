use std::rc::Rc;

use buffer_pool_manager::BufferPool;
use common::error::StoreError;
use common::{PageId, Result, NULL_ID};
use storage_node::{max_degree, Node, Value};

/// Index of the child whose subtree contains `key`, under the interior
/// ("`≤` is less") comparator: a key equal to a separator descends right.
fn interior_child_index(keys: &[u64], key: u64) -> usize {
    keys.partition_point(|&k| k <= key)
}

/// Index where `key` resides or would be inserted in a leaf, under the
/// strict `<` comparator.
fn leaf_index(keys: &[u64], key: u64) -> usize {
    keys.partition_point(|&k| k < key)
}

pub struct BPlusTree {
    pool: Rc<BufferPool>,
    root_id: PageId,
    next_node_id: PageId,
    max_degree: u32,
}

impl BPlusTree {
    /// Builds a fresh tree: allocates an empty leaf as root, admits it into
    /// the pool as dirty (the page does not yet exist on disk).
    pub fn create(pool: Rc<BufferPool>, page_size: usize) -> Result<Self> {
        let mut tree = Self {
            pool,
            root_id: NULL_ID,
            next_node_id: 1,
            max_degree: max_degree(page_size),
        };
        let root_id = tree.allocate_id();
        tree.pool.put(Node::new_leaf(root_id))?;
        tree.root_id = root_id;
        Ok(tree)
    }

    /// Resumes a tree from a persisted header; validates the root is
    /// readable (surfacing corruption early) and keeps `next_node_id`
    /// running so freshly split nodes never collide with existing ids.
    pub fn open(pool: Rc<BufferPool>, root_id: PageId, next_node_id: PageId, page_size: usize) -> Result<Self> {
        pool.get(root_id)?;
        Ok(Self {
            pool,
            root_id,
            next_node_id,
            max_degree: max_degree(page_size),
        })
    }

    pub fn root_id(&self) -> PageId {
        self.root_id
    }

    pub fn next_node_id(&self) -> PageId {
        self.next_node_id
    }

    fn allocate_id(&mut self) -> PageId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        id
    }

    /// Descends from the root, re-resolving each child by id through the
    /// pool. Returns the leaf that would contain `key`, the index `key`
    /// occupies or would be inserted at, and whether it is actually present.
    fn find(&self, key: u64) -> Result<(Node, usize, bool)> {
        let mut current = self.pool.get(self.root_id)?;
        loop {
            if current.is_leaf {
                let idx = leaf_index(&current.keys, key);
                let found = idx < current.keys.len() && current.keys[idx] == key;
                return Ok((current, idx, found));
            }
            let child_idx = interior_child_index(&current.keys, key);
            let child_id = current.children[child_idx];
            current = self.pool.get(child_id)?;
        }
    }

    pub fn get(&self, key: u64) -> Result<Option<Value>> {
        let (leaf, index, found) = self.find(key)?;
        Ok(if found { Some(leaf.values[index]) } else { None })
    }

    #[tracing::instrument(level = "debug", skip(self, value))]
    pub fn put(&mut self, key: u64, value: Value) -> Result<()> {
        let (mut leaf, index, found) = self.find(key)?;
        if found {
            leaf.values[index] = value;
            leaf.dirty = true;
            self.pool.put(leaf)?;
            return Ok(());
        }

        leaf.keys.insert(index, key);
        leaf.values.insert(index, value);
        leaf.dirty = true;

        if leaf.keys.len() as u32 == self.max_degree {
            self.split_leaf(leaf)?;
        } else {
            self.pool.put(leaf)?;
        }
        Ok(())
    }

    /// `mid = ⌊n/2⌋`; both siblings keep their keys since leaves are the
    /// data layer. The separator promoted to the parent is `R.keys[0]`.
    fn split_leaf(&mut self, mut left: Node) -> Result<()> {
        let n = left.keys.len();
        let mid = n / 2;

        let new_id = self.allocate_id();
        let mut right = Node::new_leaf(new_id);
        right.keys = left.keys.split_off(mid);
        right.values = left.values.split_off(mid);
        right.parent = left.parent;
        right.next = left.next;
        left.next = new_id;
        left.dirty = true;

        let separator = right.keys[0];
        let left_id = left.id;
        let parent_id = left.parent;

        tracing::debug!(left_id, new_id, separator, "splitting leaf");

        self.pool.put(left)?;
        self.pool.put(right)?;

        self.attach_split_child(parent_id, left_id, separator, new_id)
    }

    /// `mid = ⌈n/2⌉`; the key at `L.keys[mid-1]` is removed from `L` and
    /// promoted as the separator (interior separators are not data).
    fn split_internal(&mut self, mut left: Node) -> Result<()> {
        let n = left.keys.len();
        let mid = (n + 1) / 2;
        let separator = left.keys[mid - 1];

        let new_id = self.allocate_id();
        let mut right = Node::new_internal(new_id, Vec::new(), vec![NULL_ID]);
        right.keys = left.keys.split_off(mid);
        right.children = left.children.split_off(mid);
        left.keys.truncate(mid - 1);
        right.parent = left.parent;
        right.next = left.next;
        left.next = new_id;
        left.dirty = true;

        let left_id = left.id;
        let parent_id = left.parent;
        let right_children = right.children.clone();

        tracing::debug!(left_id, new_id, separator, "splitting interior node");

        self.pool.put(left)?;
        self.pool.put(right)?;

        for child_id in right_children {
            let mut child = self.pool.get(child_id)?;
            child.parent = new_id;
            child.dirty = true;
            self.pool.put(child)?;
        }

        self.attach_split_child(parent_id, left_id, separator, new_id)
    }

    /// After a split, either creates a new root over `left`/`right` (if
    /// `left` had no parent) or appends `(separator, right)` to the
    /// existing parent, which may recursively trigger a parent split.
    fn attach_split_child(&mut self, parent_id: PageId, left_id: PageId, separator: u64, right_id: PageId) -> Result<()> {
        if parent_id == NULL_ID {
            self.create_new_root(left_id, separator, right_id)
        } else {
            self.append_child(parent_id, separator, right_id)
        }
    }

    fn create_new_root(&mut self, left_id: PageId, separator: u64, right_id: PageId) -> Result<()> {
        let new_root_id = self.allocate_id();
        let root = Node::new_internal(new_root_id, vec![separator], vec![left_id, right_id]);
        self.pool.put(root)?;

        let mut left = self.pool.get(left_id)?;
        left.parent = new_root_id;
        left.dirty = true;
        self.pool.put(left)?;

        let mut right = self.pool.get(right_id)?;
        right.parent = new_root_id;
        right.dirty = true;
        self.pool.put(right)?;

        self.root_id = new_root_id;
        Ok(())
    }

    /// Inserts `(separator_key, child_id)` into `parent`, splitting it if
    /// the insertion fills it to `max_degree`. Always re-resolves the
    /// parent by id — an earlier ancestor may have been evicted and
    /// reloaded between the original split and this call.
    fn append_child(&mut self, parent_id: PageId, separator: u64, child_id: PageId) -> Result<()> {
        let mut parent = self.pool.get(parent_id)?;
        if parent.keys.len() as u32 == self.max_degree {
            return Err(StoreError::InvariantBroken(
                "append_child called on an already-full parent".into(),
            ));
        }

        let idx = interior_child_index(&parent.keys, separator);
        parent.keys.insert(idx, separator);
        parent.children.insert(idx + 1, child_id);
        parent.dirty = true;

        let full = parent.keys.len() as u32 == self.max_degree;
        self.pool.put(parent)?;

        let mut child = self.pool.get(child_id)?;
        child.parent = parent_id;
        child.dirty = true;
        self.pool.put(child)?;

        if full {
            let parent = self.pool.get(parent_id)?;
            self.split_internal(parent)?;
        }
        Ok(())
    }

    /// Leftmost leaf, for range scans starting at the beginning of the tree.
    pub fn leftmost_leaf(&self) -> Result<PageId> {
        let mut current = self.pool.get(self.root_id)?;
        while !current.is_leaf {
            let child_id = current.children[0];
            current = self.pool.get(child_id)?;
        }
        Ok(current.id)
    }
}
