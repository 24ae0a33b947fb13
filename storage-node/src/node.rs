use common::{PageId, NULL_ID};

/// The value shape this store persists: a fixed 10-byte record.
pub type Value = [u8; 10];

/// A materialized B+-tree node, decoded from its page.
///
/// `values` is meaningful only when `is_leaf`; `children` is meaningful only
/// when `!is_leaf` and always holds `keys.len() + 1` entries. `next` chains
/// siblings left-to-right at the same level: the semantically required use
/// is leaf range scans, but a split also links the new interior sibling in,
/// so `next` is `NULL_ID` only on the rightmost node at a given level.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: PageId,
    pub is_leaf: bool,
    pub keys: Vec<u64>,
    pub values: Vec<Value>,
    pub children: Vec<PageId>,
    pub next: PageId,
    pub parent: PageId,
    pub dirty: bool,
}

impl Node {
    pub fn new_leaf(id: PageId) -> Self {
        Self {
            id,
            is_leaf: true,
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
            next: NULL_ID,
            parent: NULL_ID,
            dirty: true,
        }
    }

    pub fn new_internal(id: PageId, keys: Vec<u64>, children: Vec<PageId>) -> Self {
        debug_assert_eq!(children.len(), keys.len() + 1);
        Self {
            id,
            is_leaf: false,
            keys,
            values: Vec::new(),
            children,
            next: NULL_ID,
            parent: NULL_ID,
            dirty: true,
        }
    }

    pub fn n(&self) -> usize {
        self.keys.len()
    }
}
