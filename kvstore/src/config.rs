use buffer_pool_manager::MEMORY_PER_ENTRY;
use common::error::StoreError;
use common::Result;

/// Below this many resident nodes the buffer pool cannot hold a root plus
/// enough working set to make a split progress without immediately evicting
/// what it just wrote; `Store::create`/`open` reject a smaller budget.
pub const MIN_BUFFER_POOL_CAPACITY: u64 = 16;

pub const MIN_MEMORY_BUDGET: u64 = MIN_BUFFER_POOL_CAPACITY * MEMORY_PER_ENTRY;

/// The two tunables a caller must supply explicitly for every `create`/
/// `open` of a store file (see spec's Config Options table): everything
/// else — `file_path` — names *where* the store lives, not *how* it is
/// configured, and is passed as a separate argument.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// Node page size in bytes; also determines `max_degree`. Must be
    /// consistent across opens of the same file — nothing on disk records
    /// it, since the 16-byte header only carries `root_id` and
    /// `next_node_id`.
    pub page_size: usize,
    /// Upper bound on resident node memory, in bytes. Buffer pool capacity
    /// is `memory_budget / MEMORY_PER_ENTRY`.
    pub memory_budget: u64,
}

impl StoreConfig {
    pub fn buffer_pool_capacity(&self) -> Result<usize> {
        if self.memory_budget < MIN_MEMORY_BUDGET {
            return Err(StoreError::InvalidConfig(format!(
                "memory_budget {} is below the floor of {} bytes ({} resident nodes)",
                self.memory_budget, MIN_MEMORY_BUDGET, MIN_BUFFER_POOL_CAPACITY
            )));
        }
        Ok((self.memory_budget / MEMORY_PER_ENTRY) as usize)
    }
}
