//! Primitives shared by every layer of the store: the page id type, the
//! on-disk error taxonomy, the fixed-width header/primitive codec (C1), and
//! the raw positioned-I/O disk manager.

pub mod codec;
pub mod disk_manager;
pub mod error;

/// Identifies a node by its position in the file (`offset = id * page_size`).
/// Id `0` is reserved for the file header and never names a node.
pub type PageId = u64;

pub const NULL_ID: PageId = 0;

pub use disk_manager::DiskManager;
pub use error::{Result, StoreError};
