//! The store facade (C5): opens/creates the backing file, reads/writes the
//! file header, and wires together the B+-tree (C4), buffer pool (C3), and
//! node codec (C2) to expose `Put`/`Get`/`Flush`/`Close`/`Delete`.

pub mod config;
pub mod store;

pub use common::error::{Result, StoreError};
pub use config::StoreConfig;
pub use storage_node::Value;
pub use store::Store;
