//! The tree's unit of storage: a materialized B+-tree node and its
//! fixed-order page codec (C2 Node I/O). Neither type here knows about
//! caching or tree-walking — those live in `buffer_pool_manager` and
//! `storage_engine` respectively.

pub mod codec;
pub mod node;

pub use codec::{decode_node, encode_node, max_degree, PAGE_HEADER_SIZE};
pub use node::{Node, Value};
pub use common::NULL_ID;
