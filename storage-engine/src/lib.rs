//! The B+-tree (C4): root id, id allocator, descent, leaf insertion, split
//! propagation, and cache-aware child/parent/next access. Every cross-node
//! hop re-resolves the neighbor by id through the buffer pool; no node
//! reference is ever held across a call that might evict it.

pub mod tree;

pub use tree::BPlusTree;
