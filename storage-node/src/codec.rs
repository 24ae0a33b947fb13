//! Node I/O (C2): serializes a `Node` into exactly one page and back,
//! addressing pages by `node_id`. Layout (little-endian throughout):
//!
//! | offset | width | field |
//! |---|---|---|
//! | 0 | 1 | `is_leaf` |
//! | 1 | 8 | stored id |
//! | 9 | 4 | `n` |
//! | 13 | 8 | `next` |
//! | 21 | 8 | `parent` |
//! | 29 | 8*n | keys |
//! | 29+8n | 10*n (leaf) or 8*(n+1) (interior) | values / children |

use common::codec::{read_bool, read_u32, read_u64, write_bool, write_u32, write_u64};
use common::error::StoreError;
use common::{PageId, Result};

use crate::node::{Node, Value};

pub const PAGE_HEADER_SIZE: usize = 29;

const IS_LEAF_OFFSET: usize = 0;
const ID_OFFSET: usize = 1;
const N_OFFSET: usize = 9;
const NEXT_OFFSET: usize = 13;
const PARENT_OFFSET: usize = 21;

const KEY_WIDTH: usize = 8;
const VALUE_WIDTH: usize = 10;
const CHILD_WIDTH: usize = 8;

/// `⌊(page_size − 29) / 18⌋`, applied uniformly to leaves and interior nodes.
pub fn max_degree(page_size: usize) -> u32 {
    ((page_size - PAGE_HEADER_SIZE) / (KEY_WIDTH + VALUE_WIDTH)) as u32
}

pub fn encode_node(node: &Node, page_size: usize) -> Vec<u8> {
    let mut buf = vec![0u8; page_size];
    write_bool(&mut buf, IS_LEAF_OFFSET, node.is_leaf);
    write_u64(&mut buf, ID_OFFSET, node.id);
    write_u32(&mut buf, N_OFFSET, node.n() as u32);
    write_u64(&mut buf, NEXT_OFFSET, node.next);
    write_u64(&mut buf, PARENT_OFFSET, node.parent);

    let mut offset = PAGE_HEADER_SIZE;
    for &key in &node.keys {
        write_u64(&mut buf, offset, key);
        offset += KEY_WIDTH;
    }
    if node.is_leaf {
        for value in &node.values {
            buf[offset..offset + VALUE_WIDTH].copy_from_slice(value);
            offset += VALUE_WIDTH;
        }
    } else {
        for &child in &node.children {
            write_u64(&mut buf, offset, child);
            offset += CHILD_WIDTH;
        }
    }
    buf
}

pub fn decode_node(buf: &[u8], expected_id: PageId) -> Result<Node> {
    let is_leaf = read_bool(buf, IS_LEAF_OFFSET);
    let stored_id = read_u64(buf, ID_OFFSET);
    if stored_id != expected_id {
        return Err(StoreError::Corruption {
            page_id: expected_id,
            reason: format!("stored id {} does not match requested id {}", stored_id, expected_id),
        });
    }
    let n = read_u32(buf, N_OFFSET) as usize;
    let next = read_u64(buf, NEXT_OFFSET);
    let parent = read_u64(buf, PARENT_OFFSET);

    let mut offset = PAGE_HEADER_SIZE;
    let mut keys = Vec::with_capacity(n);
    for _ in 0..n {
        keys.push(read_u64(buf, offset));
        offset += KEY_WIDTH;
    }

    let (values, children): (Vec<Value>, Vec<PageId>) = if is_leaf {
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            let mut v = [0u8; VALUE_WIDTH];
            v.copy_from_slice(&buf[offset..offset + VALUE_WIDTH]);
            values.push(v);
            offset += VALUE_WIDTH;
        }
        (values, Vec::new())
    } else {
        let mut children = Vec::with_capacity(n + 1);
        for _ in 0..=n {
            children.push(read_u64(buf, offset));
            offset += CHILD_WIDTH;
        }
        (Vec::new(), children)
    };

    Ok(Node {
        id: stored_id,
        is_leaf,
        keys,
        values,
        children,
        next,
        parent,
        dirty: false,
    })
}
