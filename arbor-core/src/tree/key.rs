//! Sibling keys.
//!
//! Every node in a sibling list gets a key `<explicit key or index>.<kind
//! identity>`. Matching old and new siblings by key (rather than by
//! position) turns a reorder into a pure reorder, and including the kind
//! means two different kinds at the same key are never matched.

use indexmap::{IndexMap, IndexSet};

use crate::error::StructuralError;
use crate::tree::Node;

/// Derive the key of the node at `index` in its sibling list.
pub fn derive_key(index: usize, node: &Node) -> String {
    let identity = node.kind().identity();
    match node.explicit_key() {
        Some(key) => format!("{key}.{identity}"),
        None => format!("{index}.{identity}"),
    }
}

/// Keys of a sibling list, in list order.
///
/// Fails on the first collision.
pub fn derive_keys(nodes: &[Node]) -> Result<IndexSet<String>, StructuralError> {
    let mut keys = IndexSet::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        let key = derive_key(index, node);
        if keys.contains(&key) {
            return Err(StructuralError::DuplicateKey { key });
        }
        keys.insert(key);
    }
    Ok(keys)
}

/// Index a sibling list by key.
pub fn index_by_key(nodes: Vec<Node>) -> Result<IndexMap<String, Node>, StructuralError> {
    let mut map = IndexMap::with_capacity(nodes.len());
    for (index, node) in nodes.into_iter().enumerate() {
        let key = derive_key(index, &node);
        if map.contains_key(&key) {
            return Err(StructuralError::DuplicateKey { key });
        }
        map.insert(key, node);
    }
    Ok(map)
}
