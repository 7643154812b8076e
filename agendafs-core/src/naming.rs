//! Conflict-free sibling names.

use crate::path::numbered_file_name;
use crate::tree::{NodeId, Tree};

/// A name for a new child of `parent`: `desired` if free, else the first
/// free of `base.1.ext`, `base.2.ext`, ...
pub fn unique_name(tree: &Tree, parent: NodeId, desired: &str) -> String {
    resolve(tree, parent, desired, None)
}

/// The name `child`, already under `parent`, should carry for `desired`,
/// ignoring its own current name.
pub fn unique_name_for(tree: &Tree, parent: NodeId, child: NodeId, desired: &str) -> String {
    resolve(tree, parent, desired, Some(child))
}

fn resolve(tree: &Tree, parent: NodeId, desired: &str, exclude: Option<NodeId>) -> String {
    let taken = |name: &str| {
        tree.child_by_name(parent, name)
            .is_some_and(|c| Some(c) != exclude)
    };
    if !taken(desired) {
        return desired.to_string();
    }

    (1..)
        .map(|n| numbered_file_name(desired, n))
        .find(|candidate| !taken(candidate.as_str()))
        .unwrap_or_else(|| desired.to_string())
}

/// Attach a detached `child` under `parent` as `desired`, renamed on
/// conflict. Returns the name it got.
///
/// Only the tree entry is renamed; the record keeps its summary.
pub fn attach_unique(tree: &mut Tree, parent: NodeId, child: NodeId, desired: &str) -> String {
    let name = unique_name(tree, parent, desired);
    tree.set_name(child, name.clone());
    tree.attach(parent, child);
    name
}
