//! In-memory tree index.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. The root
//! is slot 0, has no [`Entry`] and is never indexed. Every other node is
//! indexed by its backing filename and by its record uid, whether or not it
//! is currently attached under the root.

use std::collections::HashMap;

use crate::path::split_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// What a non-root node shows and where its record lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Display name, unique among siblings
    pub name: String,
    /// Backing filename, fixed for the node's lifetime
    pub vdir_name: String,
    pub uid: String,
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    entry: Option<Entry>,
}

#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    by_vdir: HashMap<String, NodeId>,
    by_uid: HashMap<String, NodeId>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Tree {
            nodes: vec![Some(Node {
                parent: None,
                children: Vec::new(),
                entry: None,
            })],
            free: Vec::new(),
            by_vdir: HashMap::new(),
            by_uid: HashMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        id.0 == 0
    }

    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.0].as_ref().expect("node id refers to a freed slot")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0].as_mut().expect("node id refers to a freed slot")
    }

    /// Create a detached node for `entry` and index it.
    pub fn insert(&mut self, entry: Entry) -> NodeId {
        let vdir_name = entry.vdir_name.clone();
        let uid = entry.uid.clone();
        let node = Node {
            parent: None,
            children: Vec::new(),
            entry: Some(entry),
        };

        let id = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        };

        self.by_vdir.insert(vdir_name, id);
        self.by_uid.insert(uid, id);
        id
    }

    pub fn entry(&self, id: NodeId) -> Option<&Entry> {
        self.node(id).entry.as_ref()
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.entry(id).map(|e| e.name.as_str()).unwrap_or("")
    }

    pub fn set_name(&mut self, id: NodeId, name: String) {
        if let Some(entry) = self.node_mut(id).entry.as_mut() {
            entry.name = name;
        }
    }

    /// Point the uid index at `id` under a new uid.
    pub fn set_uid(&mut self, id: NodeId, uid: String) {
        let Some(entry) = self.node_mut(id).entry.as_mut() else {
            return;
        };
        let old = std::mem::replace(&mut entry.uid, uid.clone());
        if self.by_uid.get(&old) == Some(&id) {
            self.by_uid.remove(&old);
        }
        self.by_uid.insert(uid, id);
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.node(id).children.is_empty()
    }

    pub fn by_vdir(&self, vdir_name: &str) -> Option<NodeId> {
        self.by_vdir.get(vdir_name).copied()
    }

    pub fn by_uid(&self, uid: &str) -> Option<NodeId> {
        self.by_uid.get(uid).copied()
    }

    /// Number of indexed (non-root) nodes
    pub fn len(&self) -> usize {
        self.by_vdir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_vdir.is_empty()
    }

    /// Every indexed node, attached or not
    pub fn indexed(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.by_vdir.values().copied().collect();
        ids.sort_by_key(|id| id.0);
        ids
    }

    /// Append `child` to `parent`'s children. The name must already be free.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.node(child).parent.is_none());
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Remove `id` from its parent, keeping sibling order. Returns whether
    /// it had a parent.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.node_mut(id).parent.take() else {
            return false;
        };
        self.node_mut(parent).children.retain(|c| *c != id);
        true
    }

    /// Detach `id` and free it with its whole subtree, dropping index entries.
    pub fn destroy(&mut self, id: NodeId) {
        if self.is_root(id) {
            return;
        }
        self.detach(id);

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes[current.0].take() else {
                continue;
            };
            stack.extend(node.children);
            if let Some(entry) = node.entry {
                if self.by_vdir.get(&entry.vdir_name) == Some(&current) {
                    self.by_vdir.remove(&entry.vdir_name);
                }
                if self.by_uid.get(&entry.uid) == Some(&current) {
                    self.by_uid.remove(&entry.uid);
                }
            }
            self.free.push(current.0);
        }
    }

    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.name(*c) == name)
    }

    /// Resolve an absolute path by scanning names level by level.
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root();
        for segment in split_path(path) {
            current = self.child_by_name(current, segment)?;
        }
        Some(current)
    }

    /// Whether `id` is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.is_root(id) || self.ancestors(id).last().copied() == Some(self.root())
    }

    /// Whether `ancestor` is `id` or lies on its parent chain
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).contains(&ancestor)
    }

    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            chain.push(p);
            current = self.parent(p);
        }
        chain
    }

    /// Absolute path of an attached node
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        if self.is_root(id) {
            return Some("/".to_string());
        }
        if !self.is_attached(id) {
            return None;
        }

        let mut names: Vec<&str> = self
            .ancestors(id)
            .into_iter()
            .filter(|a| !self.is_root(*a))
            .map(|a| self.name(a))
            .collect();
        names.reverse();
        names.push(self.name(id));
        Some(format!("/{}", names.join("/")))
    }

    /// All nodes below `id`, depth first
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.walk(id).into_iter().skip(1).map(|(_, n)| n).collect()
    }

    /// `id` and its subtree in depth-first pre-order, with depth relative to `id`
    pub fn walk(&self, id: NodeId) -> Vec<(usize, NodeId)> {
        let mut out = Vec::new();
        let mut stack = vec![(0, id)];
        while let Some((depth, current)) = stack.pop() {
            out.push((depth, current));
            for child in self.children(current).iter().rev() {
                stack.push((depth + 1, *child));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, uid: &str) -> Entry {
        Entry {
            name: name.to_string(),
            vdir_name: format!("{}.ics", uid),
            uid: uid.to_string(),
        }
    }

    #[test]
    fn test_insert_indexes_but_does_not_attach() {
        let mut tree = Tree::new();
        let id = tree.insert(entry("a.txt", "u1"));

        assert_eq!(tree.by_vdir("u1.ics"), Some(id));
        assert_eq!(tree.by_uid("u1"), Some(id));
        assert!(!tree.is_attached(id));
        assert_eq!(tree.lookup("/a.txt"), None);
        assert_eq!(tree.by_vdir(""), None);
    }

    #[test]
    fn test_is_attached_follows_parent_chain() {
        let mut tree = Tree::new();
        let root = tree.root();
        let notes = tree.insert(entry("notes", "u1"));
        let todo = tree.insert(entry("todo.txt", "u2"));
        tree.attach(notes, todo);

        assert!(tree.is_attached(root));
        assert!(!tree.is_attached(todo));

        tree.attach(root, notes);
        assert!(tree.is_attached(notes));
        assert!(tree.is_attached(todo));
    }

    #[test]
    fn test_lookup_by_path() {
        let mut tree = Tree::new();
        let root = tree.root();
        let notes = tree.insert(entry("notes", "u1"));
        let todo = tree.insert(entry("todo.txt", "u2"));
        tree.attach(root, notes);
        tree.attach(notes, todo);

        assert_eq!(tree.lookup("/"), Some(root));
        assert_eq!(tree.lookup("/notes"), Some(notes));
        assert_eq!(tree.lookup("/notes/todo.txt"), Some(todo));
        assert_eq!(tree.lookup("/notes/missing"), None);
        assert_eq!(tree.path_of(todo).as_deref(), Some("/notes/todo.txt"));
    }

    #[test]
    fn test_detach_preserves_sibling_order() {
        let mut tree = Tree::new();
        let root = tree.root();
        let ids: Vec<NodeId> = ["a", "b", "c", "d"]
            .iter()
            .enumerate()
            .map(|(i, n)| tree.insert(entry(n, &format!("u{}", i))))
            .collect();
        for id in &ids {
            tree.attach(root, *id);
        }

        assert!(tree.detach(ids[1]));
        assert!(!tree.detach(ids[1]));
        let names: Vec<&str> = tree.children(root).iter().map(|c| tree.name(*c)).collect();
        assert_eq!(names, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_destroy_frees_subtree_and_index() {
        let mut tree = Tree::new();
        let root = tree.root();
        let dir = tree.insert(entry("dir", "u1"));
        let file = tree.insert(entry("f.txt", "u2"));
        tree.attach(root, dir);
        tree.attach(dir, file);

        tree.destroy(dir);
        assert!(tree.is_empty());
        assert_eq!(tree.by_uid("u2"), None);
        assert!(tree.children(root).is_empty());

        // freed slots are reused
        let again = tree.insert(entry("x", "u3"));
        assert!(again == dir || again == file);
    }

    #[test]
    fn test_is_ancestor() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.insert(entry("a", "u1"));
        let b = tree.insert(entry("b", "u2"));
        tree.attach(root, a);
        tree.attach(a, b);

        assert!(tree.is_ancestor(a, b));
        assert!(tree.is_ancestor(a, a));
        assert!(!tree.is_ancestor(b, a));
    }
}
