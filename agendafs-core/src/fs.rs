//! Filesystem operations over the tree.
//!
//! [`AgendaFs`] owns the tree behind one read-write lock. Read operations
//! take it shared; anything that can change the tree or a record, including
//! reconciliation of external changes, takes it exclusively for the whole
//! operation. Records are read from the vdir on demand, so the vdir stays
//! the source of truth for everything except the tree shape.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::attribute::Attribute;
use crate::config::AgendaFsConfig;
use crate::constants::{DIRECTORY_PERMISSIONS, FILE_PERMISSIONS};
use crate::error::{AgendaFsError, AgendaFsResult};
use crate::journal::{Journal, new_uid};
use crate::naming::attach_unique;
use crate::path::{file_name, is_hidden, parent_path};
use crate::sync::{build_initial_tree, on_external_change, on_external_delete};
use crate::tree::{Entry, NodeId, Tree};
use crate::vdir::Vdir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// What `stat` reports for a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStat {
    pub kind: NodeKind,
    pub size: u64,
    pub perm: u16,
    pub nlink: u32,
    pub mtime: DateTime<Utc>,
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: NodeKind,
}

pub struct AgendaFs {
    tree: RwLock<Tree>,
    vdir: Vdir,
    default_extension: String,
}

impl AgendaFs {
    /// Build the tree from `vdir`.
    pub fn new(vdir: Vdir, default_extension: impl Into<String>) -> AgendaFsResult<Self> {
        let default_extension = default_extension.into();
        let tree = build_initial_tree(&vdir, &default_extension)?;

        Ok(AgendaFs {
            tree: RwLock::new(tree),
            vdir,
            default_extension,
        })
    }

    pub fn from_config(config: &AgendaFsConfig) -> AgendaFsResult<Self> {
        Self::new(Vdir::new(config.vdir_path()), config.default_extension.clone())
    }

    pub fn vdir(&self) -> &Vdir {
        &self.vdir
    }

    pub fn default_extension(&self) -> &str {
        &self.default_extension
    }

    // SYNC:

    /// Rebuild the whole tree from the vdir.
    pub fn reload(&self) -> AgendaFsResult<()> {
        let mut tree = self.tree.write();
        *tree = build_initial_tree(&self.vdir, &self.default_extension)?;
        Ok(())
    }

    /// A record file was created or modified outside of this process.
    pub fn on_external_change(&self, filename: &str) -> AgendaFsResult<()> {
        let mut tree = self.tree.write();
        on_external_change(&mut tree, &self.vdir, filename, &self.default_extension)?;
        Ok(())
    }

    /// A record file was deleted outside of this process.
    pub fn on_external_delete(&self, filename: &str) -> bool {
        let mut tree = self.tree.write();
        on_external_delete(&mut tree, filename)
    }

    // READ:

    pub fn stat(&self, path: &str) -> AgendaFsResult<NodeStat> {
        let tree = self.tree.read();
        let id = resolve(&tree, path)?;

        let Some(entry) = tree.entry(id) else {
            let dir = self.vdir.stat_dir()?;
            return Ok(NodeStat {
                kind: NodeKind::Directory,
                size: 0,
                perm: DIRECTORY_PERMISSIONS,
                nlink: 2,
                mtime: dir.mtime,
                uid: dir.uid,
                gid: dir.gid,
            });
        };

        let store = self.vdir.stat(&entry.vdir_name)?;
        let journal = self.load(&tree, id)?;

        let stat = if is_directory(&tree, id, &journal) {
            NodeStat {
                kind: NodeKind::Directory,
                size: self.directory_size(&tree, id)?,
                perm: DIRECTORY_PERMISSIONS,
                nlink: 2,
                mtime: store.mtime,
                uid: store.uid,
                gid: store.gid,
            }
        } else {
            NodeStat {
                kind: NodeKind::File,
                size: journal.content_len(),
                perm: FILE_PERMISSIONS,
                nlink: 1,
                mtime: store.mtime,
                uid: store.uid,
                gid: store.gid,
            }
        };
        Ok(stat)
    }

    /// Children of a directory, in tree order.
    pub fn read_dir(&self, path: &str) -> AgendaFsResult<Vec<DirEntry>> {
        let tree = self.tree.read();
        let id = resolve(&tree, path)?;
        if self.kind(&tree, id)? != NodeKind::Directory {
            return Err(AgendaFsError::NotADirectory(path.to_string()));
        }

        tree.children(id)
            .iter()
            .map(|child| {
                Ok(DirEntry {
                    name: tree.name(*child).to_string(),
                    kind: self.kind(&tree, *child)?,
                })
            })
            .collect()
    }

    /// The subtree below `path` in depth-first order, with depth starting at 0
    /// for the direct children.
    pub fn walk(&self, path: &str) -> AgendaFsResult<Vec<(usize, DirEntry)>> {
        let tree = self.tree.read();
        let id = resolve(&tree, path)?;

        tree.walk(id)
            .into_iter()
            .skip(1)
            .map(|(depth, node)| {
                let entry = DirEntry {
                    name: tree.name(node).to_string(),
                    kind: self.kind(&tree, node)?,
                };
                Ok((depth - 1, entry))
            })
            .collect()
    }

    pub fn open(&self, path: &str) -> AgendaFsResult<()> {
        let tree = self.tree.read();
        resolve(&tree, path).map(|_| ())
    }

    /// Up to `size` bytes of content starting at `offset`.
    pub fn read(&self, path: &str, offset: u64, size: usize) -> AgendaFsResult<Vec<u8>> {
        let tree = self.tree.read();
        let id = resolve(&tree, path)?;
        if tree.is_root(id) {
            return Err(AgendaFsError::IsADirectory(path.to_string()));
        }

        let journal = self.load(&tree, id)?;
        let content = journal.content().as_bytes();
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        if start >= content.len() {
            return Ok(Vec::new());
        }

        let end = content.len().min(start.saturating_add(size));
        Ok(content[start..end].to_vec())
    }

    pub fn get_attribute(&self, path: &str, name: &str) -> AgendaFsResult<String> {
        let attribute = Attribute::from_name(name)?;
        let tree = self.tree.read();
        let id = resolve(&tree, path)?;
        if tree.is_root(id) {
            return Err(AgendaFsError::not_found(name));
        }

        let journal = self.load(&tree, id)?;
        attribute
            .get(&journal)
            .ok_or_else(|| AgendaFsError::not_found(name))
    }

    /// Names of the attributes present on `path`.
    pub fn list_attributes(&self, path: &str) -> AgendaFsResult<Vec<String>> {
        let tree = self.tree.read();
        let id = resolve(&tree, path)?;
        if tree.is_root(id) {
            return Err(AgendaFsError::denied("the root has no attributes"));
        }

        let journal = self.load(&tree, id)?;
        Ok(Attribute::list(&journal)
            .iter()
            .map(|a| a.name().to_string())
            .collect())
    }

    // MUTATE:

    pub fn create_file(&self, path: &str) -> AgendaFsResult<()> {
        self.create_entry(path, NodeKind::File)
    }

    pub fn create_dir(&self, path: &str) -> AgendaFsResult<()> {
        self.create_entry(path, NodeKind::Directory)
    }

    fn create_entry(&self, path: &str, kind: NodeKind) -> AgendaFsResult<()> {
        check_absolute(path)?;
        if is_hidden(path) {
            return Err(AgendaFsError::denied(format!("{} is a hidden name", path)));
        }

        let mut tree = self.tree.write();
        if tree.lookup(path).is_some() {
            return Err(AgendaFsError::AlreadyExists(path.to_string()));
        }

        let parent = parent_path(path)
            .and_then(|p| tree.lookup(p))
            .ok_or_else(|| AgendaFsError::not_found(parent_path(path).unwrap_or(path)))?;
        if self.kind(&tree, parent)? != NodeKind::Directory {
            return Err(AgendaFsError::NotADirectory(
                parent_path(path).unwrap_or(path).to_string(),
            ));
        }

        let name = file_name(path);
        let uid = new_uid();
        let mut journal = match kind {
            NodeKind::Directory => Journal::new_directory(uid, name),
            NodeKind::File => Journal::new_file(uid, name),
        };
        if let Some(parent_entry) = tree.entry(parent) {
            journal.set_parent(&parent_entry.uid);
        }

        self.ensure_directory_marker(&tree, parent)?;
        let vdir_name = journal.vdir_filename();
        if let Err(e) = self.vdir.save(&vdir_name, &mut journal) {
            // drop whatever part of the record made it to disk
            let _ = self.vdir.delete(&vdir_name);
            return Err(e);
        }

        let id = tree.insert(Entry {
            name: name.to_string(),
            vdir_name: vdir_name.clone(),
            uid: journal.uid.clone(),
        });
        let name = attach_unique(&mut tree, parent, id, name);

        info!(path = %path, name = %name, file = %vdir_name, kind = ?kind, "created");
        Ok(())
    }

    /// Write `data` at `offset`, clamping the offset to the current length.
    pub fn write(&self, path: &str, offset: u64, data: &[u8]) -> AgendaFsResult<usize> {
        if is_hidden(path) {
            return Err(AgendaFsError::denied(format!("{} is a hidden name", path)));
        }

        let tree = self.tree.write();
        let id = self.resolve_file(&tree, path)?;

        let mut journal = self.load(&tree, id)?;
        journal.write_content(offset, data)?;
        self.persist(&tree, id, &mut journal)?;

        debug!(path = %path, offset, len = data.len(), "written");
        Ok(data.len())
    }

    /// Keep only the first `len` bytes of content.
    pub fn truncate(&self, path: &str, len: u64) -> AgendaFsResult<()> {
        let tree = self.tree.write();
        let id = self.resolve_file(&tree, path)?;

        let mut journal = self.load(&tree, id)?;
        if len >= journal.content_len() {
            return Ok(());
        }
        journal.truncate_content(len)?;
        self.persist(&tree, id, &mut journal)
    }

    pub fn remove_file(&self, path: &str) -> AgendaFsResult<()> {
        let mut tree = self.tree.write();
        let id = self.resolve_file(&tree, path)?;
        self.delete_entry(&mut tree, id)
    }

    pub fn remove_dir(&self, path: &str) -> AgendaFsResult<()> {
        let mut tree = self.tree.write();
        let id = resolve(&tree, path)?;
        if tree.is_root(id) {
            return Err(AgendaFsError::denied("cannot remove the root"));
        }
        if self.kind(&tree, id)? != NodeKind::Directory {
            return Err(AgendaFsError::NotADirectory(path.to_string()));
        }
        if tree.has_children(id) {
            return Err(AgendaFsError::NotEmpty(path.to_string()));
        }
        self.delete_entry(&mut tree, id)
    }

    /// Rename or move `old` to `new`, replacing a childless node at `new`.
    pub fn rename(&self, old: &str, new: &str) -> AgendaFsResult<()> {
        check_absolute(old)?;
        check_absolute(new)?;
        if is_hidden(new) {
            return Err(AgendaFsError::denied(format!("{} is a hidden name", new)));
        }

        let mut tree = self.tree.write();
        let id = resolve(&tree, old)?;
        if tree.is_root(id) {
            return Err(AgendaFsError::invalid("cannot rename the root"));
        }

        let new_parent = parent_path(new)
            .and_then(|p| tree.lookup(p))
            .ok_or_else(|| AgendaFsError::invalid(format!("parent of {} does not exist", new)))?;
        if self.kind(&tree, new_parent)? != NodeKind::Directory {
            return Err(AgendaFsError::NotADirectory(new.to_string()));
        }
        if tree.is_ancestor(id, new_parent) {
            return Err(AgendaFsError::invalid(format!(
                "cannot move {} into itself",
                old
            )));
        }

        let existing = tree.lookup(new).filter(|e| *e != id);
        if let Some(existing) = existing {
            if tree.has_children(existing) {
                return Err(AgendaFsError::NotEmpty(new.to_string()));
            }
            let moving = self.kind(&tree, id)?;
            match (moving, self.kind(&tree, existing)?) {
                (NodeKind::File, NodeKind::Directory) => {
                    return Err(AgendaFsError::IsADirectory(new.to_string()));
                }
                (NodeKind::Directory, NodeKind::File) => {
                    return Err(AgendaFsError::NotADirectory(new.to_string()));
                }
                _ => {}
            }
        }

        self.rename_path_to(&mut tree, id, new_parent, file_name(new), existing)?;
        info!(from = %old, to = %new, "renamed");
        Ok(())
    }

    /// Rename `id` to `name` under `new_parent`, updating its record and
    /// removing `replaced` (the node currently at the destination).
    ///
    /// Records are written before the tree changes; if removing `replaced`
    /// fails, the moved record is restored.
    fn rename_path_to(
        &self,
        tree: &mut Tree,
        id: NodeId,
        new_parent: NodeId,
        name: &str,
        replaced: Option<NodeId>,
    ) -> AgendaFsResult<()> {
        let original = self.load(tree, id)?;
        let mut journal = original.clone();
        journal.set_display_name(name);

        let moved = tree.parent(id) != Some(new_parent);
        if moved {
            match tree.entry(new_parent) {
                Some(parent_entry) => journal.set_parent(&parent_entry.uid),
                None => journal.clear_parent(),
            }
            self.ensure_directory_marker(tree, new_parent)?;
        }

        self.persist(tree, id, &mut journal)?;
        if let Some(replaced) = replaced {
            if let Err(e) = self.delete_entry(tree, replaced) {
                let mut original = original;
                let _ = self.persist(tree, id, &mut original);
                return Err(e);
            }
        }

        if moved {
            tree.detach(id);
            attach_unique(tree, new_parent, id, name);
        } else {
            tree.set_name(id, name.to_string());
        }
        Ok(())
    }

    /// Set an attribute. Nothing is written when the value is rejected.
    pub fn set_attribute(&self, path: &str, name: &str, value: &str) -> AgendaFsResult<()> {
        let attribute = Attribute::from_name(name)?;
        let tree = self.tree.write();
        let id = resolve(&tree, path)?;
        if tree.is_root(id) {
            return Err(AgendaFsError::denied("the root has no attributes"));
        }

        let mut journal = self.load(&tree, id)?;
        attribute.set(&mut journal, value)?;
        self.persist(&tree, id, &mut journal)?;

        debug!(path = %path, attribute = %name, "attribute set");
        Ok(())
    }

    pub fn clear_attribute(&self, path: &str, name: &str) -> AgendaFsResult<()> {
        let attribute = Attribute::from_name(name)?;
        let tree = self.tree.write();
        let id = resolve(&tree, path)?;
        if tree.is_root(id) {
            return Err(AgendaFsError::denied("the root has no attributes"));
        }

        let mut journal = self.load(&tree, id)?;
        attribute.clear(&mut journal)?;
        self.persist(&tree, id, &mut journal)?;

        debug!(path = %path, attribute = %name, "attribute cleared");
        Ok(())
    }

    // HELPERS:

    fn load(&self, tree: &Tree, id: NodeId) -> AgendaFsResult<Journal> {
        let entry = tree
            .entry(id)
            .ok_or_else(|| AgendaFsError::invalid("the root has no record"))?;
        self.vdir.load(&entry.vdir_name)
    }

    fn persist(&self, tree: &Tree, id: NodeId, journal: &mut Journal) -> AgendaFsResult<()> {
        let entry = tree
            .entry(id)
            .ok_or_else(|| AgendaFsError::invalid("the root has no record"))?;
        self.vdir.save(&entry.vdir_name, journal)
    }

    fn kind(&self, tree: &Tree, id: NodeId) -> AgendaFsResult<NodeKind> {
        if tree.is_root(id) || tree.has_children(id) {
            return Ok(NodeKind::Directory);
        }
        let journal = self.load(tree, id)?;
        Ok(if journal.is_directory() {
            NodeKind::Directory
        } else {
            NodeKind::File
        })
    }

    /// Resolve a path that must name a file.
    fn resolve_file(&self, tree: &Tree, path: &str) -> AgendaFsResult<NodeId> {
        let id = resolve(tree, path)?;
        if self.kind(tree, id)? == NodeKind::Directory {
            return Err(AgendaFsError::IsADirectory(path.to_string()));
        }
        Ok(id)
    }

    /// Sum of content lengths of every file below `id`
    fn directory_size(&self, tree: &Tree, id: NodeId) -> AgendaFsResult<u64> {
        let mut size = 0;
        for node in tree.descendants(id) {
            let journal = self.load(tree, node)?;
            if !is_directory(tree, node, &journal) {
                size += journal.content_len();
            }
        }
        Ok(size)
    }

    /// Persist the directory marker on a node that is getting a child.
    fn ensure_directory_marker(&self, tree: &Tree, id: NodeId) -> AgendaFsResult<()> {
        if tree.is_root(id) {
            return Ok(());
        }
        let mut journal = self.load(tree, id)?;
        if !journal.has_directory_marker() {
            journal.mark_as_directory();
            self.persist(tree, id, &mut journal)?;
        }
        Ok(())
    }

    fn delete_entry(&self, tree: &mut Tree, id: NodeId) -> AgendaFsResult<()> {
        let Some(vdir_name) = tree.entry(id).map(|e| e.vdir_name.clone()) else {
            return Err(AgendaFsError::denied("cannot remove the root"));
        };

        self.vdir.delete(&vdir_name)?;
        tree.destroy(id);
        info!(file = %vdir_name, "deleted");
        Ok(())
    }
}

fn is_directory(tree: &Tree, id: NodeId, journal: &Journal) -> bool {
    tree.has_children(id) || journal.is_directory()
}

fn check_absolute(path: &str) -> AgendaFsResult<()> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(AgendaFsError::invalid(format!("{} is not an absolute path", path)))
    }
}

fn resolve(tree: &Tree, path: &str) -> AgendaFsResult<NodeId> {
    check_absolute(path)?;
    tree.lookup(path)
        .ok_or_else(|| AgendaFsError::not_found(path))
}
