//! Building the tree from the vdir and reconciling external changes.
//!
//! A record whose parent reference resolves to another indexed record is
//! attached under it, and the parent is persisted with the directory
//! marker. A record whose parent cannot be resolved stays indexed but
//! detached (an orphan) until its parent shows up.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::AgendaFsResult;
use crate::journal::Journal;
use crate::naming::{attach_unique, unique_name_for};
use crate::tree::{Entry, NodeId, Tree};
use crate::vdir::Vdir;

/// Name a record shows in the tree
pub fn derived_name(journal: &Journal, has_children: bool, default_extension: &str) -> String {
    if has_children {
        journal.summary.clone()
    } else {
        journal.display_name(default_extension)
    }
}

fn entry_for(journal: &Journal, vdir_name: &str, default_extension: &str) -> Entry {
    Entry {
        name: derived_name(journal, false, default_extension),
        vdir_name: vdir_name.to_string(),
        uid: journal.uid.clone(),
    }
}

/// Scan the vdir and build the tree.
///
/// Records that fail to load are logged and skipped.
pub fn build_initial_tree(vdir: &Vdir, default_extension: &str) -> AgendaFsResult<Tree> {
    let mut tree = Tree::new();
    let mut journals: HashMap<NodeId, Journal> = HashMap::new();

    for filename in vdir.list()? {
        match vdir.load(&filename) {
            Ok(journal) => {
                if let Some(existing) = tree.by_uid(&journal.uid) {
                    warn!(
                        file = %filename,
                        uid = %journal.uid,
                        other = ?tree.entry(existing).map(|e| &e.vdir_name),
                        "duplicate uid, parent references resolve to the last one"
                    );
                }
                let id = tree.insert(entry_for(&journal, &filename, default_extension));
                journals.insert(id, journal);
            }
            Err(e) => warn!(file = %filename, error = %e, "skipping record"),
        }
    }

    let ids = tree.indexed();

    // Parents become directories before anything is attached, so they
    // are named as directories from the start.
    for id in &ids {
        let Some(parent) = journals
            .get(id)
            .and_then(|j| j.parent_uid())
            .and_then(|uid| tree.by_uid(uid))
            .filter(|parent| parent != id)
        else {
            continue;
        };

        if let Some(parent_journal) = journals.get_mut(&parent) {
            if !parent_journal.has_directory_marker() {
                mark_directory(&mut tree, vdir, parent, parent_journal, default_extension)?;
            }
        }
    }

    for id in ids {
        if let Some(journal) = journals.get(&id) {
            attach_to_parent(&mut tree, id, journal);
        }
    }

    info!(records = tree.len(), "tree built");
    Ok(tree)
}

/// Persist the directory marker on `id`'s record and rename its entry.
fn mark_directory(
    tree: &mut Tree,
    vdir: &Vdir,
    id: NodeId,
    journal: &mut Journal,
    default_extension: &str,
) -> AgendaFsResult<()> {
    let Some(vdir_name) = tree.entry(id).map(|e| e.vdir_name.clone()) else {
        return Ok(());
    };

    debug!(file = %vdir_name, "marking record as directory");
    journal.mark_as_directory();
    vdir.save(&vdir_name, journal)?;
    rename_in_place(tree, id, derived_name(journal, true, default_extension));
    Ok(())
}

/// Give `id` a new name, staying under its current parent.
fn rename_in_place(tree: &mut Tree, id: NodeId, name: String) {
    if tree.name(id) == name {
        return;
    }
    let name = match tree.parent(id) {
        Some(parent) => unique_name_for(tree, parent, id, &name),
        None => name,
    };
    tree.set_name(id, name);
}

/// Attach a detached node where its record says it belongs.
///
/// Returns false when the parent reference does not resolve (or would
/// form a cycle) and the node is left as an orphan.
fn attach_to_parent(tree: &mut Tree, id: NodeId, journal: &Journal) -> bool {
    let desired = tree.name(id).to_string();

    let Some(parent_uid) = journal.parent_uid() else {
        let root = tree.root();
        attach_unique(tree, root, id, &desired);
        return true;
    };

    match tree.by_uid(parent_uid) {
        Some(parent) if !tree.is_ancestor(id, parent) => {
            attach_unique(tree, parent, id, &desired);
            true
        }
        _ => {
            warn!(uid = %journal.uid, parent = %parent_uid, "parent not found, record is orphaned");
            false
        }
    }
}

/// Resolve the node a record's parent reference points at, marking it as
/// a directory when needed.
fn resolve_parent(
    tree: &mut Tree,
    vdir: &Vdir,
    id: NodeId,
    journal: &Journal,
    default_extension: &str,
) -> AgendaFsResult<()> {
    let Some(parent) = journal
        .parent_uid()
        .and_then(|uid| tree.by_uid(uid))
        .filter(|parent| !tree.is_ancestor(id, *parent))
    else {
        return Ok(());
    };

    if let Some(vdir_name) = tree.entry(parent).map(|e| e.vdir_name.clone()) {
        let mut parent_journal = vdir.load(&vdir_name)?;
        if !parent_journal.has_directory_marker() {
            mark_directory(tree, vdir, parent, &mut parent_journal, default_extension)?;
        }
    }
    Ok(())
}

/// Reconcile a created or modified record file.
///
/// The node is inserted or updated, renamed from its record and moved
/// under the parent its record names. Orphans waiting for this record are
/// adopted. Returns the node.
pub fn on_external_change(
    tree: &mut Tree,
    vdir: &Vdir,
    filename: &str,
    default_extension: &str,
) -> AgendaFsResult<NodeId> {
    let journal = vdir.load(filename)?;

    let id = match tree.by_vdir(filename) {
        Some(id) => {
            if tree.entry(id).is_some_and(|e| e.uid != journal.uid) {
                tree.set_uid(id, journal.uid.clone());
            }
            id
        }
        None => tree.insert(entry_for(&journal, filename, default_extension)),
    };

    resolve_parent(tree, vdir, id, &journal, default_extension)?;

    let name = derived_name(&journal, tree.has_children(id), default_extension);
    let target = match journal.parent_uid() {
        None => Some(tree.root()),
        Some(uid) => tree.by_uid(uid).filter(|p| !tree.is_ancestor(id, *p)),
    };

    // A record under the same parent (such as the echo of our own write)
    // keeps its position and is only renamed if needed
    match target.and_then(|t| tree.parent(id).filter(|p| *p == t)) {
        Some(parent) => {
            let resolved = unique_name_for(tree, parent, id, &name);
            if tree.name(id) != resolved {
                tree.set_name(id, resolved);
            }
        }
        None => {
            tree.detach(id);
            tree.set_name(id, name);
            attach_to_parent(tree, id, &journal);
        }
    }

    adopt_orphans(tree, vdir, id, &journal, default_extension)?;

    debug!(file = %filename, path = ?tree.path_of(id), "record reconciled");
    Ok(id)
}

/// Attach every orphan whose parent reference names `id`'s record.
fn adopt_orphans(
    tree: &mut Tree,
    vdir: &Vdir,
    id: NodeId,
    journal: &Journal,
    default_extension: &str,
) -> AgendaFsResult<()> {
    let orphans: Vec<NodeId> = tree
        .indexed()
        .into_iter()
        .filter(|o| *o != id && tree.parent(*o).is_none())
        .collect();

    let mut adopted = false;
    for orphan in orphans {
        let Some(vdir_name) = tree.entry(orphan).map(|e| e.vdir_name.clone()) else {
            continue;
        };
        let orphan_journal = match vdir.load(&vdir_name) {
            Ok(j) => j,
            Err(e) => {
                warn!(file = %vdir_name, error = %e, "could not read orphan");
                continue;
            }
        };
        if orphan_journal.parent_uid() != Some(journal.uid.as_str())
            || tree.is_ancestor(orphan, id)
        {
            continue;
        }

        let name = tree.name(orphan).to_string();
        attach_unique(tree, id, orphan, &name);
        info!(file = %vdir_name, parent = %journal.uid, "orphan adopted");
        adopted = true;
    }

    if adopted && !journal.has_directory_marker() {
        let mut journal = journal.clone();
        mark_directory(tree, vdir, id, &mut journal, default_extension)?;
    }
    Ok(())
}

/// Reconcile a deleted record file. Returns whether it was indexed.
///
/// Children of the deleted node are detached and stay indexed as orphans,
/// since their records still exist.
pub fn on_external_delete(tree: &mut Tree, filename: &str) -> bool {
    let Some(id) = tree.by_vdir(filename) else {
        debug!(file = %filename, "deleted file was not indexed");
        return false;
    };

    let children = tree.children(id).to_vec();
    for child in children {
        tree.detach(child);
        warn!(
            file = ?tree.entry(child).map(|e| &e.vdir_name),
            "parent deleted, record is orphaned"
        );
    }

    tree.destroy(id);
    debug!(file = %filename, "record removed");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::generate_ics;
    use tempfile::TempDir;

    fn write_record(dir: &TempDir, uid: &str, summary: &str, extra: &str) {
        let ics = format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:TEST\r\nBEGIN:VJOURNAL\r\n\
UID:{uid}\r\nSUMMARY:{summary}\r\n{extra}END:VJOURNAL\r\nEND:VCALENDAR\r\n"
        );
        std::fs::write(dir.path().join(format!("{}.ics", uid)), ics).unwrap();
    }

    fn shape(tree: &Tree) -> Vec<(usize, String)> {
        tree.walk(tree.root())
            .into_iter()
            .map(|(depth, id)| (depth, tree.name(id).to_string()))
            .collect()
    }

    fn worked_scenario() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_record(&dir, "u1", "notes", "");
        write_record(
            &dir,
            "u2",
            "todo",
            "RELATED-TO;RELTYPE=PARENT:u1\r\nX-CALDAVFS-FILEEXT:txt\r\n",
        );
        dir
    }

    #[test]
    fn test_worked_scenario() {
        let dir = worked_scenario();
        let vdir = Vdir::new(dir.path());

        let tree = build_initial_tree(&vdir, "txt").unwrap();

        assert_eq!(
            shape(&tree),
            vec![(0, "".into()), (1, "notes".into()), (2, "todo.txt".into())]
        );
        let u1 = vdir.load("u1.ics").unwrap();
        assert!(u1.has_directory_marker());
        assert!(u1.last_modified.is_some());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let dir = worked_scenario();
        write_record(&dir, "u3", "a", "X-CALDAVFS-FILEEXT:txt\r\n");
        write_record(&dir, "u4", "a", "X-CALDAVFS-FILEEXT:txt\r\n");
        let vdir = Vdir::new(dir.path());

        let first = build_initial_tree(&vdir, "txt").unwrap();
        let second = build_initial_tree(&vdir, "txt").unwrap();
        assert_eq!(shape(&first), shape(&second));
        assert!(first.lookup("/a.1.txt").is_some());
    }

    #[test]
    fn test_unresolved_parent_is_orphaned() {
        let dir = TempDir::new().unwrap();
        write_record(&dir, "u1", "lost", "RELATED-TO;RELTYPE=PARENT:nobody\r\n");
        let vdir = Vdir::new(dir.path());

        let tree = build_initial_tree(&vdir, "txt").unwrap();
        let id = tree.by_uid("u1").unwrap();
        assert!(!tree.is_attached(id));
        assert!(tree.children(tree.root()).is_empty());
    }

    #[test]
    fn test_unparseable_records_are_skipped() {
        let dir = worked_scenario();
        std::fs::write(dir.path().join("broken.ics"), "garbage").unwrap();
        let vdir = Vdir::new(dir.path());

        let tree = build_initial_tree(&vdir, "txt").unwrap();
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_external_create_adopts_orphans() {
        let dir = TempDir::new().unwrap();
        write_record(&dir, "u2", "todo", "RELATED-TO;RELTYPE=PARENT:u1\r\n");
        let vdir = Vdir::new(dir.path());
        let mut tree = build_initial_tree(&vdir, "txt").unwrap();
        assert_eq!(tree.lookup("/notes/todo.txt"), None);

        write_record(&dir, "u1", "notes", "");
        on_external_change(&mut tree, &vdir, "u1.ics", "txt").unwrap();

        assert!(tree.lookup("/notes/todo.txt").is_some());
        assert!(vdir.load("u1.ics").unwrap().has_directory_marker());
    }

    #[test]
    fn test_external_modify_moves_and_renames() {
        let dir = worked_scenario();
        let vdir = Vdir::new(dir.path());
        let mut tree = build_initial_tree(&vdir, "txt").unwrap();

        let mut todo = vdir.load("u2.ics").unwrap();
        todo.clear_parent();
        todo.summary = "done".into();
        std::fs::write(dir.path().join("u2.ics"), generate_ics(&todo)).unwrap();

        on_external_change(&mut tree, &vdir, "u2.ics", "txt").unwrap();
        assert!(tree.lookup("/done.txt").is_some());
        assert!(tree.lookup("/notes/todo.txt").is_none());
        // emptied directories remain directories
        assert!(vdir.load("u1.ics").unwrap().is_directory());
    }

    #[test]
    fn test_unchanged_record_keeps_its_position() {
        let dir = TempDir::new().unwrap();
        write_record(&dir, "u1", "a", "");
        write_record(&dir, "u2", "b", "");
        let vdir = Vdir::new(dir.path());
        let mut tree = build_initial_tree(&vdir, "txt").unwrap();

        on_external_change(&mut tree, &vdir, "u1.ics", "txt").unwrap();
        assert_eq!(
            shape(&tree),
            vec![(0, "".into()), (1, "a.txt".into()), (1, "b.txt".into())]
        );
    }

    #[test]
    fn test_echo_keeps_numbered_sibling_in_place() {
        let dir = TempDir::new().unwrap();
        write_record(&dir, "u3", "a", "");
        write_record(&dir, "u4", "a", "");
        write_record(&dir, "u5", "b", "");
        let vdir = Vdir::new(dir.path());
        let mut tree = build_initial_tree(&vdir, "txt").unwrap();
        let expected = vec![
            (0, "".into()),
            (1, "a.txt".into()),
            (1, "a.1.txt".into()),
            (1, "b.txt".into()),
        ];
        assert_eq!(shape(&tree), expected);

        on_external_change(&mut tree, &vdir, "u4.ics", "txt").unwrap();
        assert_eq!(shape(&tree), expected);
    }

    #[test]
    fn test_external_delete_orphans_children() {
        let dir = worked_scenario();
        let vdir = Vdir::new(dir.path());
        let mut tree = build_initial_tree(&vdir, "txt").unwrap();

        assert!(on_external_delete(&mut tree, "u1.ics"));
        assert!(!on_external_delete(&mut tree, "u1.ics"));

        let todo = tree.by_vdir("u2.ics").unwrap();
        assert!(!tree.is_attached(todo));
        assert!(tree.lookup("/notes").is_none());
        assert_eq!(tree.by_uid("u1"), None);
    }
}
