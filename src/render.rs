//! Terminal rendering for agendafs-core types using owo_colors.

use agendafs_core::{DirEntry, NodeKind, NodeStat};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for NodeKind {
    fn render(&self) -> String {
        match self {
            NodeKind::File => "file".to_string(),
            NodeKind::Directory => "directory".blue().to_string(),
        }
    }
}

impl Render for DirEntry {
    fn render(&self) -> String {
        match self.kind {
            NodeKind::File => self.name.clone(),
            NodeKind::Directory => format!("{}/", self.name).blue().bold().to_string(),
        }
    }
}

impl Render for NodeStat {
    fn render(&self) -> String {
        let lines = [
            format!("{} {}", "kind:".dimmed(), self.kind.render()),
            format!("{} {}", "size:".dimmed(), self.size),
            format!("{} {:o}", "mode:".dimmed(), self.perm),
            format!("{} {}", "links:".dimmed(), self.nlink),
            format!("{} {}", "modified:".dimmed(), self.mtime.to_rfc3339()),
            format!("{} {}:{}", "owner:".dimmed(), self.uid, self.gid),
        ];
        lines.join("\n")
    }
}
