use agendafs_core::AgendaFs;
use anyhow::{Context, Result};

use crate::render::Render;

pub fn run(fs: &AgendaFs, path: &str) -> Result<()> {
    let entries = fs
        .walk(path)
        .with_context(|| format!("Cannot walk {}", path))?;

    println!("{}", path);
    for (depth, entry) in entries {
        println!("{}{}", "  ".repeat(depth + 1), entry.render());
    }

    Ok(())
}

pub fn ls(fs: &AgendaFs, path: &str) -> Result<()> {
    let entries = fs
        .read_dir(path)
        .with_context(|| format!("Cannot list {}", path))?;

    for entry in entries {
        println!("{}", entry.render());
    }

    Ok(())
}
