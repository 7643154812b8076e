use agendafs_core::AgendaFs;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

/// Print every attribute with its value.
pub fn list(fs: &AgendaFs, path: &str) -> Result<()> {
    let names = fs
        .list_attributes(path)
        .with_context(|| format!("Cannot list attributes of {}", path))?;

    for name in names {
        let value = fs.get_attribute(path, &name)?;
        println!("{} {}", format!("{}:", name).dimmed(), value);
    }

    Ok(())
}

pub fn get(fs: &AgendaFs, path: &str, name: &str) -> Result<()> {
    let value = fs
        .get_attribute(path, name)
        .with_context(|| format!("Cannot read attribute {} of {}", name, path))?;
    println!("{}", value);
    Ok(())
}

pub fn set(fs: &AgendaFs, path: &str, name: &str, value: &str) -> Result<()> {
    fs.set_attribute(path, name, value)
        .with_context(|| format!("Cannot set attribute {} of {}", name, path))
}

pub fn rm(fs: &AgendaFs, path: &str, name: &str) -> Result<()> {
    fs.clear_attribute(path, name)
        .with_context(|| format!("Cannot remove attribute {} of {}", name, path))
}
