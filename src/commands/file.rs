use std::io::{Read, Write};

use agendafs_core::{AgendaFs, ErrorKind};
use anyhow::{Context, Result};

use super::READ_CHUNK;
use crate::render::Render;

pub fn stat(fs: &AgendaFs, path: &str) -> Result<()> {
    let stat = fs
        .stat(path)
        .with_context(|| format!("Cannot stat {}", path))?;
    println!("{}", stat.render());
    Ok(())
}

pub fn cat(fs: &AgendaFs, path: &str) -> Result<()> {
    fs.open(path)
        .with_context(|| format!("Cannot open {}", path))?;

    let mut stdout = std::io::stdout().lock();
    let mut offset = 0u64;
    loop {
        let chunk = fs
            .read(path, offset, READ_CHUNK)
            .with_context(|| format!("Cannot read {}", path))?;
        if chunk.is_empty() {
            break;
        }
        stdout.write_all(&chunk)?;
        offset += chunk.len() as u64;
    }

    Ok(())
}

pub fn write(fs: &AgendaFs, path: &str, offset: u64, truncate: bool) -> Result<()> {
    let mut data = Vec::new();
    std::io::stdin()
        .read_to_end(&mut data)
        .context("Failed to read stdin")?;

    match fs.stat(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            fs.create_file(path)
                .with_context(|| format!("Cannot create {}", path))?;
        }
        Err(e) => return Err(e).with_context(|| format!("Cannot stat {}", path)),
        Ok(_) if truncate => {
            fs.truncate(path, 0)
                .with_context(|| format!("Cannot truncate {}", path))?;
        }
        Ok(_) => {}
    }

    let written = fs
        .write(path, offset, &data)
        .with_context(|| format!("Cannot write {}", path))?;
    tracing::debug!(path = %path, bytes = written, "wrote content");

    Ok(())
}

pub fn mkdir(fs: &AgendaFs, path: &str) -> Result<()> {
    fs.create_dir(path)
        .with_context(|| format!("Cannot create directory {}", path))
}

/// Create an empty file, leaving existing ones alone.
pub fn touch(fs: &AgendaFs, path: &str) -> Result<()> {
    match fs.create_file(path) {
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        result => result.with_context(|| format!("Cannot create {}", path)),
    }
}

pub fn mv(fs: &AgendaFs, old: &str, new: &str) -> Result<()> {
    fs.rename(old, new)
        .with_context(|| format!("Cannot move {} to {}", old, new))
}

pub fn rm(fs: &AgendaFs, path: &str) -> Result<()> {
    fs.remove_file(path)
        .with_context(|| format!("Cannot remove {}", path))
}

pub fn rmdir(fs: &AgendaFs, path: &str) -> Result<()> {
    fs.remove_dir(path)
        .with_context(|| format!("Cannot remove directory {}", path))
}
