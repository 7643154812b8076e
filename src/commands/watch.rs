use std::sync::Arc;

use agendafs_core::{AgendaFs, Watcher};
use anyhow::{Context, Result};

/// Apply external changes to the tree until the process is killed.
pub fn run(fs: AgendaFs) -> Result<()> {
    let fs = Arc::new(fs);
    let _watcher = Watcher::spawn(Arc::clone(&fs)).context("Failed to start watcher")?;

    println!("Watching {} (Ctrl-C to stop)", fs.vdir().path().display());
    loop {
        std::thread::park();
    }
}
