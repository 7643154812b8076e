//! Background watcher reconciling the tree with external edits to the vdir.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use tracing::{debug, info, warn};

use crate::constants::{WATCH_MAX_RETRIES, WATCH_RETRY_DELAY_MS};
use crate::error::{AgendaFsError, AgendaFsResult};
use crate::fs::AgendaFs;
use crate::vdir::is_record_filename;

/// Kind of change to a record file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

enum Message {
    Change(ChangeKind, String),
    Stop,
}

/// Handle to a running watcher. Dropping it stops the watcher thread.
pub struct Watcher {
    /// Keeps the OS watch alive
    _watcher: RecommendedWatcher,
    tx: Sender<Message>,
    thread: Option<JoinHandle<()>>,
}

impl Watcher {
    /// Watch `fs`'s vdir and apply every change to `fs` on a dedicated thread.
    pub fn spawn(fs: Arc<AgendaFs>) -> AgendaFsResult<Self> {
        let (tx, rx) = mpsc::channel();
        let event_tx = tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    for (kind, filename) in classify(&event) {
                        let _ = event_tx.send(Message::Change(kind, filename));
                    }
                }
                Err(e) => warn!(error = %e, "watch error"),
            },
            notify::Config::default(),
        )
        .map_err(notify_error)?;

        watcher
            .watch(fs.vdir().path(), RecursiveMode::NonRecursive)
            .map_err(notify_error)?;

        let vdir = fs.vdir().path().display().to_string();
        let thread = thread::Builder::new()
            .name("agendafs-watcher".into())
            .spawn(move || run(fs, rx))?;

        info!(vdir = %vdir, "watching for changes");
        Ok(Watcher {
            _watcher: watcher,
            tx,
            thread: Some(thread),
        })
    }

    /// Stop the watcher and wait for its thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.tx.send(Message::Stop);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            info!("watcher stopped");
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn notify_error(e: notify::Error) -> AgendaFsError {
    AgendaFsError::Io(std::io::Error::other(e))
}

/// Record file changes described by one notify event
fn classify(event: &Event) -> Vec<(ChangeKind, String)> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Created,
        EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Deleted,
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter_map(|path| path.file_name().and_then(|n| n.to_str()))
        .filter(|name| is_record_filename(name))
        .map(|name| (kind, name.to_string()))
        .collect()
}

fn run(fs: Arc<AgendaFs>, rx: Receiver<Message>) {
    while let Ok(message) = rx.recv() {
        match message {
            Message::Stop => break,
            Message::Change(kind, filename) => apply(&fs, kind, &filename),
        }
    }
}

/// Apply one change, retrying records that cannot be parsed yet (the
/// writer may not have finished).
pub fn apply(fs: &AgendaFs, kind: ChangeKind, filename: &str) {
    debug!(file = %filename, kind = ?kind, "change detected");

    if kind == ChangeKind::Deleted {
        if fs.vdir().record_path(filename).exists() {
            // replaced, not removed
            apply(fs, ChangeKind::Modified, filename);
        } else {
            fs.on_external_delete(filename);
        }
        return;
    }

    let mut attempt = 0;
    loop {
        match fs.on_external_change(filename) {
            Ok(()) => return,
            Err(AgendaFsError::NotFound(_)) => {
                // gone again, a delete event follows
                debug!(file = %filename, "changed file disappeared");
                return;
            }
            Err(AgendaFsError::IcsParse(msg)) if attempt < WATCH_MAX_RETRIES => {
                attempt += 1;
                debug!(file = %filename, attempt, error = %msg, "retrying unreadable record");
                thread::sleep(Duration::from_millis(WATCH_RETRY_DELAY_MS));
            }
            Err(e) => {
                warn!(file = %filename, error = %e, "could not apply change");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::Journal;
    use crate::vdir::Vdir;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use std::path::PathBuf;
    use std::time::Instant;
    use tempfile::TempDir;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_classify_only_reports_records() {
        let created = event(EventKind::Create(CreateKind::File), "/v/u1.ics");
        assert_eq!(
            classify(&created),
            vec![(ChangeKind::Created, "u1.ics".to_string())]
        );

        let swap = event(EventKind::Create(CreateKind::File), "/v/.u1.ics.swp");
        assert!(classify(&swap).is_empty());

        let modified = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "/v/u1.ics",
        );
        assert_eq!(classify(&modified)[0].0, ChangeKind::Modified);

        let removed = event(EventKind::Remove(RemoveKind::File), "/v/u1.ics");
        assert_eq!(classify(&removed)[0].0, ChangeKind::Deleted);
    }

    #[test]
    fn test_apply_handles_create_and_delete() {
        let dir = TempDir::new().unwrap();
        let fs = AgendaFs::new(Vdir::new(dir.path()), "txt").unwrap();

        let mut journal = Journal::new_file("ext-1".into(), "note.md");
        fs.vdir().save("ext-1.ics", &mut journal).unwrap();
        apply(&fs, ChangeKind::Created, "ext-1.ics");
        assert!(fs.stat("/note.md").is_ok());

        std::fs::remove_file(dir.path().join("ext-1.ics")).unwrap();
        apply(&fs, ChangeKind::Deleted, "ext-1.ics");
        assert!(fs.stat("/note.md").is_err());
    }

    #[test]
    fn test_apply_gives_up_on_garbage() {
        let dir = TempDir::new().unwrap();
        let fs = AgendaFs::new(Vdir::new(dir.path()), "txt").unwrap();
        std::fs::write(dir.path().join("bad.ics"), "garbage").unwrap();

        let started = Instant::now();
        apply(&fs, ChangeKind::Modified, "bad.ics");
        assert!(started.elapsed() >= Duration::from_millis(WATCH_RETRY_DELAY_MS));
        assert!(fs.read_dir("/").unwrap().is_empty());
    }

    #[test]
    fn test_watcher_picks_up_new_records() {
        let dir = TempDir::new().unwrap();
        let fs = Arc::new(AgendaFs::new(Vdir::new(dir.path()), "txt").unwrap());
        let watcher = Watcher::spawn(Arc::clone(&fs)).unwrap();

        let mut journal = Journal::new_file("ext-2".into(), "later.txt");
        Vdir::new(dir.path()).save("ext-2.ics", &mut journal).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while fs.stat("/later.txt").is_err() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(fs.stat("/later.txt").is_ok());
        watcher.stop();
    }
}
