use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;
use notify::{
    Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Result as NotifyResult, Watcher,
    event::{CreateKind, ModifyKind, RenameMode},
};
use tracing::{debug, warn};

/// One of the watched image files was written or replaced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceChanged {
    pub path: PathBuf,
}

/// Watch the directories holding `files` and report writes to any of them.
///
/// Directories rather than files are registered so editors that save by
/// writing a temp file and renaming it over the original are still seen.
pub fn start_watcher(
    files: &[PathBuf],
    tx: Sender<SourceChanged>,
) -> NotifyResult<RecommendedWatcher> {
    let watched: Vec<PathBuf> = files.iter().map(|p| absolute(p)).collect();
    let dirs: Vec<PathBuf> = {
        let mut dirs: Vec<PathBuf> = watched
            .iter()
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect();
        dirs.sort();
        dirs.dedup();
        dirs
    };

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for path in changed_sources(&event, &watched) {
                debug!(path = %path.display(), "watched image changed");
                let _ = tx.send(SourceChanged { path });
            }
        }
        Err(err) => warn!(error = %err, "file watch error"),
    })?;
    watcher.configure(Config::default())?;

    for dir in &dirs {
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
    }
    Ok(watcher)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Watched files touched by `event`; directory and access events are ignored.
pub fn changed_sources(event: &Event, watched: &[PathBuf]) -> Vec<PathBuf> {
    let relevant = matches!(
        event.kind,
        EventKind::Create(CreateKind::File | CreateKind::Any)
            | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both))
    );
    if !relevant {
        return Vec::new();
    }
    let mut hits: Vec<PathBuf> = event
        .paths
        .iter()
        .map(|p| absolute(p))
        .filter(|p| watched.contains(p))
        .collect();
    hits.dedup();
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{DataChange, RemoveKind};
    use std::time::Duration;

    fn event(kind: EventKind, paths: &[&Path]) -> Event {
        let mut event = Event::new(kind);
        for p in paths {
            event = event.add_path(p.to_path_buf());
        }
        event
    }

    #[test]
    fn only_watched_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let color = dir.path().join("image-color.jpg");
        let other = dir.path().join("notes.txt");
        let watched = vec![absolute(&color)];

        let hit = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &[&color, &other],
        );
        assert_eq!(changed_sources(&hit, &watched), watched);

        let miss = event(EventKind::Create(CreateKind::File), &[&other]);
        assert!(changed_sources(&miss, &watched).is_empty());
    }

    #[test]
    fn renames_onto_the_file_count_but_removals_do_not() {
        let dir = tempfile::tempdir().unwrap();
        let gray = dir.path().join("image-bw.jpg");
        let watched = vec![absolute(&gray)];

        let rename = event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &[&gray]);
        assert_eq!(changed_sources(&rename, &watched).len(), 1);

        let removed = event(EventKind::Remove(RemoveKind::File), &[&gray]);
        assert!(changed_sources(&removed, &watched).is_empty());
    }

    #[test]
    fn watcher_reports_writes() {
        let dir = tempfile::tempdir().unwrap();
        let color = dir.path().join("image-color.jpg");
        std::fs::write(&color, b"before").unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        let _watcher = start_watcher(&[color.clone()], tx).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        std::fs::write(&color, b"after").unwrap();

        let change = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(change.path, absolute(&color));
    }
}
