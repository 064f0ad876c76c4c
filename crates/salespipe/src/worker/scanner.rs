use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use notify::{Config as NotifyConfig, PollWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer_opt, Config as DebouncerConfig, DebouncedEventKind};
use walkdir::WalkDir;

use crate::error::WorkerError;

const SOURCE_EXTENSION: &str = "csv";

/// Scans and watches the input zone for arrived source files. Only plain
/// `.csv` files at the top level count; claimed files (renamed to a
/// `.claimed` suffix) and the zone subdirectories are invisible to both
/// the scan and the watch.
pub struct DirectoryScanner {
    input_directory: PathBuf,
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION))
        .unwrap_or(false)
}

impl DirectoryScanner {
    pub fn new<P: AsRef<Path>>(input_directory: P) -> Self {
        Self {
            input_directory: input_directory.as_ref().to_path_buf(),
        }
    }

    pub fn input_directory(&self) -> &Path {
        &self.input_directory
    }

    /// Enumerates all arrived files, sorted by path so batch runs process
    /// files in a deterministic order.
    pub fn scan(&self) -> Result<Vec<PathBuf>, WorkerError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.input_directory)
            .min_depth(1)
            .max_depth(1) // Only scan top level, not lifecycle subdirectories
        {
            let entry = entry.map_err(|e| WorkerError::ScanFailed {
                path: self.input_directory.clone(),
                source: e,
            })?;
            let path = entry.path();

            if path.is_dir() {
                continue;
            }

            if is_source_file(path) {
                debug!("Found source file: {}", path.display());
                files.push(path.to_path_buf());
            }
        }

        files.sort();

        info!(
            "Scanned {} source files in {}",
            files.len(),
            self.input_directory.display()
        );
        Ok(files)
    }

    /// Watches the input zone and invokes `callback` once per settled file
    /// arrival. The debounce window doubles as the wait for the writer to
    /// finish, so a partially-written file is never reported.
    pub fn watch<F>(
        &self,
        debounce: Duration,
        callback: F,
        shutdown: Arc<AtomicBool>,
    ) -> Result<(), WorkerError>
    where
        F: Fn(PathBuf) + Send + 'static,
    {
        let input_dir = self.input_directory.clone();

        // Use PollWatcher for Docker/NFS compatibility
        let poll_config = NotifyConfig::default().with_poll_interval(Duration::from_secs(2));

        let debouncer_config = DebouncerConfig::default()
            .with_timeout(debounce)
            .with_notify_config(poll_config);

        let (tx, rx) = std::sync::mpsc::channel();

        let mut debouncer = new_debouncer_opt::<_, PollWatcher>(debouncer_config, tx)
            .map_err(|e| WorkerError::WatchError(e.to_string()))?;

        debouncer
            .watcher()
            .watch(&input_dir, RecursiveMode::NonRecursive)
            .map_err(|e| WorkerError::WatchError(e.to_string()))?;

        info!("Watching directory: {}", input_dir.display());

        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("Watch mode shutting down...");
                break;
            }

            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(Ok(events)) => {
                    for event in events {
                        if matches!(event.kind, DebouncedEventKind::Any) {
                            let path = &event.path;

                            if path.is_dir() {
                                continue;
                            }

                            // Claimed and already-moved files fail one of
                            // these checks and are skipped.
                            if path.exists() && is_source_file(path) {
                                info!("New source file detected: {}", path.display());
                                callback(path.to_path_buf());
                            }
                        }
                    }
                }
                Ok(Err(errors)) => {
                    warn!("Watch error: {:?}", errors);
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    continue;
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    error!("Watch channel disconnected");
                    break;
                }
            }
        }

        Ok(())
    }
}
