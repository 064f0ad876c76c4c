//! Scheduler/trigger layer: drives the batch path on a fixed interval
//! and the stream path from file-arrival events. Orchestration only, no
//! business logic.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info, warn};
use tokio::sync::broadcast;

use crate::config::Config;
use crate::db::Database;
use crate::error::{Result, StorageError};
use crate::pipeline::{BatchPipeline, StreamPipeline};
use crate::worker::DirectoryScanner;

pub struct Scheduler {
    shutdown: Arc<AtomicBool>,
    stop_tx: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawns the three loops: batch timer, input-zone watcher and the
    /// stream worker consuming the arrival queue. Runs one batch pass
    /// immediately so files already sitting in the input zone are picked
    /// up without waiting a full interval.
    pub fn start(config: &Config, db: Database) -> Result<Self> {
        std::fs::create_dir_all(&config.paths.input_dir).map_err(|e| {
            StorageError::CreateDirectory {
                path: config.paths.input_dir.clone(),
                source: e,
            }
        })?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let (stop_tx, _) = broadcast::channel::<()>(1);
        let (event_tx, event_rx) = bounded::<PathBuf>(config.stream.queue_capacity);

        let mut handles = Vec::with_capacity(3);
        handles.push(spawn_batch_timer(
            config,
            db.clone(),
            Arc::clone(&shutdown),
            stop_tx.subscribe(),
        ));
        handles.push(spawn_watcher(config, event_tx, Arc::clone(&shutdown)));
        handles.push(spawn_stream_worker(
            config,
            db,
            event_rx,
            Arc::clone(&shutdown),
        ));

        info!("Scheduler started (batch interval {}s)", config.batch.interval_secs);

        Ok(Self {
            shutdown,
            stop_tx,
            handles,
        })
    }

    /// Signals all loops to stop. An in-flight run finishes its current
    /// file's load+archive step; the checks sit between events and ticks
    /// only.
    pub fn stop(&self) {
        info!("Stopping scheduler...");
        self.shutdown.store(true, Ordering::Release);
        let _ = self.stop_tx.send(());
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Waits for all loops to exit.
    pub fn wait(self) {
        for handle in self.handles {
            if let Err(e) = handle.join() {
                error!("Scheduler thread panicked: {:?}", e);
            }
        }
        info!("Scheduler stopped");
    }
}

fn spawn_batch_timer(
    config: &Config,
    db: Database,
    shutdown: Arc<AtomicBool>,
    mut stop_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let pipeline = BatchPipeline::new(config, db);
    let interval = Duration::from_secs(config.batch.interval_secs);

    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                error!("Failed to build batch timer runtime: {}", e);
                return;
            }
        };

        rt.block_on(async {
            let mut timer = tokio::time::interval(interval);
            timer.tick().await; // consume the immediate first tick

            loop {
                if shutdown.load(Ordering::Acquire) {
                    break;
                }

                if let Err(e) = pipeline.run() {
                    error!("Batch run failed: {}", e);
                }

                tokio::select! {
                    _ = timer.tick() => {},
                    _ = stop_rx.recv() => {},
                }
            }
        });

        debug!("Batch timer stopped");
    })
}

fn spawn_watcher(
    config: &Config,
    event_tx: Sender<PathBuf>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let scanner = DirectoryScanner::new(&config.paths.input_dir);
    let debounce = Duration::from_millis(config.stream.debounce_ms);

    std::thread::spawn(move || {
        let result = scanner.watch(
            debounce,
            move |path| {
                // A full queue drops the event; the file stays arrived
                // and the next batch scan picks it up.
                if let Err(e) = event_tx.try_send(path) {
                    warn!("Arrival queue full, deferring to batch scan: {}", e);
                }
            },
            shutdown,
        );

        if let Err(e) = result {
            error!("Watcher failed: {}", e);
        }
        debug!("Watcher stopped");
    })
}

fn spawn_stream_worker(
    config: &Config,
    db: Database,
    event_rx: Receiver<PathBuf>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let pipeline = StreamPipeline::new(config, db);

    std::thread::spawn(move || {
        loop {
            if shutdown.load(Ordering::Acquire) {
                break;
            }

            match event_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(path) => match pipeline.process_file(&path) {
                    Ok(Some(_)) => {}
                    Ok(None) => debug!("{} was handled by the batch path", path.display()),
                    Err(e) => error!("Stream processing failed for {}: {}", path.display(), e),
                },
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("Stream worker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;
    use crate::db::record_repo;
    use tempfile::TempDir;

    fn test_config(tmp: &TempDir) -> Config {
        let base = tmp.path().display();
        load_config_from_str(&format!(
            r#"
paths:
  input_dir: {base}/input
  archive_dir: {base}/archive
  processed_dir: {base}/processed
  log_dir: {base}/logs
database:
  path: {base}/sales.db
batch:
  interval_secs: 3600
stream:
  debounce_ms: 100
"#
        ))
        .unwrap()
    }

    #[test]
    fn test_start_stop_joins() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let db = Database::open_in_memory().unwrap();

        let scheduler = Scheduler::start(&config, db).unwrap();
        assert!(!scheduler.is_shutdown());

        std::thread::sleep(Duration::from_millis(200));
        scheduler.stop();
        assert!(scheduler.is_shutdown());
        scheduler.wait();
    }

    #[test]
    fn test_initial_batch_run_drains_preexisting_files() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        std::fs::create_dir_all(&config.paths.input_dir).unwrap();
        std::fs::write(
            config.paths.input_dir.join("early.csv"),
            "order_id,product,quantity,unit_price,region,sales_rep,order_date,customer_id\n\
             ORD-1,Laptop,2,499.99,North,Alice Johnson,2026-01-15,CUST-1001\n",
        )
        .unwrap();

        let db = Database::open_in_memory().unwrap();
        let scheduler = Scheduler::start(&config, db.clone()).unwrap();

        // The immediate first batch pass should consume the file.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while std::time::Instant::now() < deadline {
            if record_repo::stats(&db).unwrap().total_records == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        scheduler.stop();
        scheduler.wait();

        let stats = record_repo::stats(&db).unwrap();
        assert_eq!(stats.total_records, 1);
        assert!(!config.paths.input_dir.join("early.csv").exists());
    }
}
