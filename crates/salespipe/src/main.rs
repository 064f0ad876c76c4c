use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use salespipe::config::{load_config, Config};
use salespipe::db::Database;
use salespipe::error::Result;
use salespipe::Scheduler;

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yaml"));

    if let Err(e) = run(&config_path) {
        eprintln!("salespipe: {}", e);
        std::process::exit(1);
    }
}

fn run(config_path: &PathBuf) -> Result<()> {
    let config = load_config(config_path)?;

    // Guard must stay alive for the file appender to flush.
    let _log_guard = init_logging(&config);

    info!("Starting salespipe v{}", env!("CARGO_PKG_VERSION"));
    info!("Watching {}", config.paths.input_dir.display());

    let db = Database::open(&config.database.path)?;
    let scheduler = Scheduler::start(&config, db)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::Release);
        })
        .expect("failed to register signal handler");
    }

    while !interrupted.load(Ordering::Acquire) {
        std::thread::sleep(std::time::Duration::from_millis(200));
    }

    info!("Interrupt received, shutting down");
    scheduler.stop();
    scheduler.wait();
    Ok(())
}

fn init_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    // Log directory failures fall back to stdout-only logging.
    let file_layer = std::fs::create_dir_all(&config.paths.log_dir)
        .ok()
        .map(|_| {
            let appender = tracing_appender::rolling::daily(&config.paths.log_dir, "salespipe.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (layer, guard)
        });

    let (file_layer, guard) = match file_layer {
        Some((layer, guard)) => (Some(layer), Some(guard)),
        None => {
            eprintln!(
                "warning: could not create log directory {}, logging to stdout only",
                config.paths.log_dir.display()
            );
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Route `log` macro output through tracing.
    let _ = tracing_log::LogTracer::init();

    guard
}
