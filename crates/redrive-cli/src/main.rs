use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tokio::time::{Duration, Instant};
use tracing::{info, warn};

use redrive_core::app::{AppBuilder, SubmitRequest, WorkerGroup};
use redrive_core::config::RedriveConfig;
use redrive_core::impls::fault::RandomFailure;
use redrive_core::impls::{InMemoryQueue, InMemoryTaskStore};
use redrive_core::observability;
use redrive_core::ports::{SystemClock, UlidGenerator};

/// Submit a batch of tasks and drive them through retry and dead-lettering
/// with a randomly failing unit of work.
#[derive(Debug, Parser)]
#[command(name = "redrive", version)]
struct Cli {
    /// TOML configuration file (REDRIVE_* variables override it)
    #[arg(long, env = "REDRIVE_CONFIG")]
    config: Option<PathBuf>,

    /// Number of tasks to submit
    #[arg(long, default_value_t = 10)]
    tasks: usize,

    /// Probability that one attempt fails
    #[arg(long, default_value_t = 0.3)]
    failure_rate: f64,

    /// Give up waiting after this many seconds
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = RedriveConfig::load(cli.config.as_deref()).context("loading configuration")?;
    observability::init(&config.logging);

    let store = Arc::new(InMemoryTaskStore::new());
    let queue = InMemoryQueue::from_config(&config.queue);
    let concurrency = config.worker.concurrency;

    let app = AppBuilder::new(config)
        .store(store.clone())
        .scheduler(queue.tasks())
        .unit_of_work(Arc::new(RandomFailure::new(cli.failure_rate)))
        .build()
        .context("wiring application")?;

    let ingress = app.ingress(queue.tasks(), Arc::new(UlidGenerator::new(SystemClock)));
    for index in 0..cli.tasks {
        let request = SubmitRequest::new(None, json!({ "index": index, "source": "redrive-cli" }));
        ingress
            .submit(request)
            .await
            .with_context(|| format!("submitting task {index}"))?;
    }
    info!(tasks = cli.tasks, failure_rate = cli.failure_rate, "batch submitted");

    let workers = WorkerGroup::spawn(concurrency, queue.tasks(), queue.dead_letter(), &app);

    let deadline = Instant::now() + Duration::from_secs(cli.timeout_secs);
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted");
                break;
            }
            _ = ticker.tick() => {}
        }

        let counts = store.counts_by_status().await;
        if counts.settled() == cli.tasks {
            info!(?counts, "every task settled");
            break;
        }
        if Instant::now() >= deadline {
            warn!(?counts, "timed out before every task settled");
            break;
        }
    }

    workers.shutdown_and_join().await;

    let report = json!({
        "counts": store.counts_by_status().await,
        "queues": queue.snapshot().await,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
