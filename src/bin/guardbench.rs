//! guardbench: measure the effect of caching on a synthetic chat workload.
//!
//! Runs the same read/write mix twice against a simulated store with a
//! fixed latency: first with caching off (captured as the baseline), then
//! with caching on. Prints the observability report, including the
//! before/after comparison, as JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};

use chatguard::guard::Throttle;
use chatguard::perf::MetricsCollector;
use chatguard::{Bucket, CacheKey, Config, EntityStore, Guard, GuardBuilder, GuardError, Namespace};

/// Synthetic before/after benchmark for the cache, limiter and metrics.
#[derive(Parser)]
#[command(name = "guardbench")]
#[command(version)]
#[command(about = "Compare request latency with caching disabled and enabled")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Operations per phase.
    #[arg(short = 'n', long, default_value_t = 500)]
    operations: usize,

    /// Number of distinct channels read from.
    #[arg(long, default_value_t = 5)]
    channels: usize,

    /// Number of distinct senders.
    #[arg(long, default_value_t = 20)]
    profiles: usize,

    /// Simulated store latency in milliseconds.
    #[arg(long, default_value_t = 8)]
    store_latency_ms: u64,

    /// Every Nth operation is a message send (0 = reads only).
    #[arg(long, default_value_t = 10)]
    write_every: usize,
}

/// Store that answers every load after a fixed delay.
struct SimulatedStore {
    latency: Duration,
}

#[async_trait]
impl EntityStore for SimulatedStore {
    async fn load(&self, kind: Namespace, query: &str) -> chatguard::Result<Option<serde_json::Value>> {
        tokio::time::sleep(self.latency).await;
        Ok(Some(json!({ "kind": kind, "id": query, "items": [] })))
    }
}

#[derive(Default)]
struct PhaseStats {
    reads: usize,
    writes: usize,
    throttled: usize,
}

async fn run_phase(guard: &Guard, store: &Arc<dyn EntityStore>, args: &Args) -> PhaseStats {
    let mut stats = PhaseStats::default();
    for i in 0..args.operations {
        let channel = format!("channel_{}", i % args.channels.max(1));

        if args.write_every > 0 && i % args.write_every == args.write_every - 1 {
            let profile = format!("profile_{}", i % args.profiles.max(1));
            let stale = [CacheKey::channel_messages(&channel)];
            let store = Arc::clone(store);
            let result = guard
                .mutate(
                    "messages:send",
                    Some(Throttle::new(Bucket::Messages, &profile)),
                    &stale,
                    || async move { store.load(Namespace::Channel, &channel).await.map(|_| ()) },
                )
                .await;
            match result {
                Ok(()) => stats.writes += 1,
                Err(GuardError::RateLimited { .. }) => stats.throttled += 1,
                Err(e) => warn!(error = %e, "write failed"),
            }
            continue;
        }

        let store = Arc::clone(store);
        let id = channel.clone();
        let page = guard
            .read_page(
                "messages:first_page",
                Namespace::Messages,
                &id,
                None,
                move || async move { store.load(Namespace::Messages, &channel).await },
            )
            .await;
        match page {
            Ok(_) => stats.reads += 1,
            Err(e) => warn!(error = %e, "read failed"),
        }
    }
    stats
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;

    let store: Arc<dyn EntityStore> = Arc::new(SimulatedStore {
        latency: Duration::from_millis(args.store_latency_ms),
    });
    let collector = Arc::new(MetricsCollector::with_capacity(config.metrics.capacity));

    // Phase 1: no cache
    config.cache.enabled = false;
    let uncached = GuardBuilder::from_config(&config)?
        .metrics_collector(Arc::clone(&collector))
        .build()?;
    let before = run_phase(&uncached, &store, &args).await;
    info!(
        reads = before.reads,
        writes = before.writes,
        throttled = before.throttled,
        "baseline phase finished"
    );
    uncached.observability().capture_baseline(Some("Caching disabled"))?;
    uncached.observability().clear(false)?;

    // Phase 2: cache on
    config.cache.enabled = true;
    let cached = GuardBuilder::from_config(&config)?
        .metrics_collector(Arc::clone(&collector))
        .build_checked()
        .await?;
    let after = run_phase(&cached, &store, &args).await;
    info!(
        reads = after.reads,
        writes = after.writes,
        throttled = after.throttled,
        "cached phase finished"
    );
    collector.log_summary("Caching enabled");

    let report = cached.observability().report()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
