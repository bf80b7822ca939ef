//! # Build pipeline
//!
//! Demonstrates basic taskrunner features:
//! - Sync, callback and future task bodies
//! - Serial and parallel groups, nested and mixed with literal bodies
//! - Per-task timeout and best-effort failure aggregation
//! - `LogWriter` events rendered through `tracing-subscriber`
//!
//! Run with `RUST_LOG=debug cargo run --example pipeline` to also see rejected invocations.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use taskrunner::{LogWriter, Scheduler, SchedulerConfig, TaskBody, TaskError, Target};

/// Pretends to download `what`, honoring cancellation.
fn fetch(what: &'static str, ms: u64) -> TaskBody {
    TaskBody::future(move |ctx: CancellationToken| async move {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(ms)) => {
                println!("📦 fetched {what}");
                Ok(())
            }
            _ = ctx.cancelled() => Err(TaskError::Canceled),
        }
    })
}

/// Compiles in the background and signals through the completion handle.
fn compile(units: Arc<AtomicUsize>) -> TaskBody {
    TaskBody::callback(move |done| {
        let units = Arc::clone(&units);
        tokio::spawn(async move {
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_millis(20)).await;
                units.fetch_add(1, Ordering::Relaxed);
            }
            done.ok();
        });
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("🚀 Build pipeline demo\n");

    let runner = Scheduler::builder(SchedulerConfig::default())
        .with_subscriber(Arc::new(LogWriter::new()))
        .build();
    let units = Arc::new(AtomicUsize::new(0));

    runner.register("clean", TaskBody::sync(|| println!("🧹 cleaned")))?;
    runner.register("deps", fetch("deps", 40))?;
    runner.register("assets", fetch("assets", 25))?;
    runner.register("mirror", fetch("mirror", 500).with_timeout(Duration::from_millis(50)))?;
    runner.register("compile", compile(Arc::clone(&units)))?;
    runner.register("lint", TaskBody::sync(|| false))?;

    let stamp = TaskBody::sync(|| println!("🏷️  stamped")).named("stamp");
    let fetch_all = runner.parallel(["deps", "assets"]).named("fetch-all");
    runner.register(
        "default",
        runner.serial([
            Target::from("clean"),
            Target::from(fetch_all),
            Target::from("compile"),
            Target::from(stamp),
        ]),
    )?;
    runner.register("checks", runner.parallel(["lint", "mirror", "docs"]))?;

    match runner.start()? {
        Some(build) => match build.await {
            Ok(()) => {
                let compiled = units.load(Ordering::Relaxed);
                println!("\n✅ build finished, {compiled} units compiled");
            }
            Err(e) => println!("\n⚠️  build failed: {e}"),
        },
        None => println!("\n⚠️  build did not start"),
    }

    if let Some(checks) = runner.run("checks")? {
        if let Err(e) = checks.await {
            println!("⚠️  checks: {} ({})", e.as_message(), e.as_label());
        }
    }

    runner.shutdown().await;
    Ok(())
}
