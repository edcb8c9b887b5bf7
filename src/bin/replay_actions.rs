use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use replaymill::{
    load_command_table, run_pipeline, AcceptAll, PipelineConfig, ReplayValidator, WorkerConfig,
};

/// Process stored replays in parallel and print aggregate statistics.
#[derive(Parser, Debug)]
#[command(name = "replay-actions", version, about)]
struct Cli {
    /// Directory holding one subdirectory per replay
    #[arg(long, default_value = "replays")]
    replays: PathBuf,

    /// Number of worker threads
    #[arg(long, default_value_t = 1)]
    parallel: usize,

    /// Game loops per retained step, for display only
    #[arg(long, default_value_t = 15)]
    step_mul: u32,

    /// Seconds between aggregate reports
    #[arg(long, default_value_t = 10)]
    report_secs: u64,

    /// Milliseconds between worker launches
    #[arg(long, default_value_t = 1000)]
    stagger_ms: u64,

    /// Optional ability lookup table (JSON)
    #[arg(long)]
    abilities: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Some(path) = &cli.abilities {
        let table = load_command_table(path)
            .with_context(|| format!("loading ability table from {}", path.display()))?;
        info!("loaded {} abilities from {}", table.len(), path.display());
    }

    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let interrupt = Arc::clone(&interrupt);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing in-flight replays");
                interrupt.store(true, Ordering::Relaxed);
            }
        });
    }

    let cfg = PipelineConfig {
        replay_root: cli.replays,
        parallel: cli.parallel,
        step_mul: cli.step_mul,
        report_interval: Duration::from_secs(cli.report_secs),
        stagger: Duration::from_millis(cli.stagger_ms),
        worker: WorkerConfig::default(),
    };
    let validator: Arc<dyn ReplayValidator> = Arc::new(AcceptAll);
    let sink: Box<dyn Write + Send> = Box::new(io::stdout());

    let global = tokio::task::spawn_blocking(move || {
        run_pipeline(&cfg, validator, sink, interrupt)
    })
    .await
    .context("pipeline thread panicked")?
    .context("replay pipeline failed")?;

    info!(
        "pipeline finished: {} replays, {} steps",
        global.replays, global.steps
    );
    Ok(())
}
