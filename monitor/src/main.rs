use anyhow::Context;
use clap::Parser;
use launchcore::prelude::{DEFAULT_SAMPLE_COUNT, DEFAULT_SAMPLE_RATE_HZ};
use launchcore::telemetry::LogManager;
use session::history::render_summary;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::MonitorConfig;
use workflow::runner::Runner;

mod session;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "DIY launch monitor: IR trigger + Doppler radar")]
struct Args {
    /// Load the monitor config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_SAMPLE_COUNT)]
    sample_count: usize,
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE_HZ)]
    sample_rate: u32,
    #[arg(long, default_value_t = 17)]
    gpio_pin: u32,
    /// Use a synthetic radar return instead of the ADC
    #[arg(long, default_value_t = false)]
    synthetic: bool,
    /// Inject a simulated trigger every N milliseconds
    #[arg(long)]
    simulate_every_ms: Option<u64>,
    /// Run one synthetic self-test measurement and exit
    #[arg(long, default_value_t = false)]
    self_test: bool,
    /// Print the session summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn spawn_shutdown_listener(shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    thread::spawn(move || {
        runtime.block_on(async {
            if let Err(err) = signal::ctrl_c().await {
                log::error!("awaiting Ctrl+C failed: {}", err);
            }
        });
        shutdown.store(true, Ordering::SeqCst);
    });
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let logger = LogManager::new();
    logger.info("Starting DIY Launch Monitor...");

    let config = if let Some(path) = args.config {
        MonitorConfig::load(path)?
    } else {
        MonitorConfig::from_args(
            args.sample_count,
            args.sample_rate,
            args.gpio_pin,
            args.synthetic,
            args.simulate_every_ms,
        )
    };

    let mut runner = Runner::new(config, logger.clone())?;

    if args.self_test {
        runner.radar().start_debug_measurement();
    } else {
        let shutdown = Arc::new(AtomicBool::new(false));
        spawn_shutdown_listener(Arc::clone(&shutdown))?;
        println!("Monitoring for shots (Ctrl+C to stop)...");
        runner.run(&shutdown);
    }

    let summary = runner.finish();
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serializing session summary")?
        );
    } else {
        println!("{}", render_summary(&summary));
    }
    logger.info("Launch monitor stopped");
    Ok(())
}
