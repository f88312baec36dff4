use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use county_projection::{
    CancellationToken, ParquetSink, ProjectionConfig, ProjectionResult, SyntheticWorld,
    run_async, run_with_inputs,
};

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

/// Project county populations by age, race and sex
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Year of the baseline population
    #[arg(long, default_value_t = 2020)]
    launch_year: i32,

    /// Last simulated year
    #[arg(long, default_value_t = 2030)]
    horizon_year: i32,

    /// Generate a synthetic world with this many counties instead of reading inputs
    #[arg(long, value_name = "COUNTIES")]
    synthetic: Option<usize>,

    /// Seed of the synthetic world
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Also write the synthetic inputs as Parquet files to this directory
    #[arg(long, requires = "synthetic")]
    write_inputs: Option<PathBuf>,

    /// Output directory, overriding the configuration
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of worker threads, overriding the configuration
    #[arg(short, long)]
    threads: Option<usize>,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping at the next year boundary");
                cancel.cancel();
            }
        });
    }

    let start = Instant::now();
    let result = match args.synthetic {
        Some(counties) => run_synthetic(&args, counties, cancel).await?,
        None => {
            let config = load_config(&args)?;
            info!("{config}");
            run_async(&config, args.launch_year, args.horizon_year, cancel)
                .await
                .context("projection failed")?
        }
    };

    for summary in &result.summaries {
        info!(
            "{}: {:.0} -> {:.0} (deaths {:.0}, births {:.0}, immigration {:+.0}, migration {:+.0})",
            summary.year,
            summary.start_population,
            summary.end_population,
            summary.deaths,
            summary.births,
            summary.net_immigration,
            summary.net_migration
        );
    }
    info!(
        "Projected scenario '{}' from {} to {} in {:?}",
        result.scenario,
        result.launch_year,
        result.horizon_year,
        start.elapsed()
    );
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<ProjectionConfig> {
    let mut config = match &args.config {
        Some(path) => ProjectionConfig::from_json_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => ProjectionConfig::default(),
    };
    apply_overrides(&mut config, args);
    Ok(config)
}

fn apply_overrides(config: &mut ProjectionConfig, args: &Args) {
    if let Some(output) = &args.output {
        config.output.directory.clone_from(output);
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    if args.progress {
        config.show_progress = true;
    }
}

async fn run_synthetic(
    args: &Args,
    counties: usize,
    cancel: CancellationToken,
) -> anyhow::Result<ProjectionResult> {
    let world = SyntheticWorld::new(counties)
        .with_seed(args.seed)
        .with_years(args.launch_year, args.horizon_year);
    let raw = world.generate().context("generating synthetic inputs")?;

    let input_dir = args.write_inputs.clone().unwrap_or_else(|| PathBuf::from("data"));
    let mut config = world.config(&raw, &input_dir);
    if let Some(path) = &args.config {
        let file = ProjectionConfig::from_json_file(path)
            .with_context(|| format!("reading {}", path.display()))?;
        config = ProjectionConfig {
            scenario: config.scenario,
            inputs: config.inputs,
            ..file
        };
    }
    apply_overrides(&mut config, args);

    if args.write_inputs.is_some() {
        raw.write(&config.inputs)
            .with_context(|| format!("writing inputs to {}", input_dir.display()))?;
        info!("Wrote synthetic inputs to {}", input_dir.display());
    }
    info!("Synthetic world: {counties} counties, seed {}", args.seed);
    info!("{config}");

    let (launch_year, horizon_year) = (args.launch_year, args.horizon_year);
    let result = tokio::task::spawn_blocking(move || {
        let mut sink = ParquetSink::new(&config.output);
        run_with_inputs(&config, &raw, launch_year, horizon_year, &mut sink, cancel)
    })
    .await
    .context("projection task panicked")?
    .context("projection failed")?;
    Ok(result)
}
