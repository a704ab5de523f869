mod common;
mod logic;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use ringside_game::{GameConfig, GameEngine, WinHistogram};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use common::{parse_bucket_edges, split_csv};
use logic::{
    CsvReelSource, DistributionPlan, SimulationOptions, SimulationReport, expand_modes,
    replay_trial, resolve_seed_inputs, run_simulation,
};

#[derive(Debug, Parser)]
#[command(name = "ringside-tester", version = "0.1.0")]
#[command(about = "Batch simulation, RTP reporting and trial replay for the Ringside engine")]
struct Args {
    /// Modes to simulate (comma-separated, or "all")
    #[arg(long, default_value = "all")]
    modes: String,

    /// Trials per mode and seed
    #[arg(long, default_value_t = 10_000)]
    trials: u64,

    /// Batch seeds (comma-separated; decimal or 0x-prefixed hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Game configuration JSON (defaults to the built-in catalogue)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of `<mode>.csv` reel strips overriding configured pools
    #[arg(long)]
    reels_dir: Option<PathBuf>,

    /// Distribution plan JSON splitting trials across categories
    #[arg(long, conflicts_with_all = ["category", "target_win"])]
    plan: Option<PathBuf>,

    /// Category name for a single-category run
    #[arg(long)]
    category: Option<String>,

    /// Target win multiple for a single-category run
    #[arg(long)]
    target_win: Option<f64>,

    /// Relative tolerance around the target win
    #[arg(long)]
    tolerance: Option<f64>,

    /// Attempts allowed per trial before giving up on the target
    #[arg(long)]
    retry_ceiling: Option<u32>,

    /// Histogram bucket edges (comma-separated win multiples)
    #[arg(long)]
    buckets: Option<String>,

    /// Trials per parallel chunk; 0 runs sequentially
    #[arg(long, default_value_t = 0)]
    chunk_size: u64,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Include full records for the first N trials of each batch
    #[arg(long, default_value_t = 0)]
    dump_trials: u64,

    /// Print the shaped record of one trial index instead of running batches
    #[arg(long)]
    replay: Option<u64>,

    /// Report symbol and class shares of each pool
    #[arg(long)]
    analyze_pools: bool,

    /// Recommend paytable adjustments from measured RTP
    #[arg(long)]
    tune: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.report == "console" {
        announce_banner();
    }

    let start_time = Instant::now();
    let engine = load_engine(&args)?;
    let plan = build_plan(&args)?;
    let modes = expand_modes(&engine, &split_csv(&args.modes))?;
    if modes.is_empty() {
        bail!("no modes selected");
    }
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    for seed in &seeds {
        if let Some(token) = &seed.token {
            log::debug!("seed {token} resolved to {}", seed.seed);
        }
    }

    if let Some(index) = args.replay {
        return write_replays(&args, &engine, &plan, &modes, &seeds, index);
    }

    let options = SimulationOptions {
        trials: args.trials,
        chunk_size: args.chunk_size,
        dump_trials: args.dump_trials.min(args.trials),
        histogram: build_histogram(args.buckets.as_deref())?,
        analyze_pools: args.analyze_pools,
        tune: args.tune,
    };
    let report = run_simulation(&engine, &modes, &seeds, &plan, &options)?;
    write_reports(&args, &report, start_time)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init();
}

fn announce_banner() {
    println!("{}", "🥊 Ringside Batch Simulator".bright_cyan().bold());
    println!("{}", "===========================".cyan());
}

fn load_engine(args: &Args) -> Result<GameEngine> {
    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            GameConfig::from_json(&raw)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => GameConfig::standard(),
    };
    match &args.reels_dir {
        Some(dir) => GameEngine::with_pools(config, &CsvReelSource::new(dir))
            .with_context(|| format!("failed to load reels from {}", dir.display())),
        None => Ok(GameEngine::new(config)?),
    }
}

fn build_plan(args: &Args) -> Result<DistributionPlan> {
    let mut plan = match (&args.plan, &args.category) {
        (Some(path), _) => DistributionPlan::from_json_file(path)?,
        (None, Some(category)) => DistributionPlan::single(category, args.target_win),
        (None, None) => DistributionPlan {
            categories: DistributionPlan::default()
                .categories
                .into_iter()
                .map(|mut category| {
                    category.target_win = args.target_win;
                    category
                })
                .collect(),
            ..DistributionPlan::default()
        },
    };
    if let Some(tolerance) = args.tolerance {
        plan.tolerance = tolerance;
    }
    if let Some(retry_ceiling) = args.retry_ceiling {
        plan.retry_ceiling = retry_ceiling;
    }
    plan.validate()?;
    Ok(plan)
}

fn build_histogram(buckets: Option<&str>) -> Result<WinHistogram> {
    match buckets {
        Some(spec) => Ok(WinHistogram::new(parse_bucket_edges(spec)?)?),
        None => Ok(WinHistogram::default()),
    }
}

fn write_replays(
    args: &Args,
    engine: &GameEngine,
    plan: &DistributionPlan,
    modes: &[String],
    seeds: &[logic::SeedInfo],
    index: u64,
) -> Result<()> {
    let mut replays = Vec::with_capacity(modes.len() * seeds.len());
    for mode in modes {
        for seed in seeds {
            replays.push(replay_trial(engine, mode, seed.seed, index, plan, args.trials)?);
        }
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    serde_json::to_writer_pretty(&mut output_target, &replays)?;
    writeln!(&mut output_target)?;
    output_target.flush_inner()?;
    Ok(())
}

fn write_reports(args: &Args, report: &SimulationReport, start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, report)?,
        "markdown" => logic::reports::generate_markdown_report(&mut output_target, report)?,
        "csv" => logic::reports::generate_csv_report(&mut output_target, report)?,
        _ => {
            logic::reports::generate_console_report(
                &mut output_target,
                report,
                start_time.elapsed(),
            )?;
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
