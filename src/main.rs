use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

mod batch;
mod config;
mod snap;

use config::{AppConfig, EncoderKind};
use snap::Converter;

#[derive(Debug, Parser)]
#[command(
    name = "h26x-snap",
    version,
    about = "Turn the first frame of an H.264/H.265 elementary stream into a JPEG"
)]
struct Cli {
    /// JSON settings file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JPEG quality 1-100, overrides the settings file.
    #[arg(short, long, global = true)]
    quality: Option<u8>,

    #[arg(long, global = true, value_enum)]
    encoder: Option<EncoderKind>,

    /// -v for debug, -vv for trace.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert one file.
    Convert { input: PathBuf, output: PathBuf },
    /// Convert many files concurrently into a directory.
    Batch {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        out_dir: PathBuf,
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Convert the same file repeatedly and report timings.
    Bench {
        input: PathBuf,
        output: PathBuf,
        #[arg(short = 'n', long, default_value_t = 10)]
        iterations: usize,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("h26x_snap", level)
        .filter_module("frame_snap", level)
        .filter_module("ffmpeg_next", level)
        .format_timestamp_millis()
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if cli.quality.is_some() {
        config.jpeg_quality = cli.quality;
    }
    if let Some(encoder) = cli.encoder {
        config.encoder = encoder;
    }
    if let Command::Batch {
        jobs: Some(jobs), ..
    } = cli.command
    {
        config.jobs = jobs;
    }
    config.validate()?;
    Ok(config)
}

async fn convert(converter: Converter, input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let info = tokio::task::spawn_blocking(move || converter.convert_file(&input, &output))
        .await
        .context("conversion task")??;
    log::info!("wrote {}x{} JPEG, {}B", info.width, info.height, info.len);
    Ok(())
}

async fn batch(
    converter: Converter,
    inputs: Vec<PathBuf>,
    out_dir: &Path,
    jobs: usize,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create {}", out_dir.display()))?;

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel_clone.cancelled() => {},
            _ = tokio::signal::ctrl_c() => {
                log::warn!("interrupted, waiting for running conversions");
                cancel_clone.cancel();
            },
        }
    });

    let report = batch::run_batch(inputs, out_dir, jobs, cancel.clone(), move |input, output| {
        converter.convert_file(input, output)
    })
    .await;
    cancel.cancel();

    log::info!(
        "batch done: {} converted, {} failed, {} skipped",
        report.converted,
        report.failed.len(),
        report.skipped
    );
    anyhow::ensure!(
        report.is_success(),
        "{} of the inputs were not converted",
        report.failed.len() + report.skipped
    );
    Ok(())
}

fn average(total: Duration, iterations: usize) -> Duration {
    total.div_f64(iterations as f64)
}

fn bench(
    converter: &Converter,
    input: &Path,
    output: &Path,
    iterations: usize,
) -> anyhow::Result<()> {
    let mut total = Duration::ZERO;
    for i in 0..iterations {
        let start = Instant::now();
        converter
            .convert_file(input, output)
            .with_context(|| format!("iteration {}", i + 1))?;
        let elapsed = start.elapsed();
        total += elapsed;
        log::info!("iteration {}: {:.2?}", i + 1, elapsed);
    }
    if iterations > 0 {
        log::info!(
            "{} iterations, total {:.2?}, average {:.2?}",
            iterations,
            total,
            average(total, iterations)
        );
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let converter = Converter::new(&config)?;

    match cli.command {
        Command::Convert { input, output } => convert(converter, input, output).await,
        Command::Batch {
            inputs, out_dir, ..
        } => batch(converter, inputs, &out_dir, config.jobs).await,
        Command::Bench {
            input,
            output,
            iterations,
        } => {
            tokio::task::spawn_blocking(move || bench(&converter, &input, &output, iterations))
                .await
                .context("bench task")?
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_handles_large_iteration_counts() {
        assert_eq!(average(Duration::from_secs(10), 4), Duration::from_millis(2500));
        let huge = 1usize << 32;
        assert!(average(Duration::from_secs(1), huge) < Duration::from_micros(1));
    }
}
