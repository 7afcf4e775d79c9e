//! Keeps a database growing: repeatedly runs `pgdbgen` for every YAML config
//! found under a directory, with a random batch size and a random pause.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use rand::Rng;
use tokio::process::Command;

const MAX_DIGITS: u32 = 6;
const MIN_PAUSE_SECS: u64 = 3;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run pgdbgen in a loop with random batch sizes", long_about = None)]
struct Args {
    /// Database to fill
    dbname: String,
    /// Batch sizes are drawn below 10^digits (clamped to 1..=6)
    #[arg(long, default_value_t = 4)]
    digits: u32,
    /// Longest random pause between two batches, in seconds
    #[arg(long, default_value_t = 60)]
    wait: u64,
    /// Log what would run without starting pgdbgen
    #[arg(long)]
    dry_run: bool,
    /// Directory searched (recursively) for .yaml / .yml config files
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,
    /// Generator binary to invoke
    #[arg(long, default_value = "./pgdbgen")]
    generator: PathBuf,
    /// Stop after this many passes over the config files (runs forever when unset)
    #[arg(long)]
    iterations: Option<u64>,
}

/// Upper bound (exclusive) of a batch size for the given number of digits.
fn batch_size_limit(digits: u32) -> u64 {
    10_u64.pow(digits.clamp(1, MAX_DIGITS))
}

fn random_batch_size<R: Rng>(digits: u32, rng: &mut R) -> u64 {
    rng.gen_range(0..batch_size_limit(digits))
}

fn random_pause<R: Rng>(wait: u64, rng: &mut R) -> Duration {
    let upper = MIN_PAUSE_SECS.saturating_add(wait.max(1));
    Duration::from_secs(rng.gen_range(MIN_PAUSE_SECS..upper))
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Collect YAML files below `root`, sorted for a stable processing order.
///
/// Symlinked directories are not descended into.
fn find_yaml_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir)
            .with_context(|| format!("Unable to read directory {}", dir.display()))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if is_yaml(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

fn generator_command(generator: &Path, config: &Path, dbname: &str, records: u64) -> Command {
    let mut cmd = Command::new(generator);
    cmd.arg("--config")
        .arg(config)
        .arg("--dbname")
        .arg(dbname)
        .arg("--records")
        .arg(records.to_string());
    cmd
}

async fn run_generator(args: &Args, config: &Path, records: u64) -> Result<()> {
    let status = generator_command(&args.generator, config, &args.dbname, records)
        .status()
        .await
        .with_context(|| format!("Unable to start {}", args.generator.display()))?;
    if !status.success() {
        bail!("{} exited with {} for {}", args.generator.display(), status, config.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.digits == 0 || args.digits > MAX_DIGITS {
        warn!("Digits {} out of range, using {}", args.digits, args.digits.clamp(1, MAX_DIGITS));
    }

    let mut pass = 0;
    loop {
        if args.iterations.is_some_and(|limit| pass >= limit) {
            info!("Completed {} passes", pass);
            break;
        }
        pass += 1;

        let yaml_files = find_yaml_files(&args.config_dir)?;
        if yaml_files.is_empty() {
            info!(
                "Requires at least one yaml/yml file under {}, stopping",
                args.config_dir.display()
            );
            break;
        }

        for yaml_file in &yaml_files {
            let (records, pause) = {
                let mut rng = rand::thread_rng();
                (random_batch_size(args.digits, &mut rng), random_pause(args.wait, &mut rng))
            };
            info!("🚀 Starting to add rows to {}", args.dbname);
            info!(
                "Processing config file {}, trying to insert {} records",
                yaml_file.display(),
                records
            );
            if args.dry_run {
                info!("Dry run, not starting {}", args.generator.display());
            } else {
                run_generator(&args, yaml_file, records).await?;
            }
            info!("Pause for {}s", pause.as_secs());
            tokio::time::sleep(pause).await;
        }
    }
    Ok(())
}
