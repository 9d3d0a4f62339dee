//! CryptoNight Miner CLI
//!
//! # Commands
//!
//! - `mine` - Verify the engine and mine one job until stopped
//! - `self-test` - Run the golden-vector self-test
//! - `benchmark` - Time batched engine calls
//! - `init-config` - Write a config file with the current settings

use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use cnminer::algorithm::{
    self, has_hardware_aes, Algorithm, EngineGate, Variant, HASH_SIZE, MAX_LANES,
};
use cnminer::config::default_config_path;
use cnminer::job::{write_nonce, MIN_BLOB_SIZE};
use cnminer::logging::init_logging;
use cnminer::{Config, Hashrate, Job, Workers};

/// How often the mine loop checks the deadline and report timer
const SHARE_POLL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "cnminer")]
#[command(author = "Cyberia")]
#[command(version = "0.1.0")]
#[command(about = "CryptoNight proof-of-work miner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Custom config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Algorithm: cryptonight (cn) or cryptonight-lite (cn-lite)
    #[arg(short, long, global = true)]
    algo: Option<String>,

    /// Engine variant 1..=7 (default: picked from the multiplier)
    #[arg(short, long, global = true)]
    variant: Option<i32>,

    /// Lanes per engine call 1..=5 (default: taken from the variant)
    #[arg(short, long, global = true)]
    multiplier: Option<usize>,

    /// Number of threads to use (default: number of CPU cores)
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    /// Seconds between hashrate reports
    #[arg(long, global = true)]
    print_time: Option<u64>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine a job given on the command line
    Mine {
        /// Job blob in hex
        #[arg(long)]
        blob: String,

        /// Target in hex, 8 (compact) or 16 characters
        #[arg(long)]
        target: String,

        /// Job id reported with every share
        #[arg(long, default_value = "0")]
        job_id: String,

        /// Keep the top nonce byte reserved
        #[arg(long)]
        nicehash: bool,

        /// Stop after this many seconds
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// Run the golden-vector self-test
    SelfTest {
        /// Test every variant of the algorithm instead of the configured one
        #[arg(long)]
        all: bool,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of engine calls
        #[arg(short, long, default_value = "100")]
        count: u32,
    },

    /// Write the effective configuration to the config file
    InitConfig,
}

fn main() {
    let cli = Cli::parse();

    let result = load_config(&cli).and_then(|(config, path)| {
        init_logging(&config.log_level);
        match cli.command {
            Commands::Mine {
                blob,
                target,
                job_id,
                nicehash,
                duration,
            } => cmd_mine(&config, &blob, &target, &job_id, nicehash, duration),
            Commands::SelfTest { all } => cmd_self_test(&config, all),
            Commands::Benchmark { count } => cmd_benchmark(&config, count),
            Commands::InitConfig => cmd_init_config(&config, &path),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Config file values with command-line overrides applied
fn load_config(cli: &Cli) -> anyhow::Result<(Config, PathBuf)> {
    let path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load_or_default(&path)?;

    if let Some(algo) = &cli.algo {
        config.algo = algo.clone();
    }
    if cli.variant.is_some() {
        config.variant = cli.variant;
    }
    if cli.multiplier.is_some() {
        config.multiplier = cli.multiplier;
    }
    if cli.threads.is_some() {
        config.threads = cli.threads;
    }
    if let Some(print_time) = cli.print_time {
        config.print_time = print_time;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    Ok((config, path))
}

fn cmd_mine(
    config: &Config,
    blob: &str,
    target: &str,
    job_id: &str,
    nicehash: bool,
    duration: Option<u64>,
) -> anyhow::Result<()> {
    let settings = config.settings()?;
    let job = Job::from_hex(0, job_id, blob, target, nicehash)?;

    // Nothing is spawned until the engine passes its self-test
    let mut gate = EngineGate::new(settings.multiplier)?;
    let engine = gate.init(settings.algorithm, settings.variant)?;

    println!("Starting mining...");
    println!("Algorithm: {}", settings.algorithm);
    println!("Variant: {}", engine.variant());
    println!("Threads: {}", settings.threads);
    println!("Difficulty: {}", job.diff());
    if job.is_nicehash() {
        println!("Nicehash: reserved byte {:#04x}", job.nonce() >> 24);
    }

    let (hub, shares) = Workers::new();
    let hashrate = Arc::new(Hashrate::new(settings.threads));
    let handle = hub.start(engine, settings.threads, &hashrate)?;
    hub.set_job(job);

    let deadline = duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    let report_every = (config.print_time > 0).then(|| Duration::from_secs(config.print_time));
    let mut last_report = Instant::now();
    let mut found: u64 = 0;

    loop {
        match shares.recv_timeout(SHARE_POLL) {
            Ok(share) => {
                found += 1;
                info!(
                    job = %share.job_id,
                    nonce = %share.nonce_hex(),
                    diff = share.actual_diff(),
                    "share found"
                );
                let submit = serde_json::json!({
                    "id": share.pool_id,
                    "job_id": &*share.job_id,
                    "nonce": share.nonce_hex(),
                    "result": share.digest_hex(),
                });
                println!("{}", submit);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        hashrate.update_highest();
        if let Some(every) = report_every {
            if last_report.elapsed() >= every {
                hashrate.print();
                last_report = Instant::now();
            }
        }

        if deadline.is_some_and(|at| Instant::now() >= at) {
            break;
        }
    }

    hub.stop();
    handle.join();
    hashrate.print();
    info!(shares = found, "mining stopped");

    Ok(())
}

fn cmd_self_test(config: &Config, all: bool) -> anyhow::Result<()> {
    if !all {
        let settings = config.settings()?;
        let engine = algorithm::init(settings.algorithm, settings.variant, settings.multiplier)?;
        println!(
            "{} variant {} x{}: ok",
            settings.algorithm,
            engine.variant(),
            settings.multiplier
        );
        return Ok(());
    }

    let family: Algorithm = config.algo.parse()?;
    println!("Hardware AES: {}", has_hardware_aes());

    let mut failed = 0;
    for variant in Variant::ALL {
        let outcome = algorithm::init(family, variant.index(), variant.lanes());
        let status = if outcome.is_ok() { "ok" } else { "FAILED" };
        println!("{} variant {}: {}", family, variant, status);
        if outcome.is_err() {
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} variants failed the self-test", failed, Variant::ALL.len());
    }
    Ok(())
}

fn cmd_benchmark(config: &Config, count: u32) -> anyhow::Result<()> {
    let settings = config.settings()?;
    let engine = algorithm::init(settings.algorithm, settings.variant, settings.multiplier)?;
    let lanes = engine.lanes();

    println!(
        "Running benchmark with {} calls of {} lanes ({} variant {})...",
        count,
        lanes,
        settings.algorithm,
        engine.variant()
    );

    let mut ctx = engine.context();
    let mut input = vec![0u8; MIN_BLOB_SIZE * lanes];
    let mut output = [0u8; HASH_SIZE * MAX_LANES];

    let start = Instant::now();

    for i in 0..count {
        for lane in input.chunks_exact_mut(MIN_BLOB_SIZE) {
            write_nonce(lane, i);
        }
        engine.hash(&input, MIN_BLOB_SIZE, &mut output[..HASH_SIZE * lanes], &mut ctx);
    }

    let elapsed = start.elapsed();
    let hashes = u64::from(count) * lanes as u64;
    let hashrate = hashes as f64 / elapsed.as_secs_f64();

    println!("\nResults:");
    println!("  Total hashes: {}", hashes);
    println!("  Time elapsed: {:.2}s", elapsed.as_secs_f64());
    println!("  Hashrate: {:.2} H/s", hashrate);

    let profile = settings.algorithm.profile();
    println!("\nAlgorithm parameters:");
    println!("  Memory per lane: {} KB", profile.memory / 1024);
    println!("  Iterations: {:#x}", profile.iterations);
    println!("  Total memory: {} MB", profile.memory * lanes / (1024 * 1024));

    Ok(())
}

fn cmd_init_config(config: &Config, path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!(
            "Config already exists at {}. Delete it first to write a new one.",
            path.display()
        );
    }

    config.settings()?;
    config.save(path)?;

    println!("Config written to {}", path.display());
    Ok(())
}
