//! ttlcounters demo driver
//!
//! Runs a local load against a [`TtlCounters`] store: worker threads
//! increment keys drawn from a fixed key space while the background sweeper
//! reclaims keys that go quiet. Prints a summary of the store statistics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use ttlcounters::{StoreConfig, TtlCounters};

/// Demo configuration
struct Config {
    /// TTL applied to every key
    ttl: Duration,
    /// Number of worker threads
    workers: usize,
    /// Size of the key space the workers draw from
    keys: u64,
    /// How long to run
    duration: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(500),
            workers: 4,
            keys: 10_000,
            duration: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--ttl-ms" | "-t" => {
                    config.ttl = Duration::from_millis(parse_value(&args, i, "--ttl-ms"));
                    i += 2;
                }
                "--workers" | "-w" => {
                    config.workers = parse_value(&args, i, "--workers");
                    i += 2;
                }
                "--keys" | "-k" => {
                    config.keys = parse_value(&args, i, "--keys");
                    i += 2;
                }
                "--duration-ms" | "-d" => {
                    config.duration =
                        Duration::from_millis(parse_value(&args, i, "--duration-ms"));
                    i += 2;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("ttlcounters version {}", ttlcounters::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        if config.workers == 0 || config.keys == 0 {
            eprintln!("Error: --workers and --keys must be at least 1");
            std::process::exit(1);
        }

        config
    }
}

/// Parses the value following the flag at `i`, exiting on error
fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    let Some(raw) = args.get(i + 1) else {
        eprintln!("Error: {} requires a value", flag);
        std::process::exit(1);
    };
    raw.parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid value for {}: {}", flag, raw);
        std::process::exit(1);
    })
}

fn print_help() {
    println!(
        r#"
ttlcounters demo - concurrent counters with a sliding TTL

USAGE:
    ttlcounters-demo [OPTIONS]

OPTIONS:
    -t, --ttl-ms <MS>         TTL applied to every key (default: 500)
    -w, --workers <N>         Worker threads incrementing keys (default: 4)
    -k, --keys <N>            Size of the key space (default: 10000)
    -d, --duration-ms <MS>    How long to run (default: 5000)
    -v, --version             Print version information
    -h, --help                Print this help message

EXAMPLES:
    ttlcounters-demo                          # 4 workers, 500ms TTL, 5s
    ttlcounters-demo --ttl-ms 50 --keys 100   # Short TTL, hot key space
"#
    );
}

/// Cheap xorshift so each worker walks the key space differently
fn next_key(state: &mut u64, keys: u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state % keys
}

fn run_worker(counters: Arc<TtlCounters>, stop: Arc<AtomicBool>, seed: u64, keys: u64) -> u64 {
    let mut state = seed | 1;
    let mut ops = 0u64;

    while !stop.load(Ordering::Relaxed) {
        let key = format!("key:{}", next_key(&mut state, keys));
        counters.increment(key);
        ops += 1;
    }

    ops
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    // Set up logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let counters = Arc::new(TtlCounters::with_config(StoreConfig::new(config.ttl))?);
    info!(
        ttl_ms = config.ttl.as_millis() as u64,
        sweep_interval_ms = counters.sweep_interval().as_millis() as u64,
        workers = config.workers,
        keys = config.keys,
        "Starting load"
    );

    let stop = Arc::new(AtomicBool::new(false));
    let started = Instant::now();

    let workers: Vec<_> = (0..config.workers)
        .map(|w| {
            let counters = Arc::clone(&counters);
            let stop = Arc::clone(&stop);
            let seed = 0x9E37_79B9_7F4A_7C15u64.wrapping_mul(w as u64 + 1);
            let keys = config.keys;
            tokio::task::spawn_blocking(move || run_worker(counters, stop, seed, keys))
        })
        .collect();

    let mut progress = tokio::time::interval(Duration::from_secs(1));
    progress.tick().await;
    let deadline = tokio::time::sleep(config.duration);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = progress.tick() => {
                let stats = counters.stats();
                info!(
                    keys = stats.keys,
                    increments = stats.increments,
                    reclaimed = stats.reclaimed,
                    "Progress"
                );
            }
            _ = signal::ctrl_c() => {
                info!("Interrupted, stopping workers...");
                break;
            }
        }
    }

    stop.store(true, Ordering::Relaxed);

    let mut total_ops = 0u64;
    for worker in workers {
        match worker.await {
            Ok(ops) => total_ops += ops,
            Err(e) => warn!(error = %e, "Worker failed"),
        }
    }
    let elapsed = started.elapsed();

    let stats = counters.stats();
    println!();
    println!("Elapsed:         {:.2?}", elapsed);
    println!("Increments:      {}", total_ops);
    println!(
        "Throughput:      {:.0} ops/s",
        total_ops as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    println!("Keys held:       {}", stats.keys);
    println!("Fresh starts:    {}", stats.fresh_starts);
    println!("Expired resets:  {}", stats.expired_resets);
    println!("Reclaimed:       {}", stats.reclaimed);
    println!("Sweeps:          {}", stats.sweeps);

    match Arc::try_unwrap(counters) {
        Ok(counters) => counters.shutdown().await,
        Err(_) => warn!("Store still shared at exit; sweeper stops on drop"),
    }

    Ok(())
}
