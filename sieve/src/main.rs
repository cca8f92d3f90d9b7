//! Print every prime up to a limit using a parallel segmented sieve.
//!
//! # Usage
//!
//! ```sh
//! cargo run --release --bin commonware-sieve -- --limit 1000000 --workers 8 --model shared
//! ```
//!
//! By default, the primes past the seed bound (`⌊√N⌋`) are printed. Use `--from` and `--to` to
//! print a different range. The last line reports the marking time of the slowest worker.

use clap::{builder::PossibleValuesParser, value_parser, Arg, Command};
use commonware_sieve::{
    Config, Engine, Error, Isolated, Output, Phase, Sequential, Shared, Strategy,
};
use std::{process::ExitCode, time::Duration};
use tracing::{error, info};

/// Exit status for configuration errors.
const USAGE_ERROR: u8 = 2;

fn main() -> ExitCode {
    // Parse arguments
    let matches = Command::new("commonware-sieve")
        .about("compute every prime up to a limit with a parallel segmented sieve")
        .arg(
            Arg::new("limit")
                .long("limit")
                .required(true)
                .help("Largest number tested for primality")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .default_value("4")
                .help("Number of workers marking the range past the seed bound")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .default_value("shared")
                .help("How workers are scheduled")
                .value_parser(PossibleValuesParser::new(["sequential", "shared", "isolated"])),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .help("Size of the thread pool used by the shared model (defaults to workers)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("gather-timeout-ms")
                .long("gather-timeout-ms")
                .help("Abort if a worker report takes longer than this to arrive")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("from")
                .long("from")
                .help("First number of the printed range (defaults to the seed bound)")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("to")
                .long("to")
                .help("Last number of the printed range (defaults to the limit)")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .default_value("info")
                .help("Maximum level of emitted logs")
                .value_parser(value_parser!(tracing::Level)),
        )
        .get_matches();

    // Create logger
    let level = *matches
        .get_one::<tracing::Level>("log-level")
        .unwrap_or(&tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    // Configure run
    let Some(&limit) = matches.get_one::<u64>("limit") else {
        error!("missing limit");
        return ExitCode::from(USAGE_ERROR);
    };
    let workers = matches.get_one::<usize>("workers").copied().unwrap_or(4);
    let config = Config {
        limit,
        workers,
        gather_timeout: matches
            .get_one::<u64>("gather-timeout-ms")
            .map(|ms| Duration::from_millis(*ms)),
    };

    // Run under the selected model
    let model = matches
        .get_one::<String>("model")
        .map(String::as_str)
        .unwrap_or("shared");
    let threads = matches.get_one::<usize>("threads").copied();
    let result = execute(config, model, threads);
    let (bound, output) = match result {
        Ok(result) => result,
        Err(err) => {
            error!(phase = %err.phase(), %err, "sieve failed");
            if err.phase() == Phase::Validation {
                return ExitCode::from(USAGE_ERROR);
            }
            return ExitCode::FAILURE;
        }
    };

    // Print results
    let from = matches.get_one::<u64>("from").copied().unwrap_or(bound);
    let to = matches.get_one::<u64>("to").copied().unwrap_or(limit);
    for prime in output.sieve.primes_in(from..=to) {
        println!("{prime}");
    }
    if let Some(slowest) = output.timings.slowest() {
        info!(rank = slowest.rank, elapsed = ?slowest.elapsed, "slowest worker");
    }
    println!(
        "max execution time among all workers: {:.12} seconds",
        output.timings.max().as_secs_f64()
    );
    ExitCode::SUCCESS
}

/// Validates `config`, builds the strategy named by `model`, and runs the sieve.
///
/// The shared model's pool is only built once the configuration is known to be valid.
fn execute(config: Config, model: &str, threads: Option<usize>) -> Result<(u64, Output), Error> {
    config.validate()?;
    match model {
        "sequential" => run(config, Sequential),
        "isolated" => run(config, Isolated),
        _ => {
            let threads = threads.unwrap_or(config.workers).max(1);
            run(config, Shared::with_threads(threads)?)
        }
    }
}

/// Runs the sieve and returns the seed bound alongside the output.
fn run<S: Strategy>(config: Config, strategy: S) -> Result<(u64, Output), Error> {
    let engine = Engine::new(config, strategy)?;
    let bound = engine.partition().bound();
    Ok((bound, engine.run()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_macros::test_traced;

    #[test_traced]
    fn test_rejects_workers_before_building_pool() {
        let err = execute(Config::new(100, usize::MAX), "shared", None).unwrap_err();
        assert!(matches!(err, Error::TooManyWorkers(usize::MAX)));
        assert_eq!(err.phase(), Phase::Validation);

        let err = execute(Config::new(100, 0), "shared", Some(2)).unwrap_err();
        assert!(matches!(err, Error::InvalidWorkers(0)));
        assert_eq!(err.phase(), Phase::Validation);
    }

    #[test_traced]
    fn test_execute_models() {
        for model in ["sequential", "shared", "isolated"] {
            let (bound, output) = execute(Config::new(100, 4), model, Some(2)).unwrap();
            assert_eq!(bound, 10);
            assert_eq!(output.sieve.count(), 25);
        }
    }
}
