use commonware_macros::test_traced;
use commonware_sieve::{
    sieve, Config, Engine, Error, Isolated, Phase, Sequential, Shared, Strategy,
};
use std::time::Duration;
use test_case::test_case;

/// Primes up to `limit` by trial division.
fn trial_division(limit: u64) -> Vec<u64> {
    (2..=limit)
        .filter(|&n| (2..).take_while(|d| d * d <= n).all(|d| n % d != 0))
        .collect()
}

fn primes<S: Strategy>(strategy: S, limit: u64, workers: usize) -> Vec<u64> {
    let engine = Engine::new(Config::new(limit, workers), strategy).unwrap();
    let output = engine.run().unwrap();
    assert_eq!(output.timings.samples().len(), workers);
    output.sieve.primes().collect()
}

fn shared() -> Shared {
    Shared::with_threads(4).unwrap()
}

#[test_case(2 ; "smallest limit")]
#[test_case(3 ; "no seed primes")]
#[test_case(4 ; "perfect square")]
#[test_case(97 ; "prime limit")]
#[test_case(1_000 ; "thousand")]
#[test_case(10_007 ; "large prime limit")]
fn test_single_worker_matches_trial_division(limit: u64) {
    assert_eq!(primes(Sequential, limit, 1), trial_division(limit));
}

#[test_case(1 ; "one worker")]
#[test_case(2 ; "two workers")]
#[test_case(3 ; "three workers")]
#[test_case(7 ; "seven workers")]
fn test_worker_count_invariance(workers: usize) {
    let expected = trial_division(10_000);
    assert_eq!(primes(Sequential, 10_000, workers), expected);
    assert_eq!(primes(shared(), 10_000, workers), expected);
    assert_eq!(primes(Isolated, 10_000, workers), expected);
}

#[test_traced]
fn test_hundred_across_four() {
    let expected = vec![
        2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
        97,
    ];
    assert_eq!(primes(Sequential, 100, 4), expected);
    assert_eq!(primes(shared(), 100, 4), expected);
    assert_eq!(primes(Isolated, 100, 4), expected);
}

#[test_case(2, 1, vec![2] ; "two")]
#[test_case(3, 1, vec![2, 3] ; "three")]
#[test_case(3, 4, vec![2, 3] ; "three with idle workers")]
#[test_case(30, 3, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29] ; "thirty across three")]
fn test_small_limits(limit: u64, workers: usize, expected: Vec<u64>) {
    assert_eq!(primes(Isolated, limit, workers), expected);
    assert_eq!(primes(shared(), limit, workers), expected);
}

#[test_traced]
fn test_more_workers_than_range() {
    // R = 10 - 3 = 7 < W: trailing workers own empty blocks
    let engine = Engine::new(Config::new(10, 10), Isolated).unwrap();
    let empty = engine.partition().blocks().filter(|b| b.is_empty()).count();
    assert_eq!(empty, 3);
    let output = engine.run().unwrap();
    assert_eq!(output.sieve.primes().collect::<Vec<_>>(), vec![2, 3, 5, 7]);
}

#[test_traced]
fn test_deterministic() {
    let first = sieve(50_000, 6).unwrap();
    for _ in 0..3 {
        assert_eq!(sieve(50_000, 6).unwrap(), first);
    }
    let engine = Engine::new(Config::new(50_000, 6), shared()).unwrap();
    assert_eq!(engine.run().unwrap().sieve, first);
}

#[test_traced]
fn test_prime_count() {
    let result = sieve(1_000_000, 8).unwrap();
    assert_eq!(result.count(), 78_498);
    assert!(result.is_prime(999_983));
    assert!(!result.is_prime(999_999));
}

#[test_case(0, 1 ; "zero limit")]
#[test_case(1, 1 ; "one limit")]
#[test_case(100, 0 ; "no workers")]
fn test_invalid_config(limit: u64, workers: usize) {
    let err = Engine::new(Config::new(limit, workers), Isolated).unwrap_err();
    assert_eq!(err.phase(), Phase::Validation);
    let err = sieve(limit, workers).unwrap_err();
    assert_eq!(err.phase(), Phase::Validation);
}

#[test_traced]
fn test_invalid_limit_message() {
    let err = sieve(1, 4).unwrap_err();
    assert!(matches!(err, Error::InvalidLimit(1)));
    assert_eq!(err.to_string(), "invalid limit 1: must be at least 2");
}

#[test_traced]
fn test_generous_timeout() {
    let config = Config {
        limit: 100_000,
        workers: 5,
        gather_timeout: Some(Duration::from_secs(60)),
    };
    let engine = Engine::new(config, Isolated).unwrap();
    assert_eq!(engine.run().unwrap().sieve.count(), 9_592);
}

#[test_traced]
fn test_timings_cover_every_worker() {
    let engine = Engine::new(Config::new(100_000, 5), shared()).unwrap();
    let output = engine.run().unwrap();
    let ranks: Vec<usize> = output.timings.samples().iter().map(|s| s.rank).collect();
    assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    let max = output.timings.max();
    assert!(output.timings.samples().iter().all(|s| s.elapsed <= max));
}
