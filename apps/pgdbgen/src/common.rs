use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Build the generator owned by one worker.
///
/// With a configured seed every worker gets its own reproducible stream
/// (`seed + worker_id`); without one each worker is seeded from OS entropy.
pub fn worker_rng(seed: Option<u64>, worker_id: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker_id as u64)),
        None => StdRng::from_entropy(),
    }
}

/// Generate a string of ASCII letters of exactly `length` characters
pub fn generate_letters_with_rng<R: Rng + ?Sized>(length: usize, rng: &mut R) -> String {
    (0..length)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

/// Generate a unix timestamp (seconds) between the epoch and now
pub fn generate_unix_time_with_rng<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    let now = Utc::now().timestamp().max(1);
    rng.gen_range(0..now)
}

/// Generate a back-dating offset in seconds, both bounds inclusive.
///
/// Callers guarantee `min <= max`; configuration validation enforces it.
pub fn generate_backdate_offset_with_rng<R: Rng + ?Sized>(min: i64, max: i64, rng: &mut R) -> i64 {
    rng.gen_range(min..=max)
}

/// Format a value with two decimals, the way amounts are fingerprinted and displayed
pub fn format_two_decimals(value: f64) -> String {
    format!("{:.2}", value)
}
