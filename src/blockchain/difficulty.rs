use chrono::{DateTime, Utc};

use super::block::Block;

/// Desired number of seconds between two blocks
pub const TARGET_BLOCK_TIME_SECS: f64 = 10.0;

/// Lowest difficulty the controller will ever settle on
pub const MIN_DIFFICULTY: u32 = 1;

/// Computes the next difficulty from the interval between two blocks.
///
/// Faster than half the target raises it by one, slower than twice the
/// target lowers it by one (floored at [`MIN_DIFFICULTY`]). A negative
/// interval, from a clock stepping backwards, counts as too fast.
pub fn adjust(current: u32, previous: DateTime<Utc>, latest: DateTime<Utc>) -> u32 {
    let elapsed = (latest - previous).num_milliseconds() as f64 / 1000.0;

    if elapsed < TARGET_BLOCK_TIME_SECS / 2.0 {
        current.saturating_add(1)
    } else if elapsed > TARGET_BLOCK_TIME_SECS * 2.0 {
        current.saturating_sub(1).max(MIN_DIFFICULTY)
    } else {
        current
    }
}

/// Recalibrates `current` from the two most recent blocks of `blocks`.
/// Fewer than two blocks leaves it unchanged.
pub fn retarget(current: u32, blocks: &[Block]) -> u32 {
    match blocks {
        [.., previous, latest] => adjust(current, previous.timestamp, latest.timestamp),
        _ => current,
    }
}
