//! Snowflake ID Generator
//!
//! Twitter-style distributed unique ID generation for messages and rooms.
//! IDs are time-ordered, so keyset pagination and history ordering can key
//! off the ID alone.

use parking_lot::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Custom epoch (2015-01-01T00:00:00.000Z)
const PARLEY_EPOCH: u64 = 1420070400000;

#[derive(Debug, Default)]
struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

/// Snowflake ID generator
///
/// Layout: 41 bits timestamp | 10 bits machine | 12 bits sequence.
pub struct SnowflakeGenerator {
    machine_id: u64,
    state: Mutex<GeneratorState>,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator for the given machine id (0-1023)
    pub fn new(machine_id: u64) -> Self {
        Self {
            machine_id: machine_id & 0x3FF,
            state: Mutex::new(GeneratorState::default()),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let mut state = self.state.lock();
        let timestamp = current_timestamp();

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & 0xFFF;
        } else {
            state.last_timestamp = timestamp;
            state.sequence = 0;
        }

        let id = ((timestamp - PARLEY_EPOCH) << 22)
            | (self.machine_id << 12)
            | state.sequence;

        id as i64
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}

/// Extract the millisecond timestamp from a snowflake ID
pub fn extract_timestamp(snowflake: i64) -> u64 {
    ((snowflake as u64) >> 22) + PARLEY_EPOCH
}
