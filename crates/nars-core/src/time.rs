//! Engine clock and lightweight UTC timestamps (no chrono dependency).
//!
//! Uses Howard Hinnant's civil_from_days algorithm for Unix-to-date conversion.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Unit in which budget decay measures idle time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// Reasoning cycles.
    #[default]
    Cycles,
    /// Milliseconds of real time since the memory was built.
    Wall,
}

/// Cycle counter plus, in wall mode, a real-time origin.
#[derive(Debug)]
pub struct Clock {
    mode: ClockMode,
    cycles: u64,
    origin: Instant,
}

impl Clock {
    pub fn new(mode: ClockMode) -> Self {
        Self {
            mode,
            cycles: 0,
            origin: Instant::now(),
        }
    }

    /// Advance one cycle.
    pub fn tick(&mut self) {
        self.cycles += 1;
    }

    /// Cycles elapsed. Trace events are stamped with this.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Time fed to budget decay, in the configured unit.
    pub fn now(&self) -> u64 {
        match self.mode {
            ClockMode::Cycles => self.cycles,
            ClockMode::Wall => self.origin.elapsed().as_millis() as u64,
        }
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }
}

/// Current UTC time as Unix seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Current UTC timestamp in ISO-8601 format.
pub fn now_iso8601() -> String {
    unix_to_iso8601(now_unix_secs())
}

/// Convert Unix seconds to ISO-8601 UTC string.
pub fn unix_to_iso8601(secs: u64) -> String {
    let days = (secs / 86400) as i64;
    let time_of_day = secs % 86400;
    let (y, m, d) = civil_from_days(days);
    format!(
        "{y:04}-{m:02}-{d:02}T{:02}:{:02}:{:02}Z",
        time_of_day / 3600,
        (time_of_day % 3600) / 60,
        time_of_day % 60
    )
}

fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = yoe as i64 + era * 400 + i64::from(m <= 2);
    (y, m, d)
}
