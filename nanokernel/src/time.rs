// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Time types.
//!
//! Durations and instants are counted in system clock ticks, with the tick rate taken from
//! `CONFIG_SYS_CLOCK_TICKS_PER_SEC`.  They are [`fugit`] types, so conversions to and from other
//! units are checked at compile time.

use crate::kconfig::{CONFIG_SYS_CLOCK_TICKS_PER_SEC, CONFIG_TASK_IDLE_BACKOFF_US};

/// The native tick count.
pub type Tick = u64;

/// The system clock rate, in ticks per second.
pub const SYS_FREQUENCY: u32 = CONFIG_SYS_CLOCK_TICKS_PER_SEC as u32;

/// A span of time, in system ticks.
pub type Duration = fugit::Duration<Tick, 1, SYS_FREQUENCY>;

/// A point in time, in system ticks since boot.
pub type Instant = fugit::Instant<Tick, 1, SYS_FREQUENCY>;

/// How long a polling task waits between checks of a kernel object.
pub const fn idle_backoff() -> fugit::MicrosDurationU64 {
    fugit::MicrosDurationU64::from_ticks(CONFIG_TASK_IDLE_BACKOFF_US as u64)
}

/// Time since the kernel was first asked for it.
#[cfg(feature = "host")]
pub fn uptime() -> Instant {
    use std::sync::OnceLock;
    use std::time::Instant as HostInstant;

    static BOOT: OnceLock<HostInstant> = OnceLock::new();
    let elapsed = BOOT.get_or_init(HostInstant::now).elapsed();
    Instant::from_ticks(elapsed.as_micros() as Tick * SYS_FREQUENCY as Tick / 1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_second_of_ticks() {
        let second = Duration::from_ticks(SYS_FREQUENCY as Tick);
        assert_eq!(second.to_millis(), 1000);
    }

    #[test]
    fn backoff_matches_config() {
        assert_eq!(idle_backoff().to_micros(), CONFIG_TASK_IDLE_BACKOFF_US as u64);
    }

    #[cfg(feature = "host")]
    #[test]
    fn uptime_moves_forward() {
        let start = uptime();
        std::thread::sleep(std::time::Duration::from_millis(30));
        assert!(uptime() > start);
    }
}
