// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use common::Time;

/// Ticks per second of the scheduler clock.
pub const SCHED_FREQUENCY: Time = 200_000_000;
/// Cycles per second of the ARM7.
pub const ARM7_FREQUENCY: Time = 45_000_000;

/// Configuration used when initializing the system.
/// These options don't change at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AicaConfig {
    /// Ticks per second of the clock all events are scheduled on.
    pub sched_frequency: Time,
    /// Clock ticks per ARM7 cycle.
    pub cpu_clock_scale: Time,
    /// Audio output sample rate. One sample interrupt per sample.
    pub sample_rate: Time,
    /// If the ARM7 should stay in reset until the host releases it.
    pub start_held_in_reset: bool,
}

impl AicaConfig {
    /// Clock ticks between two samples.
    pub fn sample_interval(&self) -> Time {
        (self.sched_frequency / self.sample_rate.max(1)).max(1)
    }

    /// Clock ticks per ARM7 cycle, at least one.
    pub fn cpu_scale(&self) -> Time {
        self.cpu_clock_scale.max(1)
    }
}

impl Default for AicaConfig {
    fn default() -> Self {
        Self {
            sched_frequency: SCHED_FREQUENCY,
            cpu_clock_scale: SCHED_FREQUENCY / ARM7_FREQUENCY,
            sample_rate: 44_100,
            start_held_in_reset: true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_timings() {
        let config = AicaConfig::default();
        assert_eq!(config.cpu_scale(), 4);
        assert_eq!(config.sample_interval(), 4535);
    }

    #[test]
    fn degenerate_timings_clamp() {
        let config = AicaConfig {
            sched_frequency: 10,
            cpu_clock_scale: 0,
            sample_rate: 0,
            start_held_in_reset: false,
        };
        assert_eq!(config.cpu_scale(), 1);
        assert_eq!(config.sample_interval(), 10);

        let config = AicaConfig {
            sample_rate: 100,
            ..config
        };
        assert_eq!(config.sample_interval(), 1);
    }
}
