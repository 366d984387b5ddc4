use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::game::{PerfType, Variant};

/// Clock settings of a challenge, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeControl {
    pub initial_secs: u64,
    pub increment_secs: u64,
}

impl TimeControl {
    pub fn new(initial_secs: u64, increment_secs: u64) -> Self {
        Self {
            initial_secs,
            increment_secs,
        }
    }

    pub fn perf_type(&self, variant: Variant) -> PerfType {
        PerfType::classify(variant, self.initial_secs, self.increment_secs)
    }

    /// Expected wall-clock length of a game pair at this time control.
    pub fn estimated_game_duration(&self) -> Duration {
        let single = self.initial_secs as f64 * 0.8 + self.increment_secs as f64 * 80.0;
        Duration::from_secs_f64(single * 2.0)
    }

    pub fn tc_str(&self) -> String {
        let minutes = format_minutes(self.initial_secs as f64 / 60.0);
        format!("TC: {minutes}+{}", self.increment_secs)
    }
}

/// Renders minutes the way chess sites do, with vulgar fractions for short clocks.
pub fn format_minutes(minutes: f64) -> String {
    if minutes.fract() == 0.0 {
        format!("{}", minutes as u64)
    } else if minutes == 0.25 {
        "¼".into()
    } else if minutes == 0.5 {
        "½".into()
    } else if minutes == 0.75 {
        "¾".into()
    } else {
        format!("{minutes}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimated_duration_weights_increment() {
        let tc = TimeControl::new(180, 2);
        // (180 * 0.8 + 2 * 80) * 2 = 608 seconds
        assert_eq!(tc.estimated_game_duration(), Duration::from_secs(608));
        assert_eq!(tc.perf_type(Variant::Standard), PerfType::Blitz);
    }

    #[test]
    fn minutes_formatting() {
        assert_eq!(format_minutes(3.0), "3");
        assert_eq!(format_minutes(0.5), "½");
        assert_eq!(format_minutes(1.5), "1.5");
        assert_eq!(TimeControl::new(15, 0).tc_str(), "TC: ¼+0");
    }
}
