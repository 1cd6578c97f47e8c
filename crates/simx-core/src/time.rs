//! User time units, the integer engine clock and time stamps of recorded results.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Engine clock ticks per second.
const TICKS_PER_SECOND: f64 = 1e9;

/// Conversion between user time (in the unit of the cases file) and engine ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    factor: f64,
}

impl TimeScale {
    /// Build the scale for a time unit text such as `sec`, `min`, `h` or `ms`.
    /// An unrecognized unit is logged and counted as seconds.
    pub fn from_unit(unit: &str) -> Self {
        let seconds = unit_seconds(unit).unwrap_or_else(|| {
            warn!(unit, "unknown time unit, counting as seconds");
            1.0
        });
        Self {
            factor: seconds * TICKS_PER_SECOND,
        }
    }

    /// Ticks per user time unit.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn to_ticks(&self, time: f64) -> i64 {
        (time * self.factor).round() as i64
    }

    pub fn to_time(&self, ticks: i64) -> f64 {
        ticks as f64 / self.factor
    }
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::from_unit("sec")
    }
}

/// Length of a time unit in seconds, `None` for an unrecognized unit.
pub fn unit_seconds(unit: &str) -> Option<f64> {
    let unit = unit.trim().to_ascii_lowercase();
    let seconds = if unit.starts_with("sec") || unit == "s" {
        1.0
    } else if unit.starts_with("min") {
        60.0
    } else if unit.starts_with('h') {
        3600.0
    } else if unit.starts_with('d') {
        86_400.0
    } else if unit.starts_with('y') {
        365.0 * 86_400.0
    } else if unit == "ms" || unit.starts_with("milli") {
        1e-3
    } else if unit == "us" || unit.starts_with("micro") {
        1e-6
    } else {
        return None;
    };
    Some(seconds)
}

/// A time stamp of recorded results.
///
/// Stamps are totally ordered and render with the shortest representation that
/// round-trips (`0.0`, `8.1`), which is also their key in results files.
#[derive(Debug, Clone, Copy)]
pub struct Stamp(pub f64);

impl Stamp {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for Stamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Stamp {}

impl PartialOrd for Stamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Stamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl FromStr for Stamp {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Stamp)
    }
}

impl From<f64> for Stamp {
    fn from(v: f64) -> Self {
        Stamp(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units() {
        assert_eq!(unit_seconds("second"), Some(1.0));
        assert_eq!(unit_seconds("min"), Some(60.0));
        assert_eq!(unit_seconds("hours"), Some(3600.0));
        assert_eq!(unit_seconds("ms"), Some(1e-3));
        assert_eq!(unit_seconds("microseconds"), Some(1e-6));
    }

    #[test]
    fn unknown_units_are_not_guessed() {
        assert_eq!(unit_seconds("fortnight"), None);
        assert_eq!(unit_seconds(""), None);
        assert_eq!(TimeScale::from_unit("fortnight"), TimeScale::from_unit("sec"));
    }

    #[test]
    fn ticks_round_trip_decimal_steps() {
        let scale = TimeScale::from_unit("sec");
        assert_eq!(scale.factor(), 1e9);
        assert_eq!(scale.to_ticks(0.1), 100_000_000);
        let t = (0..81).fold(0i64, |t, _| t + scale.to_ticks(0.1));
        assert_eq!(scale.to_time(t), 8.1);
        assert_eq!(TimeScale::from_unit("min").to_ticks(1.5), 90_000_000_000);
    }

    #[test]
    fn stamps_order_and_render() {
        let mut stamps = vec![Stamp(8.1), Stamp(0.0), Stamp(1.5)];
        stamps.sort();
        assert_eq!(stamps, vec![Stamp(0.0), Stamp(1.5), Stamp(8.1)]);
        assert_eq!(Stamp(0.0).to_string(), "0.0");
        assert_eq!(Stamp(8.1).to_string(), "8.1");
        assert_eq!("8.1".parse::<Stamp>().unwrap(), Stamp(8.1));
    }
}
