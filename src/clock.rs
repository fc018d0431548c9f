//! Day-fraction time conversions.
//!
//! The host exchanges timestamps as floating-point days since 1899-12-30
//! UTC. The Unix epoch sits 25569 days after that origin.

use chrono::Utc;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Days between the host epoch (1899-12-30) and the Unix epoch.
pub const UNIX_EPOCH_DAYS: f64 = 25_569.0;

/// Convert Unix seconds to the host's day-fraction convention.
pub fn unix_to_day_fraction(unix_secs: i64) -> f64 {
    unix_secs as f64 / SECONDS_PER_DAY + UNIX_EPOCH_DAYS
}

/// Convert a day-fraction timestamp to Unix seconds (truncating).
pub fn day_fraction_to_unix(day_fraction: f64) -> i64 {
    ((day_fraction - UNIX_EPOCH_DAYS) * SECONDS_PER_DAY) as i64
}

/// Current UTC time as a day fraction.
pub fn now_day_fraction() -> f64 {
    unix_to_day_fraction(Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_maps_to_offset() {
        assert_eq!(unix_to_day_fraction(0), UNIX_EPOCH_DAYS);
    }

    #[test]
    fn one_day_later() {
        assert_eq!(unix_to_day_fraction(86_400), UNIX_EPOCH_DAYS + 1.0);
    }

    #[test]
    fn round_trip() {
        let unix = 1_700_000_000;
        let d = unix_to_day_fraction(unix);
        assert_eq!(day_fraction_to_unix(d), unix);
    }

    #[test]
    fn fraction_of_day() {
        // 06:00 UTC on the Unix epoch day.
        let d = unix_to_day_fraction(6 * 3600);
        assert!((d - (UNIX_EPOCH_DAYS + 0.25)).abs() < 1e-9);
    }

    #[test]
    fn now_is_after_2020() {
        // 2020-01-01 is 43831 days after the host epoch.
        assert!(now_day_fraction() > 43_831.0);
    }
}
