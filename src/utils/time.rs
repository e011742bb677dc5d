use chrono::{DateTime, Utc, Weekday};
use chrono_tz::Tz;

/// Scheduler tick quantization in seconds. Sub-hour so the hour-index re-arm
/// guard in the announcer still distinguishes periods within one hour.
pub const TICK_PERIOD_SECS: i64 = 600;

/// Quantize an instant down to the start of its scheduler period
pub fn quantize_period(now: DateTime<Utc>) -> i64 {
    let secs = now.timestamp();
    secs.div_euclid(TICK_PERIOD_SECS) * TICK_PERIOD_SECS
}

/// Index of the hour containing a period-quantized unix timestamp
pub fn hour_index(period: i64) -> i64 {
    period.div_euclid(3600)
}

/// Local hour of day and weekday for a unix timestamp in the given timezone;
/// None only for timestamps outside chrono's representable range
pub fn local_hour_weekday(period: i64, tz: Tz) -> Option<(u32, Weekday)> {
    use chrono::{Datelike, Timelike};
    let local = DateTime::from_timestamp(period, 0)?.with_timezone(&tz);
    Some((local.hour(), local.weekday()))
}

/// Day number since the epoch for an instant, used for preamble rotation
pub fn epoch_day(instant: DateTime<Utc>) -> i64 {
    instant.timestamp().div_euclid(86_400)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;

    #[test]
    fn quantize_rounds_down_to_period_start() {
        let now = Utc.timestamp_opt(1_234, 0).unwrap();
        assert_eq!(quantize_period(now), 600);
        let now = Utc.timestamp_opt(599, 0).unwrap();
        assert_eq!(quantize_period(now), 0);
    }

    #[test]
    fn quantize_handles_pre_epoch_instants() {
        let now = Utc.timestamp_opt(-1, 0).unwrap();
        assert_eq!(quantize_period(now), -600);
    }

    #[test]
    fn hour_index_advances_once_per_hour() {
        assert_eq!(hour_index(0), 0);
        assert_eq!(hour_index(3599), 0);
        assert_eq!(hour_index(3600), 1);
    }

    #[test]
    fn local_hour_respects_timezone() {
        let tz: Tz = "Europe/Helsinki".parse().unwrap();
        // 2024-01-15 06:00 UTC is 08:00 in Helsinki (EET)
        let period = Utc
            .with_ymd_and_hms(2024, 1, 15, 6, 0, 0)
            .unwrap()
            .timestamp();
        let (hour, weekday) = local_hour_weekday(period, tz).unwrap();
        assert_eq!(hour, 8);
        assert_eq!(weekday, Weekday::Mon);
    }

    #[test]
    fn epoch_day_changes_at_midnight() {
        let before = Utc.with_ymd_and_hms(2024, 1, 15, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap();
        assert_eq!(epoch_day(before) + 1, epoch_day(after));
    }
}
