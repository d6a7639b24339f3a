//! Conversions between timestamps and calendar time.
use chrono::{DateTime, Utc};
use reef_tracker_primitives::DurationSinceUnixEpoch;

/// Converts a timestamp to a UTC calendar time, for example for log lines
/// and token expiry messages.
///
/// # Panics
///
/// Will panic when the timestamp overflows the internal `i64` type, which
/// happens naturally in about 292.5 billion years.
#[must_use]
pub fn convert_from_timestamp_to_datetime_utc(duration: DurationSinceUnixEpoch) -> DateTime<Utc> {
    DateTime::from_timestamp(
        i64::try_from(duration.as_secs()).expect("timestamp seconds fit in an i64"),
        duration.subsec_nanos(),
    )
    .expect("timestamp is in the representable range")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::convert_from_timestamp_to_datetime_utc;

    #[test]
    fn the_unix_epoch_should_map_to_the_start_of_1970() {
        let datetime = convert_from_timestamp_to_datetime_utc(Duration::ZERO);

        assert_eq!(datetime.to_string(), "1970-01-01 00:00:00 UTC");
    }

    #[test]
    fn sub_second_precision_should_be_kept() {
        let datetime = convert_from_timestamp_to_datetime_utc(Duration::new(1, 500_000_000));

        assert_eq!(datetime.timestamp_subsec_millis(), 500);
    }
}
