//! Expiry day arithmetic.

use chrono::{DateTime, Utc};

const SECS_PER_DAY: i64 = 86_400;

/// Whole days of validity remaining at `now`.
///
/// Partial days are floored so remaining validity is never over-stated: a
/// certificate with 30.5 days left reports 30, and one that expired half a
/// day ago reports -1, never 0.
///
/// ```
/// use certmon::classify::days_until_expiry;
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// assert_eq!(30, days_until_expiry(now + Duration::days(30), now));
/// assert_eq!(-1, days_until_expiry(now - Duration::hours(12), now));
/// ```
pub fn days_until_expiry(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (not_after - now).num_seconds().div_euclid(SECS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn t_exact_days() {
        assert_eq!(30, days_until_expiry(now() + Duration::days(30), now()));
        assert_eq!(31, days_until_expiry(now() + Duration::days(31), now()));
        assert_eq!(0, days_until_expiry(now(), now()));
    }

    #[test]
    fn t_partial_days_floor() {
        let half_day = Duration::hours(12);
        assert_eq!(
            30,
            days_until_expiry(now() + Duration::days(30) + half_day, now())
        );
        assert_eq!(0, days_until_expiry(now() + half_day, now()));
    }

    #[test]
    fn t_past_is_negative() {
        assert_eq!(-1, days_until_expiry(now() - Duration::hours(12), now()));
        assert_eq!(-5, days_until_expiry(now() - Duration::days(5), now()));
        assert_eq!(
            -6,
            days_until_expiry(now() - Duration::days(5) - Duration::hours(1), now())
        );
    }
}
