use std::fmt::{Display, Formatter};

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone};

/// Calendar period over which an accumulator sums up the energy.
#[derive(Debug, Hash, clap::ValueEnum, enumset::EnumSetType)]
pub enum Period {
    /// Resets at local midnight.
    Daily,

    /// Resets at local midnight on Monday.
    Weekly,

    /// Resets at local midnight on the first day of the month.
    Monthly,
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

impl Period {
    /// Boundary instant that opened the period containing `now`.
    pub fn start_of<Tz: TimeZone>(self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let date = now.date_naive();
        let date = match self {
            Self::Daily => date,
            Self::Weekly => {
                date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))?
            }
            Self::Monthly => date.with_day(1)?,
        };
        start_of_day(date, &now.timezone())
    }
}

/// Local midnight, or the first whole hour that exists when the midnight falls into a DST gap.
fn start_of_day<Tz: TimeZone>(date: NaiveDate, timezone: &Tz) -> Option<DateTime<Tz>> {
    (0..3).find_map(|hour| date.and_hms_opt(hour, 0, 0)?.and_local_timezone(timezone.clone()).earliest())
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, MappedLocalTime, NaiveDateTime, Utc};

    use super::*;

    #[test]
    fn test_daily_start() {
        let now = Utc.with_ymd_and_hms(2025, 3, 12, 17, 45, 3).unwrap();
        assert_eq!(
            Period::Daily.start_of(&now),
            Some(Utc.with_ymd_and_hms(2025, 3, 12, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_weekly_start() {
        // Wednesday:
        let now = Utc.with_ymd_and_hms(2025, 3, 12, 17, 45, 3).unwrap();
        assert_eq!(
            Period::Weekly.start_of(&now),
            Some(Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap())
        );

        // Monday itself:
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(Period::Weekly.start_of(&now), Some(now));
    }

    #[test]
    fn test_weekly_start_across_months() {
        // Sunday:
        let now = Utc.with_ymd_and_hms(2025, 3, 2, 8, 0, 0).unwrap();
        assert_eq!(
            Period::Weekly.start_of(&now),
            Some(Utc.with_ymd_and_hms(2025, 2, 24, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_monthly_start() {
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 23, 59, 59).unwrap();
        assert_eq!(
            Period::Monthly.start_of(&now),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_start_respects_time_zone() {
        let amsterdam = FixedOffset::east_opt(3600).unwrap();
        // 23:30 UTC is already the next day in Amsterdam:
        let now = Utc.with_ymd_and_hms(2025, 3, 12, 23, 30, 0).unwrap().with_timezone(&amsterdam);
        assert_eq!(
            Period::Daily.start_of(&now),
            Some(amsterdam.with_ymd_and_hms(2025, 3, 13, 0, 0, 0).unwrap())
        );
    }

    /// Clocks jump from 00:00 straight to 01:00 on September 7, 2025.
    #[derive(Copy, Clone, Debug)]
    struct SpringForwardAtMidnight;

    impl SpringForwardAtMidnight {
        const WINTER: FixedOffset = FixedOffset::west_opt(4 * 3600).unwrap();
        const SUMMER: FixedOffset = FixedOffset::west_opt(3 * 3600).unwrap();

        fn local_switch() -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2025, 9, 7).unwrap().and_hms_opt(0, 0, 0).unwrap()
        }
    }

    impl TimeZone for SpringForwardAtMidnight {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            Self
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> MappedLocalTime<FixedOffset> {
            self.offset_from_local_datetime(&local.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> MappedLocalTime<FixedOffset> {
            let switch = Self::local_switch();
            if *local < switch {
                MappedLocalTime::Single(Self::WINTER)
            } else if *local < switch + chrono::TimeDelta::hours(1) {
                MappedLocalTime::None
            } else {
                MappedLocalTime::Single(Self::SUMMER)
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::local_switch() + chrono::TimeDelta::hours(4) { Self::WINTER } else { Self::SUMMER }
        }
    }

    #[test]
    fn test_start_in_dst_gap_at_midnight() {
        let timezone = SpringForwardAtMidnight;
        let now = timezone.with_ymd_and_hms(2025, 9, 7, 12, 0, 0).unwrap();
        let start = Period::Daily.start_of(&now).unwrap();
        assert_eq!(start, timezone.with_ymd_and_hms(2025, 9, 7, 1, 0, 0).unwrap());
        assert_eq!(start.naive_utc(), SpringForwardAtMidnight::local_switch() + chrono::TimeDelta::hours(4));

        // The following days start at midnight again:
        let now = timezone.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap();
        assert_eq!(
            Period::Weekly.start_of(&now),
            Some(timezone.with_ymd_and_hms(2025, 9, 8, 0, 0, 0).unwrap())
        );
    }
}
