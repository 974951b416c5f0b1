//! Daily activity log and study streak

use chrono::{Duration, NaiveDate};

use crate::storage::LearningData;

/// Record one unit of activity on `today`
///
/// The daily log only ever grows. The streak moves once per calendar day: it continues
/// when the last study date was yesterday, restarts at 1 after a gap, and is left alone
/// when today was already logged.
pub fn record_activity(data: &mut LearningData, today: NaiveDate) {
    *data.daily_log.entry(today).or_insert(0) += 1;

    match data.last_study_date {
        Some(last) if last == today => {}
        Some(last) if last == today - Duration::days(1) => {
            data.streak += 1;
            data.last_study_date = Some(today);
        }
        _ => {
            data.streak = 1;
            data.last_study_date = Some(today);
        }
    }
}

/// Longest run of consecutive days in the activity log
pub fn longest_streak(data: &LearningData) -> u32 {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;

    // BTreeMap keys iterate in date order
    for (date, count) in &data.daily_log {
        if *count == 0 {
            continue;
        }
        current = match previous {
            Some(prev) if *date - prev == Duration::days(1) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(*date);
    }

    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    #[test]
    fn test_first_activity_starts_streak() {
        let mut data = LearningData::default();
        record_activity(&mut data, day(1));

        assert_eq!(data.streak, 1);
        assert_eq!(data.last_study_date, Some(day(1)));
        assert_eq!(data.daily_log.get(&day(1)), Some(&1));
    }

    #[test]
    fn test_same_day_leaves_streak() {
        let mut data = LearningData::default();
        record_activity(&mut data, day(1));
        record_activity(&mut data, day(2));
        record_activity(&mut data, day(2));
        record_activity(&mut data, day(2));

        assert_eq!(data.streak, 2);
        assert_eq!(data.daily_log.get(&day(2)), Some(&3));
    }

    #[test]
    fn test_gap_resets_streak() {
        let mut data = LearningData::default();
        record_activity(&mut data, day(1));
        record_activity(&mut data, day(2));
        record_activity(&mut data, day(3));
        assert_eq!(data.streak, 3);

        record_activity(&mut data, day(5));
        assert_eq!(data.streak, 1);
        assert_eq!(data.last_study_date, Some(day(5)));
    }

    #[test]
    fn test_legacy_streak_without_date_restarts() {
        let mut data = LearningData {
            streak: 9,
            ..Default::default()
        };
        record_activity(&mut data, day(10));
        assert_eq!(data.streak, 1);
    }

    #[test]
    fn test_longest_streak() {
        let mut data = LearningData::default();
        for d in [1, 2, 3, 5, 6, 9] {
            record_activity(&mut data, day(d));
        }
        assert_eq!(longest_streak(&data), 3);
        assert_eq!(longest_streak(&LearningData::default()), 0);
    }
}
