use chrono::{Datelike, Days, NaiveDate, NaiveTime, Weekday};

/// Date format used for expirations on the wire (eg/ "2026-03-20").
pub const EXPIRATION_FORMAT: &str = "%Y-%m-%d";

/// Next Friday strictly after `today`. A Friday maps to the following week.
pub fn next_friday(today: NaiveDate) -> NaiveDate {
    let days_from_monday = today.weekday().num_days_from_monday();
    let friday = Weekday::Fri.num_days_from_monday();
    let ahead = match (friday + 7 - days_from_monday) % 7 {
        0 => 7,
        days => days,
    };
    today + Days::new(u64::from(ahead))
}

/// `count` consecutive weekly Friday expirations, starting at [`next_friday`].
pub fn upcoming_expirations(today: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let first = next_friday(today);
    (0..count as u64)
        .filter_map(|week| first.checked_add_days(Days::new(week * 7)))
        .collect()
}

pub fn format_expiration(date: NaiveDate) -> String {
    date.format(EXPIRATION_FORMAT).to_string()
}

/// Unix timestamp (seconds) of UTC midnight on `expiration`, when it parses as a date.
pub fn expiration_timestamp(expiration: &str) -> Option<i64> {
    NaiveDate::parse_from_str(expiration.trim(), EXPIRATION_FORMAT)
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, EXPIRATION_FORMAT).unwrap()
    }

    #[test]
    fn test_next_friday() {
        struct TestCase {
            input: &'static str,
            expected: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0: Monday
                input: "2026-03-16",
                expected: "2026-03-20",
            },
            TestCase {
                // TC1: Thursday
                input: "2026-03-19",
                expected: "2026-03-20",
            },
            TestCase {
                // TC2: Friday rolls to next week
                input: "2026-03-20",
                expected: "2026-03-27",
            },
            TestCase {
                // TC3: Saturday
                input: "2026-03-21",
                expected: "2026-03-27",
            },
            TestCase {
                // TC4: across a year boundary
                input: "2026-12-31",
                expected: "2027-01-01",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = next_friday(date(test.input));
            assert_eq!(actual, date(test.expected), "TC{} failed", index);
        }
    }

    #[test]
    fn test_upcoming_expirations() {
        let expirations = upcoming_expirations(date("2026-10-16"), 8);
        assert_eq!(expirations.len(), 8);
        assert_eq!(format_expiration(expirations[0]), "2026-10-23");
        assert_eq!(format_expiration(expirations[7]), "2026-12-11");
        assert!(expirations.iter().all(|d| d.weekday() == Weekday::Fri));
        assert!(upcoming_expirations(date("2026-10-16"), 0).is_empty());
    }

    #[test]
    fn test_expiration_timestamp() {
        assert_eq!(expiration_timestamp("2026-03-20"), Some(1_773_964_800));
        assert_eq!(expiration_timestamp(" 1970-01-01 "), Some(0));
        assert_eq!(expiration_timestamp("next friday"), None);
    }
}
