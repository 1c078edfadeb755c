use super::Error;
use ahash::HashSet;
use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Returns the workdays (Monday to Friday) of the given month in chronological order.
/// Holidays outside of the month are ignored.
///
/// # Errors
/// - If the month is not within `1..=12`.
/// - If the year cannot be represented.
pub fn workdays_in_month(
    year: i32,
    month: u32,
    holidays: &HashSet<NaiveDate>,
) -> Result<Vec<NaiveDate>, Error> {
    if !(1..=12).contains(&month) {
        return Err(Error::InvalidMonth(month));
    }

    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(Error::InvalidYear(year))?;

    let days = first
        .iter_days()
        .take_while(|day| day.month() == month)
        .filter(|day| is_weekday(*day) && !holidays.contains(day))
        .collect();

    Ok(days)
}

/// Returns the number of Monday to Friday days of the given month, ignoring holidays.
///
/// # Errors
/// - If the month is not within `1..=12`.
/// - If the year cannot be represented.
pub fn weekdays_in_month(year: i32, month: u32) -> Result<usize, Error> {
    workdays_in_month(year, month, &HashSet::default()).map(|days| days.len())
}

/// Returns the last day of the given month.
#[must_use]
pub fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let month = first.month();
    let mut day = first;
    while let Some(next) = day.checked_add_days(Days::new(1)) {
        if next.month() != month {
            break;
        }
        day = next;
    }
    day
}

const fn is_weekday_of(weekday: Weekday) -> bool {
    !matches!(weekday, Weekday::Sat | Weekday::Sun)
}

fn is_weekday(day: NaiveDate) -> bool {
    is_weekday_of(day.weekday())
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
    }

    #[test]
    fn january_2023_without_holidays() -> anyhow::Result<()> {
        let days = workdays_in_month(2023, 1, &HashSet::default())?;
        assert_eq!(days.len(), 22);
        assert_eq!(days.first(), Some(&date(2023, 1, 2)));
        assert_eq!(days.last(), Some(&date(2023, 1, 31)));
        Ok(())
    }

    #[test]
    fn holidays_are_excluded() -> anyhow::Result<()> {
        let holidays = [date(2023, 1, 2), date(2023, 1, 16)].into_iter().collect();
        let days = workdays_in_month(2023, 1, &holidays)?;

        assert_eq!(days.len(), 20);
        assert_eq!(days.first(), Some(&date(2023, 1, 3)));
        assert!(!days.contains(&date(2023, 1, 16)));
        Ok(())
    }

    #[test]
    fn weekend_and_foreign_holidays_do_not_count() -> anyhow::Result<()> {
        let holidays = [date(2023, 1, 7), date(2023, 2, 1), date(2022, 12, 26)]
            .into_iter()
            .collect();
        let days = workdays_in_month(2023, 1, &holidays)?;
        assert_eq!(days.len(), weekdays_in_month(2023, 1)?);
        Ok(())
    }

    #[test]
    fn every_workday_is_a_weekday_in_month() -> anyhow::Result<()> {
        let holidays: HashSet<_> = [date(2024, 2, 19), date(2024, 2, 24)].into_iter().collect();

        for month in 1..=12 {
            let days = workdays_in_month(2024, month, &holidays)?;
            let weekend_or_foreign = holidays
                .iter()
                .filter(|day| day.month() != month || !is_weekday(**day))
                .count();
            let expected = weekdays_in_month(2024, month)? - (holidays.len() - weekend_or_foreign);

            assert_eq!(days.len(), expected, "month {month}");
            assert!(days.windows(2).all(|pair| pair[0] < pair[1]));
            for day in days {
                assert_eq!(day.month(), month);
                assert!(is_weekday(day));
                assert!(!holidays.contains(&day));
            }
        }
        Ok(())
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert_eq!(
            workdays_in_month(2023, 0, &HashSet::default()),
            Err(Error::InvalidMonth(0))
        );
        assert_eq!(
            workdays_in_month(2023, 13, &HashSet::default()),
            Err(Error::InvalidMonth(13))
        );
        assert_eq!(
            workdays_in_month(i32::MAX, 1, &HashSet::default()),
            Err(Error::InvalidYear(i32::MAX))
        );
    }

    #[test]
    fn last_day_handles_leap_years() {
        assert_eq!(last_day_of_month(date(2024, 2, 1)), date(2024, 2, 29));
        assert_eq!(last_day_of_month(date(2023, 2, 1)), date(2023, 2, 28));
        assert_eq!(last_day_of_month(date(2023, 12, 1)), date(2023, 12, 31));
    }
}
