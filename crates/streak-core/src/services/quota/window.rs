//! Period window resolution
//!
//! Maps a period kind and a local reference instant to the calendar window
//! that contains it. All boundaries are computed on the reference's own wall
//! clock; `end` is always the start of the next unit minus one millisecond.
//!
//! | kind      | start                              | length        |
//! |-----------|------------------------------------|---------------|
//! | day       | reference date, 00:00              | 1 day         |
//! | week      | Monday on or before the reference  | 7 days        |
//! | fortnight | see [`fortnight_start`]            | 14 days       |
//! | month     | 1st of the month                   | to next 1st   |
//! | year      | January 1st                        | to next Jan 1 |

use chrono::{Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};

use super::types::{PeriodKind, PeriodWindow};

/// Resolve the window of `kind` containing `reference`
pub fn resolve(kind: PeriodKind, reference: NaiveDateTime) -> PeriodWindow {
    let date = reference.date();

    let (first_day, next_first_day) = match kind {
        PeriodKind::Day => (date, date.succ_opt()),
        PeriodKind::Week => after_days(week_start(date), 7),
        PeriodKind::Fortnight => after_days(fortnight_start(date), 14),
        PeriodKind::Month => {
            let first = date - Duration::days(i64::from(date.day0()));
            (first, first.checked_add_months(Months::new(1)))
        }
        PeriodKind::Year => (
            date - Duration::days(i64::from(date.ordinal0())),
            NaiveDate::from_ymd_opt(date.year() + 1, 1, 1),
        ),
    };

    span(first_day, next_first_day)
}

/// Monday on or before `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(days_since_monday(date))
}

/// First day of the fortnight containing `date`
///
/// Weeks are numbered inside the month by
/// `floor((day_of_month - days_since_monday - 1) / 7)`. Weeks 0 and 1 form
/// the first block, weeks 2 and 3 the second, and the window starts at the
/// Monday of the block's first week. A partial leading week (index -1) and a
/// fifth Monday week (index 4) are anchored at their own Monday instead, so
/// the window always contains `date`.
///
/// These windows are not fixed 14-day ticks: around month boundaries two
/// consecutive fortnights may overlap by a week.
pub fn fortnight_start(date: NaiveDate) -> NaiveDate {
    let since_monday = days_since_monday(date);
    let week_index = (i64::from(date.day()) - since_monday - 1).div_euclid(7);
    let block_start = if week_index < 2 { 0 } else { 2 };

    let weeks_into_block = match week_index - block_start {
        offset @ 0..=1 => offset,
        _ => 0,
    };

    week_start(date) - Duration::weeks(weeks_into_block)
}

fn after_days(first_day: NaiveDate, days: u64) -> (NaiveDate, Option<NaiveDate>) {
    (first_day, first_day.checked_add_days(Days::new(days)))
}

/// `next_first_day` is `None` only past chrono's last representable date.
fn span(first_day: NaiveDate, next_first_day: Option<NaiveDate>) -> PeriodWindow {
    let start = first_day.and_time(NaiveTime::default());
    let end = next_first_day
        .map(|next| next.and_time(NaiveTime::default()) - Duration::milliseconds(1))
        .unwrap_or(NaiveDateTime::MAX);
    PeriodWindow { start, end }
}

// Sunday-based weekday shifted so Monday is 0: (weekday + 6) % 7
fn days_since_monday(date: NaiveDate) -> i64 {
    i64::from(date.weekday().num_days_from_monday())
}
