//! Watering date arithmetic.
//!
//! Due dates are computed on the calendar of the timestamp's own time zone:
//! whole days are added to the local date and the local time of day is kept,
//! so results stay correct across month, year and daylight-saving boundaries.

use chrono::{DateTime, Days, Duration, NaiveDateTime, Offset, TimeZone, Utc};
use std::num::NonZeroU32;

/// Returns `last_watered_at` plus `interval_days` calendar days.
///
/// A local time that occurs twice (clocks going back) resolves to the earlier
/// instant. A local time that does not exist (clocks going forward) is read
/// with the offset in effect before the transition, which lands just past the
/// gap. Results beyond the representable range saturate.
pub fn compute_next_due<Tz: TimeZone>(
    last_watered_at: &DateTime<Tz>,
    interval_days: NonZeroU32,
) -> DateTime<Tz> {
    let tz = last_watered_at.timezone();
    let target = match last_watered_at
        .naive_local()
        .checked_add_days(Days::new(u64::from(interval_days.get())))
    {
        Some(target) => target,
        None => return DateTime::<Utc>::MAX_UTC.with_timezone(&tz),
    };

    match tz.from_local_datetime(&target).earliest() {
        Some(due) => due,
        None => resolve_gap(&tz, target)
            .unwrap_or_else(|| DateTime::<Utc>::MAX_UTC.with_timezone(&tz)),
    }
}

/// Calendar days from `now` until `next_due` in their local time zone;
/// negative when overdue.
pub fn days_until_due<Tz: TimeZone>(next_due: &DateTime<Tz>, now: &DateTime<Tz>) -> i64 {
    (next_due.date_naive() - now.date_naive()).num_days()
}

fn resolve_gap<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    let before = tz
        .from_local_datetime(&local.checked_sub_signed(Duration::hours(24))?)
        .earliest()?;
    let offset_secs = before.offset().fix().local_minus_utc();
    let utc = local.checked_sub_signed(Duration::seconds(i64::from(offset_secs)))?;
    Some(tz.from_utc_datetime(&utc))
}
