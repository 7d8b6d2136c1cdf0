use anyhow::Context;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use std::collections::HashSet;

const PST_OFFSET_SECS: i32 = -8 * 3600;
const PDT_OFFSET_SECS: i32 = -7 * 3600;

// US close is 13:00 PT. Runs before this are dated to the previous session.
const CLOSE_CUTOFF_HOUR_PT: u32 = 13;
const CLOSE_CUTOFF_MINUTE_PT: u32 = 0;

pub fn resolve_report_date(
    report_date_arg: Option<&str>,
    now_utc: DateTime<Utc>,
) -> anyhow::Result<NaiveDate> {
    let holidays = configured_holidays();
    resolve_with_holidays(report_date_arg, now_utc, &holidays)
}

fn resolve_with_holidays(
    report_date_arg: Option<&str>,
    now_utc: DateTime<Utc>,
    holidays: &HashSet<NaiveDate>,
) -> anyhow::Result<NaiveDate> {
    if let Some(s) = report_date_arg {
        return NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid report date {s:?}; expected YYYY-MM-DD"));
    }

    let offset = pacific_offset(now_utc).context("invalid Pacific offset")?;
    let now_pt = now_utc.with_timezone(&offset);

    let cutoff_reached =
        (now_pt.hour(), now_pt.minute()) >= (CLOSE_CUTOFF_HOUR_PT, CLOSE_CUTOFF_MINUTE_PT);
    let mut date = now_pt.date_naive();
    if !cutoff_reached {
        date -= Duration::days(1);
    }

    while is_weekend(date) || holidays.contains(&date) {
        date -= Duration::days(1);
    }

    Ok(date)
}

/// Calendar date in US Pacific time at `now_utc`. Unlike the report date, this never
/// rolls back for the close cutoff, weekends or holidays.
pub fn pacific_today(now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let offset = pacific_offset(now_utc).context("invalid Pacific offset")?;
    Ok(now_utc.with_timezone(&offset).date_naive())
}

/// US Pacific offset at `now_utc`. DST runs from 02:00 local on the second Sunday of
/// March to 02:00 local on the first Sunday of November.
pub fn pacific_offset(now_utc: DateTime<Utc>) -> Option<FixedOffset> {
    let year = now_utc.year();
    let start = nth_sunday(year, 3, 2)?.and_hms_opt(10, 0, 0)?;
    let end = nth_sunday(year, 11, 1)?.and_hms_opt(9, 0, 0)?;

    let start = Utc.from_utc_datetime(&start);
    let end = Utc.from_utc_datetime(&end);

    let secs = if now_utc >= start && now_utc < end {
        PDT_OFFSET_SECS
    } else {
        PST_OFFSET_SECS
    };
    FixedOffset::east_opt(secs)
}

fn nth_sunday(year: i32, month: u32, n: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let to_sunday = (7 - first.weekday().num_days_from_sunday()) % 7;
    NaiveDate::from_ymd_opt(year, month, 1 + to_sunday + 7 * (n - 1))
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn configured_holidays() -> HashSet<NaiveDate> {
    let mut out = fixed_holidays(2024..=2032);
    if let Ok(s) = std::env::var("US_MARKET_HOLIDAYS") {
        out.extend(parse_holidays(&s));
    }
    out
}

// Fixed-date closures only. Floating holidays come from US_MARKET_HOLIDAYS.
fn fixed_holidays(years: std::ops::RangeInclusive<i32>) -> HashSet<NaiveDate> {
    years
        .flat_map(|y| [(y, 1, 1), (y, 7, 4), (y, 12, 25)])
        .filter_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
        .collect()
}

fn parse_holidays(s: &str) -> Vec<NaiveDate> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match NaiveDate::parse_from_str(part, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(err) => {
                tracing::warn!(value = part, error = %err, "ignoring malformed US_MARKET_HOLIDAYS entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolve(now: DateTime<Utc>) -> NaiveDate {
        resolve_with_holidays(None, now, &fixed_holidays(2026..=2026)).unwrap()
    }

    #[test]
    fn dst_switches_on_us_rule_boundaries() {
        let before = Utc.with_ymd_and_hms(2026, 3, 8, 9, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 3, 8, 10, 0, 0).unwrap();
        assert_eq!(pacific_offset(before).unwrap().local_minus_utc(), PST_OFFSET_SECS);
        assert_eq!(pacific_offset(after).unwrap().local_minus_utc(), PDT_OFFSET_SECS);

        let fall = Utc.with_ymd_and_hms(2026, 11, 1, 9, 0, 0).unwrap();
        assert_eq!(pacific_offset(fall).unwrap().local_minus_utc(), PST_OFFSET_SECS);
    }

    #[test]
    fn uses_same_day_after_cutoff_in_summer() {
        // 21:00 UTC = 14:00 PDT.
        let now = Utc.with_ymd_and_hms(2026, 7, 15, 21, 0, 0).unwrap();
        assert_eq!(resolve(now), date(2026, 7, 15));
    }

    #[test]
    fn uses_previous_day_before_cutoff() {
        // 19:00 UTC = 12:00 PDT.
        let now = Utc.with_ymd_and_hms(2026, 7, 15, 19, 0, 0).unwrap();
        assert_eq!(resolve(now), date(2026, 7, 14));
    }

    #[test]
    fn winter_uses_standard_time() {
        // 20:30 UTC = 12:30 PST; would be past the cutoff under PDT.
        let now = Utc.with_ymd_and_hms(2026, 1, 14, 20, 30, 0).unwrap();
        assert_eq!(resolve(now), date(2026, 1, 13));
    }

    #[test]
    fn rolls_back_over_weekend_and_holiday() {
        // Sunday afternoon rolls back to Friday.
        let sunday = Utc.with_ymd_and_hms(2026, 1, 18, 23, 0, 0).unwrap();
        assert_eq!(resolve(sunday), date(2026, 1, 16));

        // Saturday 2026-12-26 -> Friday is Christmas -> Thursday.
        let saturday = Utc.with_ymd_and_hms(2026, 12, 26, 22, 0, 0).unwrap();
        assert_eq!(resolve(saturday), date(2026, 12, 24));
    }

    #[test]
    fn pacific_today_ignores_cutoff_and_rollback() {
        // 17:00 UTC = 10:00 PDT on Tuesday: report date is Monday, today is Tuesday.
        let morning = Utc.with_ymd_and_hms(2026, 3, 10, 17, 0, 0).unwrap();
        assert_eq!(resolve(morning), date(2026, 3, 9));
        assert_eq!(pacific_today(morning).unwrap(), date(2026, 3, 10));

        // Sunday stays Sunday.
        let sunday = Utc.with_ymd_and_hms(2026, 1, 18, 23, 0, 0).unwrap();
        assert_eq!(pacific_today(sunday).unwrap(), date(2026, 1, 18));

        // 05:00 UTC Jan 1 is still New Year's Eve in Pacific time.
        let late = Utc.with_ymd_and_hms(2027, 1, 1, 5, 0, 0).unwrap();
        assert_eq!(pacific_today(late).unwrap(), date(2026, 12, 31));
    }

    #[test]
    fn explicit_date_overrides_clock() {
        let now = Utc.with_ymd_and_hms(2026, 1, 18, 23, 0, 0).unwrap();
        let d = resolve_with_holidays(Some("2026-01-10"), now, &HashSet::new()).unwrap();
        assert_eq!(d, date(2026, 1, 10));
        assert!(resolve_with_holidays(Some("01/10/2026"), now, &HashSet::new()).is_err());
    }

    #[test]
    fn holiday_list_skips_malformed_entries() {
        let parsed = parse_holidays("2026-05-25, nope ,,2026-09-07");
        assert_eq!(parsed, vec![date(2026, 5, 25), date(2026, 9, 7)]);
    }
}
