//! Expression parsing and evaluation.
//!
//! Evaluates compact relative-time expressions (`now`, `now-5m`, `now-1d/d`,
//! `now/w`) and absolute datetime literals against an explicit anchor. All
//! functions take the anchor as a parameter (no system clock access) — the
//! caller provides "now", keeping evaluation pure, deterministic, and
//! testable.
//!
//! # Grammar
//!
//! ```text
//! now
//! now[+-]<uint><unit>
//! now[+-]<uint><unit>/<unit>
//! now/<unit>
//! <absolute literal, "YYYY-MM-DD HH:mm:ss">
//! ```
//!
//! Units are case-sensitive: `s` seconds, `m` minutes, `h` hours, `d` days,
//! `w` weeks, `M` months, `y` years. Lowercase `m` and uppercase `M` are
//! different units and are never normalized.
//!
//! # Timezone handling
//!
//! Calendar-bucket boundaries (day/week/month/year starts) and day-level
//! offsets are computed in the caller-supplied [`chrono_tz::Tz`], defaulting
//! to UTC. This is what makes `/d` land on the correct local midnight on
//! DST-transition days.

use chrono::{
    DateTime, Datelike, Days, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, TimeZone,
    Timelike, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Display pattern for absolute datetime literals, used both for parsing
/// literal text and for rendering instants back to text.
pub const ABSOLUTE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Data model ──────────────────────────────────────────────────────────────

/// A from/to pair kept as original expression text, so relative intent
/// (e.g. `now-6h` rather than a frozen instant) survives serialization
/// and reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRange {
    pub from: String,
    pub to: String,
}

impl RawRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        RawRange {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// A [`RawRange`] resolved against a concrete anchor.
///
/// `from <= to` is the caller's invariant to enforce; inverted ranges are
/// not auto-swapped here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// The original expression pair the instants were resolved from.
    pub raw: RawRange,
}

// ── Configurable week start ─────────────────────────────────────────────────

/// Which day begins a week for `/w` bucket rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum WeekStartDay {
    /// ISO 8601 standard (Monday = day 0 of the week).
    #[default]
    Monday,
    /// US/Canada convention (Sunday = day 0 of the week).
    Sunday,
}

/// Options for [`evaluate_with_options`].
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// Which day starts the week for `/w` rounding.
    pub week_start: WeekStartDay,
}

/// How many days `weekday` is from the week-start day.
fn days_from_week_start(weekday: Weekday, week_start: WeekStartDay) -> i64 {
    match week_start {
        WeekStartDay::Monday => weekday.num_days_from_monday() as i64,
        WeekStartDay::Sunday => weekday.num_days_from_sunday() as i64,
    }
}

// ── Units ───────────────────────────────────────────────────────────────────

/// A calendar unit from the expression grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Unit {
    /// Map a unit character to its unit. Case-sensitive: `m` is minutes,
    /// `M` is months.
    pub(crate) fn from_char(c: char) -> Option<Unit> {
        match c {
            's' => Some(Unit::Second),
            'm' => Some(Unit::Minute),
            'h' => Some(Unit::Hour),
            'd' => Some(Unit::Day),
            'w' => Some(Unit::Week),
            'M' => Some(Unit::Month),
            'y' => Some(Unit::Year),
            _ => None,
        }
    }

    pub(crate) fn symbol(self) -> char {
        match self {
            Unit::Second => 's',
            Unit::Minute => 'm',
            Unit::Hour => 'h',
            Unit::Day => 'd',
            Unit::Week => 'w',
            Unit::Month => 'M',
            Unit::Year => 'y',
        }
    }

    /// Singular display noun (e.g. "minute", "month").
    pub(crate) fn noun(self) -> &'static str {
        match self {
            Unit::Second => "second",
            Unit::Minute => "minute",
            Unit::Hour => "hour",
            Unit::Day => "day",
            Unit::Week => "week",
            Unit::Month => "month",
            Unit::Year => "year",
        }
    }
}

// ── evaluate ────────────────────────────────────────────────────────────────

/// Evaluate a time expression against an explicit anchor.
///
/// Uses ISO 8601 week start (Monday) for `/w` rounding. For configurable
/// week start, use [`evaluate_with_options`].
///
/// # Arguments
///
/// * `text` — A relative expression (`now-1d/d`) or absolute literal
///   (`2023-01-02 03:04:05`, see [`ABSOLUTE_FORMAT`])
/// * `now` — The anchor instant every `now`-relative expression resolves
///   against
/// * `round_up` — When `true`, a `/<unit>` suffix snaps to the *last*
///   instant of the bucket (e.g. `/d` → 23:59:59.999) instead of the first
/// * `timezone` — The zone bucket boundaries are computed in; `None` means
///   UTC
///
/// # Leniency
///
/// Malformed text that contains `"now"` resolves to the anchor instead of
/// failing. This mirrors long-standing upstream behavior that callers rely
/// on (a mangled relative expression degrades to "right now" rather than
/// breaking the query window). Use [`is_valid_expression`] to detect such
/// text — validation is strict.
///
/// # Errors
///
/// Returns [`ParseError::InvalidFormat`] when text without a `now`
/// substring fails to parse as an absolute literal.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use rangemath::evaluate;
///
/// let now = Utc.with_ymd_and_hms(2023, 3, 15, 10, 30, 0).unwrap();
/// let yesterday = evaluate("now-1d/d", now, false, None).unwrap();
/// assert_eq!(yesterday, Utc.with_ymd_and_hms(2023, 3, 14, 0, 0, 0).unwrap());
/// ```
pub fn evaluate(
    text: &str,
    now: DateTime<Utc>,
    round_up: bool,
    timezone: Option<Tz>,
) -> Result<DateTime<Utc>, ParseError> {
    evaluate_with_options(text, now, round_up, timezone, &EvalOptions::default())
}

/// Evaluate a time expression with options.
///
/// Identical to [`evaluate`] but lets the caller pick the week-start day
/// used for `/w` rounding.
pub fn evaluate_with_options(
    text: &str,
    now: DateTime<Utc>,
    round_up: bool,
    timezone: Option<Tz>,
    options: &EvalOptions,
) -> Result<DateTime<Utc>, ParseError> {
    let tz = timezone.unwrap_or(Tz::UTC);
    match parse_strict(text, now, round_up, tz, options) {
        Err(_) if text.contains("now") => Ok(now),
        other => other,
    }
}

/// Check whether `text` is a well-formed expression.
///
/// Strict: the leniency of [`evaluate`] does not apply, so
/// `is_valid_expression("now-5x")` is `false` even though `evaluate` would
/// degrade it to the anchor. Never panics.
pub fn is_valid_expression(text: &str) -> bool {
    // Validity must not depend on which anchor is supplied, so a fixed
    // reference instant is sufficient.
    parse_strict(
        text,
        DateTime::UNIX_EPOCH,
        false,
        Tz::UTC,
        &EvalOptions::default(),
    )
    .is_ok()
}

/// Resolve a [`RawRange`] against an anchor.
///
/// `from` is evaluated rounding down and `to` rounding up, so a pair like
/// `now/d .. now/d` spans the whole day rather than a single instant.
///
/// # Errors
///
/// Returns the first [`ParseError`] from either side; the leniency of
/// [`evaluate`] applies to each side independently.
pub fn resolve_range(
    raw: &RawRange,
    now: DateTime<Utc>,
    timezone: Option<Tz>,
) -> Result<ResolvedRange, ParseError> {
    let from = evaluate(&raw.from, now, false, timezone)?;
    let to = evaluate(&raw.to, now, true, timezone)?;
    Ok(ResolvedRange {
        from,
        to,
        raw: raw.clone(),
    })
}

// ── Strict parsing ──────────────────────────────────────────────────────────

fn parse_strict(
    text: &str,
    now: DateTime<Utc>,
    round_up: bool,
    tz: Tz,
    options: &EvalOptions,
) -> Result<DateTime<Utc>, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::InvalidFormat("empty expression".to_string()));
    }
    match text.strip_prefix("now") {
        Some(math) => eval_math(math, now, round_up, tz, options),
        None => parse_absolute(text, tz),
    }
}

/// Evaluate the part after the `now` anchor: an optional signed offset
/// followed by an optional `/<unit>` rounding suffix.
fn eval_math(
    math: &str,
    now: DateTime<Utc>,
    round_up: bool,
    tz: Tz,
    options: &EvalOptions,
) -> Result<DateTime<Utc>, ParseError> {
    let mut result = now;
    let mut rest = math;

    if let Some((sign, tail)) = split_sign(rest) {
        let (magnitude, tail) = take_magnitude(tail)?;
        let (unit, tail) = take_unit(tail)?;
        result = apply_offset(result, sign, magnitude, unit, tz)?;
        rest = tail;
    }

    if let Some(tail) = rest.strip_prefix('/') {
        let (unit, tail) = take_unit(tail)?;
        if !tail.is_empty() {
            return Err(ParseError::InvalidFormat(format!(
                "unexpected trailing text: '{tail}'"
            )));
        }
        return round_to_unit(result, unit, round_up, tz, options.week_start);
    }

    if !rest.is_empty() {
        return Err(ParseError::InvalidFormat(format!(
            "unexpected trailing text: '{rest}'"
        )));
    }
    Ok(result)
}

fn split_sign(s: &str) -> Option<(i64, &str)> {
    if let Some(rest) = s.strip_prefix('+') {
        Some((1, rest))
    } else {
        s.strip_prefix('-').map(|rest| (-1, rest))
    }
}

/// Take the leading digit run as a non-negative magnitude.
fn take_magnitude(s: &str) -> Result<(i64, &str), ParseError> {
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return Err(ParseError::InvalidMagnitude(format!(
            "expected a number in '{s}'"
        )));
    }
    // Input is untrusted; cap the digit run rather than parse arbitrarily
    // long numbers.
    if digits > 10 {
        return Err(ParseError::InvalidMagnitude(format!(
            "number too long in '{s}'"
        )));
    }
    let magnitude = s[..digits]
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidMagnitude(s[..digits].to_string()))?;
    Ok((magnitude, &s[digits..]))
}

fn take_unit(s: &str) -> Result<(Unit, &str), ParseError> {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => {
            let unit = Unit::from_char(c).ok_or(ParseError::InvalidUnit(c))?;
            Ok((unit, chars.as_str()))
        }
        None => Err(ParseError::InvalidFormat("missing unit".to_string())),
    }
}

/// Parse an absolute datetime literal, interpreted as wall-clock time in
/// the supplied zone.
fn parse_absolute(text: &str, tz: Tz) -> Result<DateTime<Utc>, ParseError> {
    let naive = NaiveDateTime::parse_from_str(text, ABSOLUTE_FORMAT)
        .map_err(|e| ParseError::InvalidFormat(format!("'{text}': {e}")))?;
    Ok(resolve_local(tz, naive).with_timezone(&Utc))
}

// ── Calendar arithmetic ─────────────────────────────────────────────────────

/// Apply a signed offset of `magnitude` units to `anchor`.
///
/// Sub-day units are plain duration arithmetic in UTC. Day and week offsets
/// shift the local calendar date so wall-clock time is preserved across DST
/// transitions. Month and year offsets clamp the day of month (Jan 31 minus
/// one month lands on the last valid day of February).
fn apply_offset(
    anchor: DateTime<Utc>,
    sign: i64,
    magnitude: i64,
    unit: Unit,
    tz: Tz,
) -> Result<DateTime<Utc>, ParseError> {
    let out_of_range = || {
        ParseError::InvalidMagnitude(format!("offset out of range: {magnitude}{}", unit.symbol()))
    };

    match unit {
        Unit::Second | Unit::Minute | Unit::Hour => {
            let factor = match unit {
                Unit::Second => 1,
                Unit::Minute => 60,
                _ => 3600,
            };
            let seconds = magnitude
                .checked_mul(factor)
                .and_then(|s| s.checked_mul(sign))
                .ok_or_else(out_of_range)?;
            let delta = Duration::try_seconds(seconds).ok_or_else(out_of_range)?;
            anchor.checked_add_signed(delta).ok_or_else(out_of_range)
        }
        Unit::Day | Unit::Week => {
            let days = if unit == Unit::Week {
                magnitude.checked_mul(7).ok_or_else(out_of_range)?
            } else {
                magnitude
            };
            let days = u64::try_from(days).map_err(|_| out_of_range())?;
            let local = anchor.with_timezone(&tz);
            let date = if sign >= 0 {
                local.date_naive().checked_add_days(Days::new(days))
            } else {
                local.date_naive().checked_sub_days(Days::new(days))
            }
            .ok_or_else(out_of_range)?;
            Ok(resolve_local(tz, date.and_time(local.time())).with_timezone(&Utc))
        }
        Unit::Month | Unit::Year => {
            let months = if unit == Unit::Year {
                magnitude.checked_mul(12).ok_or_else(out_of_range)?
            } else {
                magnitude
            };
            let months = u32::try_from(months).map_err(|_| out_of_range())?;
            let local = anchor.with_timezone(&tz).naive_local();
            let shifted = if sign >= 0 {
                local.checked_add_months(Months::new(months))
            } else {
                local.checked_sub_months(Months::new(months))
            }
            .ok_or_else(out_of_range)?;
            Ok(resolve_local(tz, shifted).with_timezone(&Utc))
        }
    }
}

// ── Bucket rounding ─────────────────────────────────────────────────────────

/// Snap `instant` to the start of its `unit` bucket, or to the last instant
/// of the bucket (one millisecond before the next bucket) when `round_up`.
fn round_to_unit(
    instant: DateTime<Utc>,
    unit: Unit,
    round_up: bool,
    tz: Tz,
    week_start: WeekStartDay,
) -> Result<DateTime<Utc>, ParseError> {
    let out_of_range = || {
        ParseError::InvalidMagnitude(format!(
            "bucket boundary out of range for '/{}'",
            unit.symbol()
        ))
    };
    let local = instant.with_timezone(&tz).naive_local();
    let floor = floor_to_unit(local, unit, week_start).ok_or_else(out_of_range)?;
    let snapped = if round_up {
        next_bucket_start(floor, unit).ok_or_else(out_of_range)? - Duration::milliseconds(1)
    } else {
        floor
    };
    Ok(resolve_local(tz, snapped).with_timezone(&Utc))
}

fn floor_to_unit(
    local: NaiveDateTime,
    unit: Unit,
    week_start: WeekStartDay,
) -> Option<NaiveDateTime> {
    let date = local.date();
    match unit {
        Unit::Second => local.with_nanosecond(0),
        Unit::Minute => date.and_hms_opt(local.hour(), local.minute(), 0),
        Unit::Hour => date.and_hms_opt(local.hour(), 0, 0),
        Unit::Day => date.and_hms_opt(0, 0, 0),
        Unit::Week => {
            let back = days_from_week_start(date.weekday(), week_start);
            date.checked_sub_days(Days::new(back as u64))?
                .and_hms_opt(0, 0, 0)
        }
        Unit::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?.and_hms_opt(0, 0, 0),
        Unit::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)?.and_hms_opt(0, 0, 0),
    }
}

fn next_bucket_start(floor: NaiveDateTime, unit: Unit) -> Option<NaiveDateTime> {
    match unit {
        Unit::Second => floor.checked_add_signed(Duration::seconds(1)),
        Unit::Minute => floor.checked_add_signed(Duration::minutes(1)),
        Unit::Hour => floor.checked_add_signed(Duration::hours(1)),
        Unit::Day => floor
            .date()
            .checked_add_days(Days::new(1))?
            .and_hms_opt(0, 0, 0),
        Unit::Week => floor
            .date()
            .checked_add_days(Days::new(7))?
            .and_hms_opt(0, 0, 0),
        Unit::Month => floor.checked_add_months(Months::new(1)),
        Unit::Year => floor.checked_add_months(Months::new(12)),
    }
}

/// Resolve a local wall-clock time in `tz` to a concrete instant.
///
/// Ambiguous times (fall-back overlap) take the earlier offset. Times that
/// do not exist (spring-forward gap) advance to the first wall-clock time
/// the zone can represent; gaps are at most a couple of hours and some
/// zones shift in 30-minute steps.
fn resolve_local(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let mut probe = naive;
            for _ in 0..8 {
                probe += Duration::minutes(30);
                if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
                    return dt;
                }
            }
            tz.from_utc_datetime(&naive)
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;
    use proptest::prelude::*;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn bare_now_is_the_anchor() {
        assert_eq!(evaluate("now", anchor(), false, None).unwrap(), anchor());
        assert_eq!(evaluate("now", anchor(), true, None).unwrap(), anchor());
    }

    #[test]
    fn fixed_width_offsets() {
        assert_eq!(
            evaluate("now-5m", anchor(), false, None).unwrap(),
            anchor() - Duration::minutes(5)
        );
        assert_eq!(
            evaluate("now+3h", anchor(), false, None).unwrap(),
            anchor() + Duration::hours(3)
        );
        assert_eq!(
            evaluate("now-30s", anchor(), false, None).unwrap(),
            anchor() - Duration::seconds(30)
        );
        assert_eq!(
            evaluate("now-2w", anchor(), false, None).unwrap(),
            anchor() - Duration::weeks(2)
        );
    }

    #[test]
    fn offset_then_round_down_to_day() {
        assert_eq!(
            evaluate("now-1d/d", anchor(), false, None).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 14, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn round_up_snaps_to_last_instant_of_day() {
        assert_eq!(
            evaluate("now/d", anchor(), true, None).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 15, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn sub_day_rounding() {
        assert_eq!(
            evaluate("now/h", anchor(), false, None).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 15, 10, 0, 0).unwrap()
        );
        assert_eq!(
            evaluate("now/m", anchor(), true, None).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 15, 10, 30, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn week_rounding_starts_monday() {
        // 2023-03-15 is a Wednesday; the ISO week begins Monday 2023-03-13.
        assert_eq!(
            evaluate("now/w", anchor(), false, None).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 13, 0, 0, 0).unwrap()
        );
        assert_eq!(
            evaluate("now/w", anchor(), true, None).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 19, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn week_rounding_with_sunday_start() {
        let options = EvalOptions {
            week_start: WeekStartDay::Sunday,
        };
        assert_eq!(
            evaluate_with_options("now/w", anchor(), false, None, &options).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 12, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn month_and_year_rounding() {
        assert_eq!(
            evaluate("now/M", anchor(), false, None).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            evaluate("now/M", anchor(), true, None).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 31, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
        assert_eq!(
            evaluate("now/y", anchor(), false, None).unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn minutes_and_months_are_distinct_units() {
        let minutes = evaluate("now-1m", anchor(), false, None).unwrap();
        let months = evaluate("now-1M", anchor(), false, None).unwrap();
        assert_ne!(minutes, months);
        assert_eq!(minutes, anchor() - Duration::minutes(1));
        assert_eq!(months, Utc.with_ymd_and_hms(2023, 2, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn month_arithmetic_clamps_day_of_month() {
        let end_of_march = Utc.with_ymd_and_hms(2023, 3, 31, 0, 0, 0).unwrap();
        assert_eq!(
            evaluate("now-1M", end_of_march, false, None).unwrap(),
            Utc.with_ymd_and_hms(2023, 2, 28, 0, 0, 0).unwrap()
        );
        let end_of_january = Utc.with_ymd_and_hms(2023, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(
            evaluate("now+1M", end_of_january, false, None).unwrap(),
            Utc.with_ymd_and_hms(2023, 2, 28, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn clamping_makes_the_month_inverse_lossy() {
        // Documented edge case: the round trip loses the clamped days.
        let end_of_march = Utc.with_ymd_and_hms(2023, 3, 31, 0, 0, 0).unwrap();
        let back = evaluate("now-1M", end_of_march, false, None).unwrap();
        let forth = evaluate("now+1M", back, false, None).unwrap();
        assert_eq!(forth, Utc.with_ymd_and_hms(2023, 3, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn absolute_literals_parse_in_the_supplied_zone() {
        assert_eq!(
            evaluate("2023-01-02 03:04:05", anchor(), false, None).unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap()
        );
        // January in New York is EST (UTC-5).
        assert_eq!(
            evaluate("2023-01-02 03:04:05", anchor(), false, Some(New_York)).unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 2, 8, 4, 5).unwrap()
        );
    }

    #[test]
    fn malformed_now_text_degrades_to_the_anchor() {
        // Upstream leniency: a mangled expression containing "now" resolves
        // to the anchor instead of failing.
        assert_eq!(evaluate("now-5x", anchor(), false, None).unwrap(), anchor());
        assert_eq!(evaluate("now-", anchor(), false, None).unwrap(), anchor());
        assert_eq!(
            evaluate("nowadays", anchor(), false, None).unwrap(),
            anchor()
        );
        assert_eq!(
            evaluate("pretty now", anchor(), false, None).unwrap(),
            anchor()
        );
    }

    #[test]
    fn malformed_absolute_text_is_an_error() {
        assert!(matches!(
            evaluate("2013-13-40 00:00:00", anchor(), false, None),
            Err(ParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            evaluate("", anchor(), false, None),
            Err(ParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn validity_is_strict_and_anchor_independent() {
        assert!(is_valid_expression("now"));
        assert!(is_valid_expression("now-5m"));
        assert!(is_valid_expression("now/d"));
        assert!(is_valid_expression("now-1d/d"));
        assert!(is_valid_expression("2023-01-02 03:04:05"));
        assert!(!is_valid_expression("now-5x"));
        assert!(!is_valid_expression("now-m"));
        assert!(!is_valid_expression("now/d extra"));
        assert!(!is_valid_expression(""));
        assert!(!is_valid_expression("nowadays"));
    }

    #[test]
    fn day_boundaries_on_a_dst_transition_day() {
        // America/New_York springs forward on 2023-03-12 (02:00 EST → 03:00
        // EDT). Midnight that day is still EST (UTC-5); the end of the day
        // is EDT (UTC-4).
        let during = Utc.with_ymd_and_hms(2023, 3, 12, 15, 0, 0).unwrap();
        assert_eq!(
            evaluate("now/d", during, false, Some(New_York)).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 12, 5, 0, 0).unwrap()
        );
        assert_eq!(
            evaluate("now/d", during, true, Some(New_York)).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 13, 3, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn day_offset_preserves_wall_clock_across_dst() {
        // Midnight Mar 13 EDT minus one day is midnight Mar 12 EST — a
        // 23-hour UTC difference, same wall-clock time.
        let after_transition = Utc.with_ymd_and_hms(2023, 3, 13, 4, 0, 0).unwrap();
        assert_eq!(
            evaluate("now-1d", after_transition, false, Some(New_York)).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 12, 5, 0, 0).unwrap()
        );
    }

    #[test]
    fn resolve_range_spans_the_whole_day() {
        let raw = RawRange::new("now/d", "now/d");
        let range = resolve_range(&raw, anchor(), None).unwrap();
        assert_eq!(
            range.from,
            Utc.with_ymd_and_hms(2023, 3, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            range.to,
            Utc.with_ymd_and_hms(2023, 3, 15, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
        assert_eq!(range.raw, raw);
    }

    #[test]
    fn raw_range_survives_serde_round_trip() {
        let raw = RawRange::new("now-6h", "now");
        let json = serde_json::to_string(&raw).unwrap();
        assert_eq!(serde_json::from_str::<RawRange>(&json).unwrap(), raw);
    }

    proptest! {
        #[test]
        fn fixed_width_offsets_round_trip(
            secs in 0i64..4_000_000_000i64,
            n in 0i64..10_000,
            idx in 0usize..5,
        ) {
            // s/m/h/d/w are fixed-width in UTC, so the algebraic inverse
            // returns to the original instant exactly.
            let unit = ['s', 'm', 'h', 'd', 'w'][idx];
            let anchor = DateTime::from_timestamp(secs, 0).unwrap();
            let back = evaluate(&format!("now-{n}{unit}"), anchor, false, None).unwrap();
            let forth = evaluate(&format!("now+{n}{unit}"), back, false, None).unwrap();
            prop_assert_eq!(forth, anchor);
        }

        #[test]
        fn rounding_is_idempotent(
            secs in 0i64..4_000_000_000i64,
            idx in 0usize..7,
            round_up: bool,
        ) {
            let unit = ['s', 'm', 'h', 'd', 'w', 'M', 'y'][idx];
            let anchor = DateTime::from_timestamp(secs, 0).unwrap();
            let expr = format!("now/{unit}");
            let once = evaluate(&expr, anchor, round_up, None).unwrap();
            let twice = evaluate(&expr, once, round_up, None).unwrap();
            prop_assert_eq!(twice, once);
        }
    }
}
