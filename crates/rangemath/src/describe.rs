//! Human-readable range descriptions.
//!
//! Turns a [`RawRange`] into a display string: fully absolute pairs are
//! formatted literally, relative pairs are reverse-matched against the
//! ordered [`CANNED_RANGES`] table ("Last 5 minutes", "Yesterday", ...),
//! and anything else falls back to the raw expression text. Nothing here
//! evaluates expressions — description operates purely on the text pair
//! and static table data.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::eval::{RawRange, Unit, ABSOLUTE_FORMAT};

/// A named, preconfigured relative range used for reverse lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeOption {
    pub from: &'static str,
    pub to: &'static str,
    pub display: &'static str,
}

impl TimeOption {
    /// The option's expression pair as an owned [`RawRange`].
    pub fn to_raw(&self) -> RawRange {
        RawRange::new(self.from, self.to)
    }
}

const fn option(from: &'static str, to: &'static str, display: &'static str) -> TimeOption {
    TimeOption { from, to, display }
}

/// The canned options, in lookup order. First match wins, so order is part
/// of the contract, not a presentation detail.
pub const CANNED_RANGES: &[TimeOption] = &[
    // Whole past calendar units
    option("now-1d/d", "now-1d/d", "Yesterday"),
    option("now-2d/d", "now-2d/d", "Day before yesterday"),
    option("now-7d/d", "now-7d/d", "This day last week"),
    option("now-1w/w", "now-1w/w", "Previous week"),
    option("now-1M/M", "now-1M/M", "Previous month"),
    option("now-1y/y", "now-1y/y", "Previous year"),
    // Current calendar units
    option("now/d", "now/d", "Today"),
    option("now/d", "now", "Today so far"),
    option("now/w", "now/w", "This week"),
    option("now/w", "now", "This week so far"),
    option("now/M", "now/M", "This month"),
    option("now/M", "now", "This month so far"),
    option("now/y", "now/y", "This year"),
    option("now/y", "now", "This year so far"),
    // Trailing windows, sub-day
    option("now-5m", "now", "Last 5 minutes"),
    option("now-15m", "now", "Last 15 minutes"),
    option("now-30m", "now", "Last 30 minutes"),
    option("now-1h", "now", "Last 1 hour"),
    option("now-3h", "now", "Last 3 hours"),
    option("now-6h", "now", "Last 6 hours"),
    option("now-12h", "now", "Last 12 hours"),
    option("now-24h", "now", "Last 24 hours"),
    // Trailing windows, multi-day
    option("now-2d", "now", "Last 2 days"),
    option("now-7d", "now", "Last 7 days"),
    option("now-30d", "now", "Last 30 days"),
    option("now-90d", "now", "Last 90 days"),
    option("now-6M", "now", "Last 6 months"),
    option("now-1y", "now", "Last 1 year"),
    option("now-2y", "now", "Last 2 years"),
    option("now-5y", "now", "Last 5 years"),
];

/// Describe a raw range as a human-readable string.
///
/// Absolute pairs format as `"<from> to <to>"` using [`ABSOLUTE_FORMAT`];
/// otherwise the first exact textual match in [`CANNED_RANGES`] supplies
/// the label, and unmatched pairs fall back to the literal expression text
/// joined with `"to"`. Never fails.
///
/// # Examples
///
/// ```
/// use rangemath::{describe, RawRange};
///
/// assert_eq!(describe(&RawRange::new("now-5m", "now")), "Last 5 minutes");
/// assert_eq!(describe(&RawRange::new("now-3m", "now")), "now-3m to now");
/// ```
pub fn describe(raw: &RawRange) -> String {
    if is_absolute(&raw.from) && is_absolute(&raw.to) {
        return format!(
            "{} to {}",
            format_absolute(&raw.from),
            format_absolute(&raw.to)
        );
    }

    if let Some(option) = CANNED_RANGES
        .iter()
        .find(|o| o.from == raw.from && o.to == raw.to)
    {
        return option.display.to_string();
    }

    format!("{} to {}", raw.from, raw.to)
}

/// Describe a single expression as a range label anchored at `now`.
///
/// `now-7h` becomes `"Last 7 hours"`, `+2d` becomes `"Next 2 days"`, and a
/// bare `6h` is read as a trailing window (`"Last 6 hours"`). Expressions
/// whose `<expr> to now` pair exists in [`CANNED_RANGES`] keep their canned
/// label; anything unrecognized falls back to literal text. Never fails.
pub fn describe_expression(expr: &str) -> String {
    let is_last = !expr.starts_with('+');
    let expr = if expr.contains("now") {
        expr.to_string()
    } else if is_last {
        format!("now-{expr}")
    } else {
        format!("now{expr}")
    };

    if let Some(option) = CANNED_RANGES
        .iter()
        .find(|o| o.from == expr && o.to == "now")
    {
        return option.display.to_string();
    }

    if let Some(label) = offset_label(&expr) {
        return label;
    }

    if is_last {
        format!("{expr} to now")
    } else {
        format!("now to {expr}")
    }
}

/// Synthesize a "Last N units" / "Next N units" label from a `now±N<unit>`
/// prefix, ignoring any rounding suffix.
fn offset_label(expr: &str) -> Option<String> {
    let rest = expr.strip_prefix("now")?;
    let (direction, rest) = if let Some(r) = rest.strip_prefix('-') {
        ("Last", r)
    } else {
        ("Next", rest.strip_prefix('+')?)
    };
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let amount: u64 = rest[..digits].parse().ok()?;
    let unit = Unit::from_char(rest[digits..].chars().next()?)?;
    let plural = if amount == 1 { "" } else { "s" };
    Some(format!("{direction} {amount} {}{plural}", unit.noun()))
}

/// An expression is absolute when it carries no `now` anchor.
fn is_absolute(text: &str) -> bool {
    !text.contains("now")
}

/// Render an absolute literal through the display format, echoing the text
/// unchanged when it does not parse (description never fails).
fn format_absolute(text: &str) -> String {
    match NaiveDateTime::parse_from_str(text, ABSOLUTE_FORMAT) {
        Ok(dt) => dt.format(ABSOLUTE_FORMAT).to_string(),
        Err(_) => text.to_string(),
    }
}
