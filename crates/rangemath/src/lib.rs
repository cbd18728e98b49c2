//! # rangemath
//!
//! Deterministic time-range expression engine.
//!
//! Parses compact relative-time expressions (`now`, `now-5m`, `now-1d/d`,
//! `now/w`) into concrete instants and renders raw from/to expression pairs
//! as human-readable range descriptions ("Last 5 minutes", "Yesterday").
//!
//! ## Design Principle
//!
//! Every evaluation takes the "now" anchor as an explicit parameter — there
//! is no hidden global clock anywhere in this crate. Calendar arithmetic and
//! bucket rounding are zone-aware (a `/d` boundary is the local midnight of
//! the supplied zone, DST transitions included), month and year offsets clamp
//! the day of month, and all operations are pure functions that are safe to
//! call concurrently.
//!
//! ## Modules
//!
//! - [`eval`] — expression parsing and evaluation, range resolution
//! - [`describe`] — canned-option reverse lookup and range descriptions
//! - [`error`] — error types

pub mod describe;
pub mod error;
pub mod eval;

pub use describe::{describe, describe_expression, TimeOption, CANNED_RANGES};
pub use error::ParseError;
pub use eval::{
    evaluate, evaluate_with_options, is_valid_expression, resolve_range, EvalOptions, RawRange,
    ResolvedRange, WeekStartDay, ABSOLUTE_FORMAT,
};
