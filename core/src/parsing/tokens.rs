//! Whitespace tokenizer and fixed-width field tables for event blocks.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::ops::Range;

/// Number of digits in the compact source-time token.
pub const SOURCE_TIME_DIGITS: usize = 14;

/// Year, blank-padded day/time column and millisecond tail of a detection line.
/// The year must start a whitespace-separated token.
pub const DETECTION_LINE_PATTERN: &str =
    r"(?:^|[ \t])([0-9]{4})[ \t]*([0-9 \t]{9})\.([0-9]{3})";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    /// 0-based line within the block.
    pub line: usize,
}

/// Shape classes used to pick values out of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Exactly fourteen digits.
    SourceTime,
    /// `ddd.dd`: one to three integer digits, two decimals.
    Amplitude,
    /// `[-]ddd.dddd`: optional sign, one to three integer digits, three or four decimals.
    Coordinate,
    Other,
}

impl Shape {
    pub fn of(text: &str) -> Shape {
        if text.len() == SOURCE_TIME_DIGITS && all_digits(text) {
            return Shape::SourceTime;
        }
        let Some((int, frac)) = text.split_once('.') else {
            return Shape::Other;
        };
        let (signed, digits) = match int.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, int),
        };
        if !(1..=3).contains(&digits.len()) || !all_digits(digits) || !all_digits(frac) {
            return Shape::Other;
        }
        match frac.len() {
            2 if !signed => Shape::Amplitude,
            3 | 4 => Shape::Coordinate,
            _ => Shape::Other,
        }
    }
}

fn all_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Splits a block into whitespace-separated tokens, in text order.
pub fn tokenize(block: &str) -> impl Iterator<Item = Token<'_>> {
    block
        .lines()
        .enumerate()
        .flat_map(|(line, text)| text.split_whitespace().map(move |t| Token { text: t, line }))
}

/// Column offsets of a compact `YYYYDDDHHMMSS<fraction>` time string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeLayout {
    pub year: Range<usize>,
    pub day: Range<usize>,
    pub hour: Range<usize>,
    pub minute: Range<usize>,
    pub second: Range<usize>,
    pub fraction: Range<usize>,
    /// Milliseconds per unit of the fraction column.
    pub fraction_ms: u32,
}

/// Source-time token: deciseconds in the last column.
pub const SOURCE_TIME: TimeLayout = TimeLayout {
    year: 0..4,
    day: 4..7,
    hour: 7..9,
    minute: 9..11,
    second: 11..13,
    fraction: 13..14,
    fraction_ms: 100,
};

/// Normalized detection time: year, the 9-character column, then milliseconds.
pub const DETECTION_TIME: TimeLayout = TimeLayout {
    year: 0..4,
    day: 4..7,
    hour: 7..9,
    minute: 9..11,
    second: 11..13,
    fraction: 13..16,
    fraction_ms: 1,
};

impl TimeLayout {
    /// Builds a timestamp from year and day-of-year.
    ///
    /// A second value of 60 is stored as second zero and the minute is
    /// stepped back by one.
    pub fn decode(&self, digits: &str) -> Option<NaiveDateTime> {
        if digits.len() != self.fraction.end || !all_digits(digits) {
            return None;
        }
        let field = |range: &Range<usize>| digits.get(range.clone())?.parse::<u32>().ok();

        let year = i32::try_from(field(&self.year)?).ok()?;
        let date = NaiveDate::from_yo_opt(year, field(&self.day)?)?;
        let second = field(&self.second)?;
        if second > 60 {
            return None;
        }
        let time = NaiveTime::from_hms_milli_opt(
            field(&self.hour)?,
            field(&self.minute)?,
            second % 60,
            field(&self.fraction)? * self.fraction_ms,
        )?;

        let stamp = date.and_time(time);
        if second == 60 {
            Some(stamp - Duration::minutes(1))
        } else {
            Some(stamp)
        }
    }
}

/// Rebuilds the compact detection time from the three captured columns.
/// Blanks inside the fixed-width column stand for zeros.
pub fn normalize_detection(year: &str, column: &str, millis: &str) -> String {
    let column: String = column
        .chars()
        .map(|c| if c.is_ascii_whitespace() { '0' } else { c })
        .collect();
    format!("{year}{column}{millis}")
}
