//! Publish-date normalization.
//!
//! Feeds in the wild disagree on date formats. [`parse_time`] tries a fixed,
//! ordered list of layouts and returns the first one that matches, so the most
//! common RSS formats are tried before the rarer ones.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// How a layout encodes its time zone.
#[derive(Debug, Clone, Copy)]
enum Zone {
    /// Trailing alphabetic abbreviation (`GMT`, `EST`, ...). The offset is
    /// not inferred: the timestamp is read as UTC.
    Abbrev,
    /// Trailing numeric offset (`+0200`, `-05:00`).
    Numeric,
    /// Full RFC 3339 timestamp, offset included.
    Rfc3339,
    /// Calendar date only, midnight UTC.
    DateOnly,
}

#[derive(Debug)]
struct Layout {
    name: &'static str,
    /// Layout starts with a `Mon, ` weekday prefix. The weekday itself is not
    /// checked against the date, many feeds get it wrong.
    weekday: bool,
    format: &'static str,
    zone: Zone,
}

/// Layout order is significant: the first layout that parses wins.
const LAYOUTS: &[Layout] = &[
    Layout {
        name: "RFC 1123",
        weekday: true,
        format: "%d %b %Y %H:%M:%S",
        zone: Zone::Abbrev,
    },
    Layout {
        name: "RFC 1123 (numeric zone)",
        weekday: true,
        format: "%d %b %Y %H:%M:%S %z",
        zone: Zone::Numeric,
    },
    Layout {
        name: "RFC 3339",
        weekday: false,
        format: "",
        zone: Zone::Rfc3339,
    },
    Layout {
        name: "RFC 822",
        weekday: false,
        format: "%d %b %y %H:%M",
        zone: Zone::Abbrev,
    },
    Layout {
        name: "RFC 822 (numeric zone)",
        weekday: false,
        format: "%d %b %y %H:%M %z",
        zone: Zone::Numeric,
    },
    Layout {
        name: "long form",
        weekday: false,
        format: "%B %d, %Y",
        zone: Zone::DateOnly,
    },
];

/// Parses a feed date string into Unix epoch seconds.
///
/// Returns `None` when no known layout matches. Callers treat that as an
/// unknown publish time rather than a failure.
///
/// # Examples
///
/// ```
/// use nyusu::feed::parse_time;
///
/// assert_eq!(parse_time("Fri, 12 Jul 2024 13:00:00 +0200"), Some(1_720_782_000));
/// assert_eq!(parse_time("2024-07-12T11:00:00Z"), Some(1_720_782_000));
/// assert_eq!(parse_time("last tuesday"), None);
/// ```
pub fn parse_time(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    LAYOUTS.iter().find_map(|layout| {
        let parsed = layout.parse(raw);
        if parsed.is_some() {
            tracing::trace!(layout = layout.name, raw = %raw, "Parsed publish date");
        }
        parsed
    })
}

impl Layout {
    fn parse(&self, raw: &str) -> Option<i64> {
        let input = if self.weekday {
            strip_weekday(raw)?
        } else {
            raw
        };

        match self.zone {
            Zone::Abbrev => {
                let (body, zone) = input.rsplit_once(' ')?;
                if !is_zone_abbrev(zone) {
                    return None;
                }
                NaiveDateTime::parse_from_str(body.trim_end(), self.format)
                    .ok()
                    .map(|dt| dt.and_utc().timestamp())
            }
            Zone::Numeric => DateTime::parse_from_str(input, self.format)
                .ok()
                .map(|dt| dt.timestamp()),
            Zone::Rfc3339 => DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.timestamp()),
            Zone::DateOnly => NaiveDate::parse_from_str(input, self.format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc().timestamp()),
        }
    }
}

/// Removes a leading `Ddd, ` weekday, returning `None` if there isn't one.
fn strip_weekday(raw: &str) -> Option<&str> {
    let (day, rest) = raw.split_once(',')?;
    if day.len() >= 3 && day.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn is_zone_abbrev(zone: &str) -> bool {
    (3..=5).contains(&zone.len()) && zone.chars().all(|c| c.is_ascii_alphabetic())
}
