//! Filename normalization for recordings.
//!
//! Turns the free-text label a meeting archive attaches to a recording
//! (for example `"November 13, 2025 City Council Regular Meeting at 6:00 PM"`)
//! into a stable, filesystem-safe identifier shared by every artifact of
//! that recording.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use url::Url;

/// Maximum length of a canonical identifier, in bytes (always ASCII).
pub const MAX_ID_LEN: usize = 100;

/// Identifier used when neither the label nor the URL yields anything usable.
const UNNAMED: &str = "unnamed";

/// Filesystem-safe identifier shared by all artifacts of one recording.
///
/// Only contains `[A-Za-z0-9_.-]`, never starts with `.`, is never empty and
/// is at most [`MAX_ID_LEN`] bytes long.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalId(String);

impl CanonicalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the canonical identifier for a recording.
///
/// A label shaped like `"<Month> <Day>, <Year> <Description> at <H>:<MM> <AM|PM>"`
/// becomes `YYYY-MM-DDTHHMM_<Description>`. Anything else is sanitized as-is,
/// and a missing or fully-stripped label falls back to the last path segment
/// of `fallback_url` without its extension.
pub fn normalize(raw_label: Option<&str>, fallback_url: &str) -> CanonicalId {
    let label = raw_label.map(str::trim).filter(|label| !label.is_empty());

    if let Some(label) = label {
        if let Some(id) = parse_dated_label(label) {
            return id;
        }

        let sanitized = sanitize(label);
        if !sanitized.is_empty() {
            return CanonicalId(sanitized);
        }
    }

    let from_url = sanitize(&url_stem(fallback_url));
    if from_url.is_empty() {
        CanonicalId(UNNAMED.to_string())
    } else {
        CanonicalId(from_url)
    }
}

/// Make arbitrary text safe for use as a file name.
///
/// Removes `: , ? * " < >`, maps `/ \ |` to `-`, maps whitespace to `_`, drops
/// anything outside ASCII `[A-Za-z0-9_.-]` and leading periods, then
/// truncates to [`MAX_ID_LEN`].
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len().min(MAX_ID_LEN));

    for c in text.chars() {
        let mapped = match c {
            ':' | ',' | '?' | '*' | '"' | '<' | '>' => None,
            '/' | '\\' | '|' => Some('-'),
            c if c.is_whitespace() => Some('_'),
            c if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') => Some(c),
            _ => None,
        };

        if let Some(c) = mapped {
            if c == '.' && out.is_empty() {
                continue;
            }
            out.push(c);
            if out.len() == MAX_ID_LEN {
                break;
            }
        }
    }

    out
}

fn dated_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?P<month>[a-z]+)\.?\s+(?P<day>\d{1,2}),\s*(?P<year>\d{4})\s+(?P<desc>.+?)\s+at\s+(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<meridiem>[ap])\.?\s*m\.?\s*$",
        )
        .expect("dated label pattern is valid")
    })
}

fn parse_dated_label(label: &str) -> Option<CanonicalId> {
    let caps = dated_label_regex().captures(label)?;

    let month = month_number(&caps["month"])?;
    let day: u32 = caps["day"].parse().ok()?;
    let year: i32 = caps["year"].parse().ok()?;
    let hour12: u32 = caps["hour"].parse().ok()?;
    let minute: u32 = caps["minute"].parse().ok()?;
    let pm = caps["meridiem"].eq_ignore_ascii_case("p");

    if !(1..=12).contains(&hour12) {
        return None;
    }
    let hour = match (hour12, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let stamp = NaiveDateTime::new(date, time).format("%Y-%m-%dT%H%M");

    let description = sanitize(&caps["desc"]);
    let mut id = if description.is_empty() {
        stamp.to_string()
    } else {
        format!("{}_{}", stamp, description)
    };
    id.truncate(MAX_ID_LEN);

    Some(CanonicalId(id))
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_ascii_lowercase().as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Last non-empty path segment of `source`, extension stripped.
fn url_stem(source: &str) -> String {
    let segment = match Url::parse(source) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string),
        Err(_) => source
            .split(['?', '#'])
            .next()
            .and_then(|path| path.split('/').filter(|s| !s.is_empty()).last())
            .map(str::to_string),
    };

    segment
        .as_deref()
        .and_then(|s| Path::new(s).file_stem())
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string()
}
