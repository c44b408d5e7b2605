//! String format detection for sampled fields

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

// Pre-compiled regex patterns
static ISO_DATETIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$").unwrap()
});

static ISO_DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static ISO_TIME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}(\.\d+)?$").unwrap());

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

static IPV4_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,3}\.){3}\d{1,3}$").unwrap());

static IPV6_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(([0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}|([0-9a-fA-F]{1,4}:){1,7}:|([0-9a-fA-F]{1,4}:){1,6}:[0-9a-fA-F]{1,4})$").unwrap()
});

/// Detect if a string matches a known format
pub fn detect_format(value: &str) -> Option<&'static str> {
    let len = value.len();
    if len == 0 {
        return None;
    }

    if len > 6
        && (value.starts_with("http://")
            || value.starts_with("https://")
            || value.starts_with("ftp://")
            || value.starts_with("file://"))
    {
        return Some("uri");
    }

    if len == 10 && ISO_DATE_REGEX.is_match(value) {
        return Some("date");
    }

    if len > 5 && len < 255 && value.contains('@') && EMAIL_REGEX.is_match(value) {
        return Some("email");
    }

    if len == 36 && UUID_REGEX.is_match(&value.to_lowercase()) {
        return Some("uuid");
    }

    if len >= 19 && ISO_DATETIME_REGEX.is_match(value) {
        return Some("date-time");
    }

    if len >= 8 && ISO_TIME_REGEX.is_match(value) {
        return Some("time");
    }

    if len < 16 && IPV4_REGEX.is_match(value) && value.split('.').all(|p| p.parse::<u8>().is_ok()) {
        return Some("ipv4");
    }

    if value.contains(':') && IPV6_REGEX.is_match(value) {
        return Some("ipv6");
    }

    None
}

/// Accumulates per-field string formats
#[derive(Debug, Default)]
pub(crate) struct StringStats {
    format_counts: HashMap<&'static str, usize>,
    total_count: usize,
}

impl StringStats {
    pub(crate) fn add_string(&mut self, s: &str) {
        self.total_count += 1;
        if let Some(format) = detect_format(s) {
            *self.format_counts.entry(format).or_insert(0) += 1;
        }
    }

    /// Only reported when every string seen had the same format
    pub(crate) fn format(&self) -> Option<String> {
        if self.format_counts.len() != 1 {
            return None;
        }
        self.format_counts
            .iter()
            .next()
            .filter(|(_, count)| **count == self.total_count)
            .map(|(format, _)| format.to_string())
    }
}
