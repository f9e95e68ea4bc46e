use once_cell::sync::Lazy;
use regex::{Match, Regex};

use crate::FIRST_PERIOD;

// Patterns run on lowercased, accent-free text.
static DAY_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"thu\s*(?:\d+|hai|ba|tu|nam|sau|bay)\b|chu\s*nhat|\bt[2-7]\b|\bcn\b").unwrap()
});
static RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*-\s*(\d+)").unwrap());
static LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\s*,\s*\d+)+").unwrap());
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Extracts the periods denoted by a free-form string.
///
/// Ranges (`"1-5"`) win over comma lists (`"1,2,3"`), which win over a single
/// number. Weekday labels are ignored, so `"Tiết 1-3 Thứ 5"` gives `[1, 2, 3]`.
/// Anything unparseable gives `[1]`.
pub fn extract_periods(input: &str) -> Vec<u8> {
    let text = unidecode::unidecode(input).to_ascii_lowercase();
    let text = DAY_LABEL.replace_all(&text, " ");

    let periods = if RANGE.is_match(&text) {
        from_ranges(&text)
    } else if let Some(list) = LIST.find(&text) {
        list.as_str().split(',').filter_map(|n| period(n.trim())).collect()
    } else {
        NUMBER
            .find(&text)
            .and_then(|n| period(n.as_str()))
            .into_iter()
            .collect()
    };

    if periods.is_empty() {
        vec![FIRST_PERIOD]
    } else {
        periods
    }
}

/// Smallest period of [`extract_periods`], used for ordering lessons.
pub fn first_period(input: &str) -> u8 {
    extract_periods(input)
        .into_iter()
        .min()
        .unwrap_or(FIRST_PERIOD)
}

/// Every range in the text, plus the bare numbers listed next to them.
fn from_ranges(text: &str) -> Vec<u8> {
    let ranges: Vec<Match> = RANGE.find_iter(text).collect();
    let mut periods = Vec::new();

    for captures in RANGE.captures_iter(text) {
        let bounds = (
            captures.get(1).and_then(|n| period(n.as_str())),
            captures.get(2).and_then(|n| period(n.as_str())),
        );

        if let (Some(a), Some(b)) = bounds {
            periods.extend(a.min(b)..=a.max(b));
        }
    }

    let inside_range = |m: &Match| ranges.iter().any(|r| r.start() <= m.start() && m.end() <= r.end());

    periods.extend(
        NUMBER
            .find_iter(text)
            .filter(|m| !inside_range(m))
            .filter_map(|m| period(m.as_str())),
    );

    periods.sort_unstable();
    periods.dedup();
    periods
}

fn period(digits: &str) -> Option<u8> {
    digits.parse::<u8>().ok().filter(|&p| p > 0)
}
