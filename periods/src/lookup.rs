use serde::{Deserialize, Serialize};
use std::fmt;

use crate::normalize;

/// Start and end of each period. Morning periods start at 07:00, afternoon
/// periods at 13:00; every period lasts 45 minutes with a 5 minute break.
const PERIOD_BOUNDS: [(&str, &str); 10] = [
    ("07:00", "07:45"),
    ("07:50", "08:35"),
    ("08:40", "09:25"),
    ("09:30", "10:15"),
    ("10:20", "11:05"),
    ("13:00", "13:45"),
    ("13:50", "14:35"),
    ("14:40", "15:25"),
    ("15:30", "16:15"),
    ("16:20", "17:05"),
];

fn bounds(period: u8) -> Option<(&'static str, &'static str)> {
    if period == 0 {
        return None;
    }

    PERIOD_BOUNDS.get(period as usize - 1).copied()
}

/// Wall-clock interval of a period, e.g. `"07:00 - 07:45"`. Unknown periods
/// give an empty string.
pub fn period_time(period: u8) -> String {
    match bounds(period) {
        Some((start, end)) => format!("{} - {}", start, end),
        None => String::new(),
    }
}

/// Wall-clock interval covering periods `start..=end`, e.g. `"07:00 - 08:35"`
/// for periods 1 to 2.
pub fn period_range_time(start: u8, end: u8) -> String {
    match (bounds(start), bounds(end)) {
        (Some((from, _)), Some((_, to))) => format!("{} - {}", from, to),
        _ => String::new(),
    }
}

/// A day of the school week.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    #[serde(rename = "T2")]
    Monday,
    #[serde(rename = "T3")]
    Tuesday,
    #[serde(rename = "T4")]
    Wednesday,
    #[serde(rename = "T5")]
    Thursday,
    #[serde(rename = "T6")]
    Friday,
    #[serde(rename = "T7")]
    Saturday,
    #[serde(rename = "CN")]
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    /// Full Vietnamese name, e.g. `"Thứ hai"`.
    pub fn full_name(self) -> &'static str {
        match self {
            Day::Monday => "Thứ hai",
            Day::Tuesday => "Thứ ba",
            Day::Wednesday => "Thứ tư",
            Day::Thursday => "Thứ năm",
            Day::Friday => "Thứ sáu",
            Day::Saturday => "Thứ bảy",
            Day::Sunday => "Chủ nhật",
        }
    }

    /// Label used inside lesson period strings, e.g. `"Thứ 2"`.
    pub fn label(self) -> &'static str {
        match self {
            Day::Monday => "Thứ 2",
            Day::Tuesday => "Thứ 3",
            Day::Wednesday => "Thứ 4",
            Day::Thursday => "Thứ 5",
            Day::Friday => "Thứ 6",
            Day::Saturday => "Thứ 7",
            Day::Sunday => "Chủ nhật",
        }
    }

    /// Compact table header code, e.g. `"T2"`.
    pub fn short_name(self) -> &'static str {
        match self {
            Day::Monday => "T2",
            Day::Tuesday => "T3",
            Day::Wednesday => "T4",
            Day::Thursday => "T5",
            Day::Friday => "T6",
            Day::Saturday => "T7",
            Day::Sunday => "CN",
        }
    }

    /// Recognizes any of the three spellings, ignoring case, accents and spaces.
    pub fn parse(s: &str) -> Option<Day> {
        let wanted = normalize(s);

        if wanted.is_empty() {
            return None;
        }

        Day::ALL.iter().copied().find(|day| {
            [day.full_name(), day.label(), day.short_name()]
                .iter()
                .any(|name| normalize(name) == wanted)
        })
    }

    /// Monday is 1, Sunday is 7.
    pub fn from_number_from_monday(number: u32) -> Option<Day> {
        match number {
            1..=7 => Some(Day::ALL[number as usize - 1]),
            _ => None,
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `"Thứ hai"` becomes `"T2"`. Unknown input is returned unchanged.
pub fn full_name_to_short_name(name: &str) -> String {
    match Day::parse(name) {
        Some(day) => day.short_name().to_string(),
        None => name.to_string(),
    }
}

/// `"T2"` becomes `"Thứ hai"`. Unknown input is returned unchanged.
pub fn short_name_to_full_name(name: &str) -> String {
    match Day::parse(name) {
        Some(day) => day.full_name().to_string(),
        None => name.to_string(),
    }
}
