use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::format::{range_token, runs};
use crate::{Day, FIRST_PERIOD, LAST_PERIOD};

// Runs on lowercased, accent-free segments: "tiet 1-2 thu 2".
static SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:tiet\s*)?(\d+)(?:\s*-\s*(\d+))?\s*(.*?)\s*$").unwrap());

/// One teaching slot: a day and an inclusive range of periods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct PeriodAssignment {
    day: Day,
    start: u8,
    end: u8,
}

impl PeriodAssignment {
    /// Returns `None` unless `FIRST_PERIOD <= start <= end <= LAST_PERIOD`.
    pub fn new(day: Day, start: u8, end: u8) -> Option<Self> {
        if FIRST_PERIOD <= start && start <= end && end <= LAST_PERIOD {
            Some(Self { day, start, end })
        } else {
            None
        }
    }

    pub fn day(&self) -> Day {
        self.day
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    /// `"1-3"`, or `"5"` for a single period.
    pub fn range_label(&self) -> String {
        range_token(self.start, self.end)
    }

    /// Same day and at least one shared period.
    pub fn overlaps(&self, other: &PeriodAssignment) -> bool {
        self.day == other.day && self.start <= other.end && self.end >= other.start
    }
}

impl fmt::Display for PeriodAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tiết {} {}", self.range_label(), self.day)
    }
}

/// Parses `"Tiết 1-2 Thứ 2, Tiết 5 Thứ 4"` into assignments.
///
/// Segments without a number or a recognizable day are skipped, periods
/// outside the grid are clamped to it. Never fails.
pub fn parse_lesson_periods(input: &str) -> Vec<PeriodAssignment> {
    input.split(',').filter_map(parse_segment).collect()
}

fn parse_segment(segment: &str) -> Option<PeriodAssignment> {
    if segment.trim().is_empty() {
        return None;
    }

    let normalized = unidecode::unidecode(segment).to_ascii_lowercase();

    let captures = match SEGMENT.captures(&normalized) {
        Some(captures) => captures,
        None => {
            debug!("Skipping lesson period segment without periods: {:?}", segment);
            return None;
        }
    };

    let day = match captures.get(3).and_then(|d| Day::parse(d.as_str())) {
        Some(day) => day,
        None => {
            debug!("Skipping lesson period segment without a day: {:?}", segment);
            return None;
        }
    };

    let first = number(captures.get(1)?.as_str());
    let second = captures.get(2).map(|n| number(n.as_str())).unwrap_or(first);
    let (low, high) = (first.min(second), first.max(second));

    if high < u32::from(FIRST_PERIOD) || low > u32::from(LAST_PERIOD) {
        debug!("Skipping lesson period segment outside the grid: {:?}", segment);
        return None;
    }

    let clamp = |n: u32| n.max(u32::from(FIRST_PERIOD)).min(u32::from(LAST_PERIOD)) as u8;

    PeriodAssignment::new(day, clamp(low), clamp(high))
}

// Saturates instead of failing so that huge numbers still land outside the grid.
fn number(digits: &str) -> u32 {
    digits.parse().unwrap_or(u32::MAX)
}

/// Canonical string for a list of assignments: sorted by day, overlapping or
/// adjacent slots merged, one `"Tiết <range> <day>"` segment per run.
pub fn format_lesson_periods(assignments: &[PeriodAssignment]) -> String {
    PeriodSelection::from_assignments(assignments).to_lesson_periods()
}

/// Re-emits any lesson period string in canonical form.
pub fn canonical_lesson_periods(input: &str) -> String {
    format_lesson_periods(&parse_lesson_periods(input))
}

/// Periods selected on the weekly grid, edited one cell at a time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeriodSelection {
    cells: BTreeMap<Day, BTreeSet<u8>>,
}

impl PeriodSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_assignments(assignments: &[PeriodAssignment]) -> Self {
        let mut selection = Self::new();

        for assignment in assignments {
            selection
                .cells
                .entry(assignment.day)
                .or_insert_with(BTreeSet::new)
                .extend(assignment.start..=assignment.end);
        }

        selection
    }

    pub fn from_lesson_periods(input: &str) -> Self {
        Self::from_assignments(&parse_lesson_periods(input))
    }

    /// Flips one cell and returns whether it is now selected. Periods outside
    /// the grid are never selected.
    pub fn toggle(&mut self, day: Day, period: u8) -> bool {
        if period < FIRST_PERIOD || period > LAST_PERIOD {
            return false;
        }

        let periods = self.cells.entry(day).or_insert_with(BTreeSet::new);

        let selected = if periods.remove(&period) {
            false
        } else {
            periods.insert(period);
            true
        };

        if periods.is_empty() {
            self.cells.remove(&day);
        }

        selected
    }

    pub fn is_selected(&self, day: Day, period: u8) -> bool {
        self.cells
            .get(&day)
            .map_or(false, |periods| periods.contains(&period))
    }

    /// Selected periods of a day, ascending.
    pub fn periods(&self, day: Day) -> Vec<u8> {
        self.cells
            .get(&day)
            .map(|periods| periods.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn to_assignments(&self) -> Vec<PeriodAssignment> {
        let mut assignments = Vec::new();

        for (day, periods) in &self.cells {
            let sorted: Vec<u8> = periods.iter().copied().collect();

            for (start, end) in runs(&sorted) {
                assignments.extend(PeriodAssignment::new(*day, start, end));
            }
        }

        assignments
    }

    pub fn to_lesson_periods(&self) -> String {
        self.to_assignments()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(day: Day, start: u8, end: u8) -> PeriodAssignment {
        PeriodAssignment::new(day, start, end).unwrap()
    }

    #[test]
    fn assignment_invariants() {
        assert!(PeriodAssignment::new(Day::Monday, 1, 10).is_some());
        assert!(PeriodAssignment::new(Day::Monday, 3, 2).is_none());
        assert!(PeriodAssignment::new(Day::Monday, 0, 2).is_none());
        assert!(PeriodAssignment::new(Day::Monday, 5, 11).is_none());
    }

    #[test]
    fn parses_the_stored_format() {
        assert_eq!(
            parse_lesson_periods("Tiết 1-2 Thứ 2, Tiết 5 Thứ 4"),
            vec![slot(Day::Monday, 1, 2), slot(Day::Wednesday, 5, 5)]
        );
    }

    #[test]
    fn parsing_is_lenient() {
        assert_eq!(
            parse_lesson_periods("tiet 3 - 4 thu hai,  Tiết 1-1 CN"),
            vec![slot(Day::Monday, 3, 4), slot(Day::Sunday, 1, 1)]
        );
        assert_eq!(
            parse_lesson_periods("Tiết 4-2 Thứ 3"),
            vec![slot(Day::Tuesday, 2, 4)]
        );
        assert_eq!(
            parse_lesson_periods("Tiết 9-14 Thứ 6"),
            vec![slot(Day::Friday, 9, 10)]
        );
    }

    #[test]
    fn skips_unusable_segments() {
        assert!(parse_lesson_periods("").is_empty());
        assert!(parse_lesson_periods("Tiết 1-2").is_empty());
        assert!(parse_lesson_periods("Thứ 2").is_empty());
        assert!(parse_lesson_periods("Tiết 11-12 Thứ 2").is_empty());
        assert_eq!(
            parse_lesson_periods("nonsense, Tiết 2 Thứ 7,"),
            vec![slot(Day::Saturday, 2, 2)]
        );
    }

    #[test]
    fn single_periods_are_written_without_a_dash() {
        assert_eq!(slot(Day::Monday, 1, 1).to_string(), "Tiết 1 Thứ 2");
        assert_eq!(slot(Day::Sunday, 3, 5).to_string(), "Tiết 3-5 Chủ nhật");
    }

    #[test]
    fn canonical_form_merges_and_sorts() {
        assert_eq!(
            canonical_lesson_periods("Tiết 5 Thứ 4, Tiết 1-1 Thứ 2, Tiết 2 Thứ 2, Tiết 3-4 Thứ 2"),
            "Tiết 1-4 Thứ 2, Tiết 5 Thứ 4"
        );
        assert_eq!(canonical_lesson_periods("garbage"), "");
    }

    #[test]
    fn canonical_form_is_stable() {
        let canonical = "Tiết 1-2 Thứ 2, Tiết 5 Thứ 4, Tiết 7-10 Chủ nhật";
        assert_eq!(canonical_lesson_periods(canonical), canonical);
    }

    #[test]
    fn toggling_cells_reserializes() {
        let mut selection = PeriodSelection::from_lesson_periods("Tiết 1-3 Thứ 2");

        assert!(!selection.toggle(Day::Monday, 2));
        assert_eq!(selection.to_lesson_periods(), "Tiết 1 Thứ 2, Tiết 3 Thứ 2");

        assert!(selection.toggle(Day::Monday, 2));
        assert!(selection.toggle(Day::Friday, 6));
        assert_eq!(selection.to_lesson_periods(), "Tiết 1-3 Thứ 2, Tiết 6 Thứ 6");
        assert!(selection.is_selected(Day::Friday, 6));
        assert_eq!(selection.periods(Day::Monday), vec![1, 2, 3]);
    }

    #[test]
    fn toggling_outside_the_grid_does_nothing() {
        let mut selection = PeriodSelection::new();
        assert!(!selection.toggle(Day::Monday, 0));
        assert!(!selection.toggle(Day::Monday, 11));
        assert!(selection.is_empty());
    }

    #[test]
    fn emptied_days_disappear() {
        let mut selection = PeriodSelection::new();
        selection.toggle(Day::Tuesday, 4);
        selection.toggle(Day::Tuesday, 4);
        assert!(selection.is_empty());
        assert_eq!(selection.to_lesson_periods(), "");
    }
}
