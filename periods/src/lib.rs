//! Lesson period codec.
//!
//! Lesson periods are stored as human readable strings such as
//! `"Tiết 1-2 Thứ 2, Tiết 5 Thứ 4"`. This crate turns them into structured
//! [`PeriodAssignment`]s and back, formats period sets as compact ranges, maps
//! periods to wall-clock times, and detects overlaps between the assignments
//! of a teacher.

mod conflict;
mod extract;
mod format;
mod lesson;
mod lookup;

pub use conflict::{find_conflicts, Conflict, ScheduledAssignment};
pub use extract::{extract_periods, first_period};
pub use format::format_periods;
pub use lesson::{
    canonical_lesson_periods, format_lesson_periods, parse_lesson_periods, PeriodAssignment,
    PeriodSelection,
};
pub use lookup::{
    full_name_to_short_name, period_range_time, period_time, short_name_to_full_name, Day,
};

/// First period of the school day grid.
pub const FIRST_PERIOD: u8 = 1;
/// Last period of the school day grid.
pub const LAST_PERIOD: u8 = 10;

/// Lowercases and strips diacritics and whitespace, so that `"Thứ hai"`,
/// `"thu hai"` and `"THUHAI"` compare equal.
pub(crate) fn normalize(s: &str) -> String {
    unidecode::unidecode(s)
        .to_ascii_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}
