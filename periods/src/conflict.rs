use serde::Serialize;
use std::fmt;

use crate::lesson::{parse_lesson_periods, PeriodAssignment};

/// A stored assignment that occupies lesson periods of a teacher.
pub trait ScheduledAssignment {
    fn id(&self) -> u32;
    fn teacher_id(&self) -> u32;
    fn lesson_period(&self) -> &str;
    /// Human readable name used in conflict messages, e.g. `"Toán - 10A1"`.
    fn label(&self) -> String;
}

impl<T: ScheduledAssignment + ?Sized> ScheduledAssignment for &T {
    fn id(&self) -> u32 {
        (**self).id()
    }

    fn teacher_id(&self) -> u32 {
        (**self).teacher_id()
    }

    fn lesson_period(&self) -> &str {
        (**self).lesson_period()
    }

    fn label(&self) -> String {
        (**self).label()
    }
}

/// An existing slot that overlaps a proposed one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub assignment_id: u32,
    pub label: String,
    pub existing: PeriodAssignment,
    pub proposed: PeriodAssignment,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} trùng với Tiết {}",
            self.label,
            self.existing,
            self.proposed.range_label()
        )
    }
}

/// Reports every overlap between `proposed` and the other assignments of
/// the same teacher. `exclude` is the assignment being edited, which never
/// conflicts with itself.
pub fn find_conflicts<A: ScheduledAssignment>(
    teacher_id: u32,
    proposed: &str,
    existing: &[A],
    exclude: Option<u32>,
) -> Vec<Conflict> {
    let proposed = parse_lesson_periods(proposed);

    if proposed.is_empty() {
        return Vec::new();
    }

    let mut conflicts = Vec::new();

    let others = existing.iter().filter(|a| {
        a.teacher_id() == teacher_id
            && Some(a.id()) != exclude
            && !a.lesson_period().trim().is_empty()
    });

    for other in others {
        let slots = parse_lesson_periods(other.lesson_period());

        for wanted in &proposed {
            for slot in slots.iter().filter(|slot| wanted.overlaps(slot)) {
                conflicts.push(Conflict {
                    assignment_id: other.id(),
                    label: other.label(),
                    existing: *slot,
                    proposed: *wanted,
                });
            }
        }
    }

    conflicts
}
