use periods::{parse_lesson_periods, period_range_time, Day};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::{models::TeacherSubject, Database};

#[derive(Serialize, Debug)]
pub struct TimetableDay {
    pub day: Day,
    pub name: &'static str,
    pub lessons: Vec<TimetableLesson>,
}

#[derive(Serialize, Debug)]
pub struct TimetableLesson {
    pub teacher_subject_id: u32,
    pub start_period: u8,
    pub end_period: u8,
    /// e.g. `"1-2"`
    pub periods: String,
    /// e.g. `"07:00 - 08:35"`
    pub time: String,
    pub subject_name: String,
    pub class_name: String,
    pub teacher_name: String,
}

/// Week view of the given assignments: one entry per day that has lessons,
/// lessons ordered by their first period.
pub fn build_timetable<D: Database>(db: &D, assignments: &[&TeacherSubject]) -> Vec<TimetableDay> {
    let mut days: BTreeMap<Day, Vec<TimetableLesson>> = BTreeMap::new();

    for assignment in assignments {
        let subject_name = db
            .subject_get(assignment.subject_id)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let class_name = db
            .class_get(assignment.class_id)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        let teacher_name = db
            .user_get_by_id(assignment.teacher_id)
            .map(|u| u.full_name())
            .unwrap_or_default();

        for slot in parse_lesson_periods(&assignment.lesson_period) {
            days.entry(slot.day()).or_default().push(TimetableLesson {
                teacher_subject_id: assignment.id,
                start_period: slot.start(),
                end_period: slot.end(),
                periods: slot.range_label(),
                time: period_range_time(slot.start(), slot.end()),
                subject_name: subject_name.clone(),
                class_name: class_name.clone(),
                teacher_name: teacher_name.clone(),
            });
        }
    }

    days.into_iter()
        .map(|(day, mut lessons)| {
            lessons.sort_by_key(|l| (l.start_period, l.end_period));

            TimetableDay {
                day,
                name: day.full_name(),
                lessons,
            }
        })
        .collect()
}

/// Lessons of a single day, e.g. for the dashboards.
pub fn lessons_of_day<D: Database>(
    db: &D,
    assignments: &[&TeacherSubject],
    day: Day,
) -> Vec<TimetableLesson> {
    build_timetable(db, assignments)
        .into_iter()
        .find(|d| d.day == day)
        .map(|d| d.lessons)
        .unwrap_or_default()
}
