use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use db::{
    grades::grade_report,
    models::{Semester, TeacherSubject},
    timetable::build_timetable,
    Database, JSONDatabase, NewTeacherSubject, ScoreFilter, TeacherSubjectFilter,
    TeacherSubjectUpdate,
};
use periods::Day;

const YEAR: &str = "2024-2025";

/// Database file removed when the test ends, whether it passed or not.
struct TempFile(PathBuf);

impl TempFile {
    fn new(prefix: &str) -> Self {
        TempFile(std::env::temp_dir().join(format!(
            "{}-{}.json",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        )))
    }

    fn name(&self) -> String {
        self.0.to_string_lossy().to_string()
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn fresh_db(prefix: &str) -> (JSONDatabase, TempFile) {
    let file = TempFile::new(prefix);
    let db = JSONDatabase::new(file.name());
    (db, file)
}

fn assignment(teacher_id: u32, lesson_period: &str) -> NewTeacherSubject {
    NewTeacherSubject {
        teacher_id,
        subject_id: 0,
        class_id: 2,
        lesson_period: lesson_period.to_string(),
        semester: Semester::First,
        school_year: YEAR.to_string(),
    }
}

#[test]
fn seeded_accounts_can_log_in() {
    let (mut db, _file) = fresh_db("seeded-accounts");

    let (user, token) = db
        .auth_login("user.teacher", "user.teacher")
        .map(|(u, t)| (u.clone(), t))
        .expect("seeded teacher");
    assert!(user.kind.is_teacher());
    assert_eq!(db.auth_get_user(&token).map(|u| u.id), Some(user.id));

    assert!(db.auth_logout(&token));
    assert!(db.auth_get_user(&token).is_none());
    assert!(db.auth_login("user.teacher", "wrong").is_none());
}

#[test]
fn database_is_reloaded_from_disk() {
    let (mut db, file) = fresh_db("reload");
    let id = db.teacher_subject_add(assignment(1, "Tiết 9 Thứ 7"));
    drop(db);

    let db = JSONDatabase::new(file.name());
    assert_eq!(
        db.teacher_subject_get(id).map(|a| a.lesson_period.as_str()),
        Some("Tiết 9 Thứ 7")
    );
}

#[test]
fn lesson_periods_are_stored_canonically() {
    let (mut db, _file) = fresh_db("canonical");

    let id = db.teacher_subject_add(assignment(4, "tiet 2 thu 4, Tiết 1-1 Thứ 4"));
    assert_eq!(
        db.teacher_subject_get(id).map(|a| a.lesson_period.as_str()),
        Some("Tiết 1-2 Thứ 4")
    );

    let status = db.teacher_subject_update(
        id,
        TeacherSubjectUpdate {
            lesson_period: Some("Tiết 10 CN".to_string()),
            ..TeacherSubjectUpdate::default()
        },
    );
    assert!(status.found && status.updated);
    assert_eq!(
        db.teacher_subject_get(id).map(|a| a.lesson_period.as_str()),
        Some("Tiết 10 Chủ nhật")
    );
}

#[test]
fn conflicts_are_found_against_the_teacher_assignments() {
    let (mut db, _file) = fresh_db("conflicts");

    // Teacher 1 teaches "Tiết 1-2 Thứ 2" and "Tiết 3-4 Thứ 2" in the seed.
    let conflicts = db.schedule_conflicts(1, "Tiết 2-3 Thứ 2", Semester::First, YEAR, None);
    assert_eq!(conflicts.len(), 2);
    assert!(conflicts[0].to_string().starts_with("Toán - 10A"));

    assert!(db.schedule_conflicts(1, "Tiết 5 Thứ 2", Semester::First, YEAR, None).is_empty());
    assert!(db.schedule_conflicts(2, "Tiết 1-2 Thứ 2", Semester::First, YEAR, None).is_empty());

    let id = db.teacher_subject_add(assignment(4, "Tiết 1-3 Thứ 2"));
    assert_eq!(db.schedule_conflicts(4, "Tiết 3-4 Thứ 2", Semester::First, YEAR, None).len(), 1);
    assert!(db.schedule_conflicts(4, "Tiết 4-5 Thứ 2", Semester::First, YEAR, None).is_empty());
    assert!(db.schedule_conflicts(4, "Tiết 1-3 Thứ 2", Semester::First, YEAR, Some(id)).is_empty());

    // Slots are only shared within one semester of one school year.
    assert!(db.schedule_conflicts(1, "Tiết 1-2 Thứ 2", Semester::Second, YEAR, None).is_empty());
    assert!(db
        .schedule_conflicts(1, "Tiết 1-2 Thứ 2", Semester::First, "2025-2026", None)
        .is_empty());
}

#[test]
fn timetable_groups_lessons_by_day() {
    let (db, _file) = fresh_db("timetable");

    let filter = TeacherSubjectFilter {
        class_id: Some(0),
        ..TeacherSubjectFilter::default()
    };
    let assignments: Vec<&TeacherSubject> = db.teacher_subject_list(&filter);
    let timetable = build_timetable(&db, &assignments);

    let monday = timetable.iter().find(|d| d.day == Day::Monday).expect("monday");
    let periods: Vec<&str> = monday.lessons.iter().map(|l| l.periods.as_str()).collect();
    assert_eq!(periods, vec!["1-2", "5"]);
    assert_eq!(monday.lessons[0].time, "07:00 - 08:35");
    assert_eq!(monday.lessons[0].subject_name, "Toán");
    assert_eq!(monday.name, "Thứ hai");

    let days: Vec<Day> = timetable.iter().map(|d| d.day).collect();
    let mut sorted = days.clone();
    sorted.sort();
    assert_eq!(days, sorted);
}

#[test]
fn referenced_rows_are_in_use() {
    let (mut db, _file) = fresh_db("in-use");

    assert!(db.class_in_use(0));
    assert!(db.subject_in_use(0));
    assert!(db.teacher_in_use(1));

    let filter = TeacherSubjectFilter {
        teacher_id: Some(4),
        ..TeacherSubjectFilter::default()
    };
    let ids: Vec<u32> = db.teacher_subject_list(&filter).iter().map(|a| a.id).collect();
    assert!(db.teacher_subject_remove(&ids));
    // Still homeroom teacher of 11B1
    assert!(db.teacher_in_use(4));

    assert!(!db.teacher_subject_remove(&[999]));
}

#[test]
fn removing_a_student_drops_their_scores() {
    let (mut db, _file) = fresh_db("student-scores");

    let student = db.user_get("user.student").map(|u| u.id).expect("student");
    let filter = ScoreFilter {
        student_id: Some(student),
        ..ScoreFilter::default()
    };

    let report = grade_report(&db.score_list(&filter));
    assert_eq!(report.subjects.len(), 3);
    assert!(report.gpa.is_some());

    assert!(db.user_remove(&[student]));
    assert!(db.score_list(&filter).is_empty());
}

#[test]
fn homonyms_get_distinct_usernames() {
    let (mut db, _file) = fresh_db("homonyms");

    let new_user = || db::NewUser {
        first_name: "An".to_string(),
        last_name: "Nguyễn".to_string(),
        password: "secret".to_string(),
        kind: db::models::UserKind::Administrator,
    };

    let first = db.user_add(new_user()).username.clone();
    let second = db.user_add(new_user()).username.clone();
    assert_eq!(first, "nguyen.an");
    assert_eq!(second, "nguyen.an2");
}
