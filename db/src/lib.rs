use serde::{Deserialize, Deserializer};
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;

pub mod grades;
mod json;
pub mod models;
mod seed;
pub mod timetable;

pub use json::{DbError, JSONDatabase};
use models::{
    Class, LabelledAssignment, Score, ScoreKind, Semester, Subject, TeacherSubject, User,
    UserKind,
};
use periods::{find_conflicts, Conflict};

pub const PAGE_SIZE: usize = 10;

pub type Db = Arc<Mutex<JSONDatabase>>;

pub fn new_db(filename: String) -> Db {
    Arc::new(Mutex::new(JSONDatabase::new(filename)))
}

/// Storage operations. The provided methods hold the cross-table rules shared by the routes.
pub trait Database {
    fn reset(&mut self);
    fn seed(
        &mut self,
        users: impl Iterator<Item = NewUser>,
        classes: impl Iterator<Item = NewClass>,
        subjects: impl Iterator<Item = NewSubject>,
        teacher_subjects: impl Iterator<Item = NewTeacherSubject>,
        scores: impl Iterator<Item = NewScore>,
    );
    fn dump_as_json(&self) -> Result<String, serde_json::Error>;

    fn delay_set(&mut self, delay: Duration);
    fn delay_get(&self) -> Duration;

    fn auth_login(&mut self, username: &str, password: &str) -> Option<(&User, String)>;
    fn auth_logout(&mut self, token: &str) -> bool;
    fn auth_get_user(&self, token: &str) -> Option<&User>;

    fn user_add(&mut self, user: NewUser) -> &User;
    fn user_get(&self, username: &str) -> Option<&User>;
    fn user_get_by_id(&self, id: u32) -> Option<&User>;
    fn user_update(&mut self, user: User);
    fn user_list(
        &self,
        page: Option<usize>,
        query: Option<&str>,
        filter: impl Fn(&User) -> bool,
    ) -> (usize, Vec<&User>);
    /// Also drops the sessions and scores of the removed users.
    fn user_remove(&mut self, users: &[u32]) -> bool;

    fn user_get_teacher_by_id(&self, id: u32) -> Option<&User> {
        self.user_get_by_id(id).filter(|u| u.kind.is_teacher())
    }

    fn user_get_student_by_id(&self, id: u32) -> Option<&User> {
        self.user_get_by_id(id).filter(|u| u.kind.is_student())
    }

    fn class_list(&self, page: Option<usize>, query: Option<&str>) -> (usize, Vec<&Class>);
    fn class_add(&mut self, class: NewClass) -> u32;
    fn class_remove(&mut self, classes: &[u32]) -> bool;
    fn class_get(&self, id: u32) -> Option<&Class>;
    fn class_update(&mut self, id: u32, update: ClassUpdate) -> UpdateStatus;

    fn subject_list(&self, page: Option<usize>, query: Option<&str>) -> (usize, Vec<&Subject>);
    fn subject_add(&mut self, subject: NewSubject) -> u32;
    fn subject_remove(&mut self, subjects: &[u32]) -> bool;
    fn subject_get(&self, id: u32) -> Option<&Subject>;
    fn subject_update(&mut self, id: u32, update: SubjectUpdate) -> UpdateStatus;

    fn teacher_subject_list(&self, filter: &TeacherSubjectFilter) -> Vec<&TeacherSubject>;
    fn teacher_subject_add(&mut self, teacher_subject: NewTeacherSubject) -> u32;
    fn teacher_subject_remove(&mut self, teacher_subjects: &[u32]) -> bool;
    fn teacher_subject_get(&self, id: u32) -> Option<&TeacherSubject>;
    fn teacher_subject_update(&mut self, id: u32, update: TeacherSubjectUpdate) -> UpdateStatus;

    fn score_list(&self, filter: &ScoreFilter) -> Vec<&Score>;
    fn score_add(&mut self, score: NewScore) -> u32;
    fn score_remove(&mut self, scores: &[u32]) -> bool;
    fn score_get(&self, id: u32) -> Option<&Score>;
    fn score_update(&mut self, id: u32, update: ScoreUpdate) -> UpdateStatus;

    fn class_students(&self, class_id: u32) -> Vec<&User> {
        self.user_list(None, None, |u| {
            u.student_informations()
                .map_or(false, |informations| informations.class_id == class_id)
        })
        .1
    }

    /// Classes still referenced by a student or an assignment cannot be removed.
    fn class_in_use(&self, class_id: u32) -> bool {
        let filter = TeacherSubjectFilter {
            class_id: Some(class_id),
            ..TeacherSubjectFilter::default()
        };

        !self.class_students(class_id).is_empty()
            || !self.teacher_subject_list(&filter).is_empty()
    }

    fn subject_in_use(&self, subject_id: u32) -> bool {
        let assignments = TeacherSubjectFilter {
            subject_id: Some(subject_id),
            ..TeacherSubjectFilter::default()
        };
        let scores = ScoreFilter {
            subject_id: Some(subject_id),
            ..ScoreFilter::default()
        };

        !self.teacher_subject_list(&assignments).is_empty()
            || !self.score_list(&scores).is_empty()
    }

    /// A teacher with assignments or a homeroom class cannot be removed.
    fn teacher_in_use(&self, teacher_id: u32) -> bool {
        let filter = TeacherSubjectFilter {
            teacher_id: Some(teacher_id),
            ..TeacherSubjectFilter::default()
        };

        !self.teacher_subject_list(&filter).is_empty()
            || self
                .class_list(None, None)
                .1
                .iter()
                .any(|c| c.homeroom_teacher_id == Some(teacher_id))
    }

    /// Most recent semester of the most recent school year holding an assignment or a score.
    fn latest_term(&self) -> Option<(Semester, String)> {
        let assignments = self
            .teacher_subject_list(&TeacherSubjectFilter::default())
            .into_iter()
            .map(|a| (&a.school_year, a.semester));
        let scores = self
            .score_list(&ScoreFilter::default())
            .into_iter()
            .map(|s| (&s.school_year, s.semester));

        assignments
            .chain(scores)
            .max()
            .map(|(school_year, semester)| (semester, school_year.clone()))
    }

    /// Matching assignments, with the subject and class names of each.
    fn labelled_assignments(&self, filter: &TeacherSubjectFilter) -> Vec<LabelledAssignment<'_>> {
        self.teacher_subject_list(filter)
            .into_iter()
            .map(|assignment| LabelledAssignment {
                assignment,
                subject_name: self
                    .subject_get(assignment.subject_id)
                    .map_or("?", |s| s.name.as_str()),
                class_name: self
                    .class_get(assignment.class_id)
                    .map_or("?", |c| c.name.as_str()),
            })
            .collect()
    }

    /// Overlaps between `lesson_period` and the other assignments of the teacher
    /// in the same semester of the same school year.
    fn schedule_conflicts(
        &self,
        teacher_id: u32,
        lesson_period: &str,
        semester: Semester,
        school_year: &str,
        exclude: Option<u32>,
    ) -> Vec<Conflict> {
        let filter = TeacherSubjectFilter {
            teacher_id: Some(teacher_id),
            semester: Some(semester),
            school_year: Some(school_year.to_string()),
            ..TeacherSubjectFilter::default()
        };

        find_conflicts(
            teacher_id,
            lesson_period,
            &self.labelled_assignments(&filter),
            exclude,
        )
    }
}

pub fn username_from_name(first_name: &str, last_name: &str) -> String {
    unidecode::unidecode(&format!("{} {}", last_name, first_name))
        .trim()
        .to_ascii_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(".")
}

/// `"2024-2025"`: two consecutive years.
pub fn is_valid_school_year(school_year: &str) -> bool {
    let mut parts = school_year.splitn(2, '-');

    let years = (
        parts.next().and_then(|y| y.trim().parse::<u16>().ok()),
        parts.next().and_then(|y| y.trim().parse::<u16>().ok()),
    );

    match years {
        (Some(start), Some(end)) => start.checked_add(1) == Some(end),
        _ => false,
    }
}

/// Scores are out of 10.
pub fn is_valid_score(value: f64) -> bool {
    value.is_finite() && (0.0..=10.0).contains(&value)
}

/// Distinguishes a missing field from an explicit `null`, for `Option<Option<T>>` updates.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub kind: UserKind,
}

pub struct UpdateStatus {
    pub found: bool,
    pub updated: bool,
}

impl UpdateStatus {
    fn not_found() -> Self {
        Self {
            found: false,
            updated: false,
        }
    }
}

#[derive(Deserialize)]
pub struct NewClass {
    pub name: String,
    pub grade_level: u8,
    pub school_year: String,
    pub homeroom_teacher_id: Option<u32>,
}

#[derive(Deserialize)]
pub struct ClassUpdate {
    pub name: Option<String>,
    pub grade_level: Option<u8>,
    pub school_year: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub homeroom_teacher_id: Option<Option<u32>>,
}

#[derive(Deserialize)]
pub struct NewSubject {
    pub name: String,
    pub code: String,
}

#[derive(Deserialize)]
pub struct SubjectUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
}

#[derive(Deserialize, Clone)]
pub struct NewTeacherSubject {
    pub teacher_id: u32,
    pub subject_id: u32,
    pub class_id: u32,
    pub lesson_period: String,
    pub semester: Semester,
    pub school_year: String,
}

#[derive(Deserialize, Default)]
pub struct TeacherSubjectUpdate {
    pub teacher_id: Option<u32>,
    pub subject_id: Option<u32>,
    pub class_id: Option<u32>,
    pub lesson_period: Option<String>,
    pub semester: Option<Semester>,
    pub school_year: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
pub struct TeacherSubjectFilter {
    pub teacher_id: Option<u32>,
    pub subject_id: Option<u32>,
    pub class_id: Option<u32>,
    pub semester: Option<Semester>,
    pub school_year: Option<String>,
}

impl TeacherSubjectFilter {
    pub fn matches(&self, assignment: &TeacherSubject) -> bool {
        self.teacher_id.map_or(true, |id| assignment.teacher_id == id)
            && self.subject_id.map_or(true, |id| assignment.subject_id == id)
            && self.class_id.map_or(true, |id| assignment.class_id == id)
            && self.semester.map_or(true, |s| assignment.semester == s)
            && self
                .school_year
                .as_ref()
                .map_or(true, |y| &assignment.school_year == y)
    }
}

#[derive(Deserialize)]
pub struct NewScore {
    pub student_id: u32,
    pub subject_id: u32,
    pub kind: ScoreKind,
    pub value: f64,
    pub semester: Semester,
    pub school_year: String,
}

#[derive(Deserialize)]
pub struct ScoreUpdate {
    pub kind: Option<ScoreKind>,
    pub value: Option<f64>,
}

#[derive(Deserialize, Default, Debug)]
pub struct ScoreFilter {
    pub student_id: Option<u32>,
    pub subject_id: Option<u32>,
    pub semester: Option<Semester>,
    pub school_year: Option<String>,
}

impl ScoreFilter {
    pub fn matches(&self, score: &Score) -> bool {
        self.student_id.map_or(true, |id| score.student_id == id)
            && self.subject_id.map_or(true, |id| score.subject_id == id)
            && self.semester.map_or(true, |s| score.semester == s)
            && self
                .school_year
                .as_ref()
                .map_or(true, |y| &score.school_year == y)
    }
}
