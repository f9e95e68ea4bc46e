use periods::ScheduledAssignment;
use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct User {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
    pub kind: UserKind,
}

impl User {
    /// Vietnamese order: family name first.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    pub fn student_informations(&self) -> Option<&StudentInformations> {
        match &self.kind {
            UserKind::Student(informations) => Some(informations),
            UserKind::Administrator | UserKind::Teacher(_) => None,
        }
    }

    pub fn teacher_informations(&self) -> Option<&TeacherInformations> {
        match &self.kind {
            UserKind::Teacher(informations) => Some(informations),
            UserKind::Administrator | UserKind::Student(_) => None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub enum UserKind {
    Administrator,
    Teacher(TeacherInformations),
    Student(StudentInformations),
}

impl UserKind {
    pub fn is_teacher(&self) -> bool {
        matches!(self, Self::Teacher(_))
    }

    pub fn is_student(&self) -> bool {
        matches!(self, Self::Student(_))
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct TeacherInformations {
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub degree: Degree,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum Degree {
    #[serde(rename = "CN")]
    Bachelor,
    #[serde(rename = "THS")]
    Master,
    #[serde(rename = "TS")]
    Doctor,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct StudentInformations {
    pub class_id: u32,
    pub date_of_birth: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Class {
    pub id: u32,
    pub name: String,
    pub grade_level: u8,
    pub school_year: String,
    /// GVCN
    pub homeroom_teacher_id: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Subject {
    pub id: u32,
    pub name: String,
    pub code: String,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Semester {
    #[serde(rename = "HK1")]
    First,
    #[serde(rename = "HK2")]
    Second,
}

/// A teacher teaching a subject to a class, on the periods of `lesson_period`.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct TeacherSubject {
    pub id: u32,
    pub teacher_id: u32,
    pub subject_id: u32,
    pub class_id: u32,
    pub lesson_period: String,
    pub semester: Semester,
    pub school_year: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Score {
    pub id: u32,
    pub student_id: u32,
    pub subject_id: u32,
    pub kind: ScoreKind,
    pub value: f64,
    pub semester: Semester,
    pub school_year: String,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub enum ScoreKind {
    #[serde(rename = "ORAL")]
    Oral,
    #[serde(rename = "15M")]
    FifteenMinutes,
    #[serde(rename = "MID")]
    Midterm,
    #[serde(rename = "FINAL")]
    Final,
}

/// A teacher-subject assignment together with the names used in conflict messages.
pub struct LabelledAssignment<'a> {
    pub assignment: &'a TeacherSubject,
    pub subject_name: &'a str,
    pub class_name: &'a str,
}

impl ScheduledAssignment for LabelledAssignment<'_> {
    fn id(&self) -> u32 {
        self.assignment.id
    }

    fn teacher_id(&self) -> u32 {
        self.assignment.teacher_id
    }

    fn lesson_period(&self) -> &str {
        &self.assignment.lesson_period
    }

    fn label(&self) -> String {
        format!("{} - {}", self.subject_name, self.class_name)
    }
}
