use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use super::globals::{success_reply, ErrorCode, FailureResponse};
use crate::utils::today;
use db::{
    grades::{grade_report, Classification},
    models::{Semester, User},
    timetable::{lessons_of_day, TimetableLesson},
    Database, Db, ScoreFilter, TeacherSubjectFilter,
};
use filters::{authed, delayed, with_db, Role, Session};
use periods::Day;

pub fn routes(db: &Db) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "dashboard")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and(warp::query::<DashboardRequest>())
        .and_then(dashboard)
        .and(delayed(db))
        .boxed()
}

#[derive(Deserialize)]
struct DashboardRequest {
    /// Defaults to the current day.
    day: Option<Day>,
    semester: Option<Semester>,
    school_year: Option<String>,
}

impl DashboardRequest {
    /// The requested term, or the latest one holding data when none is given.
    fn term<D: Database>(&self, db: &D) -> (Option<Semester>, Option<String>) {
        if self.semester.is_some() || self.school_year.is_some() {
            return (self.semester, self.school_year.clone());
        }

        match db.latest_term() {
            Some((semester, school_year)) => (Some(semester), Some(school_year)),
            None => (None, None),
        }
    }
}

#[derive(Serialize)]
struct AdministratorDashboard {
    status: &'static str,
    kind: &'static str,
    semester: Option<Semester>,
    school_year: Option<String>,
    students: usize,
    teachers: usize,
    classes: usize,
    subjects: usize,
    teacher_subjects: usize,
}

#[derive(Serialize)]
struct TeacherDashboard<'a> {
    status: &'static str,
    kind: &'static str,
    day: Day,
    semester: Option<Semester>,
    school_year: Option<String>,
    teacher_subjects: usize,
    homeroom_class: Option<&'a str>,
    lessons: Vec<TimetableLesson>,
}

#[derive(Serialize)]
struct StudentDashboard<'a> {
    status: &'static str,
    kind: &'static str,
    day: Day,
    semester: Option<Semester>,
    school_year: Option<String>,
    class_name: Option<&'a str>,
    gpa: Option<f64>,
    classification: Option<Classification>,
    lessons: Vec<TimetableLesson>,
}

async fn dashboard(
    session: Session,
    db: Db,
    request: DashboardRequest,
) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;
    let day = request.day.unwrap_or_else(today);
    let (semester, school_year) = request.term(&*db);
    let in_term = || TeacherSubjectFilter {
        semester,
        school_year: school_year.clone(),
        ..TeacherSubjectFilter::default()
    };

    match session.role {
        Role::Administrator => {
            let count = |filter: fn(&User) -> bool| db.user_list(None, None, filter).0;

            Ok(success_reply(&AdministratorDashboard {
                status: "success",
                kind: session.role.code(),
                students: count(|u| u.kind.is_student()),
                teachers: count(|u| u.kind.is_teacher()),
                classes: db.class_list(None, None).0,
                subjects: db.subject_list(None, None).0,
                teacher_subjects: db.teacher_subject_list(&in_term()).len(),
                semester,
                school_year,
            }))
        }
        Role::Teacher => {
            let assignments = db.teacher_subject_list(&TeacherSubjectFilter {
                teacher_id: Some(session.user_id),
                ..in_term()
            });

            let homeroom_class = db
                .class_list(None, None)
                .1
                .into_iter()
                .find(|c| c.homeroom_teacher_id == Some(session.user_id))
                .map(|c| c.name.as_str());

            Ok(success_reply(&TeacherDashboard {
                status: "success",
                kind: session.role.code(),
                day,
                teacher_subjects: assignments.len(),
                homeroom_class,
                lessons: lessons_of_day(&*db, &assignments, day),
                semester,
                school_year,
            }))
        }
        Role::Student => {
            let class_id = match db
                .user_get_student_by_id(session.user_id)
                .and_then(|u| u.student_informations())
            {
                Some(informations) => informations.class_id,
                None => {
                    return Ok(FailureResponse::reply(
                        ErrorCode::InvalidID,
                        StatusCode::NOT_FOUND,
                    ))
                }
            };

            let assignments = db.teacher_subject_list(&TeacherSubjectFilter {
                class_id: Some(class_id),
                ..in_term()
            });

            let report = grade_report(&db.score_list(&ScoreFilter {
                student_id: Some(session.user_id),
                semester,
                school_year: school_year.clone(),
                ..ScoreFilter::default()
            }));

            Ok(success_reply(&StudentDashboard {
                status: "success",
                kind: session.role.code(),
                day,
                class_name: db.class_get(class_id).map(|c| c.name.as_str()),
                gpa: report.gpa,
                classification: report.classification,
                lessons: lessons_of_day(&*db, &assignments, day),
                semester,
                school_year,
            }))
        }
    }
}
