use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::{
    http::StatusCode,
    reply::{Json, WithStatus},
    Filter, Rejection, Reply,
};

use super::globals::{success_reply, ErrorCode, FailureResponse};
use db::{
    models::Semester,
    timetable::{build_timetable, TimetableDay},
    Database, Db, TeacherSubjectFilter,
};
use filters::{authed, authed_is_of_kind, delayed, with_db, Role, Session, Unauthorized};

pub fn routes(db: &Db) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let student_route = warp::path!("api" / "students" / u32 / "schedule")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and(warp::query::<ScheduleRequest>())
        .and_then(student_schedule)
        .and(delayed(db))
        .boxed();

    let class_route = warp::path!("api" / "classes" / u32 / "schedule")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and(warp::query::<ScheduleRequest>())
        .and_then(class_schedule)
        .and(delayed(db))
        .boxed();

    let teacher_route = warp::path!("api" / "teachers" / u32 / "schedule")
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Administrator, Role::Teacher]))
        .and(with_db(db.clone()))
        .and(warp::query::<ScheduleRequest>())
        .and_then(teacher_schedule)
        .and(delayed(db))
        .boxed();

    student_route.or(class_route).or(teacher_route)
}

#[derive(Deserialize, Debug)]
struct ScheduleRequest {
    semester: Option<Semester>,
    school_year: Option<String>,
}

impl ScheduleRequest {
    fn filter(self) -> TeacherSubjectFilter {
        TeacherSubjectFilter {
            semester: self.semester,
            school_year: self.school_year,
            ..TeacherSubjectFilter::default()
        }
    }
}

#[derive(Serialize)]
struct ScheduleResponse {
    status: &'static str,
    days: Vec<TimetableDay>,
}

fn schedule_reply<D: Database>(db: &D, filter: &TeacherSubjectFilter) -> WithStatus<Json> {
    let assignments = db.teacher_subject_list(filter);

    success_reply(&ScheduleResponse {
        status: "success",
        days: build_timetable(db, &assignments),
    })
}

async fn student_schedule(
    id: u32,
    session: Session,
    db: Db,
    request: ScheduleRequest,
) -> Result<impl warp::Reply, Rejection> {
    if !session.can_see_student(id) {
        return Err(warp::reject::custom(Unauthorized));
    }

    let db = db.lock().await;

    let class_id = match db
        .user_get_student_by_id(id)
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

    let filter = TeacherSubjectFilter {
        class_id: Some(class_id),
        ..request.filter()
    };

    Ok(schedule_reply(&*db, &filter))
}

async fn class_schedule(
    id: u32,
    _session: Session,
    db: Db,
    request: ScheduleRequest,
) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;

    if db.class_get(id).is_none() {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidID,
            StatusCode::NOT_FOUND,
        ));
    }

    let filter = TeacherSubjectFilter {
        class_id: Some(id),
        ..request.filter()
    };

    Ok(schedule_reply(&*db, &filter))
}

async fn teacher_schedule(
    id: u32,
    _session: Session,
    db: Db,
    request: ScheduleRequest,
) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;

    if db.user_get_teacher_by_id(id).is_none() {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidID,
            StatusCode::NOT_FOUND,
        ));
    }

    let filter = TeacherSubjectFilter {
        teacher_id: Some(id),
        ..request.filter()
    };

    Ok(schedule_reply(&*db, &filter))
}
