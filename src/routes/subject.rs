use serde::Serialize;
use std::convert::Infallible;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use super::{
    globals::{
        success_reply, update_reply, CreatedResponse, PaginatedQueryableListRequest,
        SimpleSuccessResponse,
    },
    ErrorCode, FailureResponse,
};
use db::{models::Subject, Database, Db, NewSubject, SubjectUpdate, TeacherSubjectFilter};
use filters::{authed, authed_is_of_kind, delayed, id_list, with_db, Role, Session};

pub fn routes(db: &Db) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list_route = warp::path!("api" / "subjects")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and(warp::query::<PaginatedQueryableListRequest>())
        .and_then(list)
        .and(delayed(db))
        .boxed();

    let create_route = warp::path!("api" / "subjects")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(create)
        .and(delayed(db))
        .boxed();

    let delete_route = warp::path!("api" / "subjects")
        .and(warp::delete())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(id_list())
        .and_then(delete)
        .and(delayed(db))
        .boxed();

    let get_route = warp::path!("api" / "subjects" / u32)
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and_then(get)
        .and(delayed(db))
        .boxed();

    let update_route = warp::path!("api" / "subjects" / u32)
        .and(warp::put())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(update)
        .and(delayed(db))
        .boxed();

    list_route
        .or(create_route)
        .or(delete_route)
        .or(get_route)
        .or(update_route)
}

#[derive(Serialize)]
struct ListResponse<'a> {
    status: &'static str,
    total: usize,
    subjects: Vec<&'a Subject>,
}

async fn list(
    _session: Session,
    db: Db,
    request: PaginatedQueryableListRequest,
) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;

    let page = request.normalized_page_number();
    let (total, subjects) = db.subject_list(Some(page), request.query.as_deref());

    Ok(warp::reply::json(&ListResponse {
        status: "success",
        total,
        subjects,
    }))
}

async fn create(
    _session: Session,
    db: Db,
    request: NewSubject,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    if request.name.trim().is_empty() || request.code.trim().is_empty() {
        return Ok(FailureResponse::reply(
            ErrorCode::MalformedData,
            StatusCode::BAD_REQUEST,
        ));
    }

    Ok(CreatedResponse::reply(db.subject_add(request)))
}

async fn delete(
    _session: Session,
    db: Db,
    request: Vec<u32>,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    if !request.iter().all(|id| db.subject_get(*id).is_some()) {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidID,
            StatusCode::NOT_FOUND,
        ));
    }

    if request.iter().any(|id| db.subject_in_use(*id)) {
        return Ok(FailureResponse::reply(
            ErrorCode::SubjectUsed,
            StatusCode::CONFLICT,
        ));
    }

    db.subject_remove(&request);
    Ok(SimpleSuccessResponse::reply(StatusCode::OK))
}

#[derive(Serialize)]
struct GetResponse<'a> {
    status: &'static str,
    subject: &'a Subject,
    teachers: Vec<SubjectTeacher>,
}

#[derive(Serialize)]
struct SubjectTeacher {
    teacher_id: u32,
    teacher_name: String,
    class_id: u32,
}

async fn get(id: u32, _session: Session, db: Db) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;

    let subject = match db.subject_get(id) {
        Some(subject) => subject,
        None => {
            return Ok(FailureResponse::reply(
                ErrorCode::InvalidID,
                StatusCode::NOT_FOUND,
            ))
        }
    };

    let teachers = db
        .teacher_subject_list(&TeacherSubjectFilter {
            subject_id: Some(id),
            ..TeacherSubjectFilter::default()
        })
        .into_iter()
        .map(|a| SubjectTeacher {
            teacher_id: a.teacher_id,
            teacher_name: db
                .user_get_by_id(a.teacher_id)
                .map(|u| u.full_name())
                .unwrap_or_default(),
            class_id: a.class_id,
        })
        .collect();

    Ok(success_reply(&GetResponse {
        status: "success",
        subject,
        teachers,
    }))
}

async fn update(
    id: u32,
    _session: Session,
    db: Db,
    request: SubjectUpdate,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;
    Ok(update_reply(db.subject_update(id, request)))
}
