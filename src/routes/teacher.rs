use log::info;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use super::{
    globals::{
        success_reply, AccountCreatedResponse, PaginatedQueryableListRequest,
        SimpleSuccessResponse,
    },
    ErrorCode, FailureResponse,
};
use crate::utils::generate_password;
use db::{
    deserialize_some,
    models::{Degree, TeacherInformations, User, UserKind},
    Database, Db, NewUser, TeacherSubjectFilter,
};
use filters::{authed_is_of_kind, delayed, id_list, with_db, Role, Session};

pub fn routes(db: &Db) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list_route = warp::path!("api" / "teachers")
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Administrator, Role::Teacher]))
        .and(with_db(db.clone()))
        .and(warp::query::<PaginatedQueryableListRequest>())
        .and_then(list)
        .and(delayed(db))
        .boxed();

    let create_route = warp::path!("api" / "teachers")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(create)
        .and(delayed(db))
        .boxed();

    let delete_route = warp::path!("api" / "teachers")
        .and(warp::delete())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(id_list())
        .and_then(delete)
        .and(delayed(db))
        .boxed();

    let get_route = warp::path!("api" / "teachers" / u32)
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Administrator, Role::Teacher]))
        .and(with_db(db.clone()))
        .and_then(get)
        .and(delayed(db))
        .boxed();

    let update_route = warp::path!("api" / "teachers" / u32)
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
    teachers: Vec<Teacher<'a>>,
}

#[derive(Serialize)]
struct Teacher<'a> {
    id: u32,
    username: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    email: Option<&'a str>,
    phone_number: Option<&'a str>,
    degree: &'a Degree,
}

impl<'a> Teacher<'a> {
    fn of(user: &'a User) -> Option<Self> {
        let informations = user.teacher_informations()?;

        Some(Self {
            id: user.id,
            username: &user.username,
            first_name: &user.first_name,
            last_name: &user.last_name,
            email: informations.email.as_deref(),
            phone_number: informations.phone_number.as_deref(),
            degree: &informations.degree,
        })
    }
}

async fn list(
    _session: Session,
    db: Db,
    request: PaginatedQueryableListRequest,
) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;

    let page = request.normalized_page_number();
    let (total, users) = db.user_list(Some(page), request.query.as_deref(), |u| {
        u.kind.is_teacher()
    });

    Ok(warp::reply::json(&ListResponse {
        status: "success",
        total,
        teachers: users.into_iter().filter_map(Teacher::of).collect(),
    }))
}

#[derive(Deserialize)]
struct NewTeacher {
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone_number: Option<String>,
    degree: Degree,
}

async fn create(
    _session: Session,
    db: Db,
    request: NewTeacher,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    let user = db.user_add(NewUser {
        first_name: request.first_name,
        last_name: request.last_name,
        password: generate_password(),
        kind: UserKind::Teacher(TeacherInformations {
            phone_number: request.phone_number,
            email: request.email,
            degree: request.degree,
        }),
    });

    info!("Created teacher account {}", user.username);

    Ok(warp::reply::with_status(
        warp::reply::json(&AccountCreatedResponse {
            status: "success",
            id: user.id,
            username: &user.username,
            password: &user.password,
        }),
        StatusCode::CREATED,
    ))
}

async fn delete(
    _session: Session,
    db: Db,
    request: Vec<u32>,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    let all_exist_and_teacher = request
        .iter()
        .all(|id| db.user_get_teacher_by_id(*id).is_some());

    if !all_exist_and_teacher {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidID,
            StatusCode::NOT_FOUND,
        ));
    }

    if request.iter().any(|id| db.teacher_in_use(*id)) {
        return Ok(FailureResponse::reply(
            ErrorCode::TeacherUsed,
            StatusCode::CONFLICT,
        ));
    }

    db.user_remove(&request);
    Ok(SimpleSuccessResponse::reply(StatusCode::OK))
}

#[derive(Serialize)]
struct GetResponse<'a> {
    status: &'static str,
    teacher: Teacher<'a>,
    homeroom_classes: Vec<&'a str>,
    teacher_subjects: usize,
}

async fn get(id: u32, _session: Session, db: Db) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;

    let teacher = match db.user_get_teacher_by_id(id).and_then(Teacher::of) {
        Some(teacher) => teacher,
        None => {
            return Ok(FailureResponse::reply(
                ErrorCode::InvalidID,
                StatusCode::NOT_FOUND,
            ))
        }
    };

    let homeroom_classes = db
        .class_list(None, None)
        .1
        .into_iter()
        .filter(|c| c.homeroom_teacher_id == Some(id))
        .map(|c| c.name.as_str())
        .collect();

    Ok(success_reply(&GetResponse {
        status: "success",
        teacher,
        homeroom_classes,
        teacher_subjects: db
            .teacher_subject_list(&TeacherSubjectFilter {
                teacher_id: Some(id),
                ..TeacherSubjectFilter::default()
            })
            .len(),
    }))
}

#[derive(Deserialize, Debug)]
struct TeacherUpdate {
    first_name: Option<String>,
    last_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    email: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    phone_number: Option<Option<String>>,
    degree: Option<Degree>,
    password: Option<String>,
}

async fn update(
    id: u32,
    _session: Session,
    db: Db,
    request: TeacherUpdate,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    let mut user = match db.user_get_teacher_by_id(id) {
        Some(user) => user.clone(),
        None => {
            return Ok(FailureResponse::reply(
                ErrorCode::InvalidID,
                StatusCode::NOT_FOUND,
            ))
        }
    };

    let mut updated = false;

    macro_rules! update {
        ($obj:ident, $property:ident) => {
            if let Some(value) = request.$property {
                $obj.$property = value;
                updated = true;
            }
        };
    }

    update!(user, first_name);
    update!(user, last_name);
    update!(user, password);

    if let UserKind::Teacher(informations) = &mut user.kind {
        update!(informations, email);
        update!(informations, phone_number);
        update!(informations, degree);
    }

    if updated {
        db.user_update(user);
        Ok(SimpleSuccessResponse::reply(StatusCode::OK))
    } else {
        Ok(SimpleSuccessResponse::reply(StatusCode::NO_CONTENT))
    }
}
