use log::info;
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
use db::{is_valid_school_year, models::Class, ClassUpdate, Database, Db, NewClass};
use filters::{authed_is_of_kind, delayed, id_list, with_db, Role, Session};

pub fn routes(db: &Db) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list_route = warp::path!("api" / "classes")
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Administrator, Role::Teacher]))
        .and(with_db(db.clone()))
        .and(warp::query::<PaginatedQueryableListRequest>())
        .and_then(list)
        .and(delayed(db))
        .boxed();

    let create_route = warp::path!("api" / "classes")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(create)
        .and(delayed(db))
        .boxed();

    let delete_route = warp::path!("api" / "classes")
        .and(warp::delete())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(id_list())
        .and_then(delete)
        .and(delayed(db))
        .boxed();

    let get_route = warp::path!("api" / "classes" / u32)
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Administrator, Role::Teacher]))
        .and(with_db(db.clone()))
        .and_then(get)
        .and(delayed(db))
        .boxed();

    let update_route = warp::path!("api" / "classes" / u32)
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

const GRADE_LEVELS: std::ops::RangeInclusive<u8> = 1..=12;

#[derive(Serialize)]
struct ListResponse<'a> {
    status: &'static str,
    total: usize,
    classes: Vec<ClassSummary<'a>>,
}

#[derive(Serialize)]
struct ClassSummary<'a> {
    #[serde(flatten)]
    class: &'a Class,
    homeroom_teacher_name: Option<String>,
    student_count: usize,
}

impl<'a> ClassSummary<'a> {
    fn of<D: Database>(db: &D, class: &'a Class) -> Self {
        Self {
            class,
            homeroom_teacher_name: class
                .homeroom_teacher_id
                .and_then(|id| db.user_get_by_id(id))
                .map(|u| u.full_name()),
            student_count: db.class_students(class.id).len(),
        }
    }
}

async fn list(
    _session: Session,
    db: Db,
    request: PaginatedQueryableListRequest,
) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;

    let page = request.normalized_page_number();
    let (total, classes) = db.class_list(Some(page), request.query.as_deref());

    Ok(warp::reply::json(&ListResponse {
        status: "success",
        total,
        classes: classes
            .into_iter()
            .map(|c| ClassSummary::of(&*db, c))
            .collect(),
    }))
}

/// Checks the fields shared by creations and updates.
fn validate<D: Database>(
    db: &D,
    grade_level: Option<u8>,
    school_year: Option<&str>,
    homeroom_teacher_id: Option<u32>,
) -> Result<(), (ErrorCode, StatusCode)> {
    if let Some(grade_level) = grade_level {
        if !GRADE_LEVELS.contains(&grade_level) {
            return Err((ErrorCode::InvalidGradeLevel, StatusCode::BAD_REQUEST));
        }
    }

    if let Some(school_year) = school_year {
        if !is_valid_school_year(school_year) {
            return Err((ErrorCode::InvalidSchoolYear, StatusCode::BAD_REQUEST));
        }
    }

    if let Some(teacher_id) = homeroom_teacher_id {
        if db.user_get_teacher_by_id(teacher_id).is_none() {
            return Err((ErrorCode::InvalidID, StatusCode::NOT_FOUND));
        }
    }

    Ok(())
}

async fn create(
    _session: Session,
    db: Db,
    request: NewClass,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    if let Err((code, status)) = validate(
        &*db,
        Some(request.grade_level),
        Some(&request.school_year),
        request.homeroom_teacher_id,
    ) {
        return Ok(FailureResponse::reply(code, status));
    }

    info!("Creating class {}", request.name);
    Ok(CreatedResponse::reply(db.class_add(request)))
}

async fn delete(
    _session: Session,
    db: Db,
    request: Vec<u32>,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    if !request.iter().all(|id| db.class_get(*id).is_some()) {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidID,
            StatusCode::NOT_FOUND,
        ));
    }

    if request.iter().any(|id| db.class_in_use(*id)) {
        return Ok(FailureResponse::reply(
            ErrorCode::ClassUsed,
            StatusCode::CONFLICT,
        ));
    }

    db.class_remove(&request);
    Ok(SimpleSuccessResponse::reply(StatusCode::OK))
}

#[derive(Serialize)]
struct GetResponse<'a> {
    status: &'static str,
    class: ClassSummary<'a>,
    students: Vec<Student<'a>>,
}

#[derive(Serialize)]
struct Student<'a> {
    id: u32,
    first_name: &'a str,
    last_name: &'a str,
}

async fn get(id: u32, _session: Session, db: Db) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;

    let class = match db.class_get(id) {
        Some(class) => class,
        None => {
            return Ok(FailureResponse::reply(
                ErrorCode::InvalidID,
                StatusCode::NOT_FOUND,
            ))
        }
    };

    let students = db
        .class_students(id)
        .into_iter()
        .map(|u| Student {
            id: u.id,
            first_name: &u.first_name,
            last_name: &u.last_name,
        })
        .collect();

    Ok(success_reply(&GetResponse {
        status: "success",
        class: ClassSummary::of(&*db, class),
        students,
    }))
}

async fn update(
    id: u32,
    _session: Session,
    db: Db,
    request: ClassUpdate,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    if let Err((code, status)) = validate(
        &*db,
        request.grade_level,
        request.school_year.as_deref(),
        request.homeroom_teacher_id.flatten(),
    ) {
        return Ok(FailureResponse::reply(code, status));
    }

    Ok(update_reply(db.class_update(id, request)))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_utils::{api, login, test_db};
    use db::Database;
    use serde_json::{json, Value};
    use warp::http::StatusCode;

    #[tokio::test]
    async fn class_creation_is_validated() {
        let db = test_db("class-create");
        let authorization = login(&db, "user.admin").await;

        let invalid_year = warp::test::request()
            .method("POST")
            .path("/api/classes")
            .header("Authorization", &authorization)
            .json(&json!({ "name": "12C1", "grade_level": 12, "school_year": "2024-2026", "homeroom_teacher_id": null }))
            .reply(&api(&db))
            .await;
        assert_eq!(invalid_year.status(), StatusCode::BAD_REQUEST);

        let invalid_level = warp::test::request()
            .method("POST")
            .path("/api/classes")
            .header("Authorization", &authorization)
            .json(&json!({ "name": "13C1", "grade_level": 13, "school_year": "2024-2025", "homeroom_teacher_id": null }))
            .reply(&api(&db))
            .await;
        assert_eq!(invalid_level.status(), StatusCode::BAD_REQUEST);

        let created = warp::test::request()
            .method("POST")
            .path("/api/classes")
            .header("Authorization", &authorization)
            .json(&json!({ "name": "12C1", "grade_level": 12, "school_year": "2024-2025", "homeroom_teacher_id": 3 }))
            .reply(&api(&db))
            .await;
        assert_eq!(created.status(), StatusCode::CREATED);

        let body: Value = serde_json::from_slice(created.body()).unwrap();
        assert_eq!(body["id"], 3);
        assert_eq!(db.lock().await.class_get(3).unwrap().name, "12C1");
    }

    #[tokio::test]
    async fn used_classes_are_kept() {
        let db = test_db("class-used");
        let authorization = login(&db, "user.admin").await;

        let response = warp::test::request()
            .method("DELETE")
            .path("/api/classes")
            .header("Authorization", &authorization)
            .json(&json!([0]))
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["code"], "ClassUsed");
    }

    #[tokio::test]
    async fn class_details_list_students() {
        let db = test_db("class-get");
        let authorization = login(&db, "user.teacher").await;

        let response = warp::test::request()
            .method("GET")
            .path("/api/classes/2")
            .header("Authorization", &authorization)
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["class"]["name"], "11B1");
        assert_eq!(body["class"]["student_count"], 2);
        assert_eq!(body["class"]["homeroom_teacher_name"], "Lê Thu Hà");
    }
}
