use log::info;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use super::{
    globals::{success_reply, AccountCreatedResponse, SimpleSuccessResponse},
    ErrorCode, FailureResponse,
};
use crate::utils::generate_password;
use db::{
    models::{StudentInformations, User, UserKind},
    Database, Db, NewUser,
};
use filters::{authed, authed_is_of_kind, delayed, id_list, with_db, Role, Session, Unauthorized};

pub fn routes(db: &Db) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list_route = warp::path!("api" / "students")
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Administrator, Role::Teacher]))
        .and(with_db(db.clone()))
        .and(warp::query::<StudentListRequest>())
        .and_then(list)
        .and(delayed(db))
        .boxed();

    let create_route = warp::path!("api" / "students")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(create)
        .and(delayed(db))
        .boxed();

    let delete_route = warp::path!("api" / "students")
        .and(warp::delete())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(id_list())
        .and_then(delete)
        .and(delayed(db))
        .boxed();

    let get_route = warp::path!("api" / "students" / u32)
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and_then(get)
        .and(delayed(db))
        .boxed();

    let update_route = warp::path!("api" / "students" / u32)
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

#[derive(Deserialize, Debug)]
struct StudentListRequest {
    query: Option<String>,
    page: Option<usize>,
    class_id: Option<u32>,
}

#[derive(Serialize)]
struct ListResponse<'a> {
    status: &'static str,
    total: usize,
    students: Vec<Student<'a>>,
}

#[derive(Serialize)]
struct Student<'a> {
    id: u32,
    username: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    class_id: u32,
    class_name: &'a str,
    date_of_birth: Option<&'a str>,
}

impl<'a> Student<'a> {
    fn of<D: Database>(db: &'a D, user: &'a User) -> Option<Self> {
        let informations = user.student_informations()?;

        Some(Self {
            id: user.id,
            username: &user.username,
            first_name: &user.first_name,
            last_name: &user.last_name,
            class_id: informations.class_id,
            class_name: db
                .class_get(informations.class_id)
                .map_or("", |c| c.name.as_str()),
            date_of_birth: informations.date_of_birth.as_deref(),
        })
    }
}

async fn list(
    _session: Session,
    db: Db,
    request: StudentListRequest,
) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;

    let page = request.page.unwrap_or(1).max(1);
    let (total, users) = db.user_list(Some(page), request.query.as_deref(), |u| {
        u.student_informations().map_or(false, |informations| {
            request
                .class_id
                .map_or(true, |class_id| informations.class_id == class_id)
        })
    });

    let students = users
        .into_iter()
        .filter_map(|u| Student::of(&*db, u))
        .collect();

    Ok(warp::reply::json(&ListResponse {
        status: "success",
        total,
        students,
    }))
}

#[derive(Deserialize)]
struct NewStudent {
    first_name: String,
    last_name: String,
    class_id: u32,
    date_of_birth: Option<String>,
}

async fn create(
    _session: Session,
    db: Db,
    request: NewStudent,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    if db.class_get(request.class_id).is_none() {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidID,
            StatusCode::NOT_FOUND,
        ));
    }

    let user = db.user_add(NewUser {
        first_name: request.first_name,
        last_name: request.last_name,
        password: generate_password(),
        kind: UserKind::Student(StudentInformations {
            class_id: request.class_id,
            date_of_birth: request.date_of_birth,
        }),
    });

    info!("Created student account {}", user.username);

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

    let all_exist_and_student = request
        .iter()
        .all(|id| db.user_get_student_by_id(*id).is_some());

    if !all_exist_and_student || !db.user_remove(&request) {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidID,
            StatusCode::NOT_FOUND,
        ));
    }

    Ok(SimpleSuccessResponse::reply(StatusCode::OK))
}

#[derive(Serialize)]
struct GetResponse<'a> {
    status: &'static str,
    student: Student<'a>,
}

async fn get(id: u32, session: Session, db: Db) -> Result<impl warp::Reply, Rejection> {
    if !session.can_see_student(id) {
        return Err(warp::reject::custom(Unauthorized));
    }

    let db = db.lock().await;

    match db
        .user_get_student_by_id(id)
        .and_then(|u| Student::of(&*db, u))
    {
        Some(student) => Ok(success_reply(&GetResponse {
            status: "success",
            student,
        })),
        None => Ok(FailureResponse::reply(
            ErrorCode::InvalidID,
            StatusCode::NOT_FOUND,
        )),
    }
}

#[derive(Deserialize, Debug)]
struct StudentUpdate {
    first_name: Option<String>,
    last_name: Option<String>,
    class_id: Option<u32>,
    #[serde(default, deserialize_with = "db::deserialize_some")]
    date_of_birth: Option<Option<String>>,
    password: Option<String>,
}

async fn update(
    id: u32,
    _session: Session,
    db: Db,
    request: StudentUpdate,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    let mut user = match db.user_get_student_by_id(id) {
        Some(user) => user.clone(),
        None => {
            return Ok(FailureResponse::reply(
                ErrorCode::InvalidID,
                StatusCode::NOT_FOUND,
            ))
        }
    };

    if let Some(class_id) = request.class_id {
        if db.class_get(class_id).is_none() {
            return Ok(FailureResponse::reply(
                ErrorCode::InvalidID,
                StatusCode::NOT_FOUND,
            ));
        }
    }

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

    if let UserKind::Student(informations) = &mut user.kind {
        update!(informations, class_id);
        update!(informations, date_of_birth);
    }

    if updated {
        db.user_update(user);
        Ok(SimpleSuccessResponse::reply(StatusCode::OK))
    } else {
        Ok(SimpleSuccessResponse::reply(StatusCode::NO_CONTENT))
    }
}

#[cfg(test)]
mod tests {
    use crate::routes::test_utils::{api, login, test_db};
    use db::Database;
    use serde_json::{json, Value};
    use warp::http::StatusCode;

    #[tokio::test]
    async fn students_are_listed_by_class() {
        let db = test_db("student-list");
        let authorization = login(&db, "user.teacher").await;

        let response = warp::test::request()
            .method("GET")
            .path("/api/students?class_id=1")
            .header("Authorization", &authorization)
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["total"], 2);
        assert!(body["students"]
            .as_array()
            .unwrap()
            .iter()
            .all(|s| s["class_name"] == "10A2"));
    }

    #[tokio::test]
    async fn created_students_get_a_password() {
        let db = test_db("student-create");
        let authorization = login(&db, "user.admin").await;

        let response = warp::test::request()
            .method("POST")
            .path("/api/students")
            .header("Authorization", &authorization)
            .json(&json!({ "first_name": "Lan", "last_name": "Trịnh Thị", "class_id": 1, "date_of_birth": "2009-03-14" }))
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["username"], "trinh.thi.lan");

        let password = body["password"].as_str().unwrap().to_string();
        assert!(db
            .lock()
            .await
            .auth_login("trinh.thi.lan", &password)
            .is_some());
    }

    #[tokio::test]
    async fn students_only_see_themselves() {
        let db = test_db("student-get");
        let authorization = login(&db, "user.student").await;

        let own = warp::test::request()
            .method("GET")
            .path("/api/students/5")
            .header("Authorization", &authorization)
            .reply(&api(&db))
            .await;
        assert_eq!(own.status(), StatusCode::OK);

        let other = warp::test::request()
            .method("GET")
            .path("/api/students/6")
            .header("Authorization", &authorization)
            .reply(&api(&db))
            .await;
        assert_eq!(other.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn moving_a_student_checks_the_class() {
        let db = test_db("student-update");
        let authorization = login(&db, "user.admin").await;

        let response = warp::test::request()
            .method("PUT")
            .path("/api/students/5")
            .header("Authorization", &authorization)
            .json(&json!({ "class_id": 42 }))
            .reply(&api(&db))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = warp::test::request()
            .method("PUT")
            .path("/api/students/5")
            .header("Authorization", &authorization)
            .json(&json!({ "class_id": 2 }))
            .reply(&api(&db))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let db = db.lock().await;
        let user = db.user_get_by_id(5).unwrap();
        assert_eq!(user.student_informations().unwrap().class_id, 2);
    }
}
