use log::info;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use super::globals::{
    success_reply, ErrorCode, FailureResponse, SimpleSuccessResponse, MIN_PASSWORD_LENGTH,
};
use db::{
    models::{Degree, UserKind},
    Database, Db,
};
use filters::{authed, delayed, with_db, Session};

pub fn routes(db: &Db) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let get_profile_route = warp::path!("api" / "profile")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and_then(get_profile)
        .and(delayed(db))
        .boxed();

    let put_profile_route = warp::path!("api" / "profile")
        .and(warp::put())
        .and(authed(db))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and(with_db(db.clone()))
        .and_then(put_profile)
        .and(delayed(db))
        .boxed();

    get_profile_route.or(put_profile_route)
}

#[derive(Serialize)]
struct ProfileResponse<'a> {
    status: &'static str,
    profile: Profile<'a>,
}

#[derive(Serialize)]
struct Profile<'a> {
    id: u32,
    username: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    degree: Option<&'a Degree>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_name: Option<&'a str>,
}

async fn get_profile(session: Session, db: Db) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;

    let user = match db.user_get_by_id(session.user_id) {
        Some(user) => user,
        None => {
            return Ok(FailureResponse::reply(
                ErrorCode::InvalidID,
                StatusCode::NOT_FOUND,
            ))
        }
    };

    let mut profile = Profile {
        id: user.id,
        username: &user.username,
        first_name: &user.first_name,
        last_name: &user.last_name,
        kind: session.role.code(),
        email: None,
        phone_number: None,
        degree: None,
        class_name: None,
    };

    match &user.kind {
        UserKind::Administrator => {}
        UserKind::Teacher(informations) => {
            profile.email = informations.email.as_deref();
            profile.phone_number = informations.phone_number.as_deref();
            profile.degree = Some(&informations.degree);
        }
        UserKind::Student(informations) => {
            profile.class_name = db
                .class_get(informations.class_id)
                .map(|c| c.name.as_str());
        }
    }

    Ok(success_reply(&ProfileResponse {
        status: "success",
        profile,
    }))
}

#[derive(Deserialize)]
struct UpdateRequest {
    old_password: String,
    password: String,
}

async fn put_profile(
    session: Session,
    request: UpdateRequest,
    db: Db,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    let mut user = match db.user_get_by_id(session.user_id) {
        Some(user) => user.clone(),
        None => {
            return Ok(FailureResponse::reply(
                ErrorCode::InvalidID,
                StatusCode::NOT_FOUND,
            ))
        }
    };

    if user.password != request.old_password {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidOldPassword,
            StatusCode::FORBIDDEN,
        ));
    }

    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Ok(FailureResponse::reply(
            ErrorCode::PasswordTooSimple,
            StatusCode::BAD_REQUEST,
        ));
    }

    user.password = request.password;
    db.user_update(user);
    info!("{} changed their password", session.username);

    Ok(SimpleSuccessResponse::reply(StatusCode::OK))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_utils::{api, login, test_db};
    use db::Database;
    use serde_json::{json, Value};
    use warp::http::StatusCode;

    #[tokio::test]
    async fn profile_of_a_teacher() {
        let db = test_db("profile-get");
        let authorization = login(&db, "user.teacher").await;

        let response = warp::test::request()
            .method("GET")
            .path("/api/profile")
            .header("Authorization", &authorization)
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["profile"]["kind"], "TEA");
        assert_eq!(body["profile"]["degree"], "THS");
        assert_eq!(body["profile"]["email"], "user.teacher@thpt.edu.vn");
    }

    #[tokio::test]
    async fn password_change_checks_the_old_one() {
        let db = test_db("profile-put");
        let authorization = login(&db, "user.student").await;

        let wrong = warp::test::request()
            .method("PUT")
            .path("/api/profile")
            .header("Authorization", &authorization)
            .json(&json!({ "old_password": "nope", "password": "s3cret-pass" }))
            .reply(&api(&db))
            .await;
        assert_eq!(wrong.status(), StatusCode::FORBIDDEN);

        let short = warp::test::request()
            .method("PUT")
            .path("/api/profile")
            .header("Authorization", &authorization)
            .json(&json!({ "old_password": "user.student", "password": "abc" }))
            .reply(&api(&db))
            .await;
        assert_eq!(short.status(), StatusCode::BAD_REQUEST);

        let ok = warp::test::request()
            .method("PUT")
            .path("/api/profile")
            .header("Authorization", &authorization)
            .json(&json!({ "old_password": "user.student", "password": "s3cret-pass" }))
            .reply(&api(&db))
            .await;
        assert_eq!(ok.status(), StatusCode::OK);

        let mut db = db.lock().await;
        assert!(db.auth_login("user.student", "s3cret-pass").is_some());
    }
}
