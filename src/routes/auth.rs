use log::info;
use serde::{Deserialize, Serialize};
use warp::{Filter, Rejection, Reply};

use super::globals::SimpleSuccessResponse;
use db::{Database, Db};
use filters::{bearer_token, delayed, with_db, Forbidden, Role};

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse<'a> {
    status: &'a str,
    token: &'a str,
    user: LoginResponseUser<'a>,
}

#[derive(Serialize)]
struct LoginResponseUser<'a> {
    id: u32,
    first_name: &'a str,
    last_name: &'a str,
    kind: &'a str,
}

pub fn routes(db: &Db) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let post_session_route = warp::path!("api" / "session")
        .and(warp::post())
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and(with_db(db.clone()))
        .and_then(post_session)
        .and(delayed(db))
        .boxed();

    let delete_session_route = warp::path!("api" / "session")
        .and(warp::delete())
        .and(warp::header::<String>("Authorization"))
        .and(with_db(db.clone()))
        .and_then(delete_session)
        .and(delayed(db))
        .boxed();

    post_session_route.or(delete_session_route)
}

async fn post_session(request: LoginRequest, db: Db) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    match db.auth_login(&request.username, &request.password) {
        Some((user, token)) => {
            info!("{} logged in", user.username);

            Ok(warp::reply::json(&LoginResponse {
                status: "success",
                token: &token,
                user: LoginResponseUser {
                    id: user.id,
                    first_name: &user.first_name,
                    last_name: &user.last_name,
                    kind: Role::of(&user.kind).code(),
                },
            }))
        }
        None => Err(warp::reject::custom(Forbidden)),
    }
}

async fn delete_session(
    authorization: String,
    db: Db,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut db = db.lock().await;

    let logged_out = match bearer_token(&authorization) {
        Some(token) => db.auth_logout(token),
        None => false,
    };

    if logged_out {
        Ok(warp::reply::json(&SimpleSuccessResponse::new()))
    } else {
        Err(warp::reject::custom(Forbidden))
    }
}

#[cfg(test)]
mod tests {
    use crate::routes::test_utils::{api, login, test_db};
    use db::Database;
    use warp::http::StatusCode;

    #[tokio::test]
    async fn login_returns_a_token_and_the_role() {
        let db = test_db("auth-login");

        let response = warp::test::request()
            .method("POST")
            .path("/api/session")
            .json(&serde_json::json!({ "username": "user.admin", "password": "user.admin" }))
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["user"]["kind"], "ADM");
        assert_eq!(body["token"].as_str().map(str::len), Some(25));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let db = test_db("auth-wrong");

        let response = warp::test::request()
            .method("POST")
            .path("/api/session")
            .json(&serde_json::json!({ "username": "user.admin", "password": "nope" }))
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn logout_invalidates_the_token() {
        let db = test_db("auth-logout");
        let authorization = login(&db, "user.student").await;

        let response = warp::test::request()
            .method("DELETE")
            .path("/api/session")
            .header("Authorization", &authorization)
            .reply(&api(&db))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let token = authorization.trim_start_matches("Bearer ");
        assert!(db.lock().await.auth_get_user(token).is_none());
    }
}
