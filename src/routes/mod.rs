use log::error;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use db::Db;
use filters::{Forbidden, Malformed, Unauthorized};

mod auth;
mod class;
mod dashboard;
mod globals;
mod manage;
mod period;
mod profile;
mod schedule;
mod score;
mod student;
mod subject;
mod teacher;
mod teacher_subject;

pub use globals::{ErrorCode, FailureResponse};

pub fn routes(db: &Db) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    manage::routes(db)
        .or(auth::routes(db))
        .or(profile::routes(db))
        .or(dashboard::routes(db))
        .or(class::routes(db))
        .or(teacher::routes(db))
        .or(student::routes(db))
        .or(subject::routes(db))
        .or(teacher_subject::routes(db))
        .or(schedule::routes(db))
        .or(score::routes(db))
        .or(period::routes(db))
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, std::convert::Infallible> {
    let error_code;
    let status_code;

    if err.is_not_found() {
        error_code = ErrorCode::NotFound;
        status_code = StatusCode::NOT_FOUND;
    } else if let Some(Forbidden) = err.find() {
        error_code = ErrorCode::InvalidCredentials;
        status_code = StatusCode::FORBIDDEN;
    } else if let Some(Unauthorized) = err.find() {
        error_code = ErrorCode::InsufficientAuthorization;
        status_code = StatusCode::UNAUTHORIZED;
    } else if let Some(Malformed) = err.find() {
        error_code = ErrorCode::MalformedData;
        status_code = StatusCode::BAD_REQUEST;
    } else if err
        .find::<warp::filters::body::BodyDeserializeError>()
        .is_some()
        || err.find::<warp::reject::InvalidQuery>().is_some()
    {
        error_code = ErrorCode::MalformedData;
        status_code = StatusCode::BAD_REQUEST;
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_code = ErrorCode::MethodNotAllowed;
        status_code = StatusCode::METHOD_NOT_ALLOWED;
    } else {
        error!("Unhandled rejection: {:?}", err);
        error_code = ErrorCode::InternalServerError;
        status_code = StatusCode::INTERNAL_SERVER_ERROR;
    }

    Ok(FailureResponse::reply(error_code, status_code))
}
