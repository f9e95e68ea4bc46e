use serde::{Deserialize, Serialize};
use warp::{
    http::StatusCode,
    reply::{Json, WithStatus},
};

use db::UpdateStatus;

#[derive(Serialize)]
pub struct FailureResponse {
    status: &'static str,
    code: ErrorCode,
}

impl FailureResponse {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            status: "error",
            code,
        }
    }

    pub fn reply(code: ErrorCode, status: StatusCode) -> WithStatus<Json> {
        warp::reply::with_status(warp::reply::json(&Self::new(code)), status)
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub enum ErrorCode {
    InvalidCredentials,
    InsufficientAuthorization,
    MalformedData,
    InvalidOldPassword,
    PasswordTooSimple,
    InvalidID,
    InvalidSchoolYear,
    InvalidGradeLevel,
    InvalidScore,
    InvalidLessonPeriod,
    ScheduleConflict,
    ClassUsed,
    SubjectUsed,
    TeacherUsed,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

#[derive(Serialize)]
pub struct SimpleSuccessResponse {
    status: &'static str,
}

impl SimpleSuccessResponse {
    pub fn new() -> Self {
        Self { status: "success" }
    }

    pub fn reply(status: StatusCode) -> WithStatus<Json> {
        warp::reply::with_status(warp::reply::json(&Self::new()), status)
    }
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub status: &'static str,
    pub id: u32,
}

impl CreatedResponse {
    pub fn reply(id: u32) -> WithStatus<Json> {
        warp::reply::with_status(
            warp::reply::json(&Self {
                status: "success",
                id,
            }),
            StatusCode::CREATED,
        )
    }
}

/// 200 when something changed, 204 when the update was empty, 404 for an unknown id.
pub fn update_reply(status: UpdateStatus) -> WithStatus<Json> {
    if !status.found {
        FailureResponse::reply(ErrorCode::InvalidID, StatusCode::NOT_FOUND)
    } else if status.updated {
        SimpleSuccessResponse::reply(StatusCode::OK)
    } else {
        SimpleSuccessResponse::reply(StatusCode::NO_CONTENT)
    }
}

/// Wraps a serializable payload in a 200 reply.
pub fn success_reply<T: Serialize>(payload: &T) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(payload), StatusCode::OK)
}

#[derive(Deserialize, Debug)]
pub struct PaginatedQueryableListRequest {
    pub query: Option<String>,
    pub page: Option<usize>,
}

impl PaginatedQueryableListRequest {
    /// Checks that the page number is valid, and if its not it returns 1
    pub fn normalized_page_number(&self) -> usize {
        self.page
            .map(|v| if v >= 1 { v } else { 1 })
            .unwrap_or(1usize)
    }
}

#[derive(Serialize)]
pub struct AccountCreatedResponse<'a> {
    pub status: &'static str,
    pub id: u32,
    pub username: &'a str,
    pub password: &'a str,
}

pub const MIN_PASSWORD_LENGTH: usize = 6;
