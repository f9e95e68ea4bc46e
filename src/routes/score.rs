use serde::Serialize;
use std::convert::Infallible;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use super::{
    globals::{success_reply, update_reply, CreatedResponse, SimpleSuccessResponse},
    ErrorCode, FailureResponse,
};
use db::{
    grades::{grade_report, Classification},
    is_valid_school_year, is_valid_score,
    models::Score,
    Database, Db, NewScore, ScoreFilter, ScoreUpdate,
};
use filters::{authed, authed_is_of_kind, delayed, id_list, with_db, Role, Session, Unauthorized};

pub fn routes(db: &Db) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list_route = warp::path!("api" / "students" / u32 / "scores")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and(warp::query::<ScoreFilter>())
        .and_then(list)
        .and(delayed(db))
        .boxed();

    let grades_route = warp::path!("api" / "students" / u32 / "grades")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and(warp::query::<ScoreFilter>())
        .and_then(grades)
        .and(delayed(db))
        .boxed();

    let create_route = warp::path!("api" / "scores")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator, Role::Teacher]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(create)
        .and(delayed(db))
        .boxed();

    let delete_route = warp::path!("api" / "scores")
        .and(warp::delete())
        .and(authed_is_of_kind(db, &[Role::Administrator, Role::Teacher]))
        .and(with_db(db.clone()))
        .and(id_list())
        .and_then(delete)
        .and(delayed(db))
        .boxed();

    let update_route = warp::path!("api" / "scores" / u32)
        .and(warp::put())
        .and(authed_is_of_kind(db, &[Role::Administrator, Role::Teacher]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(update)
        .and(delayed(db))
        .boxed();

    list_route
        .or(grades_route)
        .or(create_route)
        .or(delete_route)
        .or(update_route)
}

#[derive(Serialize)]
struct ListResponse<'a> {
    status: &'static str,
    scores: Vec<&'a Score>,
}

async fn list(
    id: u32,
    session: Session,
    db: Db,
    filter: ScoreFilter,
) -> Result<impl warp::Reply, Rejection> {
    if !session.can_see_student(id) {
        return Err(warp::reject::custom(Unauthorized));
    }

    let db = db.lock().await;

    if db.user_get_student_by_id(id).is_none() {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidID,
            StatusCode::NOT_FOUND,
        ));
    }

    let filter = ScoreFilter {
        student_id: Some(id),
        ..filter
    };

    Ok(success_reply(&ListResponse {
        status: "success",
        scores: db.score_list(&filter),
    }))
}

#[derive(Serialize)]
struct GradesResponse<'a> {
    status: &'static str,
    subjects: Vec<SubjectGrade<'a>>,
    gpa: Option<f64>,
    classification: Option<Classification>,
}

#[derive(Serialize)]
struct SubjectGrade<'a> {
    subject_id: u32,
    subject_name: &'a str,
    score_count: usize,
    average: Option<f64>,
}

async fn grades(
    id: u32,
    session: Session,
    db: Db,
    filter: ScoreFilter,
) -> Result<impl warp::Reply, Rejection> {
    if !session.can_see_student(id) {
        return Err(warp::reject::custom(Unauthorized));
    }

    let db = db.lock().await;

    if db.user_get_student_by_id(id).is_none() {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidID,
            StatusCode::NOT_FOUND,
        ));
    }

    let report = grade_report(&db.score_list(&ScoreFilter {
        student_id: Some(id),
        ..filter
    }));

    let subjects = report
        .subjects
        .iter()
        .map(|s| SubjectGrade {
            subject_id: s.subject_id,
            subject_name: db.subject_get(s.subject_id).map_or("", |s| s.name.as_str()),
            score_count: s.score_count,
            average: s.average,
        })
        .collect();

    Ok(success_reply(&GradesResponse {
        status: "success",
        subjects,
        gpa: report.gpa,
        classification: report.classification,
    }))
}

async fn create(
    _session: Session,
    db: Db,
    request: NewScore,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    if db.user_get_student_by_id(request.student_id).is_none()
        || db.subject_get(request.subject_id).is_none()
    {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidID,
            StatusCode::NOT_FOUND,
        ));
    }

    if !is_valid_score(request.value) {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidScore,
            StatusCode::BAD_REQUEST,
        ));
    }

    if !is_valid_school_year(&request.school_year) {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidSchoolYear,
            StatusCode::BAD_REQUEST,
        ));
    }

    Ok(CreatedResponse::reply(db.score_add(request)))
}

async fn delete(
    _session: Session,
    db: Db,
    request: Vec<u32>,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    if db.score_remove(&request) {
        Ok(SimpleSuccessResponse::reply(StatusCode::OK))
    } else {
        Ok(FailureResponse::reply(
            ErrorCode::InvalidID,
            StatusCode::NOT_FOUND,
        ))
    }
}

async fn update(
    id: u32,
    _session: Session,
    db: Db,
    request: ScoreUpdate,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    if let Some(value) = request.value {
        if !is_valid_score(value) {
            return Ok(FailureResponse::reply(
                ErrorCode::InvalidScore,
                StatusCode::BAD_REQUEST,
            ));
        }
    }

    Ok(update_reply(db.score_update(id, request)))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_utils::{api, login, test_db};
    use db::{Database, ScoreFilter};
    use serde_json::{json, Value};
    use warp::http::StatusCode;

    #[tokio::test]
    async fn grades_are_weighted_per_subject() {
        let db = test_db("score-grades");
        let authorization = login(&db, "user.student").await;

        let response = warp::test::request()
            .method("GET")
            .path("/api/students/5/grades?semester=HK1")
            .header("Authorization", &authorization)
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["subjects"][0]["subject_name"], "Toán");
        assert_eq!(body["subjects"][0]["average"], 8.5);
        assert_eq!(body["subjects"][1]["average"], 6.83);
        assert_eq!(body["gpa"], 7.86);
        assert_eq!(body["classification"], "Khá");
    }

    #[tokio::test]
    async fn scores_are_out_of_ten() {
        let db = test_db("score-create");
        let authorization = login(&db, "user.teacher").await;

        let score = |value: f64| {
            json!({
                "student_id": 6,
                "subject_id": 3,
                "kind": "15M",
                "value": value,
                "semester": "HK2",
                "school_year": "2024-2025",
            })
        };

        let refused = warp::test::request()
            .method("POST")
            .path("/api/scores")
            .header("Authorization", &authorization)
            .json(&score(11.0))
            .reply(&api(&db))
            .await;
        assert_eq!(refused.status(), StatusCode::BAD_REQUEST);

        let created = warp::test::request()
            .method("POST")
            .path("/api/scores")
            .header("Authorization", &authorization)
            .json(&score(9.5))
            .reply(&api(&db))
            .await;
        assert_eq!(created.status(), StatusCode::CREATED);

        let filter = ScoreFilter {
            student_id: Some(6),
            subject_id: Some(3),
            ..ScoreFilter::default()
        };
        assert_eq!(db.lock().await.score_list(&filter).len(), 1);
    }

    #[tokio::test]
    async fn students_cannot_grade() {
        let db = test_db("score-student");
        let authorization = login(&db, "user.student").await;

        let response = warp::test::request()
            .method("PUT")
            .path("/api/scores/0")
            .header("Authorization", &authorization)
            .json(&json!({ "value": 10.0 }))
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
