use log::info;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::{
    http::StatusCode,
    reply::{Json, WithStatus},
    Filter, Rejection, Reply,
};

use super::{
    globals::{success_reply, update_reply, CreatedResponse, SimpleSuccessResponse},
    ErrorCode, FailureResponse,
};
use db::{
    is_valid_school_year,
    models::{Semester, TeacherSubject},
    Database, Db, NewTeacherSubject, TeacherSubjectFilter, TeacherSubjectUpdate,
};
use filters::{authed_is_of_kind, delayed, id_list, with_db, Role, Session};
use periods::{canonical_lesson_periods, Conflict, Day, PeriodAssignment};

pub fn routes(db: &Db) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list_route = warp::path!("api" / "teacher-subjects")
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Administrator, Role::Teacher]))
        .and(with_db(db.clone()))
        .and(warp::query::<TeacherSubjectFilter>())
        .and_then(list)
        .and(delayed(db))
        .boxed();

    let create_route = warp::path!("api" / "teacher-subjects")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(create)
        .and(delayed(db))
        .boxed();

    let delete_route = warp::path!("api" / "teacher-subjects")
        .and(warp::delete())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(id_list())
        .and_then(delete)
        .and(delayed(db))
        .boxed();

    let conflicts_route = warp::path!("api" / "teacher-subjects" / "conflicts")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Administrator]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(1024 * 16).and(warp::body::json()))
        .and_then(check_conflicts)
        .and(delayed(db))
        .boxed();

    let get_route = warp::path!("api" / "teacher-subjects" / u32)
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Administrator, Role::Teacher]))
        .and(with_db(db.clone()))
        .and_then(get)
        .and(delayed(db))
        .boxed();

    let update_route = warp::path!("api" / "teacher-subjects" / u32)
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
        .or(conflicts_route)
        .or(get_route)
        .or(update_route)
}

#[derive(Serialize)]
struct ListResponse<'a> {
    status: &'static str,
    total: usize,
    teacher_subjects: Vec<Assignment<'a>>,
}

#[derive(Serialize)]
struct Assignment<'a> {
    id: u32,
    teacher_id: u32,
    teacher_name: String,
    subject_id: u32,
    subject_name: &'a str,
    class_id: u32,
    class_name: &'a str,
    lesson_period: &'a str,
    semester: Semester,
    school_year: &'a str,
}

impl<'a> Assignment<'a> {
    fn of<D: Database>(db: &'a D, assignment: &'a TeacherSubject) -> Self {
        Self {
            id: assignment.id,
            teacher_id: assignment.teacher_id,
            teacher_name: db
                .user_get_by_id(assignment.teacher_id)
                .map(|u| u.full_name())
                .unwrap_or_default(),
            subject_id: assignment.subject_id,
            subject_name: db
                .subject_get(assignment.subject_id)
                .map_or("", |s| s.name.as_str()),
            class_id: assignment.class_id,
            class_name: db
                .class_get(assignment.class_id)
                .map_or("", |c| c.name.as_str()),
            lesson_period: &assignment.lesson_period,
            semester: assignment.semester,
            school_year: &assignment.school_year,
        }
    }
}

async fn list(
    _session: Session,
    db: Db,
    filter: TeacherSubjectFilter,
) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;

    let teacher_subjects: Vec<_> = db
        .teacher_subject_list(&filter)
        .into_iter()
        .map(|a| Assignment::of(&*db, a))
        .collect();

    Ok(warp::reply::json(&ListResponse {
        status: "success",
        total: teacher_subjects.len(),
        teacher_subjects,
    }))
}

#[derive(Serialize)]
struct ConflictsResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
    conflicts: Vec<ConflictEntry>,
}

#[derive(Serialize)]
struct ConflictEntry {
    assignment_id: u32,
    message: String,
    day: Day,
    existing: PeriodAssignment,
    proposed: PeriodAssignment,
}

impl From<Conflict> for ConflictEntry {
    fn from(conflict: Conflict) -> Self {
        Self {
            assignment_id: conflict.assignment_id,
            message: conflict.to_string(),
            day: conflict.existing.day(),
            existing: conflict.existing,
            proposed: conflict.proposed,
        }
    }
}

fn conflicts_reply(conflicts: Vec<Conflict>) -> WithStatus<Json> {
    let response = ConflictsResponse {
        status: "error",
        code: Some(ErrorCode::ScheduleConflict),
        conflicts: conflicts.into_iter().map(ConflictEntry::from).collect(),
    };

    warp::reply::with_status(warp::reply::json(&response), StatusCode::CONFLICT)
}

/// Checks the ids an assignment points to.
fn check_references<D: Database>(
    db: &D,
    teacher_id: u32,
    subject_id: u32,
    class_id: u32,
) -> Result<(), ErrorCode> {
    if db.user_get_teacher_by_id(teacher_id).is_none()
        || db.subject_get(subject_id).is_none()
        || db.class_get(class_id).is_none()
    {
        Err(ErrorCode::InvalidID)
    } else {
        Ok(())
    }
}

async fn create(
    _session: Session,
    db: Db,
    request: NewTeacherSubject,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    if let Err(code) = check_references(
        &*db,
        request.teacher_id,
        request.subject_id,
        request.class_id,
    ) {
        return Ok(FailureResponse::reply(code, StatusCode::NOT_FOUND));
    }

    if !is_valid_school_year(&request.school_year) {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidSchoolYear,
            StatusCode::BAD_REQUEST,
        ));
    }

    let lesson_period = canonical_lesson_periods(&request.lesson_period);

    if lesson_period.is_empty() {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidLessonPeriod,
            StatusCode::BAD_REQUEST,
        ));
    }

    let conflicts = db.schedule_conflicts(
        request.teacher_id,
        &lesson_period,
        request.semester,
        &request.school_year,
        None,
    );

    if !conflicts.is_empty() {
        info!(
            "Refused assignment for teacher {}: {} conflict(s)",
            request.teacher_id,
            conflicts.len()
        );
        return Ok(conflicts_reply(conflicts));
    }

    let id = db.teacher_subject_add(NewTeacherSubject {
        lesson_period,
        ..request
    });

    Ok(CreatedResponse::reply(id))
}

async fn delete(
    _session: Session,
    db: Db,
    request: Vec<u32>,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    let all_exist = request.iter().all(|id| db.teacher_subject_get(*id).is_some());

    if !all_exist || !db.teacher_subject_remove(&request) {
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
    teacher_subject: Assignment<'a>,
}

async fn get(id: u32, _session: Session, db: Db) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;

    match db.teacher_subject_get(id) {
        Some(assignment) => Ok(success_reply(&GetResponse {
            status: "success",
            teacher_subject: Assignment::of(&*db, assignment),
        })),
        None => Ok(FailureResponse::reply(
            ErrorCode::InvalidID,
            StatusCode::NOT_FOUND,
        )),
    }
}

async fn update(
    id: u32,
    _session: Session,
    db: Db,
    mut request: TeacherSubjectUpdate,
) -> Result<impl warp::Reply, Infallible> {
    let mut db = db.lock().await;

    let current = match db.teacher_subject_get(id) {
        Some(current) => current.clone(),
        None => {
            return Ok(FailureResponse::reply(
                ErrorCode::InvalidID,
                StatusCode::NOT_FOUND,
            ))
        }
    };

    let teacher_id = request.teacher_id.unwrap_or(current.teacher_id);

    if let Err(code) = check_references(
        &*db,
        teacher_id,
        request.subject_id.unwrap_or(current.subject_id),
        request.class_id.unwrap_or(current.class_id),
    ) {
        return Ok(FailureResponse::reply(code, StatusCode::NOT_FOUND));
    }

    if let Some(school_year) = &request.school_year {
        if !is_valid_school_year(school_year) {
            return Ok(FailureResponse::reply(
                ErrorCode::InvalidSchoolYear,
                StatusCode::BAD_REQUEST,
            ));
        }
    }

    if let Some(lesson_period) = &request.lesson_period {
        let lesson_period = canonical_lesson_periods(lesson_period);

        if lesson_period.is_empty() {
            return Ok(FailureResponse::reply(
                ErrorCode::InvalidLessonPeriod,
                StatusCode::BAD_REQUEST,
            ));
        }

        request.lesson_period = Some(lesson_period);
    }

    // Moving the assignment to another teacher or term must be checked too.
    let lesson_period = request
        .lesson_period
        .as_deref()
        .unwrap_or(&current.lesson_period);
    let conflicts = db.schedule_conflicts(
        teacher_id,
        lesson_period,
        request.semester.unwrap_or(current.semester),
        request
            .school_year
            .as_deref()
            .unwrap_or(&current.school_year),
        Some(id),
    );

    if !conflicts.is_empty() {
        return Ok(conflicts_reply(conflicts));
    }

    Ok(update_reply(db.teacher_subject_update(id, request)))
}

#[derive(Deserialize)]
struct ConflictCheckRequest {
    teacher_id: u32,
    lesson_period: String,
    semester: Semester,
    school_year: String,
    exclude_id: Option<u32>,
}

/// Advisory check used by the assignment form before submitting.
async fn check_conflicts(
    _session: Session,
    db: Db,
    request: ConflictCheckRequest,
) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;

    if db.user_get_teacher_by_id(request.teacher_id).is_none() {
        return Ok(FailureResponse::reply(
            ErrorCode::InvalidID,
            StatusCode::NOT_FOUND,
        ));
    }

    let conflicts = db.schedule_conflicts(
        request.teacher_id,
        &canonical_lesson_periods(&request.lesson_period),
        request.semester,
        &request.school_year,
        request.exclude_id,
    );

    Ok(success_reply(&ConflictsResponse {
        status: "success",
        code: None,
        conflicts: conflicts.into_iter().map(ConflictEntry::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_utils::{api, login, test_db};
    use db::{Database, TeacherSubjectFilter};
    use serde_json::{json, Value};
    use warp::http::StatusCode;

    // Seeded: teacher 1 teaches "Tiết 1-2 Thứ 2, Tiết 4 Thứ 5" (id 0)
    // and "Tiết 3-4 Thứ 2, Tiết 1-2 Thứ 4" (id 1).
    fn assignment(lesson_period: &str) -> Value {
        json!({
            "teacher_id": 1,
            "subject_id": 0,
            "class_id": 2,
            "lesson_period": lesson_period,
            "semester": "HK1",
            "school_year": "2024-2025",
        })
    }

    #[tokio::test]
    async fn overlapping_assignment_is_refused() {
        let db = test_db("ts-overlap");
        let authorization = login(&db, "user.admin").await;

        let response = warp::test::request()
            .method("POST")
            .path("/api/teacher-subjects")
            .header("Authorization", &authorization)
            .json(&assignment("Tiết 2-3 Thứ 2"))
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["code"], "ScheduleConflict");
        assert_eq!(body["conflicts"].as_array().map(Vec::len), Some(2));
        assert_eq!(
            body["conflicts"][0]["message"],
            "Toán - 10A1: Tiết 1-2 Thứ 2 trùng với Tiết 2-3"
        );

        let filter = TeacherSubjectFilter {
            teacher_id: Some(1),
            ..TeacherSubjectFilter::default()
        };
        assert_eq!(db.lock().await.teacher_subject_list(&filter).len(), 2);
    }

    #[tokio::test]
    async fn adjacent_assignment_is_stored_canonically() {
        let db = test_db("ts-adjacent");
        let authorization = login(&db, "user.admin").await;

        let response = warp::test::request()
            .method("POST")
            .path("/api/teacher-subjects")
            .header("Authorization", &authorization)
            .json(&assignment("tiết 5 - 6 thứ hai"))
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        let id = body["id"].as_u64().unwrap() as u32;

        let db = db.lock().await;
        let stored = db.teacher_subject_get(id).unwrap();
        assert_eq!(stored.lesson_period, "Tiết 5-6 Thứ 2");
    }

    #[tokio::test]
    async fn empty_lesson_period_is_invalid() {
        let db = test_db("ts-empty");
        let authorization = login(&db, "user.admin").await;

        let response = warp::test::request()
            .method("POST")
            .path("/api/teacher-subjects")
            .header("Authorization", &authorization)
            .json(&assignment("   "))
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["code"], "InvalidLessonPeriod");
    }

    #[tokio::test]
    async fn editing_never_conflicts_with_itself() {
        let db = test_db("ts-edit");
        let authorization = login(&db, "user.admin").await;

        let response = warp::test::request()
            .method("PUT")
            .path("/api/teacher-subjects/0")
            .header("Authorization", &authorization)
            .json(&json!({ "lesson_period": "Tiết 1-2 Thứ 2, Tiết 4-5 Thứ 5" }))
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::OK);

        let db = db.lock().await;
        assert_eq!(
            db.teacher_subject_get(0).unwrap().lesson_period,
            "Tiết 1-2 Thứ 2, Tiết 4-5 Thứ 5"
        );
    }

    #[tokio::test]
    async fn advisory_check_lists_conflicts() {
        let db = test_db("ts-check");
        let authorization = login(&db, "user.admin").await;

        let response = warp::test::request()
            .method("POST")
            .path("/api/teacher-subjects/conflicts")
            .header("Authorization", &authorization)
            .json(&json!({
                "teacher_id": 1,
                "lesson_period": "Tiết 4 Thứ 2",
                "semester": "HK1",
                "school_year": "2024-2025",
                "exclude_id": null,
            }))
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["conflicts"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["conflicts"][0]["assignment_id"], 1);
        assert_eq!(body["conflicts"][0]["day"], "T2");
    }

    #[tokio::test]
    async fn same_slot_in_another_term_is_accepted() {
        let db = test_db("ts-term");
        let authorization = login(&db, "user.admin").await;

        for (semester, school_year) in &[("HK2", "2024-2025"), ("HK1", "2025-2026")] {
            let mut body = assignment("Tiết 1-2 Thứ 2");
            body["semester"] = json!(semester);
            body["school_year"] = json!(school_year);

            let response = warp::test::request()
                .method("POST")
                .path("/api/teacher-subjects")
                .header("Authorization", &authorization)
                .json(&body)
                .reply(&api(&db))
                .await;

            assert_eq!(response.status(), StatusCode::CREATED);
        }

        // Moving seeded assignment 1 onto the new HK2 slot collides with it.
        let response = warp::test::request()
            .method("PUT")
            .path("/api/teacher-subjects/1")
            .header("Authorization", &authorization)
            .json(&json!({ "semester": "HK2", "lesson_period": "Tiết 2 Thứ 2" }))
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn advisory_check_reports_each_overlap_once() {
        let db = test_db("ts-check-dup");
        let authorization = login(&db, "user.admin").await;

        let check = |semester: &str| {
            json!({
                "teacher_id": 1,
                "lesson_period": "Tiết 1 Thứ 2, Tiết 1 Thứ 2",
                "semester": semester,
                "school_year": "2024-2025",
                "exclude_id": null,
            })
        };

        let response = warp::test::request()
            .method("POST")
            .path("/api/teacher-subjects/conflicts")
            .header("Authorization", &authorization)
            .json(&check("HK1"))
            .reply(&api(&db))
            .await;

        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["conflicts"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["conflicts"][0]["assignment_id"], 0);

        let response = warp::test::request()
            .method("POST")
            .path("/api/teacher-subjects/conflicts")
            .header("Authorization", &authorization)
            .json(&check("HK2"))
            .reply(&api(&db))
            .await;

        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["conflicts"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn students_cannot_create_assignments() {
        let db = test_db("ts-student");
        let authorization = login(&db, "user.student").await;

        let response = warp::test::request()
            .method("POST")
            .path("/api/teacher-subjects")
            .header("Authorization", &authorization)
            .json(&assignment("Tiết 9 Thứ 7"))
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_deletions_are_malformed() {
        let db = test_db("ts-delete");
        let authorization = login(&db, "user.admin").await;

        let response = warp::test::request()
            .method("DELETE")
            .path("/api/teacher-subjects")
            .header("Authorization", &authorization)
            .json(&json!([]))
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["code"], "MalformedData");
    }
}
