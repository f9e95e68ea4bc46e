use db::{
    models::{User, UserKind},
    Database, Db,
};
use log::debug;
use warp::{Filter, Rejection};

use crate::with_db;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Administrator,
    Teacher,
    Student,
}

impl Role {
    pub fn of(kind: &UserKind) -> Self {
        match kind {
            UserKind::Administrator => Role::Administrator,
            UserKind::Teacher(_) => Role::Teacher,
            UserKind::Student(_) => Role::Student,
        }
    }

    /// Short code sent to the dashboard.
    pub fn code(self) -> &'static str {
        match self {
            Role::Administrator => "ADM",
            Role::Teacher => "TEA",
            Role::Student => "STU",
        }
    }
}

/// The authenticated user of a request, handed to every handler that needs it.
#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: u32,
    pub username: String,
    pub role: Role,
}

impl Session {
    fn of(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: Role::of(&user.kind),
        }
    }

    /// Administrators and teachers can see everyone, students only themselves.
    pub fn can_see_student(&self, student_id: u32) -> bool {
        match self.role {
            Role::Administrator | Role::Teacher => true,
            Role::Student => self.user_id == student_id,
        }
    }
}

/// Filter that checks if the user is authenticated or not, and rejects the request if he/she isn't
pub fn authed(db: &Db) -> impl Filter<Extract = (Session,), Error = Rejection> + Clone {
    with_db(db.clone())
        .and(warp::header::optional::<String>("Authorization"))
        .and_then(guard)
}

/// Filters that checks if the user is of the requested kind, and rejects the request if he/she doesn't
/// have the authorization ; also checks if the user is authenticated.
pub fn authed_is_of_kind(
    db: &Db,
    roles: &'static [Role],
) -> impl Filter<Extract = (Session,), Error = Rejection> + Clone {
    authed(db)
        .map(move |session| (session, roles))
        .untuple_one()
        .and_then(guard_kind)
}

#[derive(Debug)]
pub struct Forbidden;

impl warp::reject::Reject for Forbidden {}

#[derive(Debug)]
pub struct Unauthorized;

impl warp::reject::Reject for Unauthorized {}

/// Extracts the token of a `Bearer <token>` header value.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let mut parts = authorization.splitn(2, ' ');
    let auth_type = parts.next().unwrap_or("");
    let token = parts.next().unwrap_or("").trim();

    if auth_type.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

async fn guard(db: Db, authorization: Option<String>) -> Result<Session, warp::Rejection> {
    let token = match authorization.as_deref().and_then(bearer_token) {
        Some(token) => token,
        None => return Err(warp::reject::custom(Forbidden)),
    };

    let db = db.lock().await;

    match db.auth_get_user(token) {
        Some(user) => Ok(Session::of(user)),
        None => {
            debug!("Rejected unknown session token");
            Err(warp::reject::custom(Forbidden))
        }
    }
}

async fn guard_kind(session: Session, roles: &'static [Role]) -> Result<Session, warp::Rejection> {
    if roles.contains(&session.role) {
        Ok(session)
    } else {
        debug!("{} is not allowed here", session.username);
        Err(warp::reject::custom(Unauthorized))
    }
}
