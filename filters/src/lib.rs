mod authed;
mod delayed;
mod id_list;
mod with_db;

pub use authed::{
    authed, authed_is_of_kind, bearer_token, Forbidden, Role, Session, Unauthorized,
};
pub use delayed::delayed;
pub use id_list::{id_list, Malformed};
pub use with_db::with_db;
