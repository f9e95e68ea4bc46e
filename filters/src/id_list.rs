use log::debug;
use warp::{Filter, Rejection};

#[derive(Debug)]
pub struct Malformed;

impl warp::reject::Reject for Malformed {}

/// JSON body holding the ids targeted by a bulk deletion, rejected as
/// `Malformed` when empty.
pub fn id_list() -> impl Filter<Extract = (Vec<u32>,), Error = Rejection> + Clone {
    warp::body::content_length_limit(1024 * 16)
        .and(warp::body::json())
        .and_then(non_empty)
}

async fn non_empty(ids: Vec<u32>) -> Result<Vec<u32>, Rejection> {
    if ids.is_empty() {
        debug!("Rejected an empty id list");
        Err(warp::reject::custom(Malformed))
    } else {
        Ok(ids)
    }
}
