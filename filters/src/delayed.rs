use crate::with_db;
use db::{Database, Db};
use log::trace;
use warp::{Filter, Rejection};

/// Waits for the artificial delay configured through `/api/delay`, to let
/// the dashboard be tested against a slow backend.
pub fn delayed(db: &Db) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::any()
        .and(with_db(db.clone()))
        .and_then(delay)
        .untuple_one()
}

async fn delay(db: Db) -> Result<(), warp::Rejection> {
    // Release db as soon as possible
    let delay = {
        let db = db.lock().await;
        db.delay_get()
    };

    if delay.as_millis() > 0 {
        trace!("Delaying response by {}ms", delay.as_millis());
        tokio::time::delay_for(delay).await;
    }

    Ok(())
}
