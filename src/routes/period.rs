use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::{Filter, Rejection, Reply};

use db::Db;
use filters::{authed, delayed, Session};
use periods::{
    extract_periods, first_period, format_periods, full_name_to_short_name, period_range_time,
    period_time, short_name_to_full_name, Day, FIRST_PERIOD, LAST_PERIOD,
};

pub fn routes(db: &Db) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let grid_route = warp::path!("api" / "periods")
        .and(warp::get())
        .and(authed(db))
        .and_then(grid)
        .and(delayed(db))
        .boxed();

    let extract_route = warp::path!("api" / "periods" / "extract")
        .and(warp::get())
        .and(authed(db))
        .and(warp::query::<ExtractRequest>())
        .and_then(extract)
        .and(delayed(db))
        .boxed();

    let day_route = warp::path!("api" / "periods" / "day")
        .and(warp::get())
        .and(authed(db))
        .and(warp::query::<DayRequest>())
        .and_then(day)
        .and(delayed(db))
        .boxed();

    grid_route.or(extract_route).or(day_route)
}

#[derive(Serialize)]
struct GridResponse {
    status: &'static str,
    periods: Vec<GridPeriod>,
    days: Vec<GridDay>,
}

#[derive(Serialize)]
struct GridPeriod {
    period: u8,
    time: String,
}

#[derive(Serialize)]
struct GridDay {
    day: Day,
    name: &'static str,
    label: &'static str,
}

async fn grid(_session: Session) -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::json(&GridResponse {
        status: "success",
        periods: (FIRST_PERIOD..=LAST_PERIOD)
            .map(|period| GridPeriod {
                period,
                time: period_time(period),
            })
            .collect(),
        days: Day::ALL
            .iter()
            .map(|&day| GridDay {
                day,
                name: day.full_name(),
                label: day.label(),
            })
            .collect(),
    }))
}

#[derive(Deserialize)]
struct ExtractRequest {
    #[serde(default)]
    value: String,
}

#[derive(Serialize)]
struct ExtractResponse {
    status: &'static str,
    periods: Vec<u8>,
    formatted: String,
    first_period: u8,
    time: String,
}

async fn extract(
    _session: Session,
    request: ExtractRequest,
) -> Result<impl warp::Reply, Infallible> {
    let periods = extract_periods(&request.value);
    let last_period = periods.iter().copied().max().unwrap_or(FIRST_PERIOD);
    let first = first_period(&request.value);

    Ok(warp::reply::json(&ExtractResponse {
        status: "success",
        formatted: format_periods(&periods),
        first_period: first,
        time: period_range_time(first, last_period),
        periods,
    }))
}

#[derive(Deserialize)]
struct DayRequest {
    name: String,
}

#[derive(Serialize)]
struct DayResponse {
    status: &'static str,
    short_name: String,
    full_name: String,
}

/// Converts between `Thứ hai` and `T2`, echoing names it does not know.
async fn day(_session: Session, request: DayRequest) -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::json(&DayResponse {
        status: "success",
        short_name: full_name_to_short_name(&request.name),
        full_name: short_name_to_full_name(&request.name),
    }))
}
