use clap::{Parser, ValueEnum};
use fern::colors::{Color, ColoredLevelConfig};
use log::info;
use std::net::IpAddr;
use warp::Filter;

mod routes;
mod utils;

use db::new_db;
use routes::{handle_rejection, routes};

/// School timetable and grades API
#[derive(Parser, Debug)]
#[command(version, about)]
struct Config {
    /// JSON file holding the whole database, created and seeded when missing
    #[arg(long, default_value = "db.json")]
    db_file: String,

    #[arg(long, default_value = "127.0.0.1")]
    address: IpAddr,

    #[arg(long, default_value_t = 3030)]
    port: u16,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = setup_logging(config.log_level.into()) {
        eprintln!("Could not apply logging configuration: {}", e);
    }

    info!("Using database {}", config.db_file);
    let global_db = new_db(config.db_file.clone());
    let filters = routes(&global_db);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allow_headers(vec!["content-type", "Authorization"]);

    let filters = filters
        .with(cors)
        // Before logging for correct status codes
        .recover(handle_rejection)
        .with(warp::log("school_timetable_api"));

    info!("Listening on {}:{}", config.address, config.port);
    warp::serve(filters).run((config.address, config.port)).await;
}

fn setup_logging(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    let colors = ColoredLevelConfig::new().debug(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}{} {}",
                colors.color(record.level()),
                chrono::Local::now().format("[%H:%M:%S]"),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
}
