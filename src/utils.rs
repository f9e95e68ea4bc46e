use chrono::Datelike;
use periods::Day;
use rand::{self, distributions::Alphanumeric, Rng};

/// Random password given to newly created accounts.
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();

    std::iter::repeat(())
        .map(|()| rng.sample(Alphanumeric))
        .take(10)
        .collect()
}

pub fn today() -> Day {
    let weekday = chrono::Local::now().weekday();
    Day::from_number_from_monday(weekday.number_from_monday()).unwrap_or(Day::Monday)
}
