use printquote_db::{seed_defaults, SeedReport};

use crate::commands::{with_database, CommandResult};

pub fn run() -> CommandResult {
    let result = with_database("seed", |pool| async move {
        seed_defaults(&pool).await.map_err(|error| ("seed_execution", error.to_string(), 6u8))
    });

    match result {
        Ok(report) => CommandResult::success("seed", seed_message(report)),
        Err(failure) => failure,
    }
}

fn seed_message(report: SeedReport) -> String {
    match report.inserted {
        0 => "default catalog already present; nothing inserted".to_string(),
        1 => "inserted 1 default row".to_string(),
        count => format!("inserted {count} default rows"),
    }
}
