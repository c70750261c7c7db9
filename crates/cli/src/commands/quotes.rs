use printquote_core::domain::quote::QuoteId;
use printquote_db::QuoteService;

use crate::commands::{application_failure, with_database, CommandResult};

pub fn list(search: &str) -> CommandResult {
    let search = search.to_string();
    let result = with_database("quotes list", |pool| async move {
        let service = QuoteService::from_pool(pool).map_err(application_failure)?;
        service.list_quotes(&search).await.map_err(application_failure)
    });

    match result {
        Ok(quotes) => CommandResult::payload("quotes list", &quotes),
        Err(failure) => failure,
    }
}

pub fn show(id: i64) -> CommandResult {
    let result = with_database("quotes show", |pool| async move {
        let service = QuoteService::from_pool(pool).map_err(application_failure)?;
        service.detail(QuoteId(id)).await.map_err(application_failure)
    });

    match result {
        Ok(detail) => CommandResult::payload("quotes show", &detail),
        Err(failure) => failure,
    }
}

pub fn text(id: i64) -> CommandResult {
    let result = with_database("quotes text", |pool| async move {
        let service = QuoteService::from_pool(pool).map_err(application_failure)?;
        service.text(QuoteId(id)).await.map_err(application_failure)
    });

    match result {
        Ok(text) => CommandResult::plain(text),
        Err(failure) => failure,
    }
}
