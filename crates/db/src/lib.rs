pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod seed;
pub mod service;

pub use connection::{connect, connect_from_config, connect_with_settings, DbPool};
pub use seed::{seed_defaults, SeedReport};
pub use service::{PricedQuote, QuoteService};
