pub mod config;
pub mod domain;
pub mod errors;
pub mod export;
pub mod pricing;
pub mod snapshot;
pub mod validation;

pub use domain::catalog::{
    Material, MaterialInput, NewShippingRate, PackagingRate, PackagingRateInput, RateConfig,
    ShippingRate, ShippingRateInput, ShippingScope,
};
pub use domain::quote::{
    NewQuote, QuoteDetail, QuoteDetailItem, QuoteId, QuoteItem, QuoteRequest, QuoteSummary,
};
pub use errors::{ApplicationError, DomainError, Entity, InterfaceError};
pub use export::{render_quote_text, ExportError, QuoteTextRenderer};
pub use pricing::{
    calculate, calculate_batch, Breakdown, DeterministicPricingEngine, GlobalInput, ItemInput,
    PricingEngine, PricingResult, Totals,
};
pub use snapshot::{
    decode_snapshot, encode_snapshot, AliasTable, DecodedSnapshot, SnapshotDecoder,
    SnapshotDocuments,
};
pub use validation::{ValidationError, ValidationReason};
