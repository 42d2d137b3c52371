// Freelancer Kit - Core Library
// Currency/tax-id/phone masks, amounts written out in words, pricing,
// document generation and per-user history. Used by the CLI, the API server and tests.

pub mod config;
pub mod db;
pub mod documents;
pub mod error;
pub mod masks;
pub mod money;
pub mod pricing;
pub mod words;

// Re-export commonly used types
pub use config::Settings;
pub use db::{
    DocumentRecord, EditableDocument, Event, Stats,
    setup_database, save_profile, load_profile, increment_stat, get_stats,
    save_document, record_generated, insert_record, list_documents, get_document, delete_document,
    reload_snapshot, export_documents_csv, insert_event, get_events_for_entity,
};
pub use documents::{
    Contract, DocumentKind, DocumentTemplate, GeneratedDocument, Profile, Proposal, Receipt,
    format_date, generate, printable_page,
};
pub use error::KitError;
pub use masks::{digits, format_phone, format_tax_id, TaxIdKind};
pub use money::{format_amount, format_brl, parse_amount, Amount};
pub use pricing::{PriceQuote, PricingInput};
pub use words::{amount_to_words, extenso999};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
