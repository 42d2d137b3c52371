use thiserror::Error;

/// Domain errors raised by the library.
///
/// Masks and the amount parser never fail; only the words converter (for
/// out-of-domain amounts) and the history store produce these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KitError {
    #[error("amount must not be negative: {0}")]
    NegativeAmount(f64),

    #[error("amount is not a finite number")]
    NotFinite,

    #[error("amount too large to write out: {0} (limit is 999.999.999 reais)")]
    AmountTooLarge(f64),

    #[error("cents must be between 0 and 100, got {0}")]
    CentsOutOfRange(u64),

    #[error("amount of {0} cents is too large to store")]
    AmountNotStorable(u64),

    #[error("unknown document type: {0}")]
    UnknownDocumentKind(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    // Records saved before snapshots existed cannot be reopened for editing
    #[error("document {0} has no saved form data to edit")]
    MissingSnapshot(String),

    #[error("configuration error: {0}")]
    Config(String),
}
