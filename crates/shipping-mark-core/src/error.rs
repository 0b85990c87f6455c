use thiserror::Error;

/// Unified error type for shipping-mark-core
///
/// Batch indices carried by the variants are 1-based, matching what an
/// operator sees in the request form.
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Request Errors
    // ==========================================================================
    /// Profile key not present in the profile table
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    /// Total box count or batch count below 1
    #[error("invalid box count: {0}")]
    InvalidBoxCount(String),

    /// A batch asked for zero copies
    #[error("batch {batch}: copy count must be at least 1 (got {copies})")]
    InvalidCopyCount { batch: usize, copies: u32 },

    /// Override value that cannot be interpreted for its key
    #[error("invalid value for '{key}': {value}")]
    InvalidParameter { key: String, value: String },

    /// Batch without a source template reference
    #[error("batch {batch}: no template PDF selected")]
    MissingBatchFile { batch: usize },

    /// Batch template reference that does not resolve to a file
    #[error("batch {batch}: file not found - {name}")]
    FileNotFound { batch: usize, name: String },

    /// Template is neither a 1-page nor a 2-page document
    #[error("unsupported page count: {0} (only 1- or 2-page templates are supported)")]
    UnsupportedPageCount(usize),

    /// Batch copy count above the remaining box budget
    #[error("batch {batch}: requested {requested} copies but only {remaining} boxes remain")]
    BoxBudgetExceeded {
        batch: usize,
        requested: u32,
        remaining: u32,
    },

    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Template bytes are not a readable PDF
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// Error from the lopdf library while editing a document
    #[error("lopdf error: {0}")]
    Lopdf(String),

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Optional image asset could not be drawn
    ///
    /// Never propagated out of a generation run; the compositor logs it and
    /// leaves the page without the image.
    #[error("failed to draw image asset: {0}")]
    AssetDrawFailure(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error was caused by the request rather than the server.
    ///
    /// Client errors are reported back verbatim; everything else is an
    /// internal failure.
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownProfile(_)
                | Self::InvalidBoxCount(_)
                | Self::InvalidCopyCount { .. }
                | Self::InvalidParameter { .. }
                | Self::MissingBatchFile { .. }
                | Self::FileNotFound { .. }
                | Self::UnsupportedPageCount(_)
                | Self::BoxBudgetExceeded { .. }
                | Self::PdfOpen(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_message_names_batch_and_counts() {
        let err = Error::BoxBudgetExceeded {
            batch: 2,
            requested: 7,
            remaining: 3,
        };
        assert_eq!(
            err.to_string(),
            "batch 2: requested 7 copies but only 3 boxes remain"
        );
        assert!(err.is_client_error());
    }

    #[test]
    fn test_internal_errors_are_not_client_errors() {
        assert!(!Error::PdfSave("disk full".into()).is_client_error());
        assert!(!Error::ConfigLoad("bad toml".into()).is_client_error());
        assert!(Error::UnsupportedPageCount(3).is_client_error());
    }
}
