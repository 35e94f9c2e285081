//! Fatal errors raised before or around record processing.

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ArgError {
    #[error("EMAC threshold must be a finite, non-negative number, got {0}")]
    InvalidEmacMin(f64),
    #[error("HWE p-value threshold must be in [0, 1], got {0}")]
    InvalidHweMinP(f64),
    #[error("chunk size must be at least 1")]
    InvalidChunkSize,
    #[error("expected exactly three genotype count columns for {0}, got {1}")]
    InvalidGenoCols(&'static str, usize),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("input has no header line")]
    Empty,
}
