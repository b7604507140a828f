use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    /// Malformed or out-of-range format, aperture, macro, code or coordinate values.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A reference to an aperture that is not defined, or a draw/flash without a selected aperture.
    #[error("Undefined aperture: {0}")]
    UndefinedAperture(String),

    /// An unrecognized or deprecated G/M-code or parameter, while `ignore_invalid` is unset.
    #[error("Unknown code: {0}")]
    UnknownCode(String),

    #[error("Function index {index} out of range, count: {count}")]
    Index { index: usize, count: usize },

    #[error("Unsupported conversion of aperture {code}, macro: {macro_name}")]
    UnsupportedConversion { code: String, macro_name: String },
}

impl DocumentError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
