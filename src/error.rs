//! Error type shared across the crate.
//!
//! Variants map onto the failure classes the analytics can hit:
//!
//! - `InputValidation`: malformed or out-of-bounds input data
//! - `InsufficientData`: too few observations for a fit or decomposition
//! - `InvalidMethod`: unsupported scenario sampling selector
//! - `Network` / `Io`: failures in the data-acquisition and export layers
//!
//! Optimizer non-convergence is deliberately *not* an error; it is surfaced
//! via the `success` flag on the fitted parameters.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    InputValidation(String),
    InsufficientData(String),
    InvalidMethod(String),
    Network(String),
    Io(String),
}

impl AppError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::InputValidation(message.into())
    }

    pub fn insufficient(message: impl Into<String>) -> Self {
        Self::InsufficientData(message.into())
    }

    pub fn method(message: impl Into<String>) -> Self {
        Self::InvalidMethod(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Process exit code for the binary.
    ///
    /// 2 = bad input/usage, 3 = not enough data, 4 = runtime failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::InputValidation(_) | AppError::InvalidMethod(_) | AppError::Io(_) => 2,
            AppError::InsufficientData(_) => 3,
            AppError::Network(_) => 4,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::InputValidation(m) => write!(f, "invalid input: {m}"),
            AppError::InsufficientData(m) => write!(f, "insufficient data: {m}"),
            AppError::InvalidMethod(m) => write!(f, "invalid method: {m}"),
            AppError::Network(m) => write!(f, "network error: {m}"),
            AppError::Io(m) => write!(f, "io error: {m}"),
        }
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_by_class() {
        assert_eq!(AppError::input("x").exit_code(), 2);
        assert_eq!(AppError::insufficient("x").exit_code(), 3);
        assert_eq!(AppError::network("x").exit_code(), 4);
    }

    #[test]
    fn display_includes_message() {
        let err = AppError::method("no such sampler 'bootstrap'");
        assert!(err.to_string().contains("bootstrap"));
    }
}
