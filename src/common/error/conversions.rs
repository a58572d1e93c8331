//! Error conversion implementations.
//!
//! This module contains From trait implementations to convert from internal
//! error types to the unified Error type.

use super::types::Error;
use crate::common::binary::BinaryError;

// A field that cannot be read means the structure it belongs to is damaged
impl From<BinaryError> for Error {
    fn from(err: BinaryError) -> Self {
        Error::CorruptedFile(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::ErrorKind;

    #[test]
    fn test_binary_error_is_corruption() {
        let err: Error = BinaryError::InsufficientData {
            expected: 4,
            available: 2,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Corruption);
        assert!(err.to_string().contains("expected 4, got 2"));
    }
}
