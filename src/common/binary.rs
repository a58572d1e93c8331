//! Binary data parsing utilities.
//!
//! This module provides the little-endian field readers and the UTF-16LE
//! string decoding used by the compound file structures.

use encoding_rs::UTF_16LE;
use zerocopy::{FromBytes, LE, U32};

/// Binary parsing error type
#[derive(Debug, Clone)]
pub enum BinaryError {
    /// Not enough data to read the requested type
    InsufficientData { expected: usize, available: usize },
    /// Failed to parse the data
    ParseError(String),
}

impl std::fmt::Display for BinaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryError::InsufficientData {
                expected,
                available,
            } => {
                write!(
                    f,
                    "Insufficient data: expected {}, got {}",
                    expected, available
                )
            },
            BinaryError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for BinaryError {}

/// Result type for binary operations
pub type BinaryResult<T> = Result<T, BinaryError>;

#[inline]
fn field<const N: usize>(data: &[u8], offset: usize) -> BinaryResult<&[u8]> {
    offset
        .checked_add(N)
        .and_then(|end| data.get(offset..end))
        .ok_or(BinaryError::InsufficientData {
            expected: offset.saturating_add(N),
            available: data.len(),
        })
}

/// Read a little-endian u32 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use msiole::common::binary::read_u32_le;
/// let data = [0x78, 0x56, 0x34, 0x12];
/// assert_eq!(read_u32_le(&data, 0).unwrap(), 0x12345678);
/// ```
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> BinaryResult<u32> {
    U32::<LE>::read_from_bytes(field::<4>(data, offset)?)
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read u32".to_string()))
}

/// Iterate over a byte slice as consecutive little-endian u32 values.
///
/// Trailing bytes that do not form a whole value are ignored.
pub fn u32_le_values(data: &[u8]) -> impl Iterator<Item = u32> + '_ {
    data.chunks_exact(4).map(|chunk| {
        U32::<LE>::read_from_bytes(chunk)
            .map(|v| v.get())
            .unwrap_or_default()
    })
}

/// Decode UTF-16LE bytes to a String, stopping at the first NUL.
///
/// Unpaired surrogates are replaced rather than rejected.
///
/// ```
/// use msiole::common::binary::decode_utf16le;
/// let data = [0x48, 0x00, 0x69, 0x00, 0x00, 0x00, 0x41, 0x00];
/// assert_eq!(decode_utf16le(&data), "Hi");
/// ```
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let (decoded, _) = UTF_16LE.decode_without_bom_handling(bytes);
    match decoded.find('\0') {
        Some(end) => decoded[..end].to_string(),
        None => decoded.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u32_le() {
        let data = [0x78, 0x56, 0x34, 0x12, 0, 0, 0, 0];
        assert!(read_u32_le(&data, 0).is_ok_and(|v| v == 0x12345678));
        assert!(read_u32_le(&data, 4).is_ok_and(|v| v == 0));
        assert!(matches!(
            read_u32_le(&data, 6),
            Err(BinaryError::InsufficientData {
                expected: 10,
                available: 8
            })
        ));
        assert!(read_u32_le(&data, usize::MAX).is_err());
    }

    #[test]
    fn test_u32_le_values() {
        let data = [1, 0, 0, 0, 0xFE, 0xFF, 0xFF, 0xFF, 7];
        let values: Vec<u32> = u32_le_values(&data).collect();
        assert_eq!(values, vec![1, 0xFFFF_FFFE]);
    }

    #[test]
    fn test_decode_utf16le() {
        let data = vec![
            0x52, 0x00, // 'R'
            0x6F, 0x00, // 'o'
            0x6F, 0x00, // 'o'
            0x74, 0x00, // 't'
            0x00, 0x00, // null terminator
        ];
        assert_eq!(decode_utf16le(&data), "Root");
        assert_eq!(decode_utf16le(&[]), "");
    }
}
