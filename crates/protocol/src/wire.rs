//! Primitive codecs for the su wire format.
//!
//! Every integer on the wire is a little-endian `i32`. Strings are a
//! little-endian `u32` byte length followed by that many UTF-8 bytes, so
//! stream boundaries are unambiguous without any self-describing framing.
//!
//! The `put_*` functions append to a buffer; the `get_*` functions decode
//! from the front of a slice and report how many bytes they consumed, so
//! callers can walk a buffer the way the daemon walks the preamble.

use crate::error::{ProtocolError, Result};

/// Size of one wire integer in bytes.
pub const INT_LEN: usize = 4;

/// Sanity bound for length-prefixed strings. Shell paths and command lines
/// are tiny; anything near this size is a corrupt stream, not a request.
pub const MAX_STRING_LEN: usize = 64 * 1024;

/// Append a wire integer.
pub fn put_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Decode a wire integer from the front of `data`.
///
/// Returns the value and the number of bytes consumed.
pub fn get_i32(data: &[u8]) -> Result<(i32, usize)> {
    if data.len() < INT_LEN {
        return Err(ProtocolError::Malformed(format!(
            "insufficient data for integer: need {} bytes, have {}",
            INT_LEN,
            data.len()
        )));
    }
    let bytes: [u8; INT_LEN] = data[..INT_LEN].try_into().unwrap();
    Ok((i32::from_le_bytes(bytes), INT_LEN))
}

/// Append a length-prefixed string.
///
/// # Errors
///
/// Returns [`ProtocolError::StringTooLong`] if the string exceeds
/// [`MAX_STRING_LEN`].
pub fn put_string(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    if s.len() > MAX_STRING_LEN {
        return Err(ProtocolError::StringTooLong {
            len: s.len(),
            max: MAX_STRING_LEN,
        });
    }
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Decode a length-prefixed string from the front of `data`.
///
/// Returns the string and the number of bytes consumed.
pub fn get_string(data: &[u8]) -> Result<(String, usize)> {
    if data.len() < INT_LEN {
        return Err(ProtocolError::Malformed(format!(
            "insufficient data for string length: need {} bytes, have {}",
            INT_LEN,
            data.len()
        )));
    }
    let len_bytes: [u8; INT_LEN] = data[..INT_LEN].try_into().unwrap();
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > MAX_STRING_LEN {
        return Err(ProtocolError::StringTooLong {
            len,
            max: MAX_STRING_LEN,
        });
    }
    if data.len() < INT_LEN + len {
        return Err(ProtocolError::Malformed(format!(
            "insufficient data for string: need {} bytes, have {}",
            INT_LEN + len,
            data.len()
        )));
    }

    let s = std::str::from_utf8(&data[INT_LEN..INT_LEN + len])
        .map_err(|e| ProtocolError::Malformed(format!("string is not valid UTF-8: {}", e)))?
        .to_string();
    Ok((s, INT_LEN + len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_i32_layout() {
        let mut buf = Vec::new();
        put_i32(&mut buf, 0x0403_0201);
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_put_i32_negative() {
        let mut buf = Vec::new();
        put_i32(&mut buf, -1);
        assert_eq!(buf, [0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_i32_roundtrip() {
        for value in [0, 1, -1, 13, i32::MAX, i32::MIN] {
            let mut buf = Vec::new();
            put_i32(&mut buf, value);
            let (decoded, consumed) = get_i32(&buf).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, INT_LEN);
        }
    }

    #[test]
    fn test_get_i32_insufficient_data() {
        let result = get_i32(&[0x01, 0x02]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("insufficient data"));
    }

    #[test]
    fn test_put_string_layout() {
        let mut buf = Vec::new();
        put_string(&mut buf, "sh").unwrap();
        assert_eq!(buf, [0x02, 0x00, 0x00, 0x00, b's', b'h']);
    }

    #[test]
    fn test_string_roundtrip_empty() {
        let mut buf = Vec::new();
        put_string(&mut buf, "").unwrap();
        let (decoded, consumed) = get_string(&buf).unwrap();
        assert_eq!(decoded, "");
        assert_eq!(consumed, INT_LEN);
    }

    #[test]
    fn test_string_roundtrip() {
        let mut buf = Vec::new();
        put_string(&mut buf, "/system/bin/sh").unwrap();
        let (decoded, consumed) = get_string(&buf).unwrap();
        assert_eq!(decoded, "/system/bin/sh");
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn test_put_string_too_long() {
        let mut buf = Vec::new();
        let huge = "x".repeat(MAX_STRING_LEN + 1);
        let result = put_string(&mut buf, &huge);
        assert!(matches!(
            result,
            Err(ProtocolError::StringTooLong { .. })
        ));
    }

    #[test]
    fn test_get_string_oversized_length() {
        // Length prefix claims far more than the sanity bound.
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_STRING_LEN as u32 + 1).to_le_bytes());
        let result = get_string(&buf);
        assert!(matches!(
            result,
            Err(ProtocolError::StringTooLong { .. })
        ));
    }

    #[test]
    fn test_get_string_truncated_payload() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&8u32.to_le_bytes());
        buf.extend_from_slice(b"shor");
        let result = get_string(&buf);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("insufficient data"));
    }

    #[test]
    fn test_get_string_invalid_utf8() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&[0xFF, 0xFE]);
        let result = get_string(&buf);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("UTF-8"));
    }

    #[test]
    fn test_multiple_values_in_buffer() {
        let mut buf = Vec::new();
        put_i32(&mut buf, 42);
        put_string(&mut buf, "id").unwrap();
        put_i32(&mut buf, 0);

        let (first, used) = get_i32(&buf).unwrap();
        assert_eq!(first, 42);
        let (s, used2) = get_string(&buf[used..]).unwrap();
        assert_eq!(s, "id");
        let (last, _) = get_i32(&buf[used + used2..]).unwrap();
        assert_eq!(last, 0);
    }
}
