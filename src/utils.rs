//! Little-endian field extraction over raw on-disk buffers.

/// Extracts a 32-bit unsigned integer from a buffer at a given offset.
///
/// # Arguments
///
/// - `buffer`: A slice of bytes from which the value will be extracted.
/// - `offset`: The offset within the buffer where the 32-bit value starts.
///
/// # Returns
///
/// `None` if the slice does not contain 4 bytes starting from the offset.
pub fn u32_at(buffer: &[u8], offset: usize) -> Option<u32> {
    let bytes = buffer.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

/// Extracts a 16-bit unsigned integer from a buffer at a given offset.
///
/// # Arguments
///
/// - `buffer`: A slice of bytes from which the value will be extracted.
/// - `offset`: The offset within the buffer where the 16-bit value starts.
///
/// # Returns
///
/// `None` if the slice does not contain 2 bytes starting from the offset.
pub fn u16_at(buffer: &[u8], offset: usize) -> Option<u16> {
    let bytes = buffer.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes(bytes.try_into().ok()?))
}

/// Splits a pointer block into its little-endian 32-bit entries.
///
/// Trailing bytes that do not form a whole entry are ignored.
pub fn u32_entries(buffer: &[u8]) -> impl Iterator<Item = u32> + '_ {
    buffer
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
}

/// Renders a fixed-width, possibly NUL- or space-padded byte field as text.
pub fn padded_str(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_u32_at() {
        let buf = [0x53, 0xEF, 0x01, 0x00, 0x00, 0x00];
        assert_eq!(u16_at(&buf, 0), Some(0xEF53));
        assert_eq!(u32_at(&buf, 2), Some(1));
        assert_eq!(u32_at(&buf, 3), None);
        assert_eq!(u16_at(&buf, usize::MAX), None);
    }

    #[test]
    fn test_u32_entries_ignores_tail() {
        let buf = [1, 0, 0, 0, 2, 0, 0, 0, 9];
        assert_eq!(u32_entries(&buf).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_padded_str() {
        assert_eq!(padded_str(b"NO NAME    "), "NO NAME");
        assert_eq!(padded_str(b"vol\0\0\0garbage"), "vol");
    }
}
