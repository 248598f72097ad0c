//! # Frame Checksum
//!
//! Truncating 8-bit sum over the frame header and payload bytes.
//!
//! This is not a CRC: two frames can share a checksum. The receiver expects
//! exactly this sum, so it is kept as-is.

/// Calculate the 8-bit wrapping sum of `data`
///
/// # Arguments
///
/// * `data` - Bytes to sum (frame bytes 0..4)
///
/// # Returns
///
/// * `u8` - `(sum of bytes) mod 256`
///
/// # Examples
///
/// ```
/// use shock_remote::shocker::checksum::sum8;
///
/// assert_eq!(sum8(&[0xDD, 0xC8, 0x01, 0x0A]), 0xB0);
/// ```
pub fn sum8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &byte| acc.wrapping_add(byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference sum computed in a wider integer
    fn sum8_wide(data: &[u8]) -> u8 {
        (data.iter().map(|&b| b as u32).sum::<u32>() % 256) as u8
    }

    #[test]
    fn test_sum8_empty() {
        assert_eq!(sum8(&[]), 0x00);
    }

    #[test]
    fn test_sum8_wraps() {
        assert_eq!(sum8(&[0xFF, 0x01]), 0x00);
        assert_eq!(sum8(&[0xFF, 0xFF]), 0xFE);
    }

    #[test]
    fn test_sum8_frame_header() {
        assert_eq!(sum8(&[0xDD, 0xC8, 0x01, 0x0A]), 0xB0);
        assert_eq!(sum8(&[0xDD, 0xC8, 0x01, 0x63]), 0x09);
    }

    #[test]
    fn test_sum8_matches_wide_sum() {
        let test_data = [
            vec![0x01, 0x02, 0x03],
            vec![0xFF, 0xFE, 0xFD],
            vec![0xDD, 0xC8, 0x23, 0x63],
            vec![0xFF; 10],
        ];

        for data in test_data.iter() {
            assert_eq!(sum8(data), sum8_wide(data), "Sum mismatch for data: {:?}", data);
        }
    }
}
