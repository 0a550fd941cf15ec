//! # ESP3 CRC8 Implementation
//!
//! CRC-8 checksum used by the EnOcean Serial Protocol 3 for both the header
//! and the payload.
//!
//! **Polynomial**: 0x07 (x^8 + x^2 + x + 1), MSB first
//! **Initial Value**: 0x00

/// ESP3 CRC8 polynomial
const CRC8_POLY: u8 = 0x07;

/// Precomputed CRC8 lookup table for fast calculation
const CRC8_TABLE: [u8; 256] = generate_crc8_table();

/// Generate CRC8 lookup table at compile time
const fn generate_crc8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Add one byte to a running CRC8
///
/// # Arguments
///
/// * `byte` - Byte to add
/// * `crc` - CRC accumulated so far (0x00 to start)
///
/// # Returns
///
/// * `u8` - Updated CRC
#[inline]
pub fn crc8_update(byte: u8, crc: u8) -> u8 {
    CRC8_TABLE[(crc ^ byte) as usize]
}

/// Calculate the ESP3 CRC8 over a byte range, continuing from `seed`
///
/// Feeding the result of one call as the seed of the next is equivalent to a
/// single call over the concatenated ranges.
pub fn crc8_with_seed(data: &[u8], seed: u8) -> u8 {
    data.iter().fold(seed, |crc, &byte| crc8_update(byte, crc))
}

/// Calculate the ESP3 CRC8 checksum using the lookup table
///
/// # Arguments
///
/// * `data` - Byte slice to calculate CRC for (header bytes 1..4, or payload)
///
/// # Examples
///
/// ```
/// use enocean_gateway::esp3::crc::crc8;
///
/// // Header CRC of a 7+7 byte radio packet
/// assert_eq!(crc8(&[0x00, 0x07, 0x07, 0x01]), 0x7A);
/// ```
pub fn crc8(data: &[u8]) -> u8 {
    crc8_with_seed(data, 0)
}

/// Calculate CRC8 using the bitwise algorithm (slow, for verification)
#[allow(dead_code)]
fn crc8_slow(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;

    for &byte in data {
        crc ^= byte;

        for _ in 0..8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc8_empty() {
        assert_eq!(crc8(&[]), 0x00);
    }

    #[test]
    fn test_crc8_single_byte() {
        assert_eq!(crc8(&[0x00]), 0x00);
        assert_eq!(crc8(&[0x01]), 0x07);
        assert_eq!(crc8(&[0xFF]), 0xF3);
        assert_eq!(crc8(&[0xFF]), crc8_slow(&[0xFF]));
    }

    #[test]
    fn test_crc8_check_value() {
        // Standard CRC-8 (poly 0x07) check value over "123456789"
        assert_eq!(crc8(b"123456789"), 0xF4);
    }

    #[test]
    fn test_crc8_reference_telegram() {
        // 55 00 07 07 01 7A F6 30 00 86 B8 1A 30 03 FF FF FF FF FF 00 C0
        assert_eq!(crc8(&[0x00, 0x07, 0x07, 0x01]), 0x7A);

        let payload = [
            0xF6, 0x30, 0x00, 0x86, 0xB8, 0x1A, 0x30, 0x03, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
        ];
        assert_eq!(crc8(&payload), 0xC0);
    }

    #[test]
    fn test_crc8_lookup_table_matches_slow() {
        let test_data = [
            vec![0x01, 0x02, 0x03],
            vec![0x55, 0x00, 0x07, 0x07],
            vec![0xF6, 0x30, 0x00, 0x86],
            vec![0x00; 24],
            vec![0xFF; 10],
        ];

        for data in test_data.iter() {
            assert_eq!(crc8(data), crc8_slow(data), "CRC mismatch for data: {:?}", data);
        }
    }

    #[test]
    fn test_crc8_chaining() {
        let data = [0xF6, 0x30, 0x00, 0x86, 0xB8, 0x1A, 0x30];
        let (head, tail) = data.split_at(3);

        let chained = crc8_with_seed(tail, crc8(head));
        assert_eq!(chained, crc8(&data));
    }

    #[test]
    fn test_crc8_update_matches_range() {
        let data = [0x10, 0x20, 0x30];
        let mut crc = 0;
        for &b in &data {
            crc = crc8_update(b, crc);
        }
        assert_eq!(crc, crc8(&data));
    }
}
