//! Base58check decoding used by legacy Bitcoin addresses.

use sha2::{Digest, Sha256};

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn digit_value(c: u8) -> Option<u32> {
    ALPHABET
        .iter()
        .position(|&a| a == c)
        .and_then(|p| u32::try_from(p).ok())
}

/// Decode a base58 string into bytes. Leading `1`s become leading zero bytes.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn decode(s: &str) -> Option<Vec<u8>> {
    let mut bytes: Vec<u8> = Vec::with_capacity(s.len());
    for c in s.bytes() {
        let mut carry = digit_value(c)?;
        for byte in bytes.iter_mut().rev() {
            carry += u32::from(*byte) * 58;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.insert(0, (carry & 0xff) as u8);
            carry >>= 8;
        }
    }
    let leading = s.bytes().take_while(|&c| c == b'1').count();
    let mut out = vec![0u8; leading];
    out.extend(bytes.into_iter().skip_while(|&b| b == 0));
    Some(out)
}

/// Decode and verify the trailing four-byte double-SHA-256 checksum.
///
/// Returns the payload without its checksum.
#[must_use]
pub fn decode_check(s: &str) -> Option<Vec<u8>> {
    let mut data = decode(s)?;
    if data.len() < 5 {
        return None;
    }
    let checksum = data.split_off(data.len() - 4);
    let digest = Sha256::digest(Sha256::digest(&data));
    (digest[..4] == checksum[..]).then_some(data)
}

/// A P2PKH (`0x00`) or P2SH (`0x05`) address with a valid checksum.
///
/// ```rust
/// use prism_detect::validators::base58::is_bitcoin_address;
///
/// assert!(is_bitcoin_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"));
/// assert!(!is_bitcoin_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNb"));
/// ```
#[must_use]
pub fn is_bitcoin_address(s: &str) -> bool {
    matches!(decode_check(s), Some(payload) if payload.len() == 21 && matches!(payload[0], 0x00 | 0x05))
}
