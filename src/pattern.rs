//! Byte-pattern primitives for signature predicates
//!
//! Every signature works over the 4-byte fingerprint words stored in a
//! [`FlowObservation`]. Patterns are arrays of `u16` so that [`ANY`] can
//! sit outside the byte range; the `match_bytes!` macro does the casting
//! at the call site.

use crate::core::FlowObservation;

/// Wildcard pattern element, matches any observed byte.
pub const ANY: u16 = 0x100;

/// Compare a fingerprint word byte-for-byte against a 4-byte pattern.
///
/// Payloads shorter than four bytes are stored zero-padded, so patterns
/// for short payloads must spell out the trailing zeroes rather than use
/// [`ANY`].
#[inline]
pub fn match_bytes(word: [u8; 4], pat: [u16; 4]) -> bool {
    word.iter()
        .zip(pat.iter())
        .all(|(&b, &p)| p == ANY || p == b as u16)
}

/// Exact 4-byte literal comparison.
#[inline]
pub fn match_str(word: [u8; 4], lit: &[u8; 4]) -> bool {
    word == *lit
}

/// Literal matches either direction's fingerprint word.
#[inline]
pub fn match_str_either(obs: &FlowObservation, lit: &[u8; 4]) -> bool {
    match_str(obs.payload[0], lit) || match_str(obs.payload[1], lit)
}

/// Both literals present, one per direction, in either orientation.
#[inline]
pub fn match_str_both(obs: &FlowObservation, a: &[u8; 4], b: &[u8; 4]) -> bool {
    (match_str(obs.payload[0], a) && match_str(obs.payload[1], b))
        || (match_str(obs.payload[1], a) && match_str(obs.payload[0], b))
}

/// Wildcard pattern matches either direction's fingerprint word.
#[inline]
pub fn match_chars_either(obs: &FlowObservation, pat: [u16; 4]) -> bool {
    match_bytes(obs.payload[0], pat) || match_bytes(obs.payload[1], pat)
}

/// Fingerprint word read as a big-endian u32 equals the payload length
/// minus `offset`. Used by protocols that start with a length field.
#[inline]
pub fn match_length_prefix(word: [u8; 4], len: u32, offset: u32) -> bool {
    u32::from_be_bytes(word) == len.wrapping_sub(offset)
}

/// A direction that has carried no payload is treated as matching; this
/// lets one-sided captures still satisfy bidirectional signatures.
#[inline]
pub fn empty_or(len: u32, matched: bool) -> bool {
    len == 0 || matched
}

/// `match_bytes` with per-element `as u16` casts, so byte literals and
/// [`ANY`](crate::pattern::ANY) mix freely.
#[macro_export]
macro_rules! match_bytes {
    ($word:expr, $b0:expr, $b1:expr, $b2:expr, $b3:expr) => {
        $crate::pattern::match_bytes($word, [$b0 as u16, $b1 as u16, $b2 as u16, $b3 as u16])
    };
}

/// `match_chars_either` with per-element `as u16` casts.
#[macro_export]
macro_rules! match_chars_either {
    ($obs:expr, $b0:expr, $b1:expr, $b2:expr, $b3:expr) => {
        $crate::pattern::match_chars_either(
            $obs,
            [$b0 as u16, $b1 as u16, $b2 as u16, $b3 as u16],
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_bytes_exact() {
        assert!(match_bytes(*b"GET ", [0x47, 0x45, 0x54, 0x20]));
        assert!(!match_bytes(*b"GET ", [0x47, 0x45, 0x54, 0x21]));
    }

    #[test]
    fn test_match_bytes_wildcard() {
        assert!(match_bytes(*b"GET ", [0x47, ANY, ANY, ANY]));
        assert!(match_bytes([0x13, 0x42, 0x69, 0x74], [0x13, ANY, ANY, ANY]));
        assert!(!match_bytes([0x14, 0x42, 0x69, 0x74], [0x13, ANY, ANY, ANY]));
    }

    #[test]
    fn test_padded_zeroes_must_match() {
        // A 2-byte payload stores trailing zeroes which the pattern sees.
        let word = [0x41, 0x42, 0x00, 0x00];
        assert!(match_bytes(word, [0x41, 0x42, 0x00, 0x00]));
        assert!(!match_bytes(word, [0x41, 0x42, 0x43, ANY]));
    }

    #[test]
    fn test_match_bytes_macro_mixes_literals() {
        let word = *b"SSH-";
        assert!(match_bytes!(word, b'S', b'S', b'H', b'-'));
        assert!(match_bytes!(word, b'S', ANY, ANY, b'-'));
    }

    #[test]
    fn test_match_str_either_and_both() {
        let mut obs = FlowObservation::new();
        obs.payload[0] = *b"GET ";
        obs.payload[1] = *b"HTTP";
        obs.payload_len = [4, 4];
        assert!(match_str_either(&obs, b"GET "));
        assert!(match_str_either(&obs, b"HTTP"));
        assert!(!match_str_either(&obs, b"POST"));
        assert!(match_str_both(&obs, b"HTTP", b"GET "));
        assert!(match_str_both(&obs, b"GET ", b"HTTP"));
        assert!(!match_str_both(&obs, b"GET ", b"GET "));
    }

    #[test]
    fn test_match_length_prefix() {
        // 16-byte message starting with a be32 length of 16.
        assert!(match_length_prefix([0x00, 0x00, 0x00, 0x10], 16, 0));
        assert!(match_length_prefix([0x00, 0x00, 0x00, 0x10], 20, 4));
        assert!(!match_length_prefix([0x00, 0x00, 0x00, 0x10], 17, 0));
    }

    #[test]
    fn test_empty_or() {
        assert!(empty_or(0, false));
        assert!(empty_or(4, true));
        assert!(!empty_or(4, false));
    }
}
